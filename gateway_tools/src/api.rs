use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
    Url,
};
use serde::de::DeserializeOwned;

use crate::{config::GatewayConfig, data_objects::GatewaySession, GatewayApiError};

#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.reveal()))
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub async fn rest_query<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T, GatewayApiError> {
        let url = Url::parse(&self.url(path)).map_err(|e| GatewayApiError::InvalidUrl(e.to_string()))?;
        self.send_query(method, url).await
    }

    async fn send_query<T: DeserializeOwned>(&self, method: Method, url: Url) -> Result<T, GatewayApiError> {
        trace!("Sending REST query: {url}");
        let response = self.client.request(method, url).send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayApiError::Timeout(e.to_string())
            } else {
                GatewayApiError::RestResponseError(e.to_string())
            }
        })?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayApiError::RestResponseError(e.to_string()))?;
            Err(GatewayApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.base_url)
    }

    /// The URL of a single checkout session. The id is percent-encoded as one path segment.
    pub fn session_url(&self, session_id: &str) -> Result<Url, GatewayApiError> {
        let mut url =
            Url::parse(&self.url("/checkout/sessions")).map_err(|e| GatewayApiError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| GatewayApiError::InvalidUrl(format!("{} cannot take a path", self.config.base_url)))?
            .push(session_id);
        Ok(url)
    }

    pub async fn fetch_session(&self, session_id: &str) -> Result<GatewaySession, GatewayApiError> {
        let url = self.session_url(session_id)?;
        debug!("Fetching checkout session {session_id}");
        let session = self.send_query::<GatewaySession>(Method::GET, url).await?;
        info!("Checkout session {session_id} has payment status '{}'", session.payment_status);
        Ok(session)
    }
}
