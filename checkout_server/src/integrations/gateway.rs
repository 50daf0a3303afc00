use std::time::Duration;

use checkout_engine::{
    db_types::{PaymentStatus, SessionId},
    traits::{PaymentGateway, PaymentGatewayError},
};
use gateway_tools::{GatewayApi, GatewayApiError, GatewayConfig};
use log::*;

/// Connects the finalize flow to the hosted payment provider's REST API.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    api: GatewayApi,
}

impl HttpPaymentGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let api = GatewayApi::new(config)?;
        Ok(Self { api })
    }

    pub fn api(&self) -> &GatewayApi {
        &self.api
    }
}

impl PaymentGateway for HttpPaymentGateway {
    async fn fetch_payment_status(&self, session_id: &SessionId) -> Result<PaymentStatus, PaymentGatewayError> {
        let session = self
            .api
            .fetch_session(session_id.as_str())
            .await
            .map_err(|e| gateway_error(e, self.api.config().timeout))?;
        if session.id != session_id.as_str() {
            warn!("💳️ Asked for checkout session {session_id}, but the provider answered for {}", session.id);
            return Err(PaymentGatewayError::InvalidResponse(format!("unexpected session id {}", session.id)));
        }
        Ok(if session.is_paid() { PaymentStatus::paid() } else { PaymentStatus::unpaid() })
    }
}

fn gateway_error(e: GatewayApiError, timeout: Duration) -> PaymentGatewayError {
    match e {
        GatewayApiError::Timeout(_) => PaymentGatewayError::Timeout(timeout),
        GatewayApiError::JsonError(s) => PaymentGatewayError::InvalidResponse(s),
        e => PaymentGatewayError::Transport(e.to_string()),
    }
}
