use std::time::Duration;

use log::*;
use msq_common::Secret;

pub const DEFAULT_GATEWAY_URL: &str = "https://api.payments.example.com";
pub const DEFAULT_GATEWAY_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: Secret<String>,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GATEWAY_URL.to_string(),
            api_key: Secret::new(String::default()),
            timeout: Duration::from_millis(DEFAULT_GATEWAY_TIMEOUT_MS),
        }
    }
}

impl GatewayConfig {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: Secret::new(api_key.to_string()),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("MSQ_GATEWAY_URL").unwrap_or_else(|_| {
            warn!("MSQ_GATEWAY_URL not set, using (probably useless) default");
            DEFAULT_GATEWAY_URL.to_string()
        });
        let api_key = Secret::new(std::env::var("MSQ_GATEWAY_API_KEY").unwrap_or_else(|_| {
            warn!("MSQ_GATEWAY_API_KEY not set. Requests to the payment gateway will be rejected.");
            String::default()
        }));
        let timeout = std::env::var("MSQ_GATEWAY_TIMEOUT_MS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("Invalid value for MSQ_GATEWAY_TIMEOUT_MS ({s}): {e}. Using the default."))
                    .ok()
            })
            .unwrap_or(DEFAULT_GATEWAY_TIMEOUT_MS);
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout: Duration::from_millis(timeout),
        }
    }
}
