mod api;
mod config;
mod data_objects;
mod error;

pub use api::GatewayApi;
pub use config::{GatewayConfig, DEFAULT_GATEWAY_TIMEOUT_MS, DEFAULT_GATEWAY_URL};
pub use data_objects::GatewaySession;
pub use error::GatewayApiError;
