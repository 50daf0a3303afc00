use std::fmt::Display;

use checkout_engine::checkout_objects::CheckoutSummary;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Query parameters for the finalize endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinalizeQuery {
    #[serde(default)]
    pub include_shipping_address: bool,
}

/// The body the payment provider posts when a hosted checkout completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutCompletedNotification {
    pub session_id: String,
}

/// Response body for a successful finalize call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeResponse {
    /// Either `created` or `reused`.
    pub status: String,
    pub order: CheckoutSummary,
}

/// Response body while another attempt holds the session lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResponse {
    pub status: String,
    pub retry_after_ms: u64,
}
