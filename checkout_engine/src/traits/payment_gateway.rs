use std::time::Duration;

use thiserror::Error;

use crate::db_types::{PaymentStatus, SessionId};

/// Queries the hosted payment provider.
///
/// Implementations must report failures as errors. A transport error or timeout is never the same as "unpaid".
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    async fn fetch_payment_status(&self, session_id: &SessionId) -> Result<PaymentStatus, PaymentGatewayError>;
}

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("Could not reach the payment gateway: {0}")]
    Transport(String),
    #[error("The payment gateway did not respond within {0:?}")]
    Timeout(Duration),
    #[error("The payment gateway returned an unexpected response: {0}")]
    InvalidResponse(String),
}
