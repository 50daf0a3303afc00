use serde::{Deserialize, Serialize};

/// A checkout session as reported by the payment provider. Only the fields finalization needs are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySession {
    pub id: String,
    pub payment_status: String,
}

impl GatewaySession {
    /// Sessions that needed no payment (fully discounted carts) count as paid. Anything else, including statuses
    /// this client does not know about, counts as unpaid.
    pub fn is_paid(&self) -> bool {
        matches!(self.payment_status.as_str(), "paid" | "no_payment_required")
    }
}
