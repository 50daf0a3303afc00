use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::db_types::{CartPayload, OrderId, OrderItem, OrderTotals, SessionId, ShippingAddress};

pub const DEFAULT_PROCESSING_RETRY_AFTER: Duration = Duration::from_millis(1500);
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_LINE_QUANTITY: i64 = 99;

/// A single finalize invocation, as issued by the browser redirect or the provider webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeRequest {
    pub session_id: SessionId,
    /// The authenticated caller. `None` for trusted internal callers (e.g. the webhook), which skip the ownership check.
    pub caller_user_id: Option<String>,
    pub include_shipping_address: bool,
}

impl FinalizeRequest {
    pub fn new<S: Into<SessionId>>(session_id: S) -> Self {
        Self { session_id: session_id.into(), caller_user_id: None, include_shipping_address: false }
    }

    pub fn for_caller(mut self, user_id: &str) -> Self {
        self.caller_user_id = Some(user_id.to_string());
        self
    }

    pub fn with_shipping_address(mut self, include: bool) -> Self {
        self.include_shipping_address = include;
        self
    }
}

/// Tunables for the finalize flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeOptions {
    /// The back-off suggested to callers that arrive while another attempt holds the lock.
    pub processing_retry_after: Duration,
    /// Upper bound on a single payment gateway query.
    pub gateway_timeout: Duration,
    /// If set, a lock held for longer than this without producing an order may be taken over by a new attempt.
    /// `None` disables takeover, so a crashed attempt leaves the session in `Processing` until an operator steps in.
    pub stale_lock_timeout: Option<Duration>,
    /// Ordered quantities are clamped to `1..=max_line_quantity` before stock is decremented.
    pub max_line_quantity: i64,
}

impl Default for FinalizeOptions {
    fn default() -> Self {
        Self {
            processing_retry_after: DEFAULT_PROCESSING_RETRY_AFTER,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            stale_lock_timeout: None,
            max_line_quantity: DEFAULT_MAX_LINE_QUANTITY,
        }
    }
}

impl FinalizeOptions {
    pub fn with_processing_retry_after(mut self, retry_after: Duration) -> Self {
        self.processing_retry_after = retry_after;
        self
    }

    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    pub fn with_stale_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stale_lock_timeout = timeout;
        self
    }
}

/// What the buyer (or the webhook) gets back once an order exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSummary {
    pub order_id: OrderId,
    pub order_ref: String,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub shipping_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddress>,
}

impl CheckoutSummary {
    /// Builds the summary from the session's cart snapshot. The shipping address is only copied across when
    /// `include_shipping_address` is set.
    pub fn from_cart(order_id: OrderId, cart: &CartPayload, include_shipping_address: bool) -> Self {
        let order_ref = order_id.order_ref();
        Self {
            order_id,
            order_ref,
            items: cart.items.iter().cloned().map(OrderItem::from).collect(),
            totals: cart.totals.clone(),
            shipping_method: cart.shipping_method.clone(),
            shipping_address: if include_shipping_address { cart.shipping_address.clone() } else { None },
        }
    }
}

/// Every way a finalize call can end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// No session with that id.
    NotFound,
    /// The caller does not own the session.
    Forbidden,
    /// The payment provider does not (yet) report the session as paid. Nothing was changed.
    NotPaid,
    /// Another attempt holds the lock and has not produced an order yet.
    Processing { retry_after: Duration },
    /// The order already existed. No side effects were performed.
    Reused(CheckoutSummary),
    /// This call created the order.
    Created(CheckoutSummary),
    /// Something failed. If the order could not be created, the lock taken by this call has been released and the
    /// call is safe to retry. `message` is safe to show to end users; details are only logged.
    Error { message: String },
}

impl FinalizeOutcome {
    pub fn error<S: Into<String>>(message: S) -> Self {
        Self::Error { message: message.into() }
    }

    pub fn summary(&self) -> Option<&CheckoutSummary> {
        match self {
            Self::Reused(s) | Self::Created(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.summary().is_some()
    }

    /// Terminal outcomes will never change on retry.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NotFound | Self::Forbidden | Self::Reused(_) | Self::Created(_))
    }

    /// A short, stable label for logs and API responses.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::NotPaid => "not_paid",
            Self::Processing { .. } => "processing",
            Self::Reused(_) => "reused",
            Self::Created(_) => "created",
            Self::Error { .. } => "error",
        }
    }
}
