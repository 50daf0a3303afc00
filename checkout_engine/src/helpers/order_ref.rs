use crate::db_types::OrderId;

pub const ORDER_REF_PREFIX: &str = "MS-";
/// Number of order id characters that make it into the display reference.
pub const ORDER_REF_LEN: usize = 8;

/// Derives the customer-facing order reference from the order's primary id, e.g. `MS-AB12CD34`.
///
/// The reference is a pure function of the id, so every finalize call that observes the same order id renders the
/// same reference, regardless of which process created the order.
pub fn order_ref_for(order_id: &OrderId) -> String {
    let short = order_id
        .as_str()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(ORDER_REF_LEN)
        .collect::<String>()
        .to_ascii_uppercase();
    format!("{ORDER_REF_PREFIX}{short}")
}
