mod order_ref;

pub use order_ref::{order_ref_for, ORDER_REF_LEN, ORDER_REF_PREFIX};
