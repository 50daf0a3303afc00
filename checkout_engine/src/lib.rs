//! MarketSquare Checkout Engine
//!
//! The checkout engine converts a completed payment-provider session into exactly one durable order, no matter how
//! many times, or from how many places, finalization is requested.
//!
//! The library is divided into three sections:
//! 1. Backend contracts ([`mod@traits`]). The engine only talks to storage and to the payment provider through these
//!    traits. A SQLite implementation ([`SqliteDatabase`]) is provided.
//! 2. Data types ([`mod@db_types`]) shared by the engine and its backends.
//! 3. The finalize API ([`CheckoutFlowApi`]) and its steps: order creation, stock reconciliation and offer closing.
mod checkout_api;

pub mod db_types;
pub mod helpers;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

pub use checkout_api::{checkout_objects, inventory_reconciler, offer_closer, order_factory, CheckoutFlowApi};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
