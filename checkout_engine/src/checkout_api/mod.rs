//! # Checkout finalization API
//!
//! * [`checkout_flow_api`] holds [`CheckoutFlowApi`], the orchestrator behind `finalize`.
//! * [`order_factory`], [`inventory_reconciler`] and [`offer_closer`] are the steps it runs while holding the lock.
//! * [`checkout_objects`] has the request, options and outcome types.
//!
//! # API usage
//!
//! ```rust,ignore
//! use checkout_engine::{CheckoutFlowApi, SqliteDatabase};
//! use checkout_engine::checkout_objects::{FinalizeOutcome, FinalizeRequest};
//!
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // gateway is anything that implements PaymentGateway
//! let api = CheckoutFlowApi::new(db, gateway);
//! let request = FinalizeRequest::new("cs_123").for_caller("user_42");
//! match api.finalize(request).await {
//!     FinalizeOutcome::Created(summary) | FinalizeOutcome::Reused(summary) => println!("{}", summary.order_ref),
//!     other => println!("{}", other.label()),
//! }
//! ```
pub mod checkout_flow_api;
pub mod checkout_objects;
pub mod inventory_reconciler;
pub mod offer_closer;
pub mod order_factory;

pub use checkout_flow_api::CheckoutFlowApi;
