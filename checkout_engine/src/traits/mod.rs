//! # Backend contracts for the checkout engine.
//!
//! This module defines the interfaces that storage backends and external collaborators must expose in order to take
//! part in checkout finalization. The orchestrator in [`crate::CheckoutFlowApi`] only ever talks to these traits,
//! so it has no knowledge of SQL, HTTP, or any particular provider.
//!
//! ## Traits
//!
//! * [`CheckoutSessionStore`] owns the checkout session rows, and exposes the single compare-and-set lock primitive
//!   that the whole finalize protocol relies on.
//! * [`OrderManagement`] persists order aggregates (header plus line items).
//! * [`ListingManagement`] reads and writes listing stock levels.
//! * [`OfferManagement`] reads offers and performs the accepted-to-completed transition.
//! * [`PaymentGateway`] asks the payment provider whether a session has been paid.
//!
//! [`CheckoutDatabase`] bundles the four storage traits, since in practice they are usually served by one database.
mod checkout_session_store;
mod data_objects;
mod listing_management;
mod offer_management;
mod order_management;
mod payment_gateway;

pub use checkout_session_store::{CheckoutSessionStore, CheckoutStoreError};
pub use data_objects::{LockResult, SessionLock};
pub use listing_management::{ListingManagement, ListingStoreError};
pub use offer_management::{OfferManagement, OfferStoreError};
pub use order_management::{OrderManagement, OrderStoreError};
pub use payment_gateway::{PaymentGateway, PaymentGatewayError};

/// Convenience bundle of all the storage traits the finalize flow needs.
pub trait CheckoutDatabase: CheckoutSessionStore + OrderManagement + ListingManagement + OfferManagement {}

impl<T> CheckoutDatabase for T where T: CheckoutSessionStore + OrderManagement + ListingManagement + OfferManagement {}
