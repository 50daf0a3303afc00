//! # MarketSquare checkout server
//! This crate hosts the HTTP front end for checkout finalization. It is responsible for:
//! * Accepting finalize requests from buyers returning from the hosted payment page.
//! * Accepting signed "checkout completed" webhooks from the payment provider.
//! * Turning either into a call to [`checkout_engine::CheckoutFlowApi::finalize`], and the outcome into an HTTP
//!   response.
//!
//! Both entry points race each other for the same session all the time. The engine guarantees that only one of them
//! creates the order; the other sees `reused` or `processing`.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/checkout/{session_id}/finalize`: Finalize a checkout session on behalf of the buyer.
//! * `/webhook/checkout_completed`: The payment provider's completion webhook.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
