//! # quirofano-api
//!
//! HTTP surface of the surgery-management service. The binary in `main.rs`
//! wires configuration, storage and logging; everything routable lives here
//! so integration tests can build the same router over the in-memory store.

pub mod controllers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod views;

pub use routes::build_router;
pub use state::AppState;
