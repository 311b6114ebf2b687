//! Bazaar server library: config, routes, handlers, and state wiring.
//!
//! Split out of the binary so integration tests can build the router
//! against in-memory stores.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
