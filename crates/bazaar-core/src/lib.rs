//! Bazaar Core Types and Traits
//!
//! This crate provides the fundamental types and traits used throughout Bazaar:
//! - Tenant domain types and the status state machine
//! - Store trait abstractions (tenants, admin users, documents, ledger)
//! - Tenant resolution and provisioning services
//! - Core error types

pub mod document_store;
pub mod error;
pub mod ledger;
pub mod provisioner;
pub mod resolver;
pub mod tenant;
pub mod tenant_store;
pub mod user_store;

pub use error::{Error, Result};
