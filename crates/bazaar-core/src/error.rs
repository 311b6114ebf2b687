//! Error types for Bazaar Core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    // Storefront-facing resolution outcomes
    #[error("Tenant is suspended: {0}")]
    TenantSuspended(String),

    #[error("Tenant is archived: {0}")]
    TenantArchived(String),

    #[error("Invalid tenant identifier: {0}")]
    InvalidTenant(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Storage errors
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a field-level validation failure.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
