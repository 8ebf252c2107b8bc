//! Domain error types
//!
//! Validation failures for configuration-derived values such as the site URL.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The configured site URL cannot be used to address a site
    #[error("Invalid site URL: {0}")]
    InvalidSiteUrl(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
