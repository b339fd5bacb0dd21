//! Resource Provider
//!
//! The seam between the explorer core and the cloud. The core depends on
//! exactly four operations; everything else (auth, pagination, wire format)
//! is the provider implementation's business.

use super::draft::Draft;
use super::model::{FormalStatus, Resource, ResourceId};
use async_trait::async_trait;
use thiserror::Error;

/// Provider failures, typed so callers can tell "not found" from "access
/// denied" from "try again later". The core performs no automatic retries;
/// a retry is a user-initiated refresh.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Transient provider failure: {0}")]
    Transient(String),

    #[error("Provider API error: {0}")]
    Api(String),
}

impl ProviderError {
    /// Message suitable for the status line / node error display.
    /// Access-denied gets a quieter, actionable phrasing so a locked-down
    /// subtree does not read like an outage.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(what) => format!("Not found: {}", what),
            Self::AccessDenied(_) => "Access denied. Check your Azure RBAC role.".to_string(),
            Self::Auth(_) => "Authentication failed. Run 'az login'.".to_string(),
            Self::Transient(_) => "Azure is temporarily unavailable. Refresh to retry.".to_string(),
            Self::Api(msg) => msg.clone(),
        }
    }
}

/// Cloud resource provider abstraction.
///
/// Implementations must be cheap to clone behind an `Arc` and safe to call
/// from background tasks; the UI thread never blocks on these.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Enumerate the children of `parent` (a subscription root lists resource
    /// groups; a resource group lists its resources).
    async fn list_resources(&self, parent: &ResourceId) -> Result<Vec<Resource>, ProviderError>;

    /// Create the resource a draft proposes, or update its origin
    async fn create_or_update(&self, draft: &Draft) -> Result<Resource, ProviderError>;

    async fn delete(&self, id: &ResourceId) -> Result<(), ProviderError>;

    async fn get_status(&self, id: &ResourceId) -> Result<FormalStatus, ProviderError>;
}
