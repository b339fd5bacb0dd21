//! Azure API interaction module
//!
//! ARM (Azure Resource Manager) plumbing behind the [`crate::resource::ResourceProvider`]
//! seam: authentication, the HTTP wrapper with typed error mapping, and the
//! client that speaks the ARM REST routes.
//!
//! # Module Structure
//!
//! - [`auth`] - Access tokens via the Azure CLI, with in-process caching
//! - [`http`] - HTTP utilities for ARM REST calls and error-code mapping
//! - [`client`] - [`client::AzureClient`], the `ResourceProvider` implementation
//!
//! # Example
//!
//! ```ignore
//! use crate::azure::client::AzureClient;
//! use crate::resource::{ResourceId, ResourceProvider};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = AzureClient::new("my-subscription").await?;
//!     let groups = client
//!         .list_resources(&ResourceId::subscription_root("my-subscription"))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
