//! Resource abstraction layer
//!
//! Typed core of the explorer: resource identity, the draft lifecycle, and
//! the provider seam everything above it calls through.
//!
//! # Architecture
//!
//! - [`model`] - ARM resource ids, the tagged resource kind, formal status
//! - [`draft`] - Proposed create/update state bound to an optional origin
//! - [`provider`] - The four-operation provider trait and its error taxonomy
//!
//! Kinds carry a capability set (`create`/`update`/`delete`/`get_status`);
//! operations dispatch by kind instead of by subclass, so adding a kind means
//! extending the enum, not a hierarchy.

pub mod draft;
pub mod model;
pub mod provider;

pub use draft::{CommitError, Draft, ValidationError};
pub use model::{Capabilities, FormalStatus, Resource, ResourceId, ResourceKind};
pub use provider::{ProviderError, ResourceProvider};
