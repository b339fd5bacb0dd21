//! Favorites Registry
//!
//! An ordered collection of pinned resource ids. The registry stores only
//! identifiers, never resolved resources: cloud state is re-fetched on every
//! resolve, so a favorite can go stale without the registry lying about it.

use crate::config::Config;
use crate::resource::{ProviderError, Resource, ResourceId, ResourceKind, ResourceProvider};

/// Ordered favorites, insertion order = display order, newest first.
///
/// Duplicate `add` is a membership no-op and keeps the existing position;
/// only [`Favorites::promote`] reorders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Favorites {
    entries: Vec<String>,
}

impl Favorites {
    pub fn from_config(config: &Config) -> Self {
        Self {
            entries: config.favorites.clone(),
        }
    }

    /// Pin a resource id at the front. Returns false (and keeps the current
    /// position) when the id is already pinned.
    pub fn add(&mut self, resource_id: &str) -> bool {
        if self.contains(resource_id) {
            return false;
        }
        self.entries.insert(0, resource_id.to_string());
        true
    }

    /// Unpin a resource id; no-op when absent
    pub fn remove(&mut self, resource_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e != resource_id);
        self.entries.len() != before
    }

    /// Move an already-pinned id to the front
    pub fn promote(&mut self, resource_id: &str) -> bool {
        if !self.remove(resource_id) {
            return false;
        }
        self.entries.insert(0, resource_id.to_string());
        true
    }

    pub fn contains(&self, resource_id: &str) -> bool {
        self.entries.iter().any(|e| e == resource_id)
    }

    /// Ids in stored order; restartable
    pub fn list(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy the current order into the config. The caller owns writing the
    /// config to disk, right after, so mutations persist synchronously.
    pub fn store_into(&self, config: &mut Config) {
        config.favorites = self.entries.clone();
    }

    /// Look up the live resource behind a favorite. Calls through to the
    /// provider every time; `Ok(None)` means the resource no longer exists
    /// and the caller should prune the entry.
    pub async fn resolve(
        &self,
        resource_id: &str,
        provider: &dyn ResourceProvider,
    ) -> Result<Option<Resource>, ProviderError> {
        let id = ResourceId::new(resource_id);
        let kind = id
            .provider_type()
            .map(|t| ResourceKind::from_arm_type(&t))
            .unwrap_or(ResourceKind::ResourceGroup);

        match provider.get_status(&id).await {
            Ok(status) => {
                let name = id.name().to_string();
                Ok(Some(Resource::new(id, name, kind, status)))
            }
            Err(ProviderError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
