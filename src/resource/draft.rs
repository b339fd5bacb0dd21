//! Draft Lifecycle
//!
//! A `Draft` is a proposed resource state: either a creation (no origin) or
//! an update of an existing resource (origin set). Drafts live for the
//! duration of a form dialog; committing turns them into a provider call,
//! closing the dialog discards them.

use super::model::{Resource, ResourceId, ResourceKind};
use super::provider::{ProviderError, ResourceProvider};
use thiserror::Error;
use std::collections::BTreeMap;

/// Required draft fields that were left unset
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name is required")]
    MissingName,

    #[error("A pricing tier is required for {0}")]
    MissingSku(String),

    #[error("A target resource group is required")]
    MissingResourceGroup,
}

/// Why a commit failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The origin resource vanished between opening the dialog and
    /// committing. The update is aborted; it never falls back to a create.
    #[error("The resource being updated no longer exists: {0}")]
    StaleOrigin(ResourceId),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// A proposed resource state bound to an optional origin.
///
/// Invariant: `origin().is_some()` means committing issues an update;
/// `None` means committing creates a new resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    origin: Option<Resource>,
    kind: ResourceKind,
    name: String,
    sku: Option<String>,
    location: Option<String>,
    resource_group: Option<String>,
    tags: BTreeMap<String, String>,
}

impl Draft {
    /// Creation draft with defaulted fields
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            origin: None,
            kind,
            name: String::new(),
            sku: None,
            location: None,
            resource_group: None,
            tags: BTreeMap::new(),
        }
    }

    /// Update draft with fields copied from the origin
    pub fn from_origin(origin: &Resource) -> Self {
        Self {
            origin: Some(origin.clone()),
            kind: origin.kind().clone(),
            name: origin.name().to_string(),
            sku: origin.sku().map(str::to_string),
            location: origin.location().map(str::to_string),
            resource_group: origin.id().resource_group().map(str::to_string),
            tags: origin.tags().clone(),
        }
    }

    pub fn origin(&self) -> Option<&Resource> {
        self.origin.as_ref()
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sku(&self) -> Option<&str> {
        self.sku.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn resource_group(&self) -> Option<&str> {
        self.resource_group.as_deref()
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_sku(&mut self, sku: Option<String>) {
        self.sku = sku;
    }

    pub fn set_location(&mut self, location: Option<String>) {
        self.location = location;
    }

    pub fn set_resource_group(&mut self, group: Option<String>) {
        self.resource_group = group;
    }

    #[allow(dead_code)]
    pub fn insert_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    /// True iff any field differs from the origin. Origin-less drafts count
    /// as modified once any field has been set.
    pub fn is_modified(&self) -> bool {
        match &self.origin {
            Some(origin) => {
                self.name != origin.name()
                    || self.sku.as_deref() != origin.sku()
                    || self.location.as_deref() != origin.location()
                    || self.resource_group.as_deref() != origin.id().resource_group()
                    || &self.tags != origin.tags()
            }
            None => {
                !self.name.is_empty()
                    || self.sku.is_some()
                    || self.location.is_some()
                    || self.resource_group.is_some()
                    || !self.tags.is_empty()
            }
        }
    }

    /// Restore fields to the origin's values, or to defaults for an
    /// origin-less draft
    pub fn reset(&mut self) {
        match self.origin.take() {
            Some(origin) => {
                *self = Self::from_origin(&origin);
            }
            None => {
                *self = Self::new(self.kind.clone());
            }
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.kind.requires_sku() && self.sku.is_none() {
            return Err(ValidationError::MissingSku(
                self.kind.display_name().to_string(),
            ));
        }
        // Creation of anything below a subscription needs a target group
        if self.origin.is_none()
            && self.kind != ResourceKind::ResourceGroup
            && self.resource_group.is_none()
        {
            return Err(ValidationError::MissingResourceGroup);
        }
        Ok(())
    }

    /// Validate, then issue the create-or-update call.
    ///
    /// Validation failures make zero provider calls. For updates, the origin
    /// is probed first: a vanished origin aborts with [`CommitError::StaleOrigin`]
    /// instead of silently creating a fresh resource.
    pub async fn commit(&self, provider: &dyn ResourceProvider) -> Result<Resource, CommitError> {
        self.validate()?;

        if let Some(origin) = &self.origin {
            match provider.get_status(origin.id()).await {
                Ok(_) => {}
                Err(ProviderError::NotFound(_)) => {
                    return Err(CommitError::StaleOrigin(origin.id().clone()));
                }
                Err(e) => return Err(e.into()),
            }
        }

        let resource = provider.create_or_update(self).await?;
        tracing::info!(
            name = resource.name(),
            kind = resource.kind().display_name(),
            update = self.origin.is_some(),
            "draft committed"
        );
        Ok(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::model::FormalStatus;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn vm_origin() -> Resource {
        Resource::new(
            ResourceId::new(
                "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm-0",
            ),
            "vm-0",
            ResourceKind::VirtualMachine,
            FormalStatus::Running,
        )
        .with_location("westeurope")
        .with_sku("Standard_B2s")
    }

    /// Provider stub that counts calls and answers from canned results
    #[derive(Default)]
    struct CountingProvider {
        list_calls: AtomicUsize,
        commit_calls: AtomicUsize,
        status_calls: AtomicUsize,
        origin_gone: bool,
    }

    #[async_trait]
    impl ResourceProvider for CountingProvider {
        async fn list_resources(
            &self,
            _parent: &ResourceId,
        ) -> Result<Vec<Resource>, ProviderError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }

        async fn create_or_update(&self, draft: &Draft) -> Result<Resource, ProviderError> {
            self.commit_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Resource::new(
                ResourceId::new(format!("/subscriptions/s/fake/{}", draft.name())),
                draft.name(),
                draft.kind().clone(),
                FormalStatus::Running,
            ))
        }

        async fn delete(&self, _id: &ResourceId) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn get_status(&self, id: &ResourceId) -> Result<FormalStatus, ProviderError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            if self.origin_gone {
                Err(ProviderError::NotFound(id.to_string()))
            } else {
                Ok(FormalStatus::Running)
            }
        }
    }

    #[test]
    fn test_fresh_update_draft_is_unmodified() {
        let origin = vm_origin();
        let draft = Draft::from_origin(&origin);
        assert!(!draft.is_modified());
    }

    #[test]
    fn test_single_mutation_marks_modified() {
        let origin = vm_origin();

        let mut draft = Draft::from_origin(&origin);
        draft.set_name("vm-renamed");
        assert!(draft.is_modified());

        let mut draft = Draft::from_origin(&origin);
        draft.set_sku(Some("Standard_D4s".to_string()));
        assert!(draft.is_modified());

        let mut draft = Draft::from_origin(&origin);
        draft.insert_tag("team", "infra");
        assert!(draft.is_modified());
    }

    #[test]
    fn test_originless_draft_modified_once_any_field_set() {
        let mut draft = Draft::new(ResourceKind::StorageAccount);
        assert!(!draft.is_modified());
        draft.set_location(Some("northeurope".to_string()));
        assert!(draft.is_modified());
    }

    #[test]
    fn test_reset_originless_restores_defaults() {
        let mut draft = Draft::new(ResourceKind::VirtualMachine);
        draft.set_name("scratch");
        draft.set_sku(Some("Standard_B1s".to_string()));
        draft.reset();
        assert_eq!(draft, Draft::new(ResourceKind::VirtualMachine));
    }

    #[tokio::test]
    async fn test_commit_without_name_makes_zero_provider_calls() {
        let provider = CountingProvider::default();
        let draft = Draft::new(ResourceKind::VirtualMachine);

        let err = draft.commit(&provider).await.unwrap_err();
        assert_eq!(err, CommitError::Validation(ValidationError::MissingName));
        assert_eq!(provider.commit_calls.load(Ordering::SeqCst), 0);
        assert_eq!(provider.status_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_commit_requires_sku_for_sku_kinds() {
        let provider = CountingProvider::default();
        let mut draft = Draft::new(ResourceKind::PostgresServer);
        draft.set_name("pg-1");

        let err = draft.commit(&provider).await.unwrap_err();
        assert!(matches!(
            err,
            CommitError::Validation(ValidationError::MissingSku(_))
        ));
        assert_eq!(provider.commit_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_commit_with_vanished_origin_is_stale_not_create() {
        let provider = CountingProvider {
            origin_gone: true,
            ..Default::default()
        };
        let origin = vm_origin();
        let mut draft = Draft::from_origin(&origin);
        draft.set_sku(Some("Standard_D4s".to_string()));

        let err = draft.commit(&provider).await.unwrap_err();
        assert_eq!(err, CommitError::StaleOrigin(origin.id().clone()));
        assert_eq!(provider.commit_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_commit_update_probes_origin_then_writes() {
        let provider = CountingProvider::default();
        let mut draft = Draft::from_origin(&vm_origin());
        draft.set_name("vm-renamed");

        let committed = draft.commit(&provider).await.unwrap();
        assert_eq!(committed.name(), "vm-renamed");
        assert_eq!(provider.status_calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.commit_calls.load(Ordering::SeqCst), 1);
    }

    /// A single field mutation, for randomized reset sequences
    #[derive(Debug, Clone)]
    enum Mutation {
        Name(String),
        Sku(Option<String>),
        Location(Option<String>),
        Tag(String, String),
    }

    fn arb_mutation() -> impl Strategy<Value = Mutation> {
        prop_oneof![
            "[a-z][a-z0-9-]{0,20}".prop_map(Mutation::Name),
            proptest::option::of("[A-Za-z0-9_]{1,12}".prop_map(String::from))
                .prop_map(Mutation::Sku),
            proptest::option::of("[a-z]{4,12}".prop_map(String::from))
                .prop_map(Mutation::Location),
            ("[a-z]{1,8}", "[a-z0-9]{1,8}").prop_map(|(k, v)| Mutation::Tag(k, v)),
        ]
    }

    fn apply(draft: &mut Draft, mutation: &Mutation) {
        match mutation {
            Mutation::Name(n) => draft.set_name(n.clone()),
            Mutation::Sku(s) => draft.set_sku(s.clone()),
            Mutation::Location(l) => draft.set_location(l.clone()),
            Mutation::Tag(k, v) => draft.insert_tag(k.clone(), v.clone()),
        }
    }

    proptest! {
        /// reset after any mutation sequence restores field equality with origin
        #[test]
        fn reset_restores_origin(mutations in prop::collection::vec(arb_mutation(), 0..16)) {
            let origin = vm_origin();
            let mut draft = Draft::from_origin(&origin);
            for m in &mutations {
                apply(&mut draft, m);
            }
            draft.reset();
            prop_assert_eq!(draft, Draft::from_origin(&origin));
            prop_assert!(!Draft::from_origin(&origin).is_modified());
        }
    }
}
