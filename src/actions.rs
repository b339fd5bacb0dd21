//! Action Registry
//!
//! Static mapping from action identifiers to display metadata and enablement
//! predicates, plus named menu groups composed of action ids and separators.
//! The registry is built once at startup, passed by reference to whoever
//! renders menus, and never mutated afterwards.
//!
//! Execution is not the registry's business: the app layer maps a chosen
//! [`ActionId`] to a command. The registry only answers "what goes in this
//! menu and which entries are enabled for this subject".

use crate::resource::{Resource, ResourceKind};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;

/// Opaque action identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(pub &'static str);

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Well-known action ids
pub mod ids {
    use super::ActionId;

    pub const REFRESH: ActionId = ActionId("resource.refresh");
    pub const PIN: ActionId = ActionId("resource.pin");
    pub const UNPIN: ActionId = ActionId("resource.unpin");
    pub const PROMOTE: ActionId = ActionId("resource.promote");
    pub const CREATE: ActionId = ActionId("resource.create");
    pub const EDIT: ActionId = ActionId("resource.edit");
    pub const DELETE: ActionId = ActionId("resource.delete");
    pub const CONNECT: ActionId = ActionId("resource.connect");
    pub const OPEN_PORTAL: ActionId = ActionId("resource.open_portal");
    pub const UNLINK: ActionId = ActionId("resource.unlink");
}

/// Well-known group ids
pub mod groups {
    /// The subscription-level roots (Resource Groups)
    pub const SERVICE: &str = "actions.service";
    /// Any materialized resource node
    pub const RESOURCE: &str = "actions.resource";
    /// Children of the Favorites root
    pub const FAVORITE: &str = "actions.favorite";
    /// Children of the Linked Resources root
    pub const LINKED: &str = "actions.linked";
}

/// Registration of a duplicate action id. A startup misconfiguration;
/// callers fail fast instead of shadowing the earlier registration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("action already registered: {0}")]
pub struct DuplicateActionError(pub String);

/// Confirmation required before an action runs
#[derive(Debug, Clone, Default)]
pub struct ConfirmConfig {
    /// Message to show in the confirmation dialog
    pub message: Option<String>,
    /// If true, default selection is Yes; if false, default is No
    pub default_yes: bool,
    /// If true, action is destructive (shown in red)
    pub destructive: bool,
}

/// Display metadata for an action
#[derive(Debug, Clone)]
pub struct ActionMetadata {
    pub label: String,
    pub shortcut: Option<char>,
    pub confirm: Option<ConfirmConfig>,
}

impl ActionMetadata {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            shortcut: None,
            confirm: None,
        }
    }

    pub fn with_shortcut(mut self, shortcut: char) -> Self {
        self.shortcut = Some(shortcut);
        self
    }

    pub fn with_confirm(mut self, confirm: ConfirmConfig) -> Self {
        self.confirm = Some(confirm);
        self
    }
}

/// What an enablement predicate sees: the node's resource (None for
/// synthetic groups) plus its registry standing
#[derive(Debug, Clone, Copy)]
pub struct ActionSubject<'a> {
    pub resource: Option<&'a Resource>,
    pub pinned: bool,
    pub linked: bool,
}

impl<'a> ActionSubject<'a> {
    pub fn group() -> Self {
        Self {
            resource: None,
            pinned: false,
            linked: false,
        }
    }

    pub fn resource(resource: &'a Resource) -> Self {
        Self {
            resource: Some(resource),
            pinned: false,
            linked: false,
        }
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }

    pub fn linked(mut self, linked: bool) -> Self {
        self.linked = linked;
        self
    }
}

/// Pure, side-effect-free enablement check
type Predicate = Box<dyn Fn(&ActionSubject<'_>) -> bool + Send + Sync>;

struct RegisteredAction {
    metadata: ActionMetadata,
    enabled: Predicate,
}

/// One entry of a registered group. `Separator` is the `"---"` sentinel:
/// purely visual, no identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupEntry {
    Action(ActionId),
    Separator,
}

impl From<ActionId> for GroupEntry {
    fn from(id: ActionId) -> Self {
        Self::Action(id)
    }
}

/// A group entry resolved against a subject, ready to draw
#[derive(Debug, Clone)]
pub enum RenderedEntry<'a> {
    Action {
        id: ActionId,
        metadata: &'a ActionMetadata,
        enabled: bool,
    },
    Separator,
}

/// Process-wide action/group mapping, immutable after startup
#[derive(Default)]
pub struct ActionRegistry {
    actions: HashMap<ActionId, RegisteredAction>,
    groups: HashMap<&'static str, Vec<GroupEntry>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_action(
        &mut self,
        id: ActionId,
        metadata: ActionMetadata,
        enabled: impl Fn(&ActionSubject<'_>) -> bool + Send + Sync + 'static,
    ) -> Result<(), DuplicateActionError> {
        if self.actions.contains_key(&id) {
            return Err(DuplicateActionError(id.0.to_string()));
        }
        self.actions.insert(
            id,
            RegisteredAction {
                metadata,
                enabled: Box::new(enabled),
            },
        );
        Ok(())
    }

    /// Define a group composition. Entries may reference actions that are
    /// never registered; those resolve to hidden at render time.
    pub fn register_group(&mut self, id: &'static str, entries: Vec<GroupEntry>) {
        self.groups.insert(id, entries);
    }

    pub fn metadata(&self, id: ActionId) -> Option<&ActionMetadata> {
        self.actions.get(&id).map(|a| &a.metadata)
    }

    /// Evaluate an action's predicate. Unknown ids are disabled, and a
    /// panicking predicate counts as disabled rather than tearing down the UI.
    pub fn is_enabled(&self, id: ActionId, subject: &ActionSubject<'_>) -> bool {
        let Some(action) = self.actions.get(&id) else {
            return false;
        };
        catch_unwind(AssertUnwindSafe(|| (action.enabled)(subject))).unwrap_or_else(|_| {
            tracing::warn!(action = %id, "enablement predicate panicked, treating as disabled");
            false
        })
    }

    /// Resolve a group for rendering: declared order, unregistered ids
    /// hidden, separators never leading, trailing, or doubled.
    pub fn render_group(&self, group_id: &str, subject: &ActionSubject<'_>) -> Vec<RenderedEntry<'_>> {
        let Some(entries) = self.groups.get(group_id) else {
            return Vec::new();
        };

        let mut rendered: Vec<RenderedEntry<'_>> = Vec::new();
        let mut pending_separator = false;

        for entry in entries {
            match entry {
                GroupEntry::Separator => {
                    if !rendered.is_empty() {
                        pending_separator = true;
                    }
                }
                GroupEntry::Action(id) => {
                    let Some(action) = self.actions.get(id) else {
                        continue;
                    };
                    if pending_separator {
                        rendered.push(RenderedEntry::Separator);
                        pending_separator = false;
                    }
                    rendered.push(RenderedEntry::Action {
                        id: *id,
                        metadata: &action.metadata,
                        enabled: self.is_enabled(*id, subject),
                    });
                }
            }
        }

        rendered
    }
}

/// Register the built-in actions and group compositions
pub fn register_defaults(registry: &mut ActionRegistry) -> Result<(), DuplicateActionError> {
    registry.register_action(
        ids::REFRESH,
        ActionMetadata::new("Refresh").with_shortcut('R'),
        |s| s.resource.map_or(true, |r| r.kind() == &ResourceKind::ResourceGroup),
    )?;

    registry.register_action(
        ids::PIN,
        ActionMetadata::new("Add to Favorites").with_shortcut('f'),
        |s| s.resource.is_some() && !s.pinned,
    )?;

    registry.register_action(
        ids::UNPIN,
        ActionMetadata::new("Remove from Favorites").with_shortcut('f'),
        |s| s.pinned,
    )?;

    registry.register_action(
        ids::PROMOTE,
        ActionMetadata::new("Move to Top").with_shortcut('t'),
        |s| s.pinned,
    )?;

    registry.register_action(
        ids::CREATE,
        ActionMetadata::new("Create...").with_shortcut('n'),
        |s| s.resource.map_or(true, |r| r.kind() == &ResourceKind::ResourceGroup),
    )?;

    registry.register_action(
        ids::EDIT,
        ActionMetadata::new("Edit...").with_shortcut('e'),
        |s| s.resource.map_or(false, |r| r.kind().capabilities().update),
    )?;

    registry.register_action(
        ids::DELETE,
        ActionMetadata::new("Delete")
            .with_shortcut('D')
            .with_confirm(ConfirmConfig {
                message: None,
                default_yes: false,
                destructive: true,
            }),
        |s| s.resource.map_or(false, |r| r.kind().capabilities().delete),
    )?;

    registry.register_action(
        ids::CONNECT,
        ActionMetadata::new("Connect").with_shortcut('c'),
        |s| s.resource.map_or(false, |r| r.status().is_running()),
    )?;

    registry.register_action(
        ids::OPEN_PORTAL,
        ActionMetadata::new("Open in Portal").with_shortcut('o'),
        |s| s.resource.is_some(),
    )?;

    registry.register_action(
        ids::UNLINK,
        ActionMetadata::new("Unlink")
            .with_shortcut('u')
            .with_confirm(ConfirmConfig {
                message: Some("Unlink this resource from the explorer?".to_string()),
                default_yes: false,
                destructive: false,
            }),
        |s| s.linked,
    )?;

    registry.register_group(
        groups::SERVICE,
        vec![
            GroupEntry::from(ids::REFRESH),
            GroupEntry::Separator,
            GroupEntry::from(ids::CREATE),
        ],
    );

    registry.register_group(
        groups::RESOURCE,
        vec![
            GroupEntry::from(ids::PIN),
            GroupEntry::Separator,
            GroupEntry::from(ids::REFRESH),
            GroupEntry::from(ids::OPEN_PORTAL),
            GroupEntry::Separator,
            GroupEntry::from(ids::CONNECT),
            GroupEntry::from(ids::EDIT),
            GroupEntry::from(ids::CREATE),
            GroupEntry::Separator,
            GroupEntry::from(ids::DELETE),
        ],
    );

    registry.register_group(
        groups::FAVORITE,
        vec![
            GroupEntry::from(ids::UNPIN),
            GroupEntry::from(ids::PROMOTE),
            GroupEntry::Separator,
            GroupEntry::from(ids::OPEN_PORTAL),
        ],
    );

    registry.register_group(
        groups::LINKED,
        vec![
            GroupEntry::from(ids::UNLINK),
            GroupEntry::Separator,
            GroupEntry::from(ids::OPEN_PORTAL),
        ],
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{FormalStatus, ResourceId};

    fn vm(status: FormalStatus) -> Resource {
        Resource::new(
            ResourceId::new(
                "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm-0",
            ),
            "vm-0",
            ResourceKind::VirtualMachine,
            status,
        )
    }

    fn labels(rendered: &[RenderedEntry<'_>]) -> Vec<String> {
        rendered
            .iter()
            .map(|e| match e {
                RenderedEntry::Action { metadata, .. } => metadata.label.clone(),
                RenderedEntry::Separator => "---".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_duplicate_registration_fails_fast() {
        let mut registry = ActionRegistry::new();
        registry
            .register_action(ids::REFRESH, ActionMetadata::new("Refresh"), |_| true)
            .unwrap();

        let err = registry
            .register_action(ids::REFRESH, ActionMetadata::new("Refresh Again"), |_| true)
            .unwrap_err();
        assert_eq!(err, DuplicateActionError("resource.refresh".to_string()));
    }

    #[test]
    fn test_unresolved_group_reference_is_hidden_without_dangling_separator() {
        let mut registry = ActionRegistry::new();
        registry
            .register_action(ActionId("a"), ActionMetadata::new("A"), |_| true)
            .unwrap();
        // "b" intentionally never registered
        registry.register_group(
            "g",
            vec![
                GroupEntry::Action(ActionId("a")),
                GroupEntry::Separator,
                GroupEntry::Action(ActionId("b")),
            ],
        );

        let rendered = registry.render_group("g", &ActionSubject::group());
        assert_eq!(labels(&rendered), vec!["A"]);
    }

    #[test]
    fn test_separators_never_lead_or_double() {
        let mut registry = ActionRegistry::new();
        registry
            .register_action(ActionId("a"), ActionMetadata::new("A"), |_| true)
            .unwrap();
        registry
            .register_action(ActionId("b"), ActionMetadata::new("B"), |_| true)
            .unwrap();
        registry.register_group(
            "g",
            vec![
                GroupEntry::Separator,
                GroupEntry::Action(ActionId("missing")),
                GroupEntry::Separator,
                GroupEntry::Action(ActionId("a")),
                GroupEntry::Separator,
                GroupEntry::Separator,
                GroupEntry::Action(ActionId("b")),
            ],
        );

        let rendered = registry.render_group("g", &ActionSubject::group());
        assert_eq!(labels(&rendered), vec!["A", "---", "B"]);
    }

    #[test]
    fn test_panicking_predicate_is_disabled() {
        let mut registry = ActionRegistry::new();
        registry
            .register_action(ActionId("boom"), ActionMetadata::new("Boom"), |_| {
                panic!("predicate bug")
            })
            .unwrap();

        assert!(!registry.is_enabled(ActionId("boom"), &ActionSubject::group()));
    }

    #[test]
    fn test_unknown_action_is_disabled() {
        let registry = ActionRegistry::new();
        assert!(!registry.is_enabled(ActionId("nope"), &ActionSubject::group()));
    }

    #[test]
    fn test_connect_enablement_follows_formal_status() {
        let mut registry = ActionRegistry::new();
        register_defaults(&mut registry).unwrap();

        let running = vm(FormalStatus::Running);
        let stopped = vm(FormalStatus::Stopped);
        assert!(registry.is_enabled(ids::CONNECT, &ActionSubject::resource(&running)));
        assert!(!registry.is_enabled(ids::CONNECT, &ActionSubject::resource(&stopped)));
    }

    #[test]
    fn test_pin_and_unpin_are_mutually_exclusive() {
        let mut registry = ActionRegistry::new();
        register_defaults(&mut registry).unwrap();

        let resource = vm(FormalStatus::Running);
        let unpinned = ActionSubject::resource(&resource);
        let pinned = ActionSubject::resource(&resource).pinned(true);

        assert!(registry.is_enabled(ids::PIN, &unpinned));
        assert!(!registry.is_enabled(ids::UNPIN, &unpinned));
        assert!(!registry.is_enabled(ids::PIN, &pinned));
        assert!(registry.is_enabled(ids::UNPIN, &pinned));
    }

    #[test]
    fn test_default_groups_resolve_completely() {
        let mut registry = ActionRegistry::new();
        register_defaults(&mut registry).unwrap();

        let resource = vm(FormalStatus::Running);
        let rendered = registry.render_group(groups::RESOURCE, &ActionSubject::resource(&resource));
        let labels = labels(&rendered);
        assert_eq!(labels.first().map(String::as_str), Some("Add to Favorites"));
        assert!(labels.contains(&"Delete".to_string()));
    }
}
