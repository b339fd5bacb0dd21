//! Application State
//!
//! Central application state management for taz. The UI thread owns every
//! mutation: key handlers and drained worker events funnel through the
//! methods here, background tasks only ever report outcomes over the event
//! channel.

use crate::actions::{self, groups, ids, ActionId, ActionRegistry, ActionSubject, RenderedEntry};
use crate::config::Config;
use crate::credentials::{CredentialKey, PasswordStore, SaveType};
use crate::favorites::Favorites;
use crate::resource::{CommitError, Draft, ResourceId, ResourceKind, ResourceProvider};
use crate::shell::{self, ShellResult};
use crate::tree::{LoadTicket, NodeContent, NodeId, NodeState, ResourceTree};
use crate::worker::{self, AppEvent, EventReceiver, EventSender};
use anyhow::Result;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;

// =========================================================================
// Configuration Constants
// =========================================================================

/// Default viewport height (will be updated during render based on terminal size)
const DEFAULT_VIEWPORT_HEIGHT: usize = 20;

/// Locations offered in the draft form
pub const LOCATIONS: &[&str] = &["westeurope", "northeurope", "eastus", "westus2"];

/// Credential-store definition for database servers
const CREDENTIAL_DEFINITION: &str = "postgres";

/// Definition older releases stored database passwords under
const LEGACY_CREDENTIAL_DEFINITION: &str = "database";

/// Admin user database connections default to
const DEFAULT_DB_USER: &str = "azureadmin";

/// SKU choices offered per kind
pub fn sku_choices(kind: &ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::VirtualMachine => &["Standard_B2s", "Standard_D2s_v5", "Standard_D4s_v5"],
        ResourceKind::StorageAccount => &["Standard_LRS", "Standard_GRS", "Premium_LRS"],
        ResourceKind::PostgresServer => &["Standard_B1ms", "Standard_D2s_v3"],
        _ => &[],
    }
}

/// Application modes
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Normal,    // Tree navigation
    Help,      // ? help popup
    Confirm,   // Confirmation dialog
    Warning,   // Warning/info dialog (OK only)
    Actions,   // Context action menu for the selected node
    DraftForm, // Create/edit form dialog
}

/// Pending action that requires confirmation
#[derive(Debug, Clone)]
pub struct PendingAction {
    pub action: ActionId,
    pub node: NodeId,
    pub message: String,
    pub destructive: bool,
    pub selected_yes: bool,
}

/// One row of the open actions menu; `action: None` renders a separator
#[derive(Debug, Clone)]
pub struct MenuEntry {
    pub action: Option<ActionId>,
    pub label: String,
    pub shortcut: Option<char>,
    pub enabled: bool,
}

/// State of the context action menu
#[derive(Debug, Clone)]
pub struct ActionsMenuState {
    pub node: NodeId,
    pub entries: Vec<MenuEntry>,
    pub selected: usize,
}

/// Focusable field of the draft form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Kind,
    Name,
    Sku,
    Location,
}

/// State of the create/edit form dialog. The draft lives exactly as long as
/// the dialog: commit consumes it, Esc discards it.
#[derive(Debug, Clone)]
pub struct DraftFormState {
    pub draft: Draft,
    /// Node whose children are refreshed after a successful commit
    pub parent: Option<NodeId>,
    pub focused: DraftField,
    /// Kinds the user can cycle through; empty for edit drafts
    pub kind_choices: Vec<ResourceKind>,
    pub error: Option<String>,
}

/// The synthetic tree roots
#[derive(Debug, Clone, Copy)]
pub struct Roots {
    pub favorites: NodeId,
    pub linked: NodeId,
    pub groups: NodeId,
}

/// Main application state
pub struct App {
    // Provider handle shared with background workers
    pub provider: Arc<dyn ResourceProvider>,

    // Registries, built once at startup and threaded through
    pub registry: ActionRegistry,
    pub favorites: Favorites,
    pub passwords: PasswordStore,

    // Explorer tree
    pub tree: ResourceTree,
    pub roots: Roots,

    // Subscription scope
    pub subscription: String,

    // Navigation state
    pub selected: usize,
    pub mode: Mode,

    // Dialog state
    pub pending_action: Option<PendingAction>,
    pub actions_menu: Option<ActionsMenuState>,
    pub draft_form: Option<DraftFormState>,

    // UI state
    pub error_message: Option<String>,
    pub status_message: Option<String>,
    pub warning_message: Option<String>,

    // Persistent configuration
    pub config: Config,
    config_path: Option<PathBuf>,

    // Read-only mode
    pub readonly: bool,

    // Worker channel
    events_tx: EventSender,
    events_rx: EventReceiver,

    // Virtual scrolling
    pub viewport_height: usize,
    pub scroll_offset: usize,
}

impl App {
    /// Create the app with an explicit provider and configuration.
    /// `config_path` of None keeps config changes in memory only.
    pub fn new(
        provider: Arc<dyn ResourceProvider>,
        config: Config,
        config_path: Option<PathBuf>,
        subscription: String,
        readonly: bool,
    ) -> Result<Self> {
        let mut registry = ActionRegistry::new();
        actions::register_defaults(&mut registry)?;

        let favorites = Favorites::from_config(&config);

        let mut tree = ResourceTree::new();
        let roots = Roots {
            favorites: tree.add_root(NodeContent::Group {
                id: ResourceId::synthetic("favorites"),
                label: "Favorites".to_string(),
            }),
            linked: tree.add_root(NodeContent::Group {
                id: ResourceId::synthetic("linked"),
                label: "Linked Resources".to_string(),
            }),
            groups: tree.add_root(NodeContent::Group {
                id: ResourceId::subscription_root(&subscription),
                label: "Resource Groups".to_string(),
            }),
        };

        let (events_tx, events_rx) = worker::channel();

        Ok(Self {
            provider,
            registry,
            favorites,
            passwords: PasswordStore::new(),
            tree,
            roots,
            subscription,
            selected: 0,
            mode: Mode::Normal,
            pending_action: None,
            actions_menu: None,
            draft_form: None,
            error_message: None,
            status_message: None,
            warning_message: None,
            config,
            config_path,
            readonly,
            events_tx,
            events_rx,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            scroll_offset: 0,
        })
    }

    fn save_config(&self) {
        let result = match &self.config_path {
            Some(path) => self.config.save_to(path),
            None => Ok(()),
        };
        if let Err(e) = result {
            tracing::warn!("Failed to save config: {}", e);
        }
    }

    // =========================================================================
    // Tree Rows & Navigation
    // =========================================================================

    /// Visible rows in display order, as (node, depth)
    pub fn rows(&self) -> Vec<(NodeId, usize)> {
        self.tree.visible()
    }

    pub fn selected_node(&self) -> Option<NodeId> {
        self.rows().get(self.selected).map(|(id, _)| *id)
    }

    fn clamp_selection(&mut self) {
        let len = self.rows().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    pub fn next(&mut self) {
        match self.mode {
            Mode::Actions => self.menu_step(1),
            _ => {
                let len = self.rows().len();
                if len > 0 {
                    self.selected = (self.selected + 1).min(len - 1);
                }
            }
        }
    }

    pub fn previous(&mut self) {
        match self.mode {
            Mode::Actions => self.menu_step(-1),
            _ => {
                self.selected = self.selected.saturating_sub(1);
            }
        }
    }

    pub fn go_to_top(&mut self) {
        self.selected = 0;
    }

    pub fn go_to_bottom(&mut self) {
        let len = self.rows().len();
        if len > 0 {
            self.selected = len - 1;
        }
    }

    pub fn page_down(&mut self, page_size: usize) {
        let len = self.rows().len();
        if len > 0 {
            self.selected = (self.selected + page_size).min(len - 1);
        }
    }

    pub fn page_up(&mut self, page_size: usize) {
        self.selected = self.selected.saturating_sub(page_size);
    }

    pub fn update_viewport(&mut self, height: usize) {
        self.viewport_height = height.max(1);
    }

    /// Ensure the selected row is visible in the viewport
    pub fn ensure_visible(&mut self) {
        let len = self.rows().len();
        if len == 0 {
            self.scroll_offset = 0;
            return;
        }

        let visible_height = self.viewport_height;
        let margin = 2; // Keep cursor at least this far from edge

        if self.selected < self.scroll_offset + margin {
            self.scroll_offset = self.selected.saturating_sub(margin);
        } else if self.selected >= self.scroll_offset + visible_height.saturating_sub(margin) {
            self.scroll_offset = self
                .selected
                .saturating_sub(visible_height.saturating_sub(margin + 1));
        }

        let max_offset = len.saturating_sub(self.viewport_height);
        self.scroll_offset = self.scroll_offset.min(max_offset);
    }

    /// Get the range of visible rows based on scroll offset and viewport
    pub fn visible_range(&self) -> Range<usize> {
        let start = self.scroll_offset;
        let end = (self.scroll_offset + self.viewport_height).min(self.rows().len());
        start..end
    }

    /// Whether any node is currently loading (for the status line)
    pub fn loading(&self) -> bool {
        self.rows()
            .iter()
            .any(|(id, _)| matches!(self.tree.node(*id).map(|n| n.state()), Some(NodeState::Loading)))
    }

    // =========================================================================
    // Expansion & Loading
    // =========================================================================

    /// Expand or collapse the selected node
    pub fn toggle_expand(&mut self) {
        let Some(id) = self.selected_node() else {
            return;
        };
        let Some(state) = self.tree.node(id).map(|n| n.state().clone()) else {
            return;
        };

        match state {
            NodeState::Collapsed => {
                if let Some(ticket) = self.tree.begin_expand(id) {
                    self.dispatch_load(ticket);
                }
            }
            NodeState::Populated => {
                self.tree.collapse(id);
                self.clamp_selection();
            }
            // loading coalesces; errors hold until an explicit refresh
            NodeState::Loading | NodeState::Error(_) => {}
        }
    }

    /// Collapse the selected node, or jump to its parent when it has no
    /// expansion to undo
    pub fn collapse_or_focus_parent(&mut self) {
        let Some(id) = self.selected_node() else {
            return;
        };
        let Some(node) = self.tree.node(id) else {
            return;
        };

        if node.state() == &NodeState::Populated {
            self.tree.collapse(id);
            self.clamp_selection();
        } else if let Some(parent) = node.parent() {
            if let Some(position) = self.rows().iter().position(|(row, _)| *row == parent) {
                self.selected = position;
            }
        }
    }

    /// Pin or unpin the selected node depending on its current standing
    pub fn toggle_pin(&mut self) -> Result<()> {
        let Some(node) = self.selected_node() else {
            return Ok(());
        };
        let action = if self.subject_for(node).pinned {
            ids::UNPIN
        } else {
            ids::PIN
        };
        self.invoke_action(action, node)
    }

    /// Refresh a node: discard children and reload
    pub fn refresh_node(&mut self, id: NodeId) {
        if let Some(ticket) = self.tree.refresh(id) {
            self.dispatch_load(ticket);
            self.clamp_selection();
        }
    }

    pub fn refresh_selected(&mut self) {
        if let Some(id) = self.selected_node() {
            self.refresh_node(id);
        }
    }

    /// Kick off the initial enumeration of the subscription's resource groups
    pub fn load_initial(&mut self) {
        if let Some(ticket) = self.tree.begin_expand(self.roots.groups) {
            self.dispatch_load(ticket);
        }
    }

    /// Route a load ticket to the right worker: synthetic roots resolve id
    /// lists, everything else is a provider enumeration
    fn dispatch_load(&self, ticket: LoadTicket) {
        if ticket.node == self.roots.favorites {
            worker::spawn_resolve_ids(
                self.provider.clone(),
                self.favorites.clone(),
                self.favorites.list().map(str::to_string).collect(),
                ticket,
                self.events_tx.clone(),
            );
        } else if ticket.node == self.roots.linked {
            worker::spawn_resolve_ids(
                self.provider.clone(),
                self.favorites.clone(),
                self.config.linked_resources.clone(),
                ticket,
                self.events_tx.clone(),
            );
        } else if let Some(node) = self.tree.node(ticket.node) {
            worker::spawn_list(
                self.provider.clone(),
                node.content().id().clone(),
                ticket,
                self.events_tx.clone(),
            );
        }
    }

    // =========================================================================
    // Worker Events
    // =========================================================================

    /// Apply every event the workers have posted since the last tick
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
        }
    }

    pub fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ChildrenLoaded { ticket, result } => {
                self.tree.complete_load(ticket, result);
                self.clamp_selection();
            }
            AppEvent::PinnedLoaded {
                ticket,
                result,
                stale,
            } => {
                let favorites_load = ticket.node == self.roots.favorites;
                self.tree.complete_load(ticket, result);
                self.clamp_selection();

                // Stale favorites are pruned; stale linked entries stay until
                // the user unlinks them explicitly
                if favorites_load && !stale.is_empty() {
                    for id in &stale {
                        self.favorites.remove(id);
                    }
                    self.favorites.store_into(&mut self.config);
                    self.save_config();
                    self.status_message =
                        Some(format!("Removed {} stale favorite(s)", stale.len()));
                }
            }
            AppEvent::CommitFinished { parent, result, .. } => match result {
                Ok(resource) => {
                    self.status_message = Some(format!("Saved {}", resource.name()));
                    if let Some(parent) = parent {
                        self.refresh_node(parent);
                    }
                }
                Err(CommitError::StaleOrigin(id)) => {
                    self.show_warning(&format!(
                        "The resource being updated no longer exists: {}",
                        id.name()
                    ));
                    if let Some(parent) = parent {
                        self.refresh_node(parent);
                    }
                }
                Err(CommitError::Validation(e)) => {
                    self.error_message = Some(e.to_string());
                }
                Err(CommitError::Provider(e)) => {
                    self.error_message = Some(e.user_message());
                }
            },
            AppEvent::DeleteFinished { node, result, .. } => match result {
                Ok(()) => {
                    let name = self
                        .tree
                        .node(node)
                        .map(|n| n.content().label().to_string());
                    self.tree.dispose(node);
                    self.clamp_selection();
                    self.status_message =
                        Some(format!("Deleted {}", name.unwrap_or_default()));
                }
                Err(e) => {
                    self.error_message = Some(e.user_message());
                }
            },
        }
    }

    // =========================================================================
    // Action Dispatch
    // =========================================================================

    /// The enablement subject for a node
    pub fn subject_for(&self, id: NodeId) -> ActionSubject<'_> {
        let Some(node) = self.tree.node(id) else {
            return ActionSubject::group();
        };
        match node.content().resource() {
            Some(resource) => {
                let rid = resource.id().as_str();
                ActionSubject::resource(resource)
                    .pinned(self.favorites.contains(rid))
                    .linked(self.config.linked_resources.iter().any(|l| l == rid))
            }
            None => ActionSubject::group(),
        }
    }

    /// The action group a node's menu is built from
    pub fn group_for(&self, id: NodeId) -> &'static str {
        let Some(node) = self.tree.node(id) else {
            return groups::SERVICE;
        };
        match node.parent() {
            Some(parent) if parent == self.roots.favorites => groups::FAVORITE,
            Some(parent) if parent == self.roots.linked => groups::LINKED,
            _ => match node.content() {
                NodeContent::Group { .. } => groups::SERVICE,
                NodeContent::Resource(_) => groups::RESOURCE,
            },
        }
    }

    /// Open the context menu for the selected node
    pub fn open_actions_menu(&mut self) {
        let Some(id) = self.selected_node() else {
            return;
        };

        let entries: Vec<MenuEntry> = {
            let subject = self.subject_for(id);
            self.registry
                .render_group(self.group_for(id), &subject)
                .into_iter()
                .map(|entry| match entry {
                    RenderedEntry::Action {
                        id,
                        metadata,
                        enabled,
                    } => MenuEntry {
                        action: Some(id),
                        label: metadata.label.clone(),
                        shortcut: metadata.shortcut,
                        enabled,
                    },
                    RenderedEntry::Separator => MenuEntry {
                        action: None,
                        label: String::new(),
                        shortcut: None,
                        enabled: false,
                    },
                })
                .collect()
        };

        if entries.is_empty() {
            return;
        }

        let selected = entries
            .iter()
            .position(|e| e.action.is_some() && e.enabled)
            .unwrap_or(0);
        self.actions_menu = Some(ActionsMenuState {
            node: id,
            entries,
            selected,
        });
        self.mode = Mode::Actions;
    }

    /// Move the menu selection, skipping separators
    fn menu_step(&mut self, delta: isize) {
        let Some(menu) = &mut self.actions_menu else {
            return;
        };
        let len = menu.entries.len() as isize;
        let mut index = menu.selected as isize;
        loop {
            index += delta;
            if index < 0 || index >= len {
                return;
            }
            if menu.entries[index as usize].action.is_some() {
                menu.selected = index as usize;
                return;
            }
        }
    }

    /// Run the highlighted menu entry
    pub fn activate_menu_entry(&mut self) -> Result<()> {
        let Some(menu) = self.actions_menu.take() else {
            return Ok(());
        };
        self.mode = Mode::Normal;

        let Some(entry) = menu.entries.get(menu.selected) else {
            return Ok(());
        };
        let Some(action) = entry.action else {
            return Ok(());
        };
        if !entry.enabled {
            return Ok(());
        }

        self.invoke_action(action, menu.node)
    }

    /// Invoke an action on a node: guard enablement and read-only mode, then
    /// either ask for confirmation or perform it directly
    pub fn invoke_action(&mut self, action: ActionId, node: NodeId) -> Result<()> {
        {
            let subject = self.subject_for(node);
            if !self.registry.is_enabled(action, &subject) {
                return Ok(());
            }
        }

        let mutates = matches!(action, ids::CREATE | ids::EDIT | ids::DELETE);
        if self.readonly && mutates {
            self.show_warning("Read-only mode: actions are disabled");
            return Ok(());
        }

        let confirm = self
            .registry
            .metadata(action)
            .and_then(|m| m.confirm.clone());
        if let Some(confirm) = confirm {
            let label = self
                .registry
                .metadata(action)
                .map(|m| m.label.clone())
                .unwrap_or_default();
            let target = self
                .tree
                .node(node)
                .map(|n| n.content().label().to_string())
                .unwrap_or_default();
            let message = confirm
                .message
                .unwrap_or_else(|| format!("{} '{}'?", label, target));

            self.enter_confirm_mode(PendingAction {
                action,
                node,
                message,
                destructive: confirm.destructive,
                selected_yes: confirm.default_yes,
            });
            return Ok(());
        }

        self.perform_action(action, node)
    }

    /// Perform an action whose preconditions (enablement, confirmation) are
    /// already satisfied
    pub fn perform_action(&mut self, action: ActionId, node: NodeId) -> Result<()> {
        match action {
            ids::REFRESH => self.refresh_node(node),
            ids::PIN => {
                if let Some(id) = self.node_resource_id(node) {
                    if self.favorites.add(&id) {
                        self.favorites.store_into(&mut self.config);
                        self.save_config();
                        self.reload_root(self.roots.favorites);
                        self.status_message = Some(format!("Pinned {}", ResourceId::new(&id).name()));
                    }
                }
            }
            ids::UNPIN => {
                if let Some(id) = self.node_resource_id(node) {
                    if self.favorites.remove(&id) {
                        self.favorites.store_into(&mut self.config);
                        self.save_config();
                        self.reload_root(self.roots.favorites);
                        self.status_message =
                            Some(format!("Unpinned {}", ResourceId::new(&id).name()));
                    }
                }
            }
            ids::PROMOTE => {
                if let Some(id) = self.node_resource_id(node) {
                    if self.favorites.promote(&id) {
                        self.favorites.store_into(&mut self.config);
                        self.save_config();
                        self.reload_root(self.roots.favorites);
                    }
                }
            }
            ids::CREATE => self.open_create_form(node),
            ids::EDIT => self.open_edit_form(node),
            ids::DELETE => {
                if let Some(id) = self.node_resource_id(node) {
                    worker::spawn_delete(
                        self.provider.clone(),
                        ResourceId::new(&id),
                        node,
                        self.events_tx.clone(),
                    );
                    self.status_message =
                        Some(format!("Deleting {}...", ResourceId::new(&id).name()));
                }
            }
            ids::CONNECT => {
                if let Some(id) = self.node_resource_id(node) {
                    let is_database = self
                        .tree
                        .node(node)
                        .and_then(|n| n.content().resource())
                        .map(|r| r.kind() == &ResourceKind::PostgresServer)
                        .unwrap_or(false);
                    if is_database {
                        self.status_message = match self.stored_database_password(&id) {
                            Some(_) => Some(format!(
                                "Using saved credentials for {}@{}",
                                DEFAULT_DB_USER,
                                ResourceId::new(&id).name()
                            )),
                            None => Some(
                                "No saved credentials; sign in through the portal".to_string(),
                            ),
                        };
                    }
                    self.open_portal(&id);
                }
            }
            ids::OPEN_PORTAL => {
                if let Some(id) = self.node_resource_id(node) {
                    self.open_portal(&id);
                }
            }
            ids::UNLINK => {
                // confirmation already satisfied by the dialog flow
                if self.tree.unlink(node, &mut self.config) {
                    self.save_config();
                    self.status_message = Some("Unlinked resource".to_string());
                }
                self.clamp_selection();
            }
            _ => {}
        }
        Ok(())
    }

    fn open_portal(&mut self, id: &str) {
        let url = shell::portal_url(&ResourceId::new(id));
        match shell::open_browser(&url) {
            ShellResult::Success => {
                tracing::info!("Opened portal URL: {}", url);
            }
            ShellResult::Failed(code) => {
                self.error_message = Some(format!("Browser exited with code {}", code));
            }
            ShellResult::Error(msg) => {
                self.error_message = Some(format!("Failed to open browser: {}", msg));
            }
        }
    }

    /// Saved database credentials for a server. Entries stored under the
    /// legacy definition are migrated to the current one before lookup.
    fn stored_database_password(&mut self, resource_id: &str) -> Option<String> {
        let legacy = CredentialKey::new(LEGACY_CREDENTIAL_DEFINITION, resource_id, DEFAULT_DB_USER);
        let key = CredentialKey::new(CREDENTIAL_DEFINITION, resource_id, DEFAULT_DB_USER);
        if let Err(e) = self.passwords.migrate_password(&legacy, &key) {
            tracing::warn!("Failed to migrate saved credentials: {}", e);
        }
        self.passwords
            .load_password(&key, SaveType::Forever)
            .or_else(|| self.passwords.load_password(&key, SaveType::UntilRestart))
    }

    fn node_resource_id(&self, node: NodeId) -> Option<String> {
        self.tree
            .node(node)
            .and_then(|n| n.content().resource())
            .map(|r| r.id().as_str().to_string())
    }

    /// Refresh a synthetic root, but only when it has been loaded before;
    /// a collapsed root will pick up changes on its next expand
    fn reload_root(&mut self, root: NodeId) {
        let loaded = self
            .tree
            .node(root)
            .map(|n| !matches!(n.state(), NodeState::Collapsed))
            .unwrap_or(false);
        if loaded {
            self.refresh_node(root);
        }
    }

    // =========================================================================
    // Draft Form
    // =========================================================================

    /// Open a creation form scoped to the selected container
    fn open_create_form(&mut self, node: NodeId) {
        let container = self.tree.node(node).map(|n| n.content());
        let (kind_choices, resource_group) = match container {
            Some(NodeContent::Resource(r)) if r.kind() == &ResourceKind::ResourceGroup => {
                let creatable: Vec<ResourceKind> = [
                    ResourceKind::VirtualMachine,
                    ResourceKind::StorageAccount,
                    ResourceKind::PostgresServer,
                ]
                .into_iter()
                .filter(|kind| kind.capabilities().create)
                .collect();
                (creatable, Some(r.name().to_string()))
            }
            _ => (vec![ResourceKind::ResourceGroup], None),
        };

        let mut draft = Draft::new(kind_choices[0].clone());
        draft.set_resource_group(resource_group);

        self.draft_form = Some(DraftFormState {
            draft,
            parent: Some(node),
            focused: DraftField::Name,
            kind_choices,
            error: None,
        });
        self.mode = Mode::DraftForm;
    }

    /// Open an edit form for the selected resource
    fn open_edit_form(&mut self, node: NodeId) {
        let Some(resource) = self.tree.node(node).and_then(|n| n.content().resource()) else {
            return;
        };

        self.draft_form = Some(DraftFormState {
            draft: Draft::from_origin(resource),
            parent: self.tree.node(node).and_then(|n| n.parent()),
            focused: DraftField::Name,
            kind_choices: Vec::new(),
            error: None,
        });
        self.mode = Mode::DraftForm;
    }

    pub fn form_focus_next(&mut self) {
        if let Some(form) = &mut self.draft_form {
            form.focused = match form.focused {
                DraftField::Kind => DraftField::Name,
                DraftField::Name => DraftField::Sku,
                DraftField::Sku => DraftField::Location,
                DraftField::Location => {
                    if form.kind_choices.len() > 1 {
                        DraftField::Kind
                    } else {
                        DraftField::Name
                    }
                }
            };
        }
    }

    pub fn form_focus_previous(&mut self) {
        if let Some(form) = &mut self.draft_form {
            form.focused = match form.focused {
                DraftField::Kind => DraftField::Location,
                DraftField::Name => {
                    if form.kind_choices.len() > 1 {
                        DraftField::Kind
                    } else {
                        DraftField::Location
                    }
                }
                DraftField::Sku => DraftField::Name,
                DraftField::Location => DraftField::Sku,
            };
        }
    }

    pub fn form_input_char(&mut self, c: char) {
        if let Some(form) = &mut self.draft_form {
            if form.focused == DraftField::Name {
                let mut name = form.draft.name().to_string();
                name.push(c);
                form.draft.set_name(name);
                form.error = None;
            }
        }
    }

    pub fn form_backspace(&mut self) {
        if let Some(form) = &mut self.draft_form {
            if form.focused == DraftField::Name {
                let mut name = form.draft.name().to_string();
                name.pop();
                form.draft.set_name(name);
                form.error = None;
            }
        }
    }

    /// Cycle the focused choice field forward (+1) or backward (-1)
    pub fn form_cycle(&mut self, delta: isize) {
        let Some(form) = &mut self.draft_form else {
            return;
        };
        form.error = None;

        match form.focused {
            DraftField::Kind => {
                if form.kind_choices.len() < 2 {
                    return;
                }
                let current = form
                    .kind_choices
                    .iter()
                    .position(|k| k == form.draft.kind())
                    .unwrap_or(0);
                let next = cycle_index(current, form.kind_choices.len(), delta);
                // changing kind resets the draft; the entered name and the
                // target group carry over, the SKU does not apply across kinds
                let mut draft = Draft::new(form.kind_choices[next].clone());
                draft.set_name(form.draft.name());
                draft.set_resource_group(form.draft.resource_group().map(str::to_string));
                draft.set_location(form.draft.location().map(str::to_string));
                form.draft = draft;
            }
            DraftField::Sku => {
                let choices = sku_choices(form.draft.kind());
                if choices.is_empty() {
                    return;
                }
                let next = match form.draft.sku() {
                    None => Some(0),
                    Some(current) => {
                        let index = choices.iter().position(|s| *s == current).unwrap_or(0);
                        match (index, delta) {
                            (0, d) if d < 0 => None,
                            (i, _) => Some(cycle_index(i, choices.len(), delta)),
                        }
                    }
                };
                form.draft.set_sku(next.map(|i| choices[i].to_string()));
            }
            DraftField::Location => {
                let next = match form.draft.location() {
                    None => Some(0),
                    Some(current) => {
                        let index = LOCATIONS.iter().position(|l| *l == current).unwrap_or(0);
                        match (index, delta) {
                            (0, d) if d < 0 => None,
                            (i, _) => Some(cycle_index(i, LOCATIONS.len(), delta)),
                        }
                    }
                };
                form.draft.set_location(next.map(|i| LOCATIONS[i].to_string()));
            }
            DraftField::Name => {}
        }
    }

    /// Restore the form draft to its origin (or blank) state
    pub fn form_reset(&mut self) {
        if let Some(form) = &mut self.draft_form {
            form.draft.reset();
            form.error = None;
        }
    }

    /// Validate and commit the form draft. Validation failures keep the
    /// dialog open with an inline message and make no provider calls.
    pub fn submit_draft(&mut self) {
        let Some(mut form) = self.draft_form.take() else {
            return;
        };

        if let Err(e) = form.draft.validate() {
            form.error = Some(e.to_string());
            self.draft_form = Some(form);
            return;
        }

        self.status_message = Some(format!("Saving {}...", form.draft.name()));
        worker::spawn_commit(
            self.provider.clone(),
            form.draft,
            form.parent,
            self.events_tx.clone(),
        );
        self.mode = Mode::Normal;
    }

    // =========================================================================
    // Mode Transitions
    // =========================================================================

    pub fn enter_confirm_mode(&mut self, pending: PendingAction) {
        self.pending_action = Some(pending);
        self.mode = Mode::Confirm;
    }

    /// Run the confirmed pending action
    pub fn confirm_pending(&mut self) -> Result<()> {
        if let Some(pending) = self.pending_action.take() {
            self.perform_action(pending.action, pending.node)?;
        }
        self.mode = Mode::Normal;
        Ok(())
    }

    pub fn show_warning(&mut self, message: &str) {
        self.warning_message = Some(message.to_string());
        self.mode = Mode::Warning;
    }

    pub fn enter_help_mode(&mut self) {
        self.mode = Mode::Help;
    }

    /// Leave any dialog. An open draft form is discarded, never committed.
    pub fn exit_mode(&mut self) {
        self.mode = Mode::Normal;
        self.pending_action = None;
        self.actions_menu = None;
        self.draft_form = None;
        self.warning_message = None;
    }
}

fn cycle_index(current: usize, len: usize, delta: isize) -> usize {
    let len = len as isize;
    (((current as isize + delta) % len + len) % len) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{FormalStatus, ProviderError, Resource};
    use async_trait::async_trait;

    struct NullProvider;

    #[async_trait]
    impl crate::resource::ResourceProvider for NullProvider {
        async fn list_resources(
            &self,
            _parent: &ResourceId,
        ) -> Result<Vec<Resource>, ProviderError> {
            Ok(vec![])
        }

        async fn create_or_update(&self, _draft: &Draft) -> Result<Resource, ProviderError> {
            Err(ProviderError::Api("not under test".to_string()))
        }

        async fn delete(&self, _id: &ResourceId) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn get_status(&self, _id: &ResourceId) -> Result<FormalStatus, ProviderError> {
            Ok(FormalStatus::Running)
        }
    }

    fn test_app() -> App {
        App::new(
            Arc::new(NullProvider),
            Config::default(),
            None,
            "sub-1".to_string(),
            false,
        )
        .unwrap()
    }

    fn vm(name: &str) -> Resource {
        Resource::new(
            ResourceId::new(format!(
                "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/{}",
                name
            )),
            name,
            ResourceKind::VirtualMachine,
            FormalStatus::Running,
        )
    }

    /// Populate the groups root with one resource group and return its node
    fn populated_group(app: &mut App) -> NodeId {
        let ticket = app.tree.begin_expand(app.roots.groups).unwrap();
        let group = Resource::new(
            ResourceId::new("/subscriptions/sub-1/resourceGroups/rg"),
            "rg",
            ResourceKind::ResourceGroup,
            FormalStatus::Unknown,
        );
        app.apply_event(AppEvent::ChildrenLoaded {
            ticket,
            result: Ok(vec![group]),
        });
        app.tree.node(app.roots.groups).unwrap().children()[0]
    }

    /// Populate a resource-group node with one VM and return the VM node
    fn populated_vm(app: &mut App, group: NodeId) -> NodeId {
        let ticket = app.tree.begin_expand(group).unwrap();
        app.apply_event(AppEvent::ChildrenLoaded {
            ticket,
            result: Ok(vec![vm("web-01")]),
        });
        app.tree.node(group).unwrap().children()[0]
    }

    #[test]
    fn test_new_app_shows_three_roots() {
        let app = test_app();
        let rows = app.rows();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|(_, depth)| *depth == 0));
    }

    #[test]
    fn test_children_loaded_event_populates_rows() {
        let mut app = test_app();
        populated_group(&mut app);
        assert_eq!(app.rows().len(), 4);
    }

    #[test]
    fn test_stale_favorites_are_pruned_after_load() {
        let mut app = test_app();
        app.favorites.add("/subscriptions/sub-1/resourceGroups/rg-gone");
        app.favorites.add("/subscriptions/sub-1/resourceGroups/rg-kept");

        let ticket = app.tree.begin_expand(app.roots.favorites).unwrap();
        app.apply_event(AppEvent::PinnedLoaded {
            ticket,
            result: Ok(vec![]),
            stale: vec!["/subscriptions/sub-1/resourceGroups/rg-gone".to_string()],
        });

        assert!(!app.favorites.contains("/subscriptions/sub-1/resourceGroups/rg-gone"));
        assert!(app.favorites.contains("/subscriptions/sub-1/resourceGroups/rg-kept"));
        assert_eq!(
            app.config.favorites,
            vec!["/subscriptions/sub-1/resourceGroups/rg-kept".to_string()]
        );
    }

    #[test]
    fn test_readonly_blocks_mutating_actions_with_warning() {
        let mut app = test_app();
        app.readonly = true;
        let group = populated_group(&mut app);
        let node = populated_vm(&mut app, group);

        app.invoke_action(ids::DELETE, node).unwrap();
        assert_eq!(app.mode, Mode::Warning);
        assert!(app.warning_message.is_some());
    }

    #[test]
    fn test_delete_asks_for_confirmation() {
        let mut app = test_app();
        let group = populated_group(&mut app);
        let node = populated_vm(&mut app, group);

        app.invoke_action(ids::DELETE, node).unwrap();
        assert_eq!(app.mode, Mode::Confirm);
        let pending = app.pending_action.as_ref().unwrap();
        assert!(pending.destructive);
        assert!(!pending.selected_yes);
        assert!(pending.message.contains("web-01"));
    }

    #[test]
    fn test_disabled_action_is_ignored() {
        let mut app = test_app();
        let group = populated_group(&mut app);
        let node = populated_vm(&mut app, group);

        // UNLINK is disabled for a non-linked node: no dialog, no change
        app.invoke_action(ids::UNLINK, node).unwrap();
        assert_eq!(app.mode, Mode::Normal);
        assert!(app.pending_action.is_none());
    }

    #[test]
    fn test_create_form_under_group_offers_resource_kinds() {
        let mut app = test_app();
        let group = populated_group(&mut app);

        app.perform_action(ids::CREATE, group).unwrap();
        assert_eq!(app.mode, Mode::DraftForm);

        let form = app.draft_form.as_ref().unwrap();
        assert_eq!(form.draft.kind(), &ResourceKind::VirtualMachine);
        assert_eq!(form.draft.resource_group(), Some("rg"));
        assert_eq!(form.kind_choices.len(), 3);
    }

    #[test]
    fn test_create_form_at_service_root_creates_resource_groups() {
        let mut app = test_app();
        app.perform_action(ids::CREATE, app.roots.groups).unwrap();

        let form = app.draft_form.as_ref().unwrap();
        assert_eq!(form.draft.kind(), &ResourceKind::ResourceGroup);
        assert_eq!(form.kind_choices, vec![ResourceKind::ResourceGroup]);
    }

    #[test]
    fn test_submit_with_missing_name_keeps_form_open() {
        let mut app = test_app();
        let group = populated_group(&mut app);
        app.perform_action(ids::CREATE, group).unwrap();

        app.submit_draft();
        assert_eq!(app.mode, Mode::DraftForm);
        let form = app.draft_form.as_ref().unwrap();
        assert_eq!(form.error.as_deref(), Some("Name is required"));
    }

    #[test]
    fn test_edit_form_draft_is_bound_to_origin() {
        let mut app = test_app();
        let group = populated_group(&mut app);
        let node = populated_vm(&mut app, group);

        app.perform_action(ids::EDIT, node).unwrap();
        let form = app.draft_form.as_ref().unwrap();
        assert!(form.draft.origin().is_some());
        assert!(!form.draft.is_modified());
        assert_eq!(form.parent, Some(group));
    }

    #[test]
    fn test_exit_mode_discards_draft() {
        let mut app = test_app();
        let group = populated_group(&mut app);
        app.perform_action(ids::CREATE, group).unwrap();
        app.form_input_char('x');

        app.exit_mode();
        assert!(app.draft_form.is_none());
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn test_form_cycle_walks_sku_choices() {
        let mut app = test_app();
        let group = populated_group(&mut app);
        app.perform_action(ids::CREATE, group).unwrap();

        if let Some(form) = &mut app.draft_form {
            form.focused = DraftField::Sku;
        }
        assert_eq!(app.draft_form.as_ref().unwrap().draft.sku(), None);

        app.form_cycle(1);
        assert_eq!(
            app.draft_form.as_ref().unwrap().draft.sku(),
            Some("Standard_B2s")
        );
        app.form_cycle(-1);
        assert_eq!(app.draft_form.as_ref().unwrap().draft.sku(), None);
    }

    #[test]
    fn test_pin_action_front_inserts_and_syncs_config() {
        let mut app = test_app();
        let group = populated_group(&mut app);
        let node = populated_vm(&mut app, group);

        app.perform_action(ids::PIN, node).unwrap();
        let id = "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/web-01";
        assert!(app.favorites.contains(id));
        assert_eq!(app.config.favorites, vec![id.to_string()]);

        // pin again: no duplicate
        app.perform_action(ids::PIN, node).unwrap();
        assert_eq!(app.favorites.len(), 1);
    }

    #[test]
    fn test_menu_skips_separators() {
        let mut app = test_app();
        let group = populated_group(&mut app);
        let node = populated_vm(&mut app, group);
        app.selected = app
            .rows()
            .iter()
            .position(|(id, _)| *id == node)
            .unwrap();

        app.open_actions_menu();
        assert_eq!(app.mode, Mode::Actions);
        let menu = app.actions_menu.as_ref().unwrap();
        assert!(menu.entries.iter().any(|e| e.action.is_none()));

        let start = app.actions_menu.as_ref().unwrap().selected;
        app.next();
        let after = app.actions_menu.as_ref().unwrap().selected;
        assert_ne!(start, after);
        assert!(app.actions_menu.as_ref().unwrap().entries[after]
            .action
            .is_some());
    }

    #[test]
    fn test_delete_finished_disposes_node() {
        let mut app = test_app();
        let group = populated_group(&mut app);
        let node = populated_vm(&mut app, group);
        let rows_before = app.rows().len();

        app.apply_event(AppEvent::DeleteFinished {
            op: uuid::Uuid::new_v4(),
            node,
            result: Ok(()),
        });

        assert_eq!(app.rows().len(), rows_before - 1);
        assert!(app.tree.node(node).is_none());
        assert!(app.status_message.as_deref().unwrap_or("").contains("web-01"));
    }
}
