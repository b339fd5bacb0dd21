//! Lazy Resource Tree
//!
//! Explorer tree over cloud resources. Children are enumerated on first
//! expansion, discarded on collapse or refresh, and owned by their parent;
//! the child-to-parent link is a non-owning back-reference.
//!
//! Per-node state machine: Collapsed → Loading → Populated, back to Loading
//! on refresh, Loading → Error on provider failure. Error holds until the
//! next manual refresh. While a node is Loading, further expand/refresh calls
//! coalesce onto the in-flight load: [`ResourceTree::begin_expand`] hands out
//! at most one [`LoadTicket`] per load, and a completion only applies when
//! its ticket epoch still matches the node. Results for disposed, collapsed,
//! or re-refreshed nodes are dropped on arrival.

use crate::config::Config;
use crate::resource::{ProviderError, Resource, ResourceId, ResourceKind};
use std::collections::HashMap;
use uuid::Uuid;

/// Arena handle for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

/// What a node wraps: a synthetic grouping or a materialized resource
#[derive(Debug, Clone)]
pub enum NodeContent {
    Group { id: ResourceId, label: String },
    Resource(Resource),
}

impl NodeContent {
    pub fn id(&self) -> &ResourceId {
        match self {
            Self::Group { id, .. } => id,
            Self::Resource(r) => r.id(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Group { label, .. } => label,
            Self::Resource(r) => r.name(),
        }
    }

    pub fn resource(&self) -> Option<&Resource> {
        match self {
            Self::Group { .. } => None,
            Self::Resource(r) => Some(r),
        }
    }
}

/// Population state of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeState {
    Collapsed,
    Loading,
    Populated,
    /// Provider failure, user-visible on the node row. Terminal until the
    /// next manual refresh.
    Error(String),
}

/// A tree element
#[derive(Debug)]
pub struct Node {
    content: NodeContent,
    state: NodeState,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Bumped on every Loading entry and on discard; stale completions
    /// carry an older epoch and are dropped
    epoch: u64,
}

impl Node {
    pub fn content(&self) -> &NodeContent {
        &self.content
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Leaf resources (anything that cannot own sub-resources) never expand
    pub fn is_expandable(&self) -> bool {
        match &self.content {
            NodeContent::Group { .. } => true,
            NodeContent::Resource(r) => r.kind() == &ResourceKind::ResourceGroup,
        }
    }
}

/// Permission to run exactly one load for a node. Handed to a background
/// worker; the matching completion is applied through [`ResourceTree::complete_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub node: NodeId,
    epoch: u64,
    /// Correlation id for log lines
    pub op: Uuid,
}

/// Outcome of applying a load completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Populated,
    Failed,
    /// Ticket no longer matches the node; result dropped on arrival
    Discarded,
}

/// Arena-backed explorer tree
#[derive(Debug, Default)]
pub struct ResourceTree {
    nodes: HashMap<NodeId, Node>,
    roots: Vec<NodeId>,
    next_id: u64,
}

impl ResourceTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, content: NodeContent, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                content,
                state: NodeState::Collapsed,
                parent,
                children: Vec::new(),
                epoch: 0,
            },
        );
        id
    }

    pub fn add_root(&mut self, content: NodeContent) -> NodeId {
        let id = self.insert(content, None);
        self.roots.push(id);
        id
    }

    pub fn add_child(&mut self, parent: NodeId, content: NodeContent) -> Option<NodeId> {
        if !self.nodes.contains_key(&parent) {
            return None;
        }
        let id = self.insert(content, Some(parent));
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(id);
        }
        Some(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Start loading a collapsed node. Returns the single load ticket, or
    /// None when the node is a leaf, already loading (the caller coalesces
    /// onto the in-flight load and will observe its outcome), already
    /// populated, or in error (errors hold until an explicit refresh).
    pub fn begin_expand(&mut self, id: NodeId) -> Option<LoadTicket> {
        let node = self.nodes.get_mut(&id)?;
        if !node.is_expandable() || node.state != NodeState::Collapsed {
            return None;
        }

        node.state = NodeState::Loading;
        node.epoch += 1;
        let ticket = LoadTicket {
            node: id,
            epoch: node.epoch,
            op: Uuid::new_v4(),
        };
        tracing::debug!(op = %ticket.op, node = %node.content.id(), "expand");
        Some(ticket)
    }

    /// Discard children and re-enter Loading. Works from Populated, Error,
    /// and Collapsed; a node already Loading coalesces (returns None).
    pub fn refresh(&mut self, id: NodeId) -> Option<LoadTicket> {
        match self.nodes.get(&id) {
            Some(node) if node.is_expandable() && node.state != NodeState::Loading => {}
            _ => return None,
        }

        self.discard_children(id);
        let node = self.nodes.get_mut(&id)?;
        node.state = NodeState::Loading;
        node.epoch += 1;
        let ticket = LoadTicket {
            node: id,
            epoch: node.epoch,
            op: Uuid::new_v4(),
        };
        tracing::debug!(op = %ticket.op, node = %node.content.id(), "refresh");
        Some(ticket)
    }

    /// Collapse a node, discarding its children. The next expand reloads.
    pub fn collapse(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if node.state == NodeState::Collapsed {
            return;
        }
        self.discard_children(id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.state = NodeState::Collapsed;
            node.epoch += 1;
        }
    }

    /// Apply a finished load. Stale tickets (node disposed, collapsed, or
    /// refreshed since the ticket was issued) are dropped.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<Resource>, ProviderError>,
    ) -> Applied {
        let Some(node) = self.nodes.get(&ticket.node) else {
            tracing::debug!(op = %ticket.op, "load result for disposed node dropped");
            return Applied::Discarded;
        };
        if node.epoch != ticket.epoch || node.state != NodeState::Loading {
            tracing::debug!(op = %ticket.op, "stale load result dropped");
            return Applied::Discarded;
        }

        match result {
            Ok(resources) => {
                for resource in resources {
                    self.add_child(ticket.node, NodeContent::Resource(resource));
                }
                if let Some(node) = self.nodes.get_mut(&ticket.node) {
                    node.state = NodeState::Populated;
                }
                Applied::Populated
            }
            Err(e) => {
                if let Some(node) = self.nodes.get_mut(&ticket.node) {
                    node.state = NodeState::Error(e.user_message());
                }
                Applied::Failed
            }
        }
    }

    /// Remove a node and its subtree from the arena
    pub fn dispose(&mut self, id: NodeId) {
        self.discard_children(id);
        if let Some(node) = self.nodes.remove(&id) {
            if let Some(parent) = node.parent {
                if let Some(parent_node) = self.nodes.get_mut(&parent) {
                    parent_node.children.retain(|c| *c != id);
                }
            }
        }
        self.roots.retain(|r| *r != id);
    }

    /// Remove a linked node: drops its backing id from the persisted
    /// linked-resources list and the node from its parent's children.
    ///
    /// Precondition: the caller has obtained user confirmation. The caller
    /// also persists `config` afterwards.
    pub fn unlink(&mut self, id: NodeId, config: &mut Config) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        let backing = node.content.id().as_str().to_string();

        let before = config.linked_resources.len();
        config.linked_resources.retain(|l| *l != backing);
        let removed = config.linked_resources.len() != before;

        self.dispose(id);
        removed
    }

    fn discard_children(&mut self, id: NodeId) {
        let children = match self.nodes.get_mut(&id) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };
        for child in children {
            self.discard_subtree(child);
        }
    }

    fn discard_subtree(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(&id) {
            for child in node.children {
                self.discard_subtree(child);
            }
        }
    }

    /// Depth-first flattening of the visible rows: every node shows, children
    /// only under populated parents
    pub fn visible(&self) -> Vec<(NodeId, usize)> {
        let mut rows = Vec::new();
        for root in &self.roots {
            self.push_visible(*root, 0, &mut rows);
        }
        rows
    }

    fn push_visible(&self, id: NodeId, depth: usize, rows: &mut Vec<(NodeId, usize)>) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        rows.push((id, depth));
        if node.state == NodeState::Populated {
            for child in &node.children {
                self.push_visible(*child, depth + 1, rows);
            }
        }
    }
}
