//! Background Operations
//!
//! Long-running provider calls run on tokio tasks and post typed events back
//! to the UI thread over an mpsc channel. The UI thread is the only mutator:
//! workers never touch app state, they only report outcomes. A worker result
//! whose load ticket has gone stale (node refreshed, collapsed, or disposed)
//! is dropped by the tree on arrival; the in-flight call itself is never
//! hard-cancelled.

use crate::favorites::Favorites;
use crate::resource::{CommitError, Draft, ProviderError, Resource, ResourceId, ResourceProvider};
use crate::tree::{LoadTicket, NodeId};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Events posted from background workers to the UI thread
#[derive(Debug)]
pub enum AppEvent {
    /// A node's child enumeration finished
    ChildrenLoaded {
        ticket: LoadTicket,
        result: Result<Vec<Resource>, ProviderError>,
    },
    /// A pinned/linked id list was resolved against the provider. `stale`
    /// holds ids the provider no longer knows; the UI decides whether to
    /// prune them (favorites) or leave them alone (linked resources).
    PinnedLoaded {
        ticket: LoadTicket,
        result: Result<Vec<Resource>, ProviderError>,
        stale: Vec<String>,
    },
    /// A draft commit finished. `parent` is the node to refresh on success.
    CommitFinished {
        op: Uuid,
        parent: Option<NodeId>,
        result: Result<Resource, CommitError>,
    },
    /// A resource deletion finished
    DeleteFinished {
        op: Uuid,
        node: NodeId,
        result: Result<(), ProviderError>,
    },
}

pub type EventSender = mpsc::UnboundedSender<AppEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<AppEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Enumerate a node's children. One ticket, one provider query.
pub fn spawn_list(
    provider: Arc<dyn ResourceProvider>,
    parent: ResourceId,
    ticket: LoadTicket,
    events: EventSender,
) {
    tokio::spawn(async move {
        tracing::debug!(op = %ticket.op, parent = %parent, "listing children");
        let result = provider.list_resources(&parent).await;
        // send fails only when the UI is shutting down
        let _ = events.send(AppEvent::ChildrenLoaded { ticket, result });
    });
}

/// Resolve a snapshot of pinned/linked ids, one provider round-trip per id.
/// Vanished ids are collected as stale rather than failing the load; the
/// first hard provider failure aborts the whole load.
pub fn spawn_resolve_ids(
    provider: Arc<dyn ResourceProvider>,
    snapshot: Favorites,
    ids: Vec<String>,
    ticket: LoadTicket,
    events: EventSender,
) {
    tokio::spawn(async move {
        let mut resources = Vec::new();
        let mut stale = Vec::new();
        let mut failure = None;

        for id in ids {
            match snapshot.resolve(&id, provider.as_ref()).await {
                Ok(Some(resource)) => resources.push(resource),
                Ok(None) => stale.push(id),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let result = match failure {
            Some(e) => Err(e),
            None => Ok(resources),
        };
        let _ = events.send(AppEvent::PinnedLoaded {
            ticket,
            result,
            stale,
        });
    });
}

/// Commit a draft off-thread
pub fn spawn_commit(
    provider: Arc<dyn ResourceProvider>,
    draft: Draft,
    parent: Option<NodeId>,
    events: EventSender,
) -> Uuid {
    let op = Uuid::new_v4();
    tokio::spawn(async move {
        tracing::info!(op = %op, name = draft.name(), "committing draft");
        let result = draft.commit(provider.as_ref()).await;
        let _ = events.send(AppEvent::CommitFinished { op, parent, result });
    });
    op
}

/// Delete a resource off-thread
pub fn spawn_delete(
    provider: Arc<dyn ResourceProvider>,
    id: ResourceId,
    node: NodeId,
    events: EventSender,
) -> Uuid {
    let op = Uuid::new_v4();
    tokio::spawn(async move {
        tracing::info!(op = %op, resource = %id, "deleting resource");
        let result = provider.delete(&id).await;
        let _ = events.send(AppEvent::DeleteFinished { op, node, result });
    });
    op
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{FormalStatus, ResourceKind};
    use crate::tree::{NodeContent, ResourceTree};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct OneGroupProvider {
        list_calls: AtomicUsize,
    }

    #[async_trait]
    impl ResourceProvider for OneGroupProvider {
        async fn list_resources(
            &self,
            _parent: &ResourceId,
        ) -> Result<Vec<Resource>, ProviderError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Resource::new(
                ResourceId::new("/subscriptions/s/resourceGroups/rg-a"),
                "rg-a",
                ResourceKind::ResourceGroup,
                FormalStatus::Unknown,
            )])
        }

        async fn create_or_update(&self, _draft: &Draft) -> Result<Resource, ProviderError> {
            Err(ProviderError::Api("not under test".to_string()))
        }

        async fn delete(&self, _id: &ResourceId) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn get_status(&self, _id: &ResourceId) -> Result<FormalStatus, ProviderError> {
            Err(ProviderError::NotFound("gone".to_string()))
        }
    }

    #[tokio::test]
    async fn test_coalesced_expand_issues_one_query_and_one_event() {
        let provider = Arc::new(OneGroupProvider {
            list_calls: AtomicUsize::new(0),
        });
        let (tx, mut rx) = channel();

        let mut tree = ResourceTree::new();
        let root = tree.add_root(NodeContent::Group {
            id: ResourceId::subscription_root("s"),
            label: "Resource Groups".to_string(),
        });

        // two concurrent expand requests: only the first yields a ticket
        let ticket = tree.begin_expand(root).unwrap();
        assert!(tree.begin_expand(root).is_none());
        spawn_list(provider.clone(), ResourceId::subscription_root("s"), ticket, tx);

        let event = rx.recv().await.unwrap();
        match event {
            AppEvent::ChildrenLoaded { ticket, result } => {
                tree.complete_load(ticket, result);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        assert_eq!(provider.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(tree.node(root).unwrap().children().len(), 1);
        // channel drained: exactly one event for the coalesced expands
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_resolve_collects_stale_ids() {
        let provider = Arc::new(OneGroupProvider {
            list_calls: AtomicUsize::new(0),
        });
        let (tx, mut rx) = channel();

        let mut tree = ResourceTree::new();
        let root = tree.add_root(NodeContent::Group {
            id: ResourceId::synthetic("favorites"),
            label: "Favorites".to_string(),
        });
        let ticket = tree.begin_expand(root).unwrap();

        spawn_resolve_ids(
            provider,
            Favorites::default(),
            vec!["/subscriptions/s/resourceGroups/rg-gone".to_string()],
            ticket,
            tx,
        );

        match rx.recv().await.unwrap() {
            AppEvent::PinnedLoaded { result, stale, .. } => {
                assert_eq!(result.unwrap(), vec![]);
                assert_eq!(stale, vec!["/subscriptions/s/resourceGroups/rg-gone".to_string()]);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
