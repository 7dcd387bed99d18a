use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, instrument};

use super::ClientError;
use crate::gateway::BackendGateway;
use crate::model::{WorkspaceId, WorkspaceSnapshot};

/// One surface's cache of the workspace list.
///
/// The cache is a disposable projection of backend state: it is rebuilt
/// wholesale on every refresh and never reconciled with another surface.
/// Snapshots are published as `Arc`s, so a reader holds either the old or
/// the new list, never a mix.
pub struct DesktopRegistry<G> {
    gateway: Arc<G>,
    snapshot: Arc<watch::Sender<Arc<WorkspaceSnapshot>>>,
}

impl<G> Clone for DesktopRegistry<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            snapshot: self.snapshot.clone(),
        }
    }
}

impl<G: BackendGateway> DesktopRegistry<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            snapshot: Arc::new(watch::Sender::new(Arc::default())),
        }
    }

    pub fn current(&self) -> Arc<WorkspaceSnapshot> { self.snapshot.borrow().clone() }

    pub fn subscribe(&self) -> watch::Receiver<Arc<WorkspaceSnapshot>> { self.snapshot.subscribe() }

    /// Reads the authoritative list without touching the cache.
    pub async fn fetch(&self) -> Result<WorkspaceSnapshot, ClientError> {
        let workspaces = self.gateway.list_workspaces().await?;
        Ok(WorkspaceSnapshot::new(workspaces)?)
    }

    /// On failure the previous snapshot stays in place.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Arc<WorkspaceSnapshot>, ClientError> {
        let snapshot = self.fetch().await?;
        Ok(self.replace(snapshot))
    }

    pub fn replace(&self, snapshot: WorkspaceSnapshot) -> Arc<WorkspaceSnapshot> {
        let snapshot = Arc::new(snapshot);
        debug!(count = snapshot.len(), active = ?snapshot.active_id(), "snapshot replaced");
        self.snapshot.send_replace(snapshot.clone());
        snapshot
    }

    /// Publishes a locally derived snapshot with only `id` active. The backend
    /// is not contacted.
    pub fn apply_optimistic(&self, id: WorkspaceId) -> Result<Arc<WorkspaceSnapshot>, ClientError> {
        let mut applied = None;
        self.snapshot.send_if_modified(|current| match current.with_active(id) {
            Some(next) => {
                *current = Arc::new(next);
                applied = Some(current.clone());
                true
            }
            None => false,
        });
        let snapshot = applied.ok_or(ClientError::UnknownWorkspace(id))?;
        debug!(%id, "optimistic snapshot applied");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::gateway::{GatewayError, InMemoryBackend, Operation};
    use crate::model::SnapshotError;
    use crate::model::workspace::ws;

    fn id(raw: u64) -> WorkspaceId { WorkspaceId::new(raw) }

    #[tokio::test]
    async fn refresh_replaces_snapshot() {
        let backend = Arc::new(InMemoryBackend::with_workspaces(2));
        backend.set_active(Some(id(2)));
        let registry = DesktopRegistry::new(backend.clone());
        let mut rx = registry.subscribe();

        assert!(registry.current().is_empty());
        registry.refresh().await.unwrap();

        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(2, snapshot.len());
        assert_eq!(Some(id(2)), snapshot.active_id());
    }

    #[tokio::test]
    async fn read_failure_keeps_previous_snapshot() {
        let backend = Arc::new(InMemoryBackend::with_workspaces(2));
        let registry = DesktopRegistry::new(backend.clone());
        let before = registry.refresh().await.unwrap();

        backend.fail_next(Operation::List, GatewayError::TransportFailure("down".into()));
        let err = registry.refresh().await.unwrap_err();

        assert_eq!(ClientError::Gateway(GatewayError::TransportFailure("down".into())), err);
        assert_eq!(before, registry.current());
    }

    #[tokio::test]
    async fn two_active_from_backend_is_an_error() {
        let backend = Arc::new(InMemoryBackend::with_workspaces(2));
        let registry = DesktopRegistry::new(backend.clone());
        let before = registry.refresh().await.unwrap();

        backend.respond_next_list(vec![ws(1, "A", true), ws(2, "B", true)]);
        let err = registry.refresh().await.unwrap_err();

        assert_eq!(
            ClientError::InconsistentSnapshot(SnapshotError::MultipleActive {
                ids: vec![id(1), id(2)]
            }),
            err
        );
        assert_eq!(before, registry.current());
    }

    #[tokio::test]
    async fn optimistic_marks_only_target() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.respond_next_list(vec![ws(1, "A", false), ws(2, "B", true)]);
        let registry = DesktopRegistry::new(backend.clone());
        registry.refresh().await.unwrap();

        let snapshot = registry.apply_optimistic(id(1)).unwrap();
        assert_eq!(vec![ws(1, "A", true), ws(2, "B", false)], snapshot.as_slice().to_vec());
        assert_eq!(snapshot, registry.current());
        assert_eq!(1, backend.calls(Operation::List));
    }

    #[tokio::test]
    async fn optimistic_unknown_id_leaves_cache() {
        let backend = Arc::new(InMemoryBackend::with_workspaces(1));
        let registry = DesktopRegistry::new(backend);
        let before = registry.refresh().await.unwrap();

        assert_eq!(Err(ClientError::UnknownWorkspace(id(5))), registry.apply_optimistic(id(5)));
        assert_eq!(before, registry.current());
    }
}
