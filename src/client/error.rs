use crate::gateway::GatewayError;
use crate::model::{SnapshotError, WorkspaceId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// Refused before reaching the backend.
    #[error("cannot delete the last workspace")]
    LastWorkspace,
    /// Refused before reaching the backend.
    #[error("workspace limit reached ({max})")]
    WorkspaceLimit { max: usize },
    #[error("workspace {0} is not in the current list")]
    UnknownWorkspace(WorkspaceId),
    #[error("inconsistent workspace list: {0}")]
    InconsistentSnapshot(#[from] SnapshotError),
}
