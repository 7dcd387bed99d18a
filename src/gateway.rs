//! The command/event boundary to the workspace backend.
//!
//! Nothing outside this module talks to the backend directly. Every request is
//! asynchronous and may fail; mutating calls may change state observed by the
//! other surface, but never refresh its cache.

use std::future::Future;

use tracing::Span;

use crate::actor;
use crate::model::{HotkeySettings, Workspace, WorkspaceId};

pub mod chrome;
pub mod memory;

pub use chrome::{ChromeCommand, RecordingChrome, WindowChrome};
pub use memory::{InMemoryBackend, Operation};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("workspace {0} not found")]
    NotFound(WorkspaceId),
    #[error("cannot delete the last workspace")]
    LastWorkspace,
    #[error("cannot delete the active workspace")]
    ActiveWorkspace,
    #[error("another workspace switch is already in progress")]
    AlreadyBusy,
    #[error("workspace switch failed: {0}")]
    SwitchFailed(String),
    #[error("workspace limit reached ({max})")]
    WorkspaceLimit { max: usize },
    #[error("backend unreachable: {0}")]
    TransportFailure(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Pushed by the backend when a global switch hotkey fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyEvent {
    /// 1-based position in the workspace list. Not validated by the backend.
    pub index: u32,
}

pub trait BackendGateway: Send + Sync + 'static {
    fn list_workspaces(&self) -> impl Future<Output = GatewayResult<Vec<Workspace>>> + Send;

    /// The backend picks the id and name; callers refetch to learn them.
    fn create_workspace(&self) -> impl Future<Output = GatewayResult<()>> + Send;

    fn delete_workspace(&self, id: WorkspaceId) -> impl Future<Output = GatewayResult<()>> + Send;

    fn activate_workspace(&self, id: WorkspaceId)
    -> impl Future<Output = GatewayResult<()>> + Send;

    /// Deactivates every managed workspace.
    fn restore_original_state(&self) -> impl Future<Output = GatewayResult<()>> + Send;

    fn get_hotkey_settings(&self) -> impl Future<Output = GatewayResult<HotkeySettings>> + Send;

    fn set_hotkey_settings(
        &self,
        settings: HotkeySettings,
    ) -> impl Future<Output = GatewayResult<()>> + Send;

    fn get_autostart(&self) -> impl Future<Output = GatewayResult<bool>> + Send;

    fn set_autostart(&self, enabled: bool) -> impl Future<Output = GatewayResult<()>> + Send;

    fn subscribe_hotkeys(&self) -> HotkeySubscription;
}

/// A scoped registration for hotkey push events.
///
/// Dropping the subscription releases it with the backend; nothing is
/// delivered to it afterwards.
pub struct HotkeySubscription {
    rx: actor::Receiver<HotkeyEvent>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl HotkeySubscription {
    pub fn new(rx: actor::Receiver<HotkeyEvent>, release: impl FnOnce() + Send + 'static) -> Self {
        Self { rx, release: Some(Box::new(release)) }
    }

    pub async fn recv(&mut self) -> Option<(Span, HotkeyEvent)> { self.rx.recv().await }

    pub fn unsubscribe(self) {}
}

impl Drop for HotkeySubscription {
    fn drop(&mut self) {
        self.rx.close();
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for HotkeySubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotkeySubscription").field("released", &self.release.is_none()).finish()
    }
}
