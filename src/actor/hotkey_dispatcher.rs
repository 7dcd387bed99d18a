//! Turns backend hotkey pushes into workspace switches for the main surface.
//!
//! Indices are resolved against a freshly fetched list, never the cache: the
//! press may refer to a list the other surface changed since our last refresh.
//! Each press is handled as its own task so a quick second press supersedes a
//! switch that is still waiting on the backend.

use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, instrument, warn};

use crate::client::{DesktopRegistry, SwitchController, SwitchOutcome};
use crate::gateway::{BackendGateway, HotkeyEvent, HotkeySubscription};
use crate::model::{WorkspaceId, WorkspaceSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotkeyResolution {
    /// Index 0 or past the end of the list.
    OutOfRange,
    AlreadyActive,
    /// The live list could not be read; the press is dropped.
    Unavailable,
    Switched(SwitchOutcome),
}

pub struct HotkeyDispatcher<G> {
    registry: DesktopRegistry<G>,
    switcher: SwitchController<G>,
    subscription: HotkeySubscription,
    shutdown: CancellationToken,
}

/// Owned by the surface; tearing it down stops the dispatcher and releases
/// the subscription.
#[derive(Debug)]
pub struct DispatcherHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Returns once no handler can run any more.
    pub async fn teardown(self) {
        self.shutdown.cancel();
        if let Err(err) = self.task.await {
            warn!(%err, "hotkey dispatcher ended abnormally");
        }
    }
}

impl<G: BackendGateway> HotkeyDispatcher<G> {
    pub fn new(
        registry: DesktopRegistry<G>,
        switcher: SwitchController<G>,
        subscription: HotkeySubscription,
    ) -> Self {
        Self {
            registry,
            switcher,
            subscription,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn spawn(self) -> DispatcherHandle {
        let shutdown = self.shutdown.clone();
        let task = tokio::spawn(self.run());
        DispatcherHandle { shutdown, task }
    }

    pub async fn run(mut self) {
        let mut handlers = JoinSet::new();
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                    if let Some(resolution) = reap(joined) {
                        debug!(?resolution, "hotkey handled");
                    }
                }
                maybe = self.subscription.recv() => {
                    let Some((span, HotkeyEvent { index })) = maybe else { break };
                    let registry = self.registry.clone();
                    let switcher = self.switcher.clone();
                    handlers.spawn(
                        async move { handle_press(&registry, &switcher, index).await }
                            .instrument(span),
                    );
                }
            }
        }
        handlers.abort_all();
        while handlers.join_next().await.is_some() {}
        drop(self.subscription);
        debug!("hotkey dispatcher stopped");
    }
}

/// Unwraps a finished handler, logging one that panicked or was aborted.
fn reap(joined: Result<HotkeyResolution, JoinError>) -> Option<HotkeyResolution> {
    match joined {
        Ok(resolution) => Some(resolution),
        Err(err) => {
            warn!(%err, "hotkey handler ended abnormally");
            None
        }
    }
}

#[instrument(skip(registry, switcher))]
pub async fn handle_press<G: BackendGateway>(
    registry: &DesktopRegistry<G>,
    switcher: &SwitchController<G>,
    index: u32,
) -> HotkeyResolution {
    // No list has a position 0; skip the round trip.
    if index == 0 {
        return HotkeyResolution::OutOfRange;
    }
    let live = match registry.fetch().await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(%err, "dropping hotkey press, workspace list unavailable");
            return HotkeyResolution::Unavailable;
        }
    };
    let target = match resolve(&live, index) {
        Ok(target) => target,
        Err(resolution) => {
            debug!(?resolution, "hotkey ignored");
            return resolution;
        }
    };
    registry.replace(live);
    HotkeyResolution::Switched(switcher.switch(target).await)
}

/// Maps a 1-based index onto a switch target.
pub fn resolve(snapshot: &WorkspaceSnapshot, index: u32) -> Result<WorkspaceId, HotkeyResolution> {
    let workspace = snapshot.at_hotkey_index(index).ok_or(HotkeyResolution::OutOfRange)?;
    if workspace.is_active {
        return Err(HotkeyResolution::AlreadyActive);
    }
    Ok(workspace.id)
}
