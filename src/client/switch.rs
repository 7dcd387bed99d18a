//! Optimistic workspace switching.
//!
//! A switch publishes the target as active before the backend answers. Each
//! attempt carries an [`AttemptToken`]; only the completion matching the most
//! recently issued token may touch the cache or the phase, so a slow response
//! to a superseded attempt can never overwrite a newer one.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use super::{ClientError, DesktopRegistry, StatusLine};
use crate::gateway::BackendGateway;
use crate::model::{AttemptToken, WorkspaceId, WorkspaceSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchPhase {
    Idle,
    Optimistic { attempt: AttemptToken, target: WorkspaceId },
    Committed { attempt: AttemptToken, target: WorkspaceId },
    RolledBack { attempt: AttemptToken, target: WorkspaceId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Target was already active; nothing happened.
    AlreadyActive,
    Committed,
    /// A newer attempt was issued before this one completed.
    Superseded,
    /// The error has already been put on the status line.
    RolledBack(ClientError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchOptions {
    /// Refetch after a committed switch to pick up file-count changes.
    pub refresh_after_commit: bool,
}

#[derive(Debug)]
struct State {
    latest: AttemptToken,
    phase: SwitchPhase,
    pending: usize,
    /// Snapshot from before the latest optimistic application.
    previous: Option<Arc<WorkspaceSnapshot>>,
}

pub struct SwitchController<G> {
    gateway: Arc<G>,
    registry: DesktopRegistry<G>,
    status: StatusLine,
    options: SwitchOptions,
    state: Arc<Mutex<State>>,
}

impl<G> Clone for SwitchController<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            registry: self.registry.clone(),
            status: self.status.clone(),
            options: self.options,
            state: self.state.clone(),
        }
    }
}

/// Decrements the in-flight count however the attempt ends, including when
/// its task is aborted mid-request.
struct InFlight(Arc<Mutex<State>>);

impl Drop for InFlight {
    fn drop(&mut self) { self.0.lock().pending -= 1; }
}

impl<G: BackendGateway> SwitchController<G> {
    pub fn new(
        gateway: Arc<G>,
        registry: DesktopRegistry<G>,
        status: StatusLine,
        options: SwitchOptions,
    ) -> Self {
        Self {
            gateway,
            registry,
            status,
            options,
            state: Arc::new(Mutex::new(State {
                latest: AttemptToken::default(),
                phase: SwitchPhase::Idle,
                pending: 0,
                previous: None,
            })),
        }
    }

    pub fn phase(&self) -> SwitchPhase { self.state.lock().phase }

    /// Number of activation requests still awaiting a backend answer,
    /// superseded ones included.
    pub fn pending(&self) -> usize { self.state.lock().pending }

    pub fn is_pending(&self) -> bool { self.pending() > 0 }

    pub fn latest_attempt(&self) -> AttemptToken { self.state.lock().latest }

    #[instrument(skip(self))]
    pub async fn switch(&self, id: WorkspaceId) -> SwitchOutcome {
        if self.registry.current().is_active(id) {
            debug!("already active");
            return SwitchOutcome::AlreadyActive;
        }

        let (attempt, _in_flight) = match self.begin(id) {
            Ok(started) => started,
            Err(err) => {
                self.status.report(&err);
                return SwitchOutcome::RolledBack(err);
            }
        };
        self.status.clear();
        debug!(%attempt, "optimistic switch issued");

        let result = self.gateway.activate_workspace(id).await;

        let mut stale = false;
        let superseded = {
            let mut state = self.state.lock();
            if state.latest != attempt {
                debug!(%attempt, latest = %state.latest, ok = result.is_ok(), "discarding superseded completion");
                // The newer attempt already rolled back, so this success is
                // what the backend now shows.
                let settle = result.is_ok() && matches!(state.phase, SwitchPhase::RolledBack { .. });
                Some(settle.then_some(state.latest))
            } else {
                match &result {
                    Ok(()) => {
                        state.phase = SwitchPhase::Committed { attempt, target: id };
                        state.previous = None;
                        // A plain refresh may have replaced the optimistic
                        // snapshot while the request was out.
                        if !self.registry.current().is_active(id) {
                            stale = self.registry.apply_optimistic(id).is_err();
                        }
                    }
                    Err(_) => {
                        state.phase = SwitchPhase::RolledBack { attempt, target: id };
                        if let Some(previous) = state.previous.take() {
                            self.registry.replace(WorkspaceSnapshot::clone(&previous));
                        }
                    }
                }
                None
            }
        };

        if let Some(settle) = superseded {
            if let Some(latest) = settle {
                self.resync(latest).await;
            }
            return SwitchOutcome::Superseded;
        }

        match result {
            Ok(()) => {
                info!(%attempt, "switch committed");
                if self.options.refresh_after_commit || stale {
                    self.resync(attempt).await;
                }
                SwitchOutcome::Committed
            }
            Err(err) => {
                let err = ClientError::from(err);
                self.status.report(&err);
                self.resync(attempt).await;
                SwitchOutcome::RolledBack(err)
            }
        }
    }

    fn begin(&self, id: WorkspaceId) -> Result<(AttemptToken, InFlight), ClientError> {
        let mut state = self.state.lock();
        let previous = self.registry.current();
        self.registry.apply_optimistic(id)?;
        let attempt = state.latest.next();
        state.latest = attempt;
        state.phase = SwitchPhase::Optimistic { attempt, target: id };
        state.pending += 1;
        // Keep the oldest confirmed view while attempts pile up on each other.
        if state.previous.is_none() {
            state.previous = Some(previous);
        }
        Ok((attempt, InFlight(self.state.clone())))
    }

    /// Refetches and publishes, unless a newer attempt started meanwhile.
    async fn resync(&self, attempt: AttemptToken) {
        let snapshot = match self.registry.fetch().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(%attempt, %err, "resync after switch failed; keeping current snapshot");
                return;
            }
        };
        let state = self.state.lock();
        if state.latest == attempt {
            self.registry.replace(snapshot);
        } else {
            debug!(%attempt, latest = %state.latest, "resync result superseded");
        }
    }
}
