//! An in-process backend with the same validation rules as the real service.
//!
//! Besides serving the demo binary it lets tests hold activations open, pick
//! the order in which they complete, inject one-shot failures and count the
//! calls each surface makes.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};
use tracing::{debug, info, trace};

use super::{BackendGateway, GatewayError, GatewayResult, HotkeyEvent, HotkeySubscription};
use crate::actor;
use crate::common::config::DEFAULT_MAX_WORKSPACES;
use crate::model::{HotkeySettings, Workspace, WorkspaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    List,
    Create,
    Delete,
    Activate,
    Restore,
    GetHotkeys,
    SetHotkeys,
    GetAutostart,
    SetAutostart,
}

#[derive(Debug, Clone)]
struct Record {
    id: WorkspaceId,
    name: String,
    path: String,
    file_count: u32,
}

#[derive(Debug)]
struct State {
    workspaces: Vec<Record>,
    active: Option<WorkspaceId>,
    next_id: u64,
    max_workspaces: usize,
    hotkeys: HotkeySettings,
    autostart: bool,
    activation_in_flight: bool,
    serialize_activations: bool,
    hold_activations: bool,
    held: Vec<(WorkspaceId, oneshot::Sender<()>)>,
    failures: HashMap<Operation, VecDeque<GatewayError>>,
    raw_lists: VecDeque<Vec<Workspace>>,
    calls: HashMap<Operation, usize>,
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    senders: Vec<(u64, actor::Sender<HotkeyEvent>)>,
}

pub struct InMemoryBackend {
    state: Mutex<State>,
    subscribers: Arc<Mutex<Subscribers>>,
    held_changed: Notify,
}

impl Default for InMemoryBackend {
    fn default() -> Self { Self::new() }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                workspaces: Vec::new(),
                active: None,
                next_id: 1,
                max_workspaces: DEFAULT_MAX_WORKSPACES,
                hotkeys: HotkeySettings::default(),
                autostart: false,
                activation_in_flight: false,
                serialize_activations: true,
                hold_activations: false,
                held: Vec::new(),
                failures: HashMap::new(),
                raw_lists: VecDeque::new(),
                calls: HashMap::new(),
            }),
            subscribers: Arc::default(),
            held_changed: Notify::new(),
        }
    }

    /// A backend pre-populated with `count` inactive workspaces, ids `1..=count`.
    pub fn with_workspaces(count: usize) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.state.lock();
            for _ in 0..count {
                state.push_workspace();
            }
        }
        backend
    }

    pub fn set_max_workspaces(&self, max: usize) { self.state.lock().max_workspaces = max; }

    pub fn set_active(&self, id: Option<WorkspaceId>) { self.state.lock().active = id; }

    pub fn active(&self) -> Option<WorkspaceId> { self.state.lock().active }

    pub fn set_file_count(&self, id: WorkspaceId, file_count: u32) {
        let mut state = self.state.lock();
        if let Some(record) = state.workspaces.iter_mut().find(|r| r.id == id) {
            record.file_count = file_count;
        }
    }

    pub fn workspace_count(&self) -> usize { self.state.lock().workspaces.len() }

    /// Makes the next call of `operation` fail with `error`. Queued failures
    /// are consumed in order, one per call.
    pub fn fail_next(&self, operation: Operation, error: GatewayError) {
        self.state.lock().failures.entry(operation).or_default().push_back(error);
    }

    /// Makes the next `list_workspaces` return `workspaces` verbatim,
    /// bypassing the backend's own bookkeeping.
    pub fn respond_next_list(&self, workspaces: Vec<Workspace>) {
        self.state.lock().raw_lists.push_back(workspaces);
    }

    pub fn calls(&self, operation: Operation) -> usize {
        self.state.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Activations wait for [`Self::release_activation`] before completing.
    pub fn hold_activations(&self) { self.state.lock().hold_activations = true; }

    /// Lets several activations run at once instead of answering `AlreadyBusy`.
    pub fn allow_concurrent_activations(&self) {
        self.state.lock().serialize_activations = false;
    }

    pub fn held_activations(&self) -> usize { self.state.lock().held.len() }

    pub async fn wait_for_held(&self, count: usize) {
        loop {
            let notified = self.held_changed.notified();
            if self.held_activations() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Completes the oldest held activation targeting `id`.
    pub fn release_activation(&self, id: WorkspaceId) -> bool {
        let tx = {
            let mut state = self.state.lock();
            let Some(pos) = state.held.iter().position(|(target, _)| *target == id) else {
                return false;
            };
            state.held.remove(pos).1
        };
        tx.send(()).is_ok()
    }

    /// Simulates the OS-level hotkey hook firing. Returns how many
    /// subscribers the event was delivered to.
    pub fn press_hotkey(&self, index: u32) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.senders.retain(|(_, tx)| !tx.is_closed());
        let mut delivered = 0;
        for (_, tx) in &subscribers.senders {
            if tx.try_send(HotkeyEvent { index }).is_ok() {
                delivered += 1;
            }
        }
        debug!(index, delivered, "hotkey pressed");
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.senders.retain(|(_, tx)| !tx.is_closed());
        subscribers.senders.len()
    }

    fn enter(&self, operation: Operation) -> GatewayResult<()> {
        let mut state = self.state.lock();
        *state.calls.entry(operation).or_default() += 1;
        trace!(%operation, "backend call");
        state.take_failure(operation)
    }

    async fn finish_activation(&self, id: WorkspaceId) -> GatewayResult<()> {
        let (slot, held) = {
            let mut state = self.state.lock();
            if !state.workspaces.iter().any(|r| r.id == id) {
                return Err(GatewayError::NotFound(id));
            }
            if state.serialize_activations && state.activation_in_flight {
                return Err(GatewayError::AlreadyBusy);
            }
            state.activation_in_flight = true;
            let held = if state.hold_activations {
                let (tx, rx) = oneshot::channel();
                state.held.push((id, tx));
                Some(rx)
            } else {
                None
            };
            (ActivationSlot(Some(&self.state)), held)
        };

        if let Some(rx) = held {
            self.held_changed.notify_waiters();
            // A dropped sender means the backend itself went away.
            if rx.await.is_err() {
                return Err(GatewayError::TransportFailure("backend shut down".into()));
            }
        }

        let mut state = self.state.lock();
        slot.release(&mut state);
        state.take_failure(Operation::Activate)?;
        if !state.workspaces.iter().any(|r| r.id == id) {
            return Err(GatewayError::NotFound(id));
        }
        state.active = Some(id);
        info!(%id, "workspace activated");
        Ok(())
    }
}

/// Frees the activation slot when the request ends, including when the
/// calling task is dropped while the activation is held.
struct ActivationSlot<'a>(Option<&'a Mutex<State>>);

impl ActivationSlot<'_> {
    fn release(mut self, state: &mut State) {
        state.activation_in_flight = false;
        self.0 = None;
    }
}

impl Drop for ActivationSlot<'_> {
    fn drop(&mut self) {
        if let Some(state) = self.0 {
            state.lock().activation_in_flight = false;
        }
    }
}

impl State {
    fn push_workspace(&mut self) -> WorkspaceId {
        let id = WorkspaceId::new(self.next_id);
        self.next_id += 1;
        self.workspaces.push(Record {
            id,
            name: format!("Desktop {id}"),
            path: format!("workspaces/Desktop{id}"),
            file_count: 0,
        });
        id
    }

    fn take_failure(&mut self, operation: Operation) -> GatewayResult<()> {
        match self.failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn list(&self) -> Vec<Workspace> {
        self.workspaces
            .iter()
            .map(|r| Workspace {
                id: r.id,
                name: r.name.clone(),
                path: r.path.clone(),
                is_active: self.active == Some(r.id),
                file_count: r.file_count,
            })
            .collect()
    }
}

impl BackendGateway for InMemoryBackend {
    async fn list_workspaces(&self) -> GatewayResult<Vec<Workspace>> {
        self.enter(Operation::List)?;
        let mut state = self.state.lock();
        if let Some(raw) = state.raw_lists.pop_front() {
            return Ok(raw);
        }
        Ok(state.list())
    }

    async fn create_workspace(&self) -> GatewayResult<()> {
        self.enter(Operation::Create)?;
        let mut state = self.state.lock();
        if state.workspaces.len() >= state.max_workspaces {
            return Err(GatewayError::WorkspaceLimit { max: state.max_workspaces });
        }
        let id = state.push_workspace();
        info!(%id, "workspace created");
        Ok(())
    }

    async fn delete_workspace(&self, id: WorkspaceId) -> GatewayResult<()> {
        self.enter(Operation::Delete)?;
        let mut state = self.state.lock();
        let Some(pos) = state.workspaces.iter().position(|r| r.id == id) else {
            return Err(GatewayError::NotFound(id));
        };
        if state.workspaces.len() <= 1 {
            return Err(GatewayError::LastWorkspace);
        }
        if state.active == Some(id) {
            return Err(GatewayError::ActiveWorkspace);
        }
        state.workspaces.remove(pos);
        info!(%id, "workspace deleted");
        Ok(())
    }

    async fn activate_workspace(&self, id: WorkspaceId) -> GatewayResult<()> {
        {
            let mut state = self.state.lock();
            *state.calls.entry(Operation::Activate).or_default() += 1;
        }
        self.finish_activation(id).await
    }

    async fn restore_original_state(&self) -> GatewayResult<()> {
        self.enter(Operation::Restore)?;
        self.state.lock().active = None;
        info!("restored original desktop");
        Ok(())
    }

    async fn get_hotkey_settings(&self) -> GatewayResult<HotkeySettings> {
        self.enter(Operation::GetHotkeys)?;
        Ok(self.state.lock().hotkeys)
    }

    async fn set_hotkey_settings(&self, settings: HotkeySettings) -> GatewayResult<()> {
        self.enter(Operation::SetHotkeys)?;
        self.state.lock().hotkeys = settings;
        Ok(())
    }

    async fn get_autostart(&self) -> GatewayResult<bool> {
        self.enter(Operation::GetAutostart)?;
        Ok(self.state.lock().autostart)
    }

    async fn set_autostart(&self, enabled: bool) -> GatewayResult<()> {
        self.enter(Operation::SetAutostart)?;
        self.state.lock().autostart = enabled;
        Ok(())
    }

    fn subscribe_hotkeys(&self) -> HotkeySubscription {
        let (tx, rx) = actor::channel();
        let id = {
            let mut subscribers = self.subscribers.lock();
            let id = subscribers.next_id;
            subscribers.next_id += 1;
            subscribers.senders.push((id, tx));
            id
        };
        debug!(subscriber = id, "hotkey subscription acquired");
        let subscribers = Arc::downgrade(&self.subscribers);
        HotkeySubscription::new(rx, move || {
            if let Some(subscribers) = subscribers.upgrade() {
                subscribers.lock().senders.retain(|(sid, _)| *sid != id);
                debug!(subscriber = id, "hotkey subscription released");
            }
        })
    }
}
