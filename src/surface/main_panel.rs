use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use crate::actor::{DispatcherHandle, HotkeyDispatcher};
use crate::client::{
    ClientError, DesktopRegistry, SettingsController, StatusLine, SwitchController, SwitchOutcome,
};
use crate::common::config::ClientConfig;
use crate::gateway::{BackendGateway, ChromeCommand, GatewayResult, WindowChrome};
use crate::model::{WorkspaceId, WorkspaceSnapshot};

/// The main control panel.
///
/// Every action catches its own error: the message lands on the status line
/// (replacing any earlier one) and is also returned so callers can react.
/// Only this surface subscribes to hotkey pushes.
pub struct MainSurface<G> {
    gateway: Arc<G>,
    chrome: Arc<dyn WindowChrome>,
    max_workspaces: usize,
    registry: DesktopRegistry<G>,
    switcher: SwitchController<G>,
    status: StatusLine,
    busy: Arc<AtomicUsize>,
    dispatcher: Mutex<Option<DispatcherHandle>>,
}

/// Counts one create/delete/restore for as long as it is in flight.
struct Busy(Arc<AtomicUsize>);

impl Busy {
    fn enter(count: &Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::AcqRel);
        Self(count.clone())
    }
}

impl Drop for Busy {
    fn drop(&mut self) { self.0.fetch_sub(1, Ordering::AcqRel); }
}

impl<G: BackendGateway> MainSurface<G> {
    pub fn new(gateway: Arc<G>, chrome: Arc<dyn WindowChrome>, config: &ClientConfig) -> Self {
        let registry = DesktopRegistry::new(gateway.clone());
        let status = StatusLine::new();
        let switcher = SwitchController::new(
            gateway.clone(),
            registry.clone(),
            status.clone(),
            config.main.switch_options(),
        );
        Self {
            gateway,
            chrome,
            max_workspaces: config.max_workspaces,
            registry,
            switcher,
            status,
            busy: Arc::default(),
            dispatcher: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &DesktopRegistry<G> { &self.registry }

    pub fn switcher(&self) -> &SwitchController<G> { &self.switcher }

    pub fn status(&self) -> &StatusLine { &self.status }

    pub fn snapshot(&self) -> Arc<WorkspaceSnapshot> { self.registry.current() }

    /// True while a create, delete or restore is in flight.
    pub fn busy(&self) -> bool { self.busy.load(Ordering::Acquire) > 0 }

    /// Whether the "restore original desktop" action applies.
    pub fn can_restore(&self) -> bool { self.snapshot().has_active() }

    pub fn is_mounted(&self) -> bool { self.dispatcher.lock().is_some() }

    /// Loads the list and starts listening for hotkeys. Must run inside a
    /// tokio runtime.
    #[instrument(skip(self))]
    pub async fn mount(&self) {
        _ = self.refresh().await;
        let mut dispatcher = self.dispatcher.lock();
        if dispatcher.is_none() {
            let subscription = self.gateway.subscribe_hotkeys();
            *dispatcher = Some(
                HotkeyDispatcher::new(self.registry.clone(), self.switcher.clone(), subscription)
                    .spawn(),
            );
            info!("main surface mounted");
        }
    }

    /// Stops hotkey handling; no handler runs once this returns.
    pub async fn teardown(&self) {
        let handle = self.dispatcher.lock().take();
        if let Some(handle) = handle {
            handle.teardown().await;
            info!("main surface torn down");
        }
    }

    pub async fn refresh(&self) -> Result<Arc<WorkspaceSnapshot>, ClientError> {
        self.registry.refresh().await.inspect_err(|err| self.status.report(err))
    }

    pub async fn switch(&self, id: WorkspaceId) -> SwitchOutcome { self.switcher.switch(id).await }

    #[instrument(skip(self))]
    pub async fn create(&self) -> Result<(), ClientError> {
        if self.snapshot().len() >= self.max_workspaces {
            let err = ClientError::WorkspaceLimit { max: self.max_workspaces };
            self.status.report(&err);
            return Err(err);
        }
        self.mutate(self.gateway.create_workspace()).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: WorkspaceId) -> Result<(), ClientError> {
        // Fast path only; the backend still validates.
        if self.snapshot().len() <= 1 {
            let err = ClientError::LastWorkspace;
            self.status.report(&err);
            return Err(err);
        }
        self.mutate(self.gateway.delete_workspace(id)).await
    }

    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<(), ClientError> {
        self.mutate(self.gateway.restore_original_state()).await
    }

    /// A fresh settings form; call `open` on it to load the current values.
    pub fn settings(&self) -> SettingsController<G> {
        SettingsController::new(self.gateway.clone(), self.status.clone())
    }

    pub fn minimize(&self) { self.chrome.dispatch(ChromeCommand::Minimize) }

    pub fn toggle_maximize(&self) { self.chrome.dispatch(ChromeCommand::ToggleMaximize) }

    /// The panel hides instead of closing; the tray keeps the app alive.
    pub fn close(&self) { self.chrome.dispatch(ChromeCommand::Hide) }

    async fn mutate(
        &self,
        request: impl Future<Output = GatewayResult<()>>,
    ) -> Result<(), ClientError> {
        let _busy = Busy::enter(&self.busy);
        self.status.clear();

        if let Err(err) = request.await {
            let err = ClientError::from(err);
            self.status.report(&err);
            // The backend may have partially applied the request.
            _ = self.registry.refresh().await;
            return Err(err);
        }
        debug!("mutation accepted, refetching");
        self.refresh().await.map(drop)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::gateway::{GatewayError, InMemoryBackend, Operation, RecordingChrome};

    fn id(raw: u64) -> WorkspaceId { WorkspaceId::new(raw) }

    fn surface(backend: &Arc<InMemoryBackend>, config: &ClientConfig) -> MainSurface<InMemoryBackend> {
        MainSurface::new(backend.clone(), Arc::new(RecordingChrome::new()), config)
    }

    #[test_log::test(tokio::test)]
    async fn delete_last_is_refused_locally() {
        let backend = Arc::new(InMemoryBackend::with_workspaces(1));
        let main = surface(&backend, &ClientConfig::default());
        main.refresh().await.unwrap();

        assert_eq!(Err(ClientError::LastWorkspace), main.delete(id(1)).await);
        assert_eq!(0, backend.calls(Operation::Delete));
        assert_eq!(Some("cannot delete the last workspace".to_string()), main.status().message());
    }

    #[test_log::test(tokio::test)]
    async fn create_refetches_new_workspace() {
        let backend = Arc::new(InMemoryBackend::with_workspaces(1));
        let main = surface(&backend, &ClientConfig::default());
        main.refresh().await.unwrap();

        main.create().await.unwrap();
        let names: Vec<String> = main.snapshot().iter().map(|ws| ws.name.clone()).collect();
        assert_eq!(vec!["Desktop 1".to_string(), "Desktop 2".to_string()], names);
        assert!(!main.busy());
    }

    #[test_log::test(tokio::test)]
    async fn create_over_limit_is_refused_locally() {
        let backend = Arc::new(InMemoryBackend::with_workspaces(2));
        let config = ClientConfig { max_workspaces: 2, ..ClientConfig::default() };
        let main = surface(&backend, &config);
        main.refresh().await.unwrap();

        assert_eq!(Err(ClientError::WorkspaceLimit { max: 2 }), main.create().await);
        assert_eq!(0, backend.calls(Operation::Create));
    }

    #[test_log::test(tokio::test)]
    async fn backend_error_replaces_previous_message() {
        let backend = Arc::new(InMemoryBackend::with_workspaces(2));
        backend.set_active(Some(id(1)));
        let main = surface(&backend, &ClientConfig::default());
        main.refresh().await.unwrap();

        let err = main.delete(id(1)).await.unwrap_err();
        assert_eq!(ClientError::Gateway(GatewayError::ActiveWorkspace), err);
        assert_eq!(Some(err.to_string()), main.status().message());

        main.delete(id(9)).await.unwrap_err();
        assert_eq!(
            Some(GatewayError::NotFound(id(9)).to_string()),
            main.status().message()
        );
        assert_eq!(2, main.snapshot().len());
    }

    #[test_log::test(tokio::test)]
    async fn restore_clears_active() {
        let backend = Arc::new(InMemoryBackend::with_workspaces(2));
        backend.set_active(Some(id(2)));
        let main = surface(&backend, &ClientConfig::default());
        main.refresh().await.unwrap();
        assert!(main.can_restore());

        main.restore().await.unwrap();
        assert!(!main.can_restore());
        assert_eq!(None, backend.active());
    }

    #[test_log::test(tokio::test)]
    async fn surfaces_converge_only_by_refetching() {
        use crate::surface::TraySurface;

        let backend = Arc::new(InMemoryBackend::with_workspaces(2));
        let main = surface(&backend, &ClientConfig::default());
        let tray = TraySurface::new(
            backend.clone(),
            Arc::new(RecordingChrome::new()),
            ClientConfig::default().tray.switch_options(),
        );
        main.mount().await;
        tray.open().await;

        assert_eq!(SwitchOutcome::Committed, main.switch(id(2)).await);
        assert_eq!(None, tray.snapshot().active_id());

        tray.open().await;
        assert_eq!(Some(id(2)), tray.snapshot().active_id());

        assert_eq!(SwitchOutcome::Committed, tray.switch(id(1)).await);
        assert_eq!(Some(id(2)), main.snapshot().active_id());
        main.refresh().await.unwrap();
        assert_eq!(Some(id(1)), main.snapshot().active_id());

        main.teardown().await;
        assert!(!main.is_mounted());
    }

    #[test_log::test(tokio::test)]
    async fn mounted_surface_follows_hotkeys() {
        let backend = Arc::new(InMemoryBackend::with_workspaces(3));
        let main = surface(&backend, &ClientConfig::default());
        main.mount().await;
        main.mount().await;
        assert_eq!(1, backend.subscriber_count());

        backend.press_hotkey(3);
        for _ in 0..50 {
            if main.snapshot().active_id() == Some(id(3)) && !main.switcher().is_pending() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(Some(id(3)), main.snapshot().active_id());
        assert_eq!(Some(id(3)), backend.active());

        main.teardown().await;
        assert_eq!(0, backend.subscriber_count());
    }

    #[test_log::test(tokio::test)]
    async fn create_during_switch_keeps_target_active() {
        let backend = Arc::new(InMemoryBackend::with_workspaces(2));
        backend.set_active(Some(id(1)));
        let main = Arc::new(surface(&backend, &ClientConfig::default()));
        main.refresh().await.unwrap();
        backend.hold_activations();

        let switching = tokio::spawn({
            let main = main.clone();
            async move { main.switch(id(2)).await }
        });
        backend.wait_for_held(1).await;
        main.create().await.unwrap();
        assert_eq!(3, main.snapshot().len());

        backend.release_activation(id(2));
        assert_eq!(SwitchOutcome::Committed, switching.await.unwrap());
        assert_eq!(Some(id(2)), backend.active());
        assert_eq!(Some(id(2)), main.snapshot().active_id());
        assert_eq!(3, main.snapshot().len());
    }

    #[test]
    fn busy_until_every_mutation_finishes() {
        let main = MainSurface::new(
            Arc::new(InMemoryBackend::new()),
            Arc::new(RecordingChrome::new()),
            &ClientConfig::default(),
        );
        let first = Busy::enter(&main.busy);
        let second = Busy::enter(&main.busy);
        drop(first);
        assert!(main.busy());
        drop(second);
        assert!(!main.busy());
    }

    #[test]
    fn close_hides_window() {
        let chrome = Arc::new(RecordingChrome::new());
        let main = MainSurface::new(
            Arc::new(InMemoryBackend::new()),
            chrome.clone(),
            &ClientConfig::default(),
        );
        main.minimize();
        main.toggle_maximize();
        main.close();
        assert_eq!(
            vec![ChromeCommand::Minimize, ChromeCommand::ToggleMaximize, ChromeCommand::Hide],
            chrome.commands()
        );
    }
}
