use std::sync::Arc;

use tracing::instrument;

use crate::client::{DesktopRegistry, StatusLine, SwitchController, SwitchOptions, SwitchOutcome};
use crate::gateway::{BackendGateway, ChromeCommand, WindowChrome};
use crate::model::{WorkspaceId, WorkspaceSnapshot};

/// The tray popup. It receives no hotkey pushes, so its list may be stale
/// until the next time it is opened.
pub struct TraySurface<G> {
    registry: DesktopRegistry<G>,
    switcher: SwitchController<G>,
    status: StatusLine,
    chrome: Arc<dyn WindowChrome>,
}

impl<G: BackendGateway> TraySurface<G> {
    pub fn new(gateway: Arc<G>, chrome: Arc<dyn WindowChrome>, options: SwitchOptions) -> Self {
        let registry = DesktopRegistry::new(gateway.clone());
        let status = StatusLine::new();
        let switcher = SwitchController::new(gateway, registry.clone(), status.clone(), options);
        Self { registry, switcher, status, chrome }
    }

    pub fn registry(&self) -> &DesktopRegistry<G> { &self.registry }

    pub fn status(&self) -> &StatusLine { &self.status }

    pub fn snapshot(&self) -> Arc<WorkspaceSnapshot> { self.registry.current() }

    #[instrument(skip(self))]
    pub async fn open(&self) {
        if let Err(err) = self.registry.refresh().await {
            self.status.report(&err);
        }
    }

    pub async fn switch(&self, id: WorkspaceId) -> SwitchOutcome { self.switcher.switch(id).await }

    pub fn show_main(&self) {
        self.chrome.dispatch(ChromeCommand::ShowMainWindow);
        self.chrome.dispatch(ChromeCommand::Hide);
    }

    pub fn exit(&self) { self.chrome.dispatch(ChromeCommand::ExitApplication) }
}
