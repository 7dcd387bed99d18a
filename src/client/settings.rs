use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::{ClientError, StatusLine};
use crate::gateway::BackendGateway;
use crate::model::Preferences;

/// Load-edit-save wrapper around the hotkey and autostart preferences.
///
/// There is no optimistic behaviour here: the draft is local until `save`
/// succeeds. Two surfaces saving at once race and the last write wins.
pub struct SettingsController<G> {
    gateway: Arc<G>,
    status: StatusLine,
    loaded: Option<Preferences>,
    draft: Option<Preferences>,
    saving: bool,
}

impl<G: BackendGateway> SettingsController<G> {
    pub fn new(gateway: Arc<G>, status: StatusLine) -> Self {
        Self {
            gateway,
            status,
            loaded: None,
            draft: None,
            saving: false,
        }
    }

    pub fn is_open(&self) -> bool { self.draft.is_some() }

    pub fn is_saving(&self) -> bool { self.saving }

    pub fn draft(&self) -> Option<&Preferences> { self.draft.as_ref() }

    pub fn draft_mut(&mut self) -> Option<&mut Preferences> { self.draft.as_mut() }

    /// Loads both preferences into a fresh draft. If loading fails the draft
    /// starts from defaults and the error is surfaced.
    #[instrument(skip(self))]
    pub async fn open(&mut self) -> Result<&mut Preferences, ClientError> {
        match self.load().await {
            Ok(prefs) => {
                self.loaded = Some(prefs);
                Ok(self.draft.insert(prefs))
            }
            Err(err) => {
                self.status.report(&err);
                self.loaded = None;
                self.draft = Some(Preferences::default());
                Err(err)
            }
        }
    }

    async fn load(&self) -> Result<Preferences, ClientError> {
        let hotkeys = self.gateway.get_hotkey_settings().await?;
        let autostart = self.gateway.get_autostart().await?;
        Ok(Preferences { hotkeys, autostart })
    }

    /// Writes the draft back as a pair and closes it. On failure the draft
    /// stays open for another attempt.
    #[instrument(skip(self))]
    pub async fn save(&mut self) -> Result<(), ClientError> {
        let Some(draft) = self.draft else {
            return Ok(());
        };
        self.saving = true;
        let result = self.write(draft).await;
        self.saving = false;

        match result {
            Ok(()) => {
                info!(?draft, "settings saved");
                self.status.clear();
                self.loaded = None;
                self.draft = None;
                Ok(())
            }
            Err(err) => {
                self.status.report(&err);
                Err(err)
            }
        }
    }

    pub fn cancel(&mut self) {
        self.loaded = None;
        self.draft = None;
    }

    async fn write(&self, draft: Preferences) -> Result<(), ClientError> {
        // Without a successful load there is nothing to put back; read it now.
        let baseline = match self.loaded {
            Some(loaded) => loaded.hotkeys,
            None => self.gateway.get_hotkey_settings().await?,
        };
        self.gateway.set_hotkey_settings(draft.hotkeys).await?;
        let Err(err) = self.gateway.set_autostart(draft.autostart).await else {
            return Ok(());
        };
        // Put the first half back so a failed save leaves the backend as it was.
        if baseline != draft.hotkeys
            && let Err(undo) = self.gateway.set_hotkey_settings(baseline).await
        {
            warn!(%undo, "could not restore hotkey settings after failed save");
        }
        Err(err.into())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::gateway::{GatewayError, InMemoryBackend, Operation};
    use crate::model::{HotkeyModifier, HotkeySettings};

    fn controller(backend: &Arc<InMemoryBackend>) -> (SettingsController<InMemoryBackend>, StatusLine) {
        let status = StatusLine::new();
        (SettingsController::new(backend.clone(), status.clone()), status)
    }

    #[tokio::test]
    async fn save_then_reload_returns_same_pair() {
        let backend = Arc::new(InMemoryBackend::new());
        let (mut settings, _status) = controller(&backend);

        let draft = settings.open().await.unwrap();
        draft.hotkeys = HotkeySettings {
            enabled: false,
            modifier: HotkeyModifier::CtrlAlt,
        };
        settings.save().await.unwrap();
        assert!(!settings.is_open());

        let reloaded = *settings.open().await.unwrap();
        assert_eq!(
            Preferences {
                hotkeys: HotkeySettings {
                    enabled: false,
                    modifier: HotkeyModifier::CtrlAlt,
                },
                autostart: false,
            },
            reloaded
        );
        assert_eq!(1, backend.calls(Operation::SetHotkeys));
        assert_eq!(1, backend.calls(Operation::SetAutostart));
    }

    #[tokio::test]
    async fn cancel_discards_draft() {
        let backend = Arc::new(InMemoryBackend::new());
        let (mut settings, _status) = controller(&backend);

        settings.open().await.unwrap().autostart = true;
        settings.cancel();
        settings.save().await.unwrap();

        assert_eq!(Ok(false), backend.get_autostart().await);
        assert_eq!(0, backend.calls(Operation::SetAutostart));
    }

    #[tokio::test]
    async fn failed_save_leaves_backend_and_keeps_draft() {
        let backend = Arc::new(InMemoryBackend::new());
        let (mut settings, status) = controller(&backend);

        let draft = settings.open().await.unwrap();
        draft.hotkeys.modifier = HotkeyModifier::CtrlShift;
        draft.autostart = true;
        backend.fail_next(Operation::SetAutostart, GatewayError::TransportFailure("registry".into()));

        let err = settings.save().await.unwrap_err();

        assert_eq!(ClientError::Gateway(GatewayError::TransportFailure("registry".into())), err);
        assert_eq!(Ok(HotkeySettings::default()), backend.get_hotkey_settings().await);
        assert_eq!(Ok(false), backend.get_autostart().await);
        assert_eq!(Some(err.to_string()), status.message());
        assert!(!settings.is_saving());
        assert_eq!(Some(HotkeyModifier::CtrlShift), settings.draft().map(|d| d.hotkeys.modifier));

        settings.save().await.unwrap();
        assert_eq!(Ok(true), backend.get_autostart().await);
        assert_eq!(None, status.message());
    }

    #[tokio::test]
    async fn failed_save_after_failed_load_leaves_backend() {
        let backend = Arc::new(InMemoryBackend::new());
        let stored = HotkeySettings {
            enabled: false,
            modifier: HotkeyModifier::CtrlShift,
        };
        backend.set_hotkey_settings(stored).await.unwrap();
        let (mut settings, _status) = controller(&backend);
        backend.fail_next(Operation::GetHotkeys, GatewayError::TransportFailure("down".into()));
        assert!(settings.open().await.is_err());

        settings.draft_mut().unwrap().autostart = true;
        backend.fail_next(Operation::SetAutostart, GatewayError::TransportFailure("registry".into()));
        settings.save().await.unwrap_err();

        assert_eq!(Ok(stored), backend.get_hotkey_settings().await);
        assert_eq!(Ok(false), backend.get_autostart().await);
        assert!(settings.is_open());
    }

    #[tokio::test]
    async fn save_refused_when_baseline_unreadable() {
        let backend = Arc::new(InMemoryBackend::new());
        let (mut settings, _status) = controller(&backend);
        backend.fail_next(Operation::GetHotkeys, GatewayError::TransportFailure("down".into()));
        assert!(settings.open().await.is_err());

        settings.draft_mut().unwrap().hotkeys.enabled = false;
        backend.fail_next(Operation::GetHotkeys, GatewayError::TransportFailure("down".into()));
        assert_eq!(
            Err(ClientError::Gateway(GatewayError::TransportFailure("down".into()))),
            settings.save().await
        );
        assert_eq!(0, backend.calls(Operation::SetHotkeys));
        assert_eq!(Ok(HotkeySettings::default()), backend.get_hotkey_settings().await);
    }

    #[tokio::test]
    async fn load_failure_falls_back_to_defaults() {
        let backend = Arc::new(InMemoryBackend::new());
        let (mut settings, status) = controller(&backend);
        backend.fail_next(Operation::GetAutostart, GatewayError::TransportFailure("down".into()));

        assert!(settings.open().await.is_err());
        assert_eq!(Some(&Preferences::default()), settings.draft());
        assert!(status.message().is_some());
    }
}
