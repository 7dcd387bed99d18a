use parking_lot::Mutex;
use tracing::debug;

/// Host window operations. Fire-and-forget: the surface never waits for them
/// and never learns whether they succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ChromeCommand {
    Minimize,
    ToggleMaximize,
    Close,
    Show,
    Hide,
    ShowMainWindow,
    ExitApplication,
}

pub trait WindowChrome: Send + Sync {
    fn dispatch(&self, command: ChromeCommand);
}

/// Keeps every dispatched command; what the demo binary and tests use in
/// place of a real window host.
#[derive(Debug, Default)]
pub struct RecordingChrome {
    commands: Mutex<Vec<ChromeCommand>>,
}

impl RecordingChrome {
    pub fn new() -> Self { Self::default() }

    pub fn commands(&self) -> Vec<ChromeCommand> { self.commands.lock().clone() }
}

impl WindowChrome for RecordingChrome {
    fn dispatch(&self, command: ChromeCommand) {
        debug!(%command, "window chrome");
        self.commands.lock().push(command);
    }
}
