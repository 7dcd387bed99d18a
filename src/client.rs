//! Per-surface client state: the workspace cache, the switch state machine,
//! the settings draft and the surface's single status message.

pub mod error;
pub mod registry;
pub mod settings;
pub mod status;
pub mod switch;

pub use error::ClientError;
pub use registry::DesktopRegistry;
pub use settings::SettingsController;
pub use status::StatusLine;
pub use switch::{SwitchController, SwitchOptions, SwitchOutcome, SwitchPhase};
