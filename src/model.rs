pub mod attempt;
pub mod settings;
pub mod workspace;

pub use attempt::AttemptToken;
pub use settings::{HotkeyModifier, HotkeySettings, Preferences};
pub use workspace::{SnapshotError, Workspace, WorkspaceId, WorkspaceSnapshot};
