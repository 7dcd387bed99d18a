use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::client::SwitchOptions;

pub const DEFAULT_MAX_WORKSPACES: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Create is refused locally once this many workspaces exist.
    pub max_workspaces: usize,
    /// Used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub main: SurfaceConfig,
    pub tray: SurfaceConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SurfaceConfig {
    pub refresh_after_commit: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_workspaces: DEFAULT_MAX_WORKSPACES,
            log_filter: "info".to_string(),
            main: SurfaceConfig { refresh_after_commit: false },
            // The tray is short-lived; refetching keeps its file counts honest.
            tray: SurfaceConfig { refresh_after_commit: true },
        }
    }
}

impl SurfaceConfig {
    pub fn switch_options(self) -> SwitchOptions {
        SwitchOptions {
            refresh_after_commit: self.refresh_after_commit,
        }
    }
}

impl ClientConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("workdesk").join("client.toml"))
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> { Ok(toml::from_str(text)?) }

    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io { path: path.to_owned(), source }),
        }
    }

    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml(&self) -> String {
        toml::to_string(self).unwrap_or_else(|err| format!("# unrepresentable config: {err}\n"))
    }
}
