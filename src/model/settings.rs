use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr
)]
pub enum HotkeyModifier {
    #[default]
    #[serde(rename = "alt")]
    #[strum(serialize = "alt")]
    Alt,
    #[serde(rename = "ctrl+alt")]
    #[strum(serialize = "ctrl+alt")]
    CtrlAlt,
    #[serde(rename = "ctrl+shift")]
    #[strum(serialize = "ctrl+shift")]
    CtrlShift,
}

impl HotkeyModifier {
    /// Human readable key combination prefix.
    pub fn label(self) -> &'static str {
        match self {
            HotkeyModifier::Alt => "Alt",
            HotkeyModifier::CtrlAlt => "Ctrl + Alt",
            HotkeyModifier::CtrlShift => "Ctrl + Shift",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeySettings {
    pub enabled: bool,
    pub modifier: HotkeyModifier,
}

impl Default for HotkeySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            modifier: HotkeyModifier::Alt,
        }
    }
}

/// The backend-owned preference pair, always written back together.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Preferences {
    pub hotkeys: HotkeySettings,
    pub autostart: bool,
}
