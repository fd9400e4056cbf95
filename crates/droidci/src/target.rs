//! Artifact kinds and device selection.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two packages a step operates on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[value(name = "application")]
    Application,
    #[value(name = "tests")]
    Tests,
}

impl Target {
    /// Build order: the test package compiles against the application.
    pub const ALL: [Target; 2] = [Target::Application, Target::Tests];

    pub fn id(self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Tests => "tests",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Device mode as written in settings files and on the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    #[value(name = "emulator")]
    Emulator,
    #[value(name = "physical")]
    Physical,
}

/// Resolved device-bridge qualifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceSelector {
    /// A named emulator instance, addressed with `-s <id>`.
    Emulator(String),
    /// The single attached USB device, addressed with `-d`.
    Physical,
}

impl DeviceSelector {
    pub fn bridge_args(&self) -> Vec<String> {
        match self {
            Self::Emulator(id) => vec!["-s".to_string(), id.clone()],
            Self::Physical => vec!["-d".to_string()],
        }
    }

    pub fn is_physical(&self) -> bool {
        matches!(self, Self::Physical)
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Emulator(id) => write!(f, "emulator {id}"),
            Self::Physical => f.write_str("physical device"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emulator_selector_args() {
        let sel = DeviceSelector::Emulator("avd1".into());
        assert_eq!(sel.bridge_args(), ["-s", "avd1"]);
        assert!(!sel.is_physical());
    }

    #[test]
    fn test_physical_selector_args() {
        assert_eq!(DeviceSelector::Physical.bridge_args(), ["-d"]);
        assert!(DeviceSelector::Physical.is_physical());
    }

    #[test]
    fn test_build_order_puts_application_first() {
        assert_eq!(Target::ALL, [Target::Application, Target::Tests]);
    }
}
