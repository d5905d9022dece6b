//! What the session needs to know about a device family's CLI.

use indexmap::IndexMap;
use regex::bytes::Regex;

use super::privilege_level::PrivilegeLevel;
use crate::channel::any_of;

/// Prompts, modes, error markers and session setup of one device family.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    pub name: String,

    /// Modes keyed by name; earlier entries win when prompts overlap.
    pub privilege_levels: IndexMap<String, PrivilegeLevel>,

    /// Mode the session settles in after login.
    pub default_privilege: String,

    /// Output fragments that mean the device rejected a command.
    pub error_markers: Vec<String>,

    /// Sent once the default mode is reached (paging off and the like).
    pub setup_commands: Vec<String>,
}

impl PlatformDefinition {
    /// A platform with `levels` (in match order) settling in `default`.
    pub fn new(
        name: impl Into<String>,
        levels: impl IntoIterator<Item = PrivilegeLevel>,
        default: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            privilege_levels: levels
                .into_iter()
                .map(|level| (level.name.clone(), level))
                .collect(),
            default_privilege: default.into(),
            error_markers: Vec::new(),
            setup_commands: Vec::new(),
        }
    }

    pub fn get_privilege(&self, name: &str) -> Option<&PrivilegeLevel> {
        self.privilege_levels.get(name)
    }

    /// Mode a fresh login lands in.
    pub fn root_privilege(&self) -> Option<&PrivilegeLevel> {
        self.privilege_levels.values().find(|level| level.parent.is_none())
    }

    /// Regex matching the prompt of any mode.
    pub fn prompt_pattern(&self) -> Result<Regex, regex::Error> {
        any_of(self.privilege_levels.values().map(|level| &level.pattern))
    }

    /// First error marker found in `output`.
    pub fn detect_failure(&self, output: &str) -> Option<&str> {
        self.error_markers
            .iter()
            .map(String::as_str)
            .find(|marker| output.contains(marker))
    }
}
