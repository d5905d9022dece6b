//! Privilege level tracking and navigation.

use indexmap::IndexMap;
use regex::bytes::Regex;

use crate::error::{Result, SessionError};
use crate::platform::PrivilegeLevel;

/// Tracks which CLI mode the session is in and how to move between modes.
///
/// Levels form a tree through `parent`. A path between two levels
/// climbs from the source to their closest common ancestor and then walks
/// down to the target.
#[derive(Debug)]
pub struct PrivilegeManager {
    /// All defined privilege levels.
    levels: IndexMap<String, PrivilegeLevel>,

    /// Current privilege level name.
    current: Option<String>,
}

impl PrivilegeManager {
    /// Create a new privilege manager; the current level starts unknown.
    pub fn new(levels: IndexMap<String, PrivilegeLevel>) -> Self {
        Self {
            levels,
            current: None,
        }
    }

    /// Determine the privilege level a prompt belongs to.
    pub fn determine_from_prompt(&self, prompt: &str) -> Result<&PrivilegeLevel> {
        self.levels
            .values()
            .find(|level| level.matches(prompt))
            .ok_or_else(|| {
                SessionError::UnknownPrivilege {
                    prompt: prompt.to_string(),
                }
                .into()
            })
    }

    /// Update the current level from a prompt and return its name.
    pub fn update_from_prompt(&mut self, prompt: &str) -> Result<String> {
        let name = self.determine_from_prompt(prompt)?.name.clone();
        self.current = Some(name.clone());
        Ok(name)
    }

    /// Name of the current privilege level, if known.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Forget the current level (after the transport is dropped).
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Chain of level names from `name` up to the root, inclusive.
    fn ancestry(&self, name: &str) -> Result<Vec<String>> {
        let mut chain = Vec::new();
        let mut cursor = Some(name.to_string());

        while let Some(level_name) = cursor {
            let level = self
                .levels
                .get(&level_name)
                .ok_or_else(|| SessionError::UnknownPrivilege {
                    prompt: level_name.clone(),
                })?;
            if chain.contains(&level_name) {
                break;
            }
            cursor = level.parent.clone();
            chain.push(level_name);
        }

        Ok(chain)
    }

    /// Levels to traverse from `from` to `to`, both ends included.
    pub fn find_path(&self, from: &str, to: &str) -> Result<Vec<String>> {
        let up = self.ancestry(from)?;
        let down = self.ancestry(to)?;

        let no_path = || SessionError::NoPrivilegePath {
            from: from.to_string(),
            to: to.to_string(),
        };

        let (up_index, common) = up
            .iter()
            .enumerate()
            .find(|(_, name)| down.contains(name))
            .ok_or_else(no_path)?;
        let down_index = down.iter().position(|name| name == common).ok_or_else(no_path)?;

        let mut path: Vec<String> = up[..=up_index].to_vec();
        path.extend(down[..down_index].iter().rev().cloned());
        Ok(path)
    }

    /// The command (and optional password prompt) to move between two
    /// adjacent levels.
    pub fn transition(&self, from: &str, to: &str) -> Option<Transition> {
        let from_level = self.levels.get(from)?;
        let to_level = self.levels.get(to)?;

        if to_level.parent.as_deref() == Some(from) {
            return Some(Transition {
                command: to_level.enter_command.clone()?,
                auth_prompt: to_level.password_prompt.clone(),
            });
        }

        if from_level.parent.as_deref() == Some(to) {
            return Some(Transition {
                command: from_level.exit_command.clone()?,
                auth_prompt: None,
            });
        }

        None
    }
}

/// A single step between adjacent privilege levels.
#[derive(Debug, Clone)]
pub struct Transition {
    /// Command to send.
    pub command: String,

    /// Password prompt to answer, if the step needs one.
    pub auth_prompt: Option<Regex>,
}
