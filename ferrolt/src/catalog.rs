//! Declarative command catalog.
//!
//! Each entry pairs a command template with the pattern that must appear
//! before the next command is sent. Templates use named placeholders:
//!
//! ```text
//! interface gpon_olt-1/{slot}/{port}
//! \(config-if-gpon_olt-1/{slot}/{port}\)
//! ```
//!
//! `{{` and `}}` produce literal braces. A `{` not followed by an
//! identifier (as in the regex repetition `\d{1,3}`) is copied verbatim.

use regex::bytes::Regex;
use serde::Deserialize;

use crate::channel::compile_expect;
use crate::error::CatalogError;

/// Name of the entry sent once before the per-port loop.
pub const ENTER_CONFIG: &str = "enter_config_mode";

/// One command of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandSpec {
    /// Catalog key.
    pub name: String,

    /// Command template.
    pub command: String,

    /// Expected-response regex template.
    pub expect: String,
}

impl CommandSpec {
    /// Create a catalog entry.
    pub fn new(name: impl Into<String>, command: impl Into<String>, expect: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            expect: expect.into(),
        }
    }

    /// Substitute `slot` and `port` into both templates.
    pub fn render(&self, slot: u32, port: u32) -> Result<RenderedCommand, CatalogError> {
        let bindings = [("slot", slot), ("port", port)];
        let command = render_template(&self.command, &bindings)?;
        let expect_source = render_template(&self.expect, &bindings)?;
        let expect = compile_expect(&expect_source).map_err(|source| CatalogError::InvalidPattern {
            name: self.name.clone(),
            source,
        })?;

        Ok(RenderedCommand {
            name: self.name.clone(),
            command,
            expect,
        })
    }
}

/// A catalog entry with its placeholders filled in.
#[derive(Debug, Clone)]
pub struct RenderedCommand {
    /// Catalog key.
    pub name: String,

    /// Command line to send.
    pub command: String,

    /// Pattern the device must print before the next command.
    pub expect: Regex,
}

/// Ordered list of [`CommandSpec`]s.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct CommandCatalog {
    entries: Vec<CommandSpec>,
}

impl CommandCatalog {
    /// Build a catalog from entries in execution order.
    pub fn new(entries: Vec<CommandSpec>) -> Self {
        Self { entries }
    }

    /// The ONU reboot catalog for ZTE GPON line cards.
    pub fn onu_reboot() -> Self {
        Self::new(vec![
            CommandSpec::new(ENTER_CONFIG, "configure terminal", r"\(config\)#"),
            CommandSpec::new(
                "interface_config",
                "interface gpon_olt-1/{slot}/{port}",
                r"\(config-if-gpon_olt-1/{slot}/{port}\)",
            ),
            CommandSpec::new(
                "onu_reboot",
                "onu-action omci-reboot",
                r"\(config-if-gpon_olt-1/{slot}/{port}\)",
            ),
            CommandSpec::new("exit_config_mode", "exit", r"\(config\)#"),
        ])
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.entries.iter().find(|spec| spec.name == name)
    }

    /// The global "enter configuration mode" entry.
    pub fn enter_config(&self) -> Result<&CommandSpec, CatalogError> {
        self.get(ENTER_CONFIG).ok_or_else(|| CatalogError::MissingEntry {
            name: ENTER_CONFIG.to_string(),
        })
    }

    /// Entries run for every sub-port, in declared order.
    pub fn per_port(&self) -> impl Iterator<Item = &CommandSpec> {
        self.entries.iter().filter(|spec| spec.name != ENTER_CONFIG)
    }

    /// Number of commands sent per sub-port.
    pub fn per_port_len(&self) -> usize {
        self.per_port().count()
    }

    /// All entries, in declared order.
    pub fn entries(&self) -> &[CommandSpec] {
        &self.entries
    }

    /// Render every entry once so template mistakes surface before a
    /// session is opened.
    pub fn validate(&self) -> Result<(), CatalogError> {
        self.enter_config()?;
        for spec in &self.entries {
            spec.render(1, 1)?;
        }
        Ok(())
    }
}

impl Default for CommandCatalog {
    fn default() -> Self {
        Self::onu_reboot()
    }
}

/// Replace `{name}` placeholders with values from `bindings`.
pub fn render_template(template: &str, bindings: &[(&str, u32)]) -> Result<String, CatalogError> {
    let mut out = String::with_capacity(template.len() + 8);
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }

        if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
            continue;
        }

        let ident_len = tail[1..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(tail.len() - 1);
        let starts_ident = tail[1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');

        if !starts_ident {
            out.push('{');
            rest = &tail[1..];
            continue;
        }

        let name = &tail[1..1 + ident_len];
        if !tail[1 + ident_len..].starts_with('}') {
            return Err(CatalogError::Unterminated {
                template: template.to_string(),
            });
        }

        let value = bindings
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| CatalogError::UnknownPlaceholder {
                name: name.to_string(),
                template: template.to_string(),
            })?;
        out.push_str(&value.to_string());
        rest = &tail[2 + ident_len..];
    }

    out.push_str(rest);
    Ok(out)
}
