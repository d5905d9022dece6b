//! CLI modes and how to move between them.

use regex::bytes::Regex;

/// One CLI mode of the device, recognised by its prompt.
///
/// Modes form a tree: every mode but the root names its `parent`, is
/// entered from it with `enter_command` and left with `exit_command`.
#[derive(Debug, Clone)]
pub struct PrivilegeLevel {
    pub name: String,

    /// Prompt of this mode.
    pub pattern: Regex,

    pub parent: Option<String>,
    pub enter_command: Option<String>,
    pub exit_command: Option<String>,

    /// Shown after `enter_command` when the mode is password protected.
    pub password_prompt: Option<Regex>,

    /// A prompt containing any of these belongs to some other mode, even if
    /// `pattern` matches. `ZXAN#` and `ZXAN(config)#` both end in `#`.
    pub excludes: Vec<String>,
}

impl PrivilegeLevel {
    /// The mode a fresh login lands in.
    pub fn root(name: impl Into<String>, prompt: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(prompt)?,
            parent: None,
            enter_command: None,
            exit_command: None,
            password_prompt: None,
            excludes: Vec::new(),
        })
    }

    /// A mode entered from `parent` with `enter` and left with `exit`.
    pub fn child(
        name: impl Into<String>,
        prompt: &str,
        parent: impl Into<String>,
        enter: impl Into<String>,
        exit: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            parent: Some(parent.into()),
            enter_command: Some(enter.into()),
            exit_command: Some(exit.into()),
            ..Self::root(name, prompt)?
        })
    }

    /// Entering this mode asks for a password, announced by `prompt`.
    pub fn password_protected(mut self, prompt: &str) -> Result<Self, regex::Error> {
        self.password_prompt = Some(Regex::new(prompt)?);
        Ok(self)
    }

    pub fn excluding(mut self, fragment: impl Into<String>) -> Self {
        self.excludes.push(fragment.into());
        self
    }

    /// True if `prompt` is this mode's prompt.
    pub fn matches(&self, prompt: &str) -> bool {
        !self.excludes.iter().any(|f| prompt.contains(f.as_str()))
            && self.pattern.is_match(prompt.as_bytes())
    }
}
