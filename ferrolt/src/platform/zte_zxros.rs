//! ZTE ZXROS / ZXAN OLT platform definition.
//!
//! # Prompt Examples
//!
//! ```text
//! ZXAN>                               # exec
//! ZXAN#                               # privilege_exec
//! ZXAN(config)#                       # configuration
//! ZXAN(config-if-gpon_olt-1/3/1)#     # configuration (interface)
//! ```
//!
//! # Privilege Graph
//!
//! ```text
//! ┌──────┐  enable     ┌────────────────┐  configure terminal  ┌───────────────┐
//! │ exec ├─────────────► privilege_exec ├──────────────────────► configuration │
//! │  >   │  disable    │       #        │        end           │  (config*)#   │
//! └──────┘◄────────────┴────────────────┘◄─────────────────────┴───────────────┘
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Platform name used in configuration.
pub const NAME: &str = "zte_zxros";

/// Create the ZTE ZXROS platform definition.
pub fn platform() -> Result<PlatformDefinition, regex::Error> {
    let exec = PrivilegeLevel::root("exec", r"(?m)^[\w.\-@/: ]{1,63}>\s*$")?;

    let privilege_exec = PrivilegeLevel::child(
        "privilege_exec",
        r"(?m)^[\w.\-@/: ]{1,63}#\s*$",
        "exec",
        "enable",
        "disable",
    )?
    .password_protected(r"(?mi)^password:\s*$")?
    .excluding("(config");

    let configuration = PrivilegeLevel::child(
        "configuration",
        r"(?m)^[\w.\-@/: ]{1,63}\(config[\w.\-@/:+]{0,63}\)#\s*$",
        "privilege_exec",
        "configure terminal",
        "end",
    )?;

    let mut platform = PlatformDefinition::new(
        NAME,
        [exec, privilege_exec, configuration],
        "privilege_exec",
    );
    platform.error_markers = ["%Error", "% Error", "%Code", "% Invalid input", "Invalid command"]
        .map(String::from)
        .to_vec();
    platform.setup_commands = vec!["terminal length 0".to_string()];

    Ok(platform)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zte_platform() {
        let platform = platform().unwrap();
        assert_eq!(platform.name, "zte_zxros");
        assert_eq!(platform.default_privilege, "privilege_exec");
        let names: Vec<_> = platform.privilege_levels.keys().cloned().collect();
        assert_eq!(names, vec!["exec", "privilege_exec", "configuration"]);
    }

    #[test]
    fn test_prompts_resolve_to_one_level() {
        let platform = platform().unwrap();
        let exec = platform.get_privilege("exec").unwrap();
        let priv_exec = platform.get_privilege("privilege_exec").unwrap();
        let config = platform.get_privilege("configuration").unwrap();

        assert!(exec.matches("ZXAN>"));
        assert!(!exec.matches("ZXAN#"));

        assert!(priv_exec.matches("ZXAN#"));
        assert!(priv_exec.matches("OLT-CENTRO# "));
        assert!(!priv_exec.matches("ZXAN(config)#"));

        assert!(config.matches("ZXAN(config)#"));
        assert!(config.matches("ZXAN(config-if-gpon_olt-1/3/1)#"));
        assert!(!config.matches("ZXAN#"));
    }

    #[test]
    fn test_password_prompt() {
        let platform = platform().unwrap();
        let priv_exec = platform.get_privilege("privilege_exec").unwrap();
        let auth = priv_exec.password_prompt.as_ref().unwrap();
        assert!(auth.is_match(b"enable\r\nPassword:"));
        assert!(auth.is_match(b"password: "));
    }

    #[test]
    fn test_combined_prompt_pattern_matches_every_mode() {
        let platform = platform().unwrap();
        let prompt = platform.prompt_pattern().unwrap();
        assert!(prompt.is_match(b"show card\r\n...\r\nZXAN(config)#"));
        assert!(prompt.is_match(b"ZXAN>"));
        assert!(prompt.is_match(b"ZXAN#"));
        assert!(!prompt.is_match(b"Password:"));
    }

    #[test]
    fn test_failure_detection() {
        let platform = platform().unwrap();
        assert_eq!(
            platform.detect_failure("onu-action omci-reboot\r\n%Error 20215: No ONU"),
            Some("%Error")
        );
        assert_eq!(platform.detect_failure("ZXAN(config)#"), None);
    }
}
