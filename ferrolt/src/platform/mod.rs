//! Device platform definitions: prompts, privilege levels, failure strings.

mod definition;
mod privilege_level;
pub mod zte_zxros;

pub use definition::PlatformDefinition;
pub use privilege_level::PrivilegeLevel;
