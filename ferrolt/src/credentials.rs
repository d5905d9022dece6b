//! Device credentials collected from the operator.

use secrecy::{ExposeSecret, SecretString};

use crate::transport::SshConfig;

/// Address and secrets for one device.
///
/// Created once from operator input; the password fields are replaced when
/// the operator is asked again after a failed login or escalation.
#[derive(Debug, Clone)]
pub struct Credentials {
    address: String,
    username: String,
    password: SecretString,
    secret: SecretString,
}

impl Credentials {
    /// Bundle the four credential fields.
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
        secret: SecretString,
    ) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            password,
            secret,
        }
    }

    /// Device address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Login username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Privileged-mode ("enable") secret.
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    /// Name of the first field left empty, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.address.trim().is_empty() {
            Some("IP address")
        } else if self.username.trim().is_empty() {
            Some("Username")
        } else if self.password.expose_secret().is_empty() {
            Some("Password")
        } else if self.secret.expose_secret().is_empty() {
            Some("Secret password")
        } else {
            None
        }
    }

    /// True when every field has a value.
    pub fn is_complete(&self) -> bool {
        self.missing_field().is_none()
    }

    /// Replace the privileged secret after a failed escalation.
    pub fn replace_secret(&mut self, secret: SecretString) {
        self.secret = secret;
    }

    /// Replace username and password after a rejected login.
    pub fn replace_login(&mut self, username: impl Into<String>, password: SecretString) {
        self.username = username.into();
        self.password = password;
    }

    /// SSH settings for this device on top of `base` (port, timeouts).
    pub fn ssh_config(&self, base: &SshConfig) -> SshConfig {
        SshConfig {
            host: self.address.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            ..base.clone()
        }
    }
}
