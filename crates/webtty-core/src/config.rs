//! Server and SSH target configuration.
//!
//! All validation happens here, at startup. Per-session command resolution
//! is infallible once a configuration has passed `validate`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BASE_PATH, DEFAULT_COMMAND, DEFAULT_SSH_PORT};
use crate::error::{Error, Result};

/// Where SSH sessions land when a remote target is configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshTarget {
    /// Remote host. `None` means sessions run the local command.
    pub host: Option<String>,
    /// SSH port.
    pub port: u16,
    /// Remote user; omitted from the target when absent.
    pub user: Option<String>,
    /// Identity file passed as `-i`.
    pub identity_file: Option<PathBuf>,
    /// Value for `-o PreferredAuthentications=`.
    pub preferred_auth: Option<String>,
    /// Disable strict host key checking (testing / ephemeral hosts only).
    pub skip_host_key_check: bool,
}

impl Default for SshTarget {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_SSH_PORT,
            user: None,
            identity_file: None,
            preferred_auth: None,
            skip_host_key_check: false,
        }
    }
}

impl SshTarget {
    /// Validate the target. Called once at startup.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::Config {
                message: "ssh port must be greater than 0".to_string(),
            });
        }
        if let Some(host) = &self.host {
            if host.is_empty() || host.contains(char::is_whitespace) {
                return Err(Error::Config {
                    message: format!("invalid ssh host: {:?}", host),
                });
            }
        }
        if let Some(user) = &self.user {
            if user.is_empty() || user.contains(char::is_whitespace) || user.contains('@') {
                return Err(Error::Config {
                    message: format!("invalid ssh user: {:?}", user),
                });
            }
        }
        Ok(())
    }

    /// `user@host` or bare host, falling back to localhost when no host is
    /// configured but SSH was forced.
    pub fn destination(&self) -> String {
        let host = self.host.as_deref().unwrap_or("localhost");
        match &self.user {
            Some(user) => format!("{}@{}", user, host),
            None => host.to_string(),
        }
    }
}

/// Server-wide options shared by every session.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// HTTP base path; the page, assets, and WebSocket endpoint hang off it.
    pub base_path: String,
    /// Page title for the bootstrap HTML.
    pub title: String,
    /// Render the iframe-friendly variant of the bootstrap page.
    pub allow_iframe: bool,
    /// Signing secret; `None` means open mode.
    pub signing_secret: Option<String>,
    /// Command run when no SSH target and no override apply.
    pub default_command: String,
    /// Explicit override command, wins unless `force_ssh` is set.
    pub override_command: Option<String>,
    /// Always build an SSH invocation, overriding everything else.
    pub force_ssh: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            title: "webtty terminal".to_string(),
            allow_iframe: false,
            signing_secret: None,
            default_command: DEFAULT_COMMAND.to_string(),
            override_command: None,
            force_ssh: false,
        }
    }
}

impl ServerOptions {
    /// Validate the options. Called once at startup.
    pub fn validate(&self) -> Result<()> {
        if !self.base_path.starts_with('/') || self.base_path.ends_with('/') {
            return Err(Error::Config {
                message: format!(
                    "base path must start with '/' and carry no trailing '/': {:?}",
                    self.base_path
                ),
            });
        }
        if self.default_command.trim().is_empty() {
            return Err(Error::Config {
                message: "default command must not be empty".to_string(),
            });
        }
        if let Some(secret) = &self.signing_secret {
            if secret.is_empty() {
                return Err(Error::Config {
                    message: "signing secret must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssh_target_default_is_valid() {
        let target = SshTarget::default();
        assert!(target.validate().is_ok());
        assert_eq!(target.port, 22);
        assert!(target.host.is_none());
    }

    #[test]
    fn ssh_target_destination() {
        let mut target = SshTarget {
            host: Some("example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(target.destination(), "example.com");

        target.user = Some("bob".to_string());
        assert_eq!(target.destination(), "bob@example.com");
    }

    #[test]
    fn ssh_target_destination_falls_back_to_localhost() {
        let target = SshTarget {
            user: Some("bob".to_string()),
            ..Default::default()
        };
        assert_eq!(target.destination(), "bob@localhost");
    }

    #[test]
    fn ssh_target_rejects_bad_values() {
        let target = SshTarget {
            port: 0,
            ..Default::default()
        };
        assert!(target.validate().is_err());

        let target = SshTarget {
            host: Some("two words".to_string()),
            ..Default::default()
        };
        assert!(target.validate().is_err());

        let target = SshTarget {
            user: Some("bob@elsewhere".to_string()),
            ..Default::default()
        };
        assert!(target.validate().is_err());
    }

    #[test]
    fn server_options_default_is_valid() {
        assert!(ServerOptions::default().validate().is_ok());
    }

    #[test]
    fn server_options_rejects_bad_base_path() {
        let options = ServerOptions {
            base_path: "tty".to_string(),
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = ServerOptions {
            base_path: "/tty/".to_string(),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn server_options_rejects_empty_secret() {
        let options = ServerOptions {
            signing_secret: Some(String::new()),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }
}
