//! Command resolution for a session.
//!
//! Decides what a session executes: an SSH invocation towards the
//! configured target, an explicit override command, or the default local
//! command. Pure and infallible; configuration is validated at startup.

use crate::config::SshTarget;

/// Resolved program plus ordered argument list. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a command line on whitespace into program and arguments.
    /// Empty input falls back to `sh`.
    pub fn parse(command: &str) -> Self {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts.next().unwrap_or_else(|| "sh".to_string());
        Self {
            program,
            args: parts.collect(),
        }
    }

    /// Display form for logs.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

/// Resolve the command for a session.
///
/// Precedence:
/// 1. `force_ssh` set: always the SSH invocation, even over an override.
/// 2. Explicit override command.
/// 3. SSH host configured: the SSH invocation.
/// 4. The default local command, unchanged.
pub fn resolve(
    ssh: &SshTarget,
    override_command: Option<&str>,
    force_ssh: bool,
    default_command: &str,
) -> CommandSpec {
    if force_ssh {
        return ssh_invocation(ssh);
    }
    if let Some(command) = override_command {
        return CommandSpec::parse(command);
    }
    if ssh.host.is_some() {
        return ssh_invocation(ssh);
    }
    CommandSpec::parse(default_command)
}

/// Build the `ssh` argument vector for the configured target.
fn ssh_invocation(ssh: &SshTarget) -> CommandSpec {
    let mut args = vec!["-p".to_string(), ssh.port.to_string()];

    if let Some(identity) = &ssh.identity_file {
        args.push("-i".to_string());
        args.push(identity.display().to_string());
    }

    if let Some(auth) = &ssh.preferred_auth {
        args.push("-o".to_string());
        args.push(format!("PreferredAuthentications={}", auth));
    }

    if ssh.skip_host_key_check {
        args.push("-o".to_string());
        args.push("StrictHostKeyChecking=no".to_string());
        args.push("-o".to_string());
        args.push("UserKnownHostsFile=/dev/null".to_string());
    }

    args.push(ssh.destination());

    CommandSpec::new("ssh", args)
}

// =============================================================================
// Tests
// =============================================================================
