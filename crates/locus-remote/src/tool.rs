//! The SSH transport abstraction.
//!
//! [`SshTool`] is the seam between the channel and the wire: the
//! production implementation shells out to the system OpenSSH client
//! ([`OpenSshTool`](crate::OpenSshTool)), and tests substitute doubles
//! that fail or misbehave on cue.

use std::collections::BTreeMap;
use std::io::Read;

use crate::error::RemoteExecError;

/// Connection parameters for one SSH target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshConfig {
    /// Hostname or IP of the target machine.
    pub host: String,
    /// Login user; the transport's own default applies when absent.
    pub user: Option<String>,
    /// SSH port, 22 by default.
    pub port: u16,
    /// Private key file passed to the transport.
    pub private_key_file: Option<String>,
    /// Executable used as the ssh client.
    pub ssh_executable: String,
    /// Extra transport options (`-o` style), in insertion-sorted order.
    pub extra_options: BTreeMap<String, String>,
}

impl SshConfig {
    /// Config for a host with transport defaults.
    #[must_use]
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: None,
            port: 22,
            private_key_file: None,
            ssh_executable: "ssh".to_string(),
            extra_options: BTreeMap::new(),
        }
    }

    /// The `user@host` form used in messages and as the ssh target.
    #[must_use]
    pub fn target(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }

    /// Applies per-call transport overrides on top of this config.
    ///
    /// Recognized override keys: `user`, `port`, `privateKeyFile`;
    /// anything else becomes an extra transport option.
    #[must_use]
    pub fn with_overrides(&self, overrides: &BTreeMap<String, String>) -> Self {
        let mut merged = self.clone();
        for (key, value) in overrides {
            match key.as_str() {
                "user" => merged.user = Some(value.clone()),
                "port" => {
                    if let Ok(port) = value.parse() {
                        merged.port = port;
                    }
                }
                "privateKeyFile" => merged.private_key_file = Some(value.clone()),
                _ => {
                    merged.extra_options.insert(key.clone(), value.clone());
                }
            }
        }
        merged
    }
}

/// Per-call execution options.
///
/// The output-plumbing fields (`no_stdout_logging`, `no_stderr_logging`,
/// `log_prefix`, `script_dir`) are compatible with pooled connections.
/// `transport` overrides and `close_connection` affect the transport
/// itself and force a dedicated, one-shot connection.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Human-readable label used purely for tracing.
    pub summary: String,
    /// Environment exported to the remote shell.
    pub env: BTreeMap<String, String>,
    /// Disable mirroring of stdout to the SSH I/O log target.
    pub no_stdout_logging: bool,
    /// Disable mirroring of stderr to the SSH I/O log target.
    pub no_stderr_logging: bool,
    /// Prefix for mirrored output lines; defaults to the target.
    pub log_prefix: Option<String>,
    /// Remote directory for script-mode files.
    pub script_dir: Option<String>,
    /// Tear the connection down after this one call.
    pub close_connection: bool,
    /// Authentication/transport overrides for this call only.
    pub transport: BTreeMap<String, String>,
}

impl ExecOptions {
    /// Options with just a tracing summary.
    #[must_use]
    pub fn summary(label: impl Into<String>) -> Self {
        Self {
            summary: label.into(),
            ..Self::default()
        }
    }

    /// True when this call cannot reuse a pooled handle.
    #[must_use]
    pub fn needs_dedicated_connection(&self) -> bool {
        self.close_connection || !self.transport.is_empty()
    }
}

/// A running remote command: its output streams and exit status.
pub trait SshProcess: Send {
    /// Takes the stdout pipe. Yields `None` on second call.
    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>>;

    /// Takes the stderr pipe. Yields `None` on second call.
    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>>;

    /// Blocks until the command finishes and returns its exit code.
    fn wait(&mut self) -> Result<i32, RemoteExecError>;
}

/// One SSH transport handle to one target.
///
/// Implementations use interior mutability; the pool hands a handle to
/// exactly one caller at a time.
pub trait SshTool: Send + Sync {
    /// Establishes (or re-establishes) the connection.
    fn connect(&self) -> Result<(), RemoteExecError>;

    /// Liveness check; a pooled handle is reused only while this holds.
    fn is_connected(&self) -> bool;

    /// Runs commands by feeding each string as a line to an interactive
    /// login shell. No automatic fail-fast: callers wanting that embed
    /// `|| exit 1` themselves.
    fn spawn_commands(
        &self,
        opts: &ExecOptions,
        commands: &[String],
    ) -> Result<Box<dyn SshProcess>, RemoteExecError>;

    /// Runs commands by serializing them to a remote script file and
    /// executing it as one process. Heavier, but avoids shell-parsing
    /// quirks.
    fn spawn_script(
        &self,
        opts: &ExecOptions,
        commands: &[String],
    ) -> Result<Box<dyn SshProcess>, RemoteExecError>;

    /// Tears the connection down. Idempotent.
    fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_includes_user_when_present() {
        let mut config = SshConfig::for_host("db1");
        assert_eq!(config.target(), "db1");
        config.user = Some("admin".into());
        assert_eq!(config.target(), "admin@db1");
    }

    #[test]
    fn overrides_split_into_typed_fields_and_extras() {
        let base = SshConfig::for_host("db1");
        let mut overrides = BTreeMap::new();
        overrides.insert("user".to_string(), "root".to_string());
        overrides.insert("port".to_string(), "2222".to_string());
        overrides.insert("StrictHostKeyChecking".to_string(), "no".to_string());

        let merged = base.with_overrides(&overrides);
        assert_eq!(merged.user.as_deref(), Some("root"));
        assert_eq!(merged.port, 2222);
        assert_eq!(merged.extra_options["StrictHostKeyChecking"], "no");
        // base untouched
        assert_eq!(base.port, 22);
    }

    #[test]
    fn plumbing_options_reuse_pooled_handles() {
        let mut opts = ExecOptions::summary("install");
        opts.no_stdout_logging = true;
        opts.log_prefix = Some("[db1] ".into());
        opts.script_dir = Some("/tmp".into());
        assert!(!opts.needs_dedicated_connection());

        opts.transport.insert("user".into(), "other".into());
        assert!(opts.needs_dedicated_connection());

        let mut close_only = ExecOptions::summary("once");
        close_only.close_connection = true;
        assert!(close_only.needs_dedicated_connection());
    }
}
