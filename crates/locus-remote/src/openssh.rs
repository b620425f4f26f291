//! SSH transport backed by the system OpenSSH client.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::RemoteExecError;
use crate::tool::{ExecOptions, SshConfig, SshProcess, SshTool};

/// An [`SshTool`] that shells out to `ssh`.
///
/// Connection reuse rides on OpenSSH ControlMaster: `connect`
/// establishes a background master process bound to a private control
/// socket, every exec multiplexes over it, and `close` tears it down.
/// Liveness is `ssh -O check` against the socket.
pub struct OpenSshTool {
    config: SshConfig,
    control_path: PathBuf,
    connected: AtomicBool,
}

impl std::fmt::Debug for OpenSshTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenSshTool")
            .field("target", &self.config.target())
            .field("control_path", &self.control_path)
            .finish()
    }
}

impl OpenSshTool {
    /// Creates a disconnected tool for one target.
    #[must_use]
    pub fn new(config: SshConfig) -> Self {
        let control_path =
            std::env::temp_dir().join(format!("locus-cm-{}.sock", Uuid::new_v4().simple()));
        Self {
            config,
            control_path,
            connected: AtomicBool::new(false),
        }
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.config.ssh_executable);
        cmd.arg("-o")
            .arg(format!("ControlPath={}", self.control_path.display()));
        cmd.arg("-o").arg("BatchMode=yes");
        if self.config.port != 22 {
            cmd.arg("-p").arg(self.config.port.to_string());
        }
        if let Some(key) = &self.config.private_key_file {
            cmd.arg("-i").arg(key);
        }
        for (option, value) in &self.config.extra_options {
            cmd.arg("-o").arg(format!("{}={}", option, value));
        }
        cmd
    }

    fn spawn_remote(
        &self,
        opts: &ExecOptions,
        remote_command: &str,
        stdin_payload: String,
    ) -> Result<Box<dyn SshProcess>, RemoteExecError> {
        let target = self.config.target();
        trace!(target_host = %target, summary = %opts.summary, "spawning remote command");

        let mut child = self
            .base_command()
            .arg(&target)
            .arg(remote_command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RemoteExecError::Spawn {
                program: self.config.ssh_executable.clone(),
                source,
            })?;

        // the payload may exceed the pipe buffer while the remote side
        // is already producing output, so the write must not block this
        // thread before the output pumps are running
        let stdin_writer = child.stdin.take().map(|mut stdin| {
            thread::Builder::new()
                .name("locus-ssh-stdin".to_string())
                // dropping stdin on return sends EOF to the remote shell
                .spawn(move || stdin.write_all(stdin_payload.as_bytes()))
                // thread spawn fails only on resource exhaustion
                .unwrap_or_else(|e| panic!("cannot spawn stdin writer thread: {e}"))
        });

        Ok(Box::new(OpenSshProcess {
            child,
            target,
            stdin_writer,
        }))
    }
}

impl SshTool for OpenSshTool {
    fn connect(&self) -> Result<(), RemoteExecError> {
        let target = self.config.target();
        debug!(target_host = %target, "establishing ssh control master");

        let output = self
            .base_command()
            .args(["-o", "ControlMaster=yes", "-o", "ControlPersist=yes"])
            .args(["-N", "-f"])
            .arg(&target)
            .output()
            .map_err(|source| RemoteExecError::Spawn {
                program: self.config.ssh_executable.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RemoteExecError::Connect {
                target,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        if !self.connected.load(Ordering::SeqCst) {
            return false;
        }
        let alive = self
            .base_command()
            .args(["-O", "check"])
            .arg(self.config.target())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        if !alive {
            self.connected.store(false, Ordering::SeqCst);
        }
        alive
    }

    fn spawn_commands(
        &self,
        opts: &ExecOptions,
        commands: &[String],
    ) -> Result<Box<dyn SshProcess>, RemoteExecError> {
        // each command is a line to an interactive login shell; a
        // failing line does not stop the ones after it
        let mut lines = Vec::with_capacity(opts.env.len() + commands.len());
        for (name, value) in &opts.env {
            lines.push(format!("export {}={}", name, shell_quote(value)));
        }
        lines.extend(commands.iter().cloned());
        let payload = format!("{}\n", lines.join("\n"));
        self.spawn_remote(opts, "bash --login -s", payload)
    }

    fn spawn_script(
        &self,
        opts: &ExecOptions,
        commands: &[String],
    ) -> Result<Box<dyn SshProcess>, RemoteExecError> {
        let script_dir = opts.script_dir.as_deref().unwrap_or("/tmp");
        let script_path = format!("{}/locus-{}.sh", script_dir, Uuid::new_v4().simple());

        let mut body = String::from("#!/usr/bin/env bash\n");
        for (name, value) in &opts.env {
            body.push_str(&format!("export {}={}\n", name, shell_quote(value)));
        }
        for command in commands {
            body.push_str(command);
            body.push('\n');
        }

        // receive the script, run it as one process, clean up, and
        // carry its exit code out
        let runner = format!(
            "cat > {p} && chmod +x {p} && {p}; rc=$?; rm -f {p}; exit $rc",
            p = script_path
        );
        self.spawn_remote(opts, &runner, body)
    }

    fn close(&self) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        debug!(target_host = %self.config.target(), "closing ssh control master");
        let _ = self
            .base_command()
            .args(["-O", "exit"])
            .arg(self.config.target())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }
}

impl Drop for OpenSshTool {
    fn drop(&mut self) {
        self.close();
    }
}

/// A remote command multiplexed over the control master.
struct OpenSshProcess {
    child: Child,
    target: String,
    stdin_writer: Option<JoinHandle<std::io::Result<()>>>,
}

impl SshProcess for OpenSshProcess {
    fn take_stdout(&mut self) -> Option<Box<dyn std::io::Read + Send>> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn std::io::Read + Send>)
    }

    fn take_stderr(&mut self) -> Option<Box<dyn std::io::Read + Send>> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn std::io::Read + Send>)
    }

    fn wait(&mut self) -> Result<i32, RemoteExecError> {
        let status = self.child.wait().map_err(|source| RemoteExecError::Io {
            context: format!("waiting for remote command on {}", self.target),
            source,
        })?;
        // the child has exited, so the writer is done or about to fail
        // fast; a remote that quit without draining its input is not a
        // transport fault
        if let Some(writer) = self.stdin_writer.take() {
            match writer.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(source)) => {
                    return Err(RemoteExecError::Io {
                        context: format!("writing input for remote command on {}", self.target),
                        source,
                    });
                }
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        match status.code() {
            Some(code) => Ok(code),
            // killed by signal: the transport went away under us
            None => Err(RemoteExecError::TransportClosed {
                target: self.target.clone(),
            }),
        }
    }
}

/// Single-quotes a value for the remote shell.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_quote_protects_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn fresh_tool_is_disconnected() {
        let tool = OpenSshTool::new(SshConfig::for_host("nowhere.invalid"));
        assert!(!tool.is_connected());
    }

    #[test]
    fn control_paths_are_unique_per_tool() {
        let a = OpenSshTool::new(SshConfig::for_host("h"));
        let b = OpenSshTool::new(SshConfig::for_host("h"));
        assert_ne!(a.control_path, b.control_path);
    }

    #[test]
    fn remote_exit_without_reading_stdin_is_not_a_fault() {
        use crate::exec::run_streamed;

        // `false` ignores its arguments and exits without ever reading
        // stdin; the writer must neither block the spawn nor turn the
        // resulting broken pipe into an error
        let mut config = SshConfig::for_host("ignored");
        config.ssh_executable = "false".to_string();
        let tool = OpenSshTool::new(config);

        let opts = ExecOptions::summary("stdin backlog");
        let payload = "x".repeat(1 << 20);
        let process = tool.spawn_remote(&opts, "noop", payload).unwrap();
        let result = run_streamed(process, &opts, "h").unwrap();
        assert_eq!(result.exit_code, 1);
    }
}
