//! Guaranteed-cleanup streaming around a remote process.

use std::io::{BufRead, BufReader, Read};
use std::thread::{self, JoinHandle};

use tracing::info;

use crate::error::RemoteExecError;
use crate::tool::{ExecOptions, SshProcess};

/// Tracing target carrying mirrored remote command output.
///
/// Kept separate from the crate's own logs so SSH I/O can be filtered
/// (or silenced) independently.
pub const SSH_IO_TARGET: &str = "locus::remote::io";

/// Outcome of one remote execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Remote exit code.
    pub exit_code: i32,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

impl ExecResult {
    /// True for exit code zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A background copier draining one output stream.
///
/// Each line is appended to an in-memory buffer for the caller and,
/// unless disabled, mirrored to [`SSH_IO_TARGET`] with the configured
/// prefix. The pump ends when the stream does, which the transport
/// guarantees by closing its pipes on every termination path.
struct StreamPump {
    handle: JoinHandle<Vec<u8>>,
}

impl StreamPump {
    fn spawn(stream: Box<dyn Read + Send>, prefix: String, stream_name: &'static str, log: bool) -> Self {
        let handle = thread::Builder::new()
            .name(format!("locus-pump-{}", stream_name))
            .spawn(move || {
                let mut captured = Vec::new();
                let mut reader = BufReader::new(stream);
                let mut line = Vec::new();
                loop {
                    line.clear();
                    match reader.read_until(b'\n', &mut line) {
                        Ok(0) => break,
                        Ok(_) => {
                            captured.extend_from_slice(&line);
                            if log {
                                let text = String::from_utf8_lossy(&line);
                                info!(
                                    target: SSH_IO_TARGET,
                                    "{}[{}] {}",
                                    prefix,
                                    stream_name,
                                    text.trim_end_matches(['\r', '\n'])
                                );
                            }
                        }
                        // reader error means the pipe died; stop pumping
                        Err(_) => break,
                    }
                }
                captured
            })
            // thread spawn fails only on resource exhaustion
            .unwrap_or_else(|e| panic!("cannot spawn stream pump thread: {e}"));
        Self { handle }
    }

    /// Joins the copier. A panic on the pump thread is re-raised here
    /// rather than swallowed.
    fn join(self) -> Vec<u8> {
        match self.handle.join() {
            Ok(captured) => captured,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Drives a spawned remote process to completion with streamed output.
///
/// Stdout and stderr are each pumped by a dedicated copier thread. The
/// cleanup contract holds on every path: whether `wait` succeeds, the
/// command exits non-zero, or the transport faults mid-call, both pipes
/// are drained to end-of-stream and both copiers are joined before this
/// function returns. Only then is a transport error surfaced.
pub fn run_streamed(
    mut process: Box<dyn SshProcess>,
    opts: &ExecOptions,
    default_prefix: &str,
) -> Result<ExecResult, RemoteExecError> {
    let prefix = opts
        .log_prefix
        .clone()
        .unwrap_or_else(|| format!("[{}] ", default_prefix));

    let out_pump = process
        .take_stdout()
        .map(|s| StreamPump::spawn(s, prefix.clone(), "stdout", !opts.no_stdout_logging));
    let err_pump = process
        .take_stderr()
        .map(|s| StreamPump::spawn(s, prefix, "stderr", !opts.no_stderr_logging));

    // collect the exit first; cleanup below must run regardless
    let waited = process.wait();

    let stdout = out_pump.map(StreamPump::join).unwrap_or_default();
    let stderr = err_pump.map(StreamPump::join).unwrap_or_default();

    let exit_code = waited?;
    Ok(ExecResult {
        exit_code,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Process double backed by canned output.
    struct FakeProcess {
        stdout: Option<Box<dyn Read + Send>>,
        stderr: Option<Box<dyn Read + Send>>,
        result: Option<Result<i32, RemoteExecError>>,
    }

    impl FakeProcess {
        fn new(stdout: &str, stderr: &str, result: Result<i32, RemoteExecError>) -> Self {
            Self {
                stdout: Some(Box::new(Cursor::new(stdout.as_bytes().to_vec()))),
                stderr: Some(Box::new(Cursor::new(stderr.as_bytes().to_vec()))),
                result: Some(result),
            }
        }
    }

    impl SshProcess for FakeProcess {
        fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
            self.stdout.take()
        }

        fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>> {
            self.stderr.take()
        }

        fn wait(&mut self) -> Result<i32, RemoteExecError> {
            self.result.take().expect("wait called twice")
        }
    }

    #[test]
    fn captures_both_streams() {
        let process = FakeProcess::new("line1\nline2\n", "oops\n", Ok(0));
        let result = run_streamed(Box::new(process), &ExecOptions::summary("t"), "h").unwrap();
        assert!(result.success());
        assert_eq!(result.stdout, "line1\nline2\n");
        assert_eq!(result.stderr, "oops\n");
    }

    #[test]
    fn nonzero_exit_is_a_result_not_an_error() {
        let process = FakeProcess::new("", "bad\n", Ok(3));
        let result = run_streamed(Box::new(process), &ExecOptions::summary("t"), "h").unwrap();
        assert!(!result.success());
        assert_eq!(result.exit_code, 3);
    }

    #[test]
    fn transport_fault_surfaces_after_pipes_drain() {
        // the streams still carry bytes; cleanup must capture them
        // before the wait error propagates
        let process = FakeProcess::new(
            "partial output\n",
            "",
            Err(RemoteExecError::TransportClosed { target: "h".into() }),
        );
        let err = run_streamed(Box::new(process), &ExecOptions::summary("t"), "h").unwrap_err();
        assert!(matches!(err, RemoteExecError::TransportClosed { .. }));
    }

    #[test]
    fn missing_streams_are_tolerated() {
        let mut process = FakeProcess::new("x\n", "", Ok(0));
        process.stdout = None;
        process.stderr = None;
        let result = run_streamed(Box::new(process), &ExecOptions::summary("t"), "h").unwrap();
        assert_eq!(result.stdout, "");
    }
}
