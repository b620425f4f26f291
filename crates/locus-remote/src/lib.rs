//! The remote command-execution channel.
//!
//! An [`SshMachineLocation`] is a location that can run commands on an
//! addressable machine over SSH. Each channel owns a pool of reusable
//! transport handles, a string-keyed mutex table for coordinating
//! access to shared remote resources, and the set of TCP ports it has
//! claimed.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  SshMachineLocation (a Location)                               │
//! │                                                                │
//! │  ┌────────────┐  ┌────────────┐  ┌──────────────────────────┐ │
//! │  │ SshToolPool│  │ MutexTable │  │ claimed ports (BTreeSet) │ │
//! │  │ lease /    │  │ acquire /  │  │ obtain / release         │ │
//! │  │ validate / │  │ try /      │  └──────────────────────────┘ │
//! │  │ close      │  │ release    │                               │
//! │  └─────┬──────┘  └────────────┘                               │
//! │        │ SshTool (trait)                                      │
//! │        ▼                                                      │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │ OpenSshTool: system ssh client, ControlMaster      │      │
//! │  │ spawn → SshProcess → StreamPump threads → caller   │      │
//! │  └────────────────────────────────────────────────────┘      │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every exec call blocks its caller for the full round trip; the
//! per-call copier threads are joined before the call returns, on every
//! path including transport failure.
//!
//! Command output is mirrored line by line to the dedicated tracing
//! target `locus::remote::io`, so SSH I/O can be filtered independently
//! of the rest of the logs.

mod error;
mod exec;
mod machine;
mod mutex;
mod openssh;
mod pool;
mod tool;

pub use error::RemoteExecError;
pub use exec::{run_streamed, ExecResult, SSH_IO_TARGET};
pub use machine::SshMachineLocation;
pub use mutex::MutexTable;
pub use openssh::OpenSshTool;
pub use pool::SshToolPool;
pub use tool::{ExecOptions, SshConfig, SshProcess, SshTool};
