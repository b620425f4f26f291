//! Remote-execution faults.

use locus_types::ErrorCode;
use thiserror::Error;

/// Transport, authentication, or I/O failure on a remote channel.
#[derive(Debug, Error)]
pub enum RemoteExecError {
    /// Could not establish the SSH connection.
    #[error("cannot connect to {target}: {reason}")]
    Connect { target: String, reason: String },

    /// First-ever connection attempt on this channel failed.
    ///
    /// Enriched with first-time-setup guidance; later reconnect
    /// failures propagate the raw [`Connect`](Self::Connect) instead.
    #[error(
        "cannot establish ssh connection to {target}. \
         Ensure passwordless and passphraseless ssh access is enabled using standard keys \
         from ~/.ssh or as configured in the location properties. Check that the target \
         host is reachable, that credentials are correct (location and permissions if \
         using a key), that the remote SSH subsystem is available, and that there is \
         sufficient random noise in /dev/random on both ends."
    )]
    FirstConnect {
        target: String,
        #[source]
        source: Box<RemoteExecError>,
    },

    /// The transport program could not be started.
    #[error("cannot spawn '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while talking to the remote process.
    #[error("remote i/o failure during {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The transport went away mid-call.
    #[error("transport to {target} closed during execution")]
    TransportClosed { target: String },
}

impl ErrorCode for RemoteExecError {
    fn code(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "REMOTE_CONNECT",
            Self::FirstConnect { .. } => "REMOTE_FIRST_CONNECT",
            Self::Spawn { .. } => "REMOTE_SPAWN",
            Self::Io { .. } => "REMOTE_IO",
            Self::TransportClosed { .. } => "REMOTE_TRANSPORT_CLOSED",
        }
    }

    fn is_recoverable(&self) -> bool {
        // hosts come back, networks heal; the caller owns retry policy
        true
    }
}
