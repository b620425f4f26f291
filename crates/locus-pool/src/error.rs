//! Leasing errors.

use locus_types::{ErrorCode, LocationId};
use thiserror::Error;

/// Error from a pool operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The candidate set is exhausted and, if the pool is extensible,
    /// provisioning also failed.
    #[error("no machines available in pool '{pool}': {reason}")]
    NoMachinesAvailable { pool: String, reason: String },

    /// The desired machine was never part of this pool.
    #[error("machine {machine} is unknown to pool '{pool}'")]
    MachineUnknown { pool: String, machine: LocationId },

    /// The desired machine is known but currently leased out.
    #[error("machine {machine} is already in use in pool '{pool}'")]
    MachineInUse { pool: String, machine: LocationId },

    /// Release of a machine this pool has not leased out.
    #[error("machine {machine} is not currently leased from pool '{pool}'")]
    NotLeasedHere { pool: String, machine: LocationId },

    /// A host-list value could not be expanded into machines.
    #[error("invalid host list '{value}': {reason}")]
    InvalidHosts { value: String, reason: String },

    /// The pool's own configuration is unusable.
    #[error("pool '{pool}' is misconfigured: {reason}")]
    Misconfigured { pool: String, reason: String },

    /// Lazy resolution of an upstream pool failed.
    #[error("cannot resolve upstream '{spec}' for pool '{pool}': {reason}")]
    UpstreamResolution {
        pool: String,
        spec: String,
        reason: String,
    },
}

impl ErrorCode for PoolError {
    fn code(&self) -> &'static str {
        match self {
            Self::NoMachinesAvailable { .. } => "POOL_NO_MACHINES_AVAILABLE",
            Self::MachineUnknown { .. } => "POOL_MACHINE_UNKNOWN",
            Self::MachineInUse { .. } => "POOL_MACHINE_IN_USE",
            Self::NotLeasedHere { .. } => "POOL_NOT_LEASED_HERE",
            Self::InvalidHosts { .. } => "POOL_INVALID_HOSTS",
            Self::Misconfigured { .. } => "POOL_MISCONFIGURED",
            Self::UpstreamResolution { .. } => "POOL_UPSTREAM_RESOLUTION",
        }
    }

    fn is_recoverable(&self) -> bool {
        // a lease may free up; an in-use desired machine may return
        matches!(
            self,
            Self::NoMachinesAvailable { .. } | Self::MachineInUse { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locus_types::assert_error_codes;

    #[test]
    fn error_codes() {
        let machine = LocationId::new();
        assert_error_codes(
            &[
                PoolError::NoMachinesAvailable {
                    pool: "p".into(),
                    reason: "empty".into(),
                },
                PoolError::MachineUnknown {
                    pool: "p".into(),
                    machine,
                },
                PoolError::MachineInUse {
                    pool: "p".into(),
                    machine,
                },
                PoolError::NotLeasedHere {
                    pool: "p".into(),
                    machine,
                },
                PoolError::InvalidHosts {
                    value: "h{".into(),
                    reason: "unclosed".into(),
                },
                PoolError::Misconfigured {
                    pool: "p".into(),
                    reason: "no sub-locations".into(),
                },
                PoolError::UpstreamResolution {
                    pool: "p".into(),
                    spec: "named:x".into(),
                    reason: "unknown".into(),
                },
            ],
            "POOL_",
        );
    }

    #[test]
    fn exhaustion_is_recoverable_validation_is_not() {
        let exhausted = PoolError::NoMachinesAvailable {
            pool: "p".into(),
            reason: "all leased".into(),
        };
        assert!(exhausted.is_recoverable());

        let unknown = PoolError::MachineUnknown {
            pool: "p".into(),
            machine: LocationId::new(),
        };
        assert!(!unknown.is_recoverable());
    }
}
