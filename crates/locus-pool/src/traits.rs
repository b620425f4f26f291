//! The provisioner trait and obtain flags.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use locus_location::{Location, MachineLocation};
use locus_types::LocationId;

use crate::error::PoolError;

/// Shared handle to a leased or leasable machine.
pub type MachineRef = Arc<dyn MachineLocation>;

/// Flags accompanying one `obtain` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObtainFlags {
    /// Ask for one specific machine instead of any available one.
    pub desired_machine: Option<LocationId>,
    /// Everything else; forwarded to provisioning where relevant.
    pub extra: BTreeMap<String, Value>,
}

impl ObtainFlags {
    /// Flags requesting any available machine.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Flags requesting one specific machine.
    #[must_use]
    pub fn desired(machine: LocationId) -> Self {
        Self {
            desired_machine: Some(machine),
            ..Self::default()
        }
    }
}

/// A location that leases machines.
///
/// `obtain` creates a lease and `release` destroys it; every
/// implementation serializes its mutating operations behind its own
/// lock.
pub trait MachineProvisioner: Location {
    /// Leases one machine.
    ///
    /// # Errors
    ///
    /// [`PoolError::NoMachinesAvailable`] when the candidate set is
    /// exhausted; [`PoolError::MachineUnknown`] /
    /// [`PoolError::MachineInUse`] for an unsatisfiable
    /// `desired_machine`.
    fn obtain(&self, flags: &ObtainFlags) -> Result<MachineRef, PoolError>;

    /// Returns a leased machine.
    ///
    /// # Errors
    ///
    /// [`PoolError::NotLeasedHere`] when this pool did not lease the
    /// machine out.
    fn release(&self, machine: &MachineRef) -> Result<(), PoolError>;
}
