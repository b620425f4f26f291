//! Composite location exposing sub-locations as availability zones.

use std::sync::Arc;

use locus_location::{Location, LocationCore};

use crate::error::PoolError;
use crate::traits::{MachineProvisioner, MachineRef, ObtainFlags};

/// A composite of several provisioning sub-locations.
///
/// The sub-locations are published as availability zones for callers
/// that spread work themselves. Direct leasing against the composite
/// delegates to the first sub-location only; callers wanting
/// cross-zone balancing should wrap the zones in an
/// [`crate::AggregatingProvisioningLocation`] instead.
pub struct MultiLocation {
    core: LocationCore,
    zones: Vec<Arc<dyn MachineProvisioner>>,
}

impl std::fmt::Debug for MultiLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiLocation")
            .field("id", &self.core.id())
            .field("name", &self.core.display_name())
            .field("zones", &self.zones.len())
            .finish()
    }
}

impl MultiLocation {
    /// A composite over the given sub-locations.
    ///
    /// # Errors
    ///
    /// [`PoolError::Misconfigured`] when `zones` is empty.
    pub fn new(zones: Vec<Arc<dyn MachineProvisioner>>) -> Result<Self, PoolError> {
        let core = LocationCore::new();
        if zones.is_empty() {
            return Err(PoolError::Misconfigured {
                pool: core.display_name(),
                reason: "multi location needs at least one sub-location".to_string(),
            });
        }
        Ok(Self { core, zones })
    }

    /// Sets the display name.
    #[must_use]
    pub fn named(self, name: impl Into<String>) -> Self {
        self.core.set_display_name(name);
        self
    }

    /// The sub-locations, in declaration order.
    #[must_use]
    pub fn availability_zones(&self) -> &[Arc<dyn MachineProvisioner>] {
        &self.zones
    }
}

impl Location for MultiLocation {
    fn core(&self) -> &LocationCore {
        &self.core
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl MachineProvisioner for MultiLocation {
    fn obtain(&self, flags: &ObtainFlags) -> Result<MachineRef, PoolError> {
        self.zones[0].obtain(flags)
    }

    fn release(&self, machine: &MachineRef) -> Result<(), PoolError> {
        self.zones[0].release(machine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::FixedListProvisioningLocation;
    use locus_location::MachineLocation;
    use locus_remote::SshMachineLocation;

    fn zone(name: &str, hosts: &[&str]) -> Arc<dyn MachineProvisioner> {
        let machines = hosts
            .iter()
            .map(|h| Arc::new(SshMachineLocation::new(*h)) as MachineRef)
            .collect();
        Arc::new(FixedListProvisioningLocation::new(machines).named(name))
    }

    #[test]
    fn rejects_empty_zone_list() {
        let err = MultiLocation::new(vec![]).unwrap_err();
        assert!(matches!(err, PoolError::Misconfigured { .. }));
    }

    #[test]
    fn zones_are_exposed_in_order() {
        let multi = MultiLocation::new(vec![zone("east", &["e1"]), zone("west", &["w1"])]).unwrap();
        let names: Vec<String> = multi
            .availability_zones()
            .iter()
            .map(|z| z.display_name())
            .collect();
        assert_eq!(names, ["east", "west"]);
    }

    #[test]
    fn leasing_delegates_to_first_zone() {
        let multi = MultiLocation::new(vec![zone("east", &["e1"]), zone("west", &["w1"])]).unwrap();

        let machine = multi.obtain(&ObtainFlags::any()).unwrap();
        assert_eq!(machine.address(), "e1");

        multi.release(&machine).unwrap();
        let again = multi.obtain(&ObtainFlags::any()).unwrap();
        assert_eq!(again.id(), machine.id());
    }
}
