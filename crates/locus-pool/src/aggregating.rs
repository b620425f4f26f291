//! Round-robin aggregation over upstream pools.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use locus_location::{Location, LocationCore};
use locus_types::LocationId;

use crate::error::PoolError;
use crate::traits::{MachineProvisioner, MachineRef, ObtainFlags};

/// A pool that spreads leases across several upstream pools.
///
/// Each `obtain` starts from the next upstream in rotation and walks
/// the ring until one of them yields a machine. An upstream that is
/// merely exhausted is skipped; any other upstream error aborts the
/// walk and propagates. Releases are routed back to whichever upstream
/// actually leased the machine.
pub struct AggregatingProvisioningLocation {
    core: LocationCore,
    upstreams: Vec<Arc<dyn MachineProvisioner>>,
    next: AtomicUsize,
    routes: Mutex<HashMap<LocationId, usize>>,
}

impl std::fmt::Debug for AggregatingProvisioningLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregatingProvisioningLocation")
            .field("id", &self.core.id())
            .field("name", &self.core.display_name())
            .field("upstreams", &self.upstreams.len())
            .field("routed", &self.routes.lock().len())
            .finish()
    }
}

impl AggregatingProvisioningLocation {
    /// Aggregates over the given upstream pools.
    ///
    /// # Errors
    ///
    /// [`PoolError::Misconfigured`] when `upstreams` is empty.
    pub fn new(upstreams: Vec<Arc<dyn MachineProvisioner>>) -> Result<Self, PoolError> {
        let core = LocationCore::new();
        if upstreams.is_empty() {
            return Err(PoolError::Misconfigured {
                pool: core.display_name(),
                reason: "aggregating pool needs at least one upstream".to_string(),
            });
        }
        Ok(Self {
            core,
            upstreams,
            next: AtomicUsize::new(0),
            routes: Mutex::new(HashMap::new()),
        })
    }

    /// Sets the display name.
    #[must_use]
    pub fn named(self, name: impl Into<String>) -> Self {
        self.core.set_display_name(name);
        self
    }

    /// Number of upstream pools.
    #[must_use]
    pub fn upstream_count(&self) -> usize {
        self.upstreams.len()
    }
}

impl Location for AggregatingProvisioningLocation {
    fn core(&self) -> &LocationCore {
        &self.core
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl MachineProvisioner for AggregatingProvisioningLocation {
    fn obtain(&self, flags: &ObtainFlags) -> Result<MachineRef, PoolError> {
        let n = self.upstreams.len();
        let start = self.next.fetch_add(1, Ordering::Relaxed) % n;

        let mut refusals = Vec::new();
        for step in 0..n {
            let index = (start + step) % n;
            let upstream = &self.upstreams[index];
            match upstream.obtain(flags) {
                Ok(machine) => {
                    self.routes.lock().insert(machine.id(), index);
                    debug!(
                        pool = %self.display_name(),
                        upstream = %upstream.display_name(),
                        machine = %machine.id(),
                        "leased via upstream"
                    );
                    return Ok(machine);
                }
                // only exhaustion moves on to the next upstream
                Err(PoolError::NoMachinesAvailable { pool, reason }) => {
                    debug!(pool = %self.display_name(), upstream = %pool, "upstream exhausted");
                    refusals.push(format!("{pool}: {reason}"));
                }
                Err(other) => return Err(other),
            }
        }

        Err(PoolError::NoMachinesAvailable {
            pool: self.display_name(),
            reason: format!("all {} upstreams refused ({})", n, refusals.join("; ")),
        })
    }

    fn release(&self, machine: &MachineRef) -> Result<(), PoolError> {
        let index = {
            let mut routes = self.routes.lock();
            routes.remove(&machine.id())
        };
        match index {
            Some(index) => {
                let result = self.upstreams[index].release(machine);
                if result.is_err() {
                    // keep the route so a retry can still find its way
                    self.routes.lock().insert(machine.id(), index);
                }
                result
            }
            None => Err(PoolError::NotLeasedHere {
                pool: self.display_name(),
                machine: machine.id(),
            }),
        }
    }
}
