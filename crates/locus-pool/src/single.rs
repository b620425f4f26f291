//! One shared machine lease, handed out by reference count.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use locus_location::{Location, LocationCore};

use crate::error::PoolError;
use crate::traits::{MachineProvisioner, MachineRef, ObtainFlags};

/// Resolves the upstream pool the shared machine comes from.
pub type UpstreamSource =
    Box<dyn Fn() -> Result<Arc<dyn MachineProvisioner>, PoolError> + Send + Sync>;

/// A pool that leases the same machine to every caller.
///
/// The upstream pool is resolved lazily on the first `obtain` and one
/// machine is leased from it. Further obtains hand back that same
/// machine and bump a reference count; the upstream lease is only
/// returned when the count drops back to zero.
pub struct SingleMachineProvisioningLocation {
    core: LocationCore,
    source: UpstreamSource,
    state: Mutex<SharedLease>,
}

#[derive(Default)]
struct SharedLease {
    upstream: Option<Arc<dyn MachineProvisioner>>,
    machine: Option<MachineRef>,
    borrowers: usize,
    first_flags: Option<ObtainFlags>,
}

impl std::fmt::Debug for SingleMachineProvisioningLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SingleMachineProvisioningLocation")
            .field("id", &self.core.id())
            .field("name", &self.core.display_name())
            .field("borrowers", &state.borrowers)
            .field("leased", &state.machine.is_some())
            .finish()
    }
}

impl SingleMachineProvisioningLocation {
    /// Shares one machine leased from the pool `source` resolves to.
    #[must_use]
    pub fn new(source: UpstreamSource) -> Self {
        Self {
            core: LocationCore::new(),
            source,
            state: Mutex::new(SharedLease::default()),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn named(self, name: impl Into<String>) -> Self {
        self.core.set_display_name(name);
        self
    }

    /// Current number of outstanding logical leases.
    #[must_use]
    pub fn borrower_count(&self) -> usize {
        self.state.lock().borrowers
    }
}

impl Location for SingleMachineProvisioningLocation {
    fn core(&self) -> &LocationCore {
        &self.core
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl MachineProvisioner for SingleMachineProvisioningLocation {
    fn obtain(&self, flags: &ObtainFlags) -> Result<MachineRef, PoolError> {
        let mut state = self.state.lock();

        if let Some(machine) = state.machine.clone() {
            // later flags cannot change the machine everyone shares
            if state.first_flags.as_ref() != Some(flags) {
                warn!(
                    pool = %self.display_name(),
                    "ignoring flags that differ from the first obtain"
                );
            }
            state.borrowers += 1;
            return Ok(machine);
        }

        if state.upstream.is_none() {
            state.upstream = Some((self.source)()?);
        }
        let upstream = state.upstream.as_ref().map(Arc::clone);
        let Some(upstream) = upstream else {
            return Err(PoolError::Misconfigured {
                pool: self.display_name(),
                reason: "upstream resolution yielded nothing".to_string(),
            });
        };

        let machine = upstream.obtain(flags)?;
        debug!(
            pool = %self.display_name(),
            machine = %machine.id(),
            "leased the shared machine"
        );
        state.machine = Some(Arc::clone(&machine));
        state.first_flags = Some(flags.clone());
        state.borrowers = 1;
        Ok(machine)
    }

    fn release(&self, machine: &MachineRef) -> Result<(), PoolError> {
        let mut state = self.state.lock();

        let holds_it = state
            .machine
            .as_ref()
            .is_some_and(|m| m.id() == machine.id());
        if !holds_it || state.borrowers == 0 {
            return Err(PoolError::NotLeasedHere {
                pool: self.display_name(),
                machine: machine.id(),
            });
        }

        state.borrowers -= 1;
        if state.borrowers > 0 {
            return Ok(());
        }

        debug!(pool = %self.display_name(), machine = %machine.id(), "last borrower gone");
        state.machine = None;
        state.first_flags = None;
        match &state.upstream {
            Some(upstream) => upstream.release(machine),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::FixedListProvisioningLocation;
    use locus_remote::SshMachineLocation;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn shared_over(hosts: &[&str]) -> (SingleMachineProvisioningLocation, Arc<FixedListProvisioningLocation>) {
        let machines = hosts
            .iter()
            .map(|h| Arc::new(SshMachineLocation::new(*h)) as MachineRef)
            .collect();
        let upstream = Arc::new(FixedListProvisioningLocation::new(machines).named("upstream"));
        let handle = Arc::clone(&upstream);
        let single = SingleMachineProvisioningLocation::new(Box::new(move || {
            Ok(Arc::clone(&handle) as Arc<dyn MachineProvisioner>)
        }))
        .named("shared");
        (single, upstream)
    }

    #[test]
    fn every_obtain_returns_the_same_machine() {
        let (single, upstream) = shared_over(&["m1", "m2"]);

        let a = single.obtain(&ObtainFlags::any()).unwrap();
        let b = single.obtain(&ObtainFlags::any()).unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(single.borrower_count(), 2);
        // only one upstream lease backs both borrowers
        assert_eq!(upstream.in_use_count(), 1);
    }

    #[test]
    fn upstream_resolved_lazily_and_once() {
        static RESOLVED: AtomicUsize = AtomicUsize::new(0);
        let machines = vec![Arc::new(SshMachineLocation::new("m1")) as MachineRef];
        let upstream = Arc::new(FixedListProvisioningLocation::new(machines));
        let handle = Arc::clone(&upstream);
        let single = SingleMachineProvisioningLocation::new(Box::new(move || {
            RESOLVED.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::clone(&handle) as Arc<dyn MachineProvisioner>)
        }));

        assert_eq!(RESOLVED.load(Ordering::SeqCst), 0);
        single.obtain(&ObtainFlags::any()).unwrap();
        single.obtain(&ObtainFlags::any()).unwrap();
        assert_eq!(RESOLVED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn upstream_release_happens_at_count_zero_only() {
        let (single, upstream) = shared_over(&["m1"]);

        let a = single.obtain(&ObtainFlags::any()).unwrap();
        let b = single.obtain(&ObtainFlags::any()).unwrap();

        single.release(&a).unwrap();
        assert_eq!(upstream.in_use_count(), 1);

        single.release(&b).unwrap();
        assert_eq!(upstream.in_use_count(), 0);
    }

    #[test]
    fn release_without_lease_errors() {
        let (single, _upstream) = shared_over(&["m1"]);
        let stranger: MachineRef = Arc::new(SshMachineLocation::new("stray"));
        let err = single.release(&stranger).unwrap_err();
        assert!(matches!(err, PoolError::NotLeasedHere { .. }));
    }

    #[test]
    fn source_failure_surfaces_and_next_obtain_retries() {
        static ATTEMPTS: AtomicUsize = AtomicUsize::new(0);
        let machines = vec![Arc::new(SshMachineLocation::new("m1")) as MachineRef];
        let upstream = Arc::new(FixedListProvisioningLocation::new(machines));
        let handle = Arc::clone(&upstream);
        let single = SingleMachineProvisioningLocation::new(Box::new(move || {
            if ATTEMPTS.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(PoolError::UpstreamResolution {
                    pool: "shared".into(),
                    spec: "named:missing".into(),
                    reason: "unknown name".into(),
                })
            } else {
                Ok(Arc::clone(&handle) as Arc<dyn MachineProvisioner>)
            }
        }));

        assert!(single.obtain(&ObtainFlags::any()).is_err());
        assert!(single.obtain(&ObtainFlags::any()).is_ok());
    }

    #[test]
    fn concurrent_borrowers_share_one_lease() {
        let (single, upstream) = shared_over(&["m1", "m2", "m3"]);
        let single = Arc::new(single);

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let single = Arc::clone(&single);
                thread::spawn(move || single.obtain(&ObtainFlags::any()).map(|m| m.id()))
            })
            .collect();

        let ids: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(single.borrower_count(), 6);
        assert_eq!(upstream.in_use_count(), 1);
    }
}
