//! Provisioning on the local host.

use std::collections::BTreeSet;
use std::net::TcpListener;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use locus_location::{ConfigBag, Location, LocationCore, MachineLocation, PortSupplier};
use locus_types::PortRange;

use crate::error::PoolError;
use crate::fixed::FixedListProvisioningLocation;
use crate::traits::{MachineProvisioner, MachineRef, ObtainFlags};

/// Port claims shared by every machine of one localhost pool.
///
/// All localhost machines bind the same network stack, so claims live
/// in one table owned by the pool and handed to each machine by
/// reference. The table is an explicit field, not process-global
/// state.
#[derive(Debug, Default)]
pub struct PortReservations {
    claimed: Mutex<BTreeSet<u16>>,
}

impl PortReservations {
    /// An empty reservation table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `port`. Returns false when the table already holds it
    /// or the best-effort local bind check says it is taken.
    ///
    /// Ports below 1024 skip the bind check; binding them needs
    /// privileges the caller may legitimately have while we do not.
    pub fn claim(&self, port: u16) -> bool {
        let mut claimed = self.claimed.lock();
        if claimed.contains(&port) {
            return false;
        }
        if port >= 1024 && TcpListener::bind(("0.0.0.0", port)).is_err() {
            debug!(port, "local bind check failed, port treated as taken");
            return false;
        }
        claimed.insert(port)
    }

    /// Releases a claim. Unknown ports are ignored.
    pub fn release(&self, port: u16) {
        self.claimed.lock().remove(&port);
    }

    /// Whether the table currently holds `port`.
    #[must_use]
    pub fn is_claimed(&self, port: u16) -> bool {
        self.claimed.lock().contains(&port)
    }
}

/// One provisioned machine on the local host.
///
/// Tracks its own claims so `close` returns exactly what this machine
/// took from the shared table.
pub struct LocalhostMachine {
    core: LocationCore,
    reservations: Arc<PortReservations>,
    own_ports: Mutex<BTreeSet<u16>>,
}

impl std::fmt::Debug for LocalhostMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalhostMachine")
            .field("id", &self.core.id())
            .field("ports", &self.own_ports.lock().len())
            .finish()
    }
}

impl LocalhostMachine {
    fn new(reservations: Arc<PortReservations>) -> Self {
        let core = LocationCore::new();
        core.set_display_name("localhost");
        Self {
            core,
            reservations,
            own_ports: Mutex::new(BTreeSet::new()),
        }
    }
}

impl Location for LocalhostMachine {
    fn core(&self) -> &LocationCore {
        &self.core
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn close(&self) {
        let mut own = self.own_ports.lock();
        for port in own.iter() {
            self.reservations.release(*port);
        }
        own.clear();
    }
}

impl MachineLocation for LocalhostMachine {
    fn address(&self) -> String {
        "localhost".to_string()
    }
}

impl PortSupplier for LocalhostMachine {
    fn obtain_specific_port(&self, port: u16) -> bool {
        if !self.reservations.claim(port) {
            return false;
        }
        self.own_ports.lock().insert(port);
        true
    }

    fn obtain_port(&self, range: &PortRange) -> Option<u16> {
        range.iter().find(|p| self.obtain_specific_port(*p))
    }

    fn release_port(&self, port: u16) {
        if self.own_ports.lock().remove(&port) {
            self.reservations.release(port);
        }
    }
}

/// An extensible pool of machines on the local host.
///
/// Unbounded by default; a `count` construction flag pre-provisions a
/// fixed set and closes the pool instead. All machines share one
/// [`PortReservations`] table.
pub struct LocalhostProvisioningLocation {
    pool: FixedListProvisioningLocation,
    reservations: Arc<PortReservations>,
}

impl std::fmt::Debug for LocalhostProvisioningLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalhostProvisioningLocation")
            .field("pool", &self.pool)
            .finish()
    }
}

impl LocalhostProvisioningLocation {
    /// An unbounded localhost pool.
    #[must_use]
    pub fn new() -> Self {
        let reservations = Arc::new(PortReservations::new());
        let minting = Arc::clone(&reservations);
        let pool = FixedListProvisioningLocation::extensible(
            vec![],
            Box::new(move || Ok(Arc::new(LocalhostMachine::new(Arc::clone(&minting))) as MachineRef)),
        )
        .named("localhost");
        Self { pool, reservations }
    }

    /// A closed localhost pool of exactly `count` machines.
    #[must_use]
    pub fn with_count(count: usize) -> Self {
        let reservations = Arc::new(PortReservations::new());
        let machines = (0..count)
            .map(|_| Arc::new(LocalhostMachine::new(Arc::clone(&reservations))) as MachineRef)
            .collect();
        let pool = FixedListProvisioningLocation::new(machines).named("localhost");
        Self { pool, reservations }
    }

    /// Builds from construction flags, consuming `count` and the
    /// common location flags.
    ///
    /// # Errors
    ///
    /// [`PoolError::Misconfigured`] for a non-numeric `count`.
    pub fn from_flags(mut bag: ConfigBag) -> Result<Self, PoolError> {
        let count = match bag.peek("count") {
            Some(_) => Some(bag.consume_u64("count").ok_or_else(|| PoolError::Misconfigured {
                pool: "localhost".to_string(),
                reason: "count must be a non-negative integer".to_string(),
            })?),
            None => None,
        };
        let this = match count {
            Some(n) => Self::with_count(n as usize),
            None => Self::new(),
        };
        this.pool.core().configure(&mut bag);
        this.pool.core().absorb_leftovers(bag);
        Ok(this)
    }

    /// The shared port-reservation table.
    #[must_use]
    pub fn port_reservations(&self) -> &Arc<PortReservations> {
        &self.reservations
    }
}

impl Default for LocalhostProvisioningLocation {
    fn default() -> Self {
        Self::new()
    }
}

impl Location for LocalhostProvisioningLocation {
    fn core(&self) -> &LocationCore {
        self.pool.core()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl MachineProvisioner for LocalhostProvisioningLocation {
    fn obtain(&self, flags: &ObtainFlags) -> Result<MachineRef, PoolError> {
        self.pool.obtain(flags)
    }

    fn release(&self, machine: &MachineRef) -> Result<(), PoolError> {
        self.pool.release(machine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_pool_keeps_provisioning() {
        let pool = LocalhostProvisioningLocation::new();
        let a = pool.obtain(&ObtainFlags::any()).unwrap();
        let b = pool.obtain(&ObtainFlags::any()).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.address(), "localhost");
    }

    #[test]
    fn counted_pool_is_closed() {
        let pool = LocalhostProvisioningLocation::with_count(1);
        pool.obtain(&ObtainFlags::any()).unwrap();
        let err = pool.obtain(&ObtainFlags::any()).unwrap_err();
        assert!(matches!(err, PoolError::NoMachinesAvailable { .. }));
    }

    #[test]
    fn machines_share_one_reservation_table() {
        let pool = LocalhostProvisioningLocation::new();
        let a = pool.obtain(&ObtainFlags::any()).unwrap();
        let b = pool.obtain(&ObtainFlags::any()).unwrap();
        let a = a.as_any().downcast_ref::<LocalhostMachine>().unwrap();
        let b = b.as_any().downcast_ref::<LocalhostMachine>().unwrap();

        // sub-1024 ports skip the bind check, keeping this hermetic
        assert!(a.obtain_specific_port(200));
        assert!(!b.obtain_specific_port(200));

        a.release_port(200);
        assert!(b.obtain_specific_port(200));
    }

    #[test]
    fn close_releases_only_own_claims() {
        let pool = LocalhostProvisioningLocation::new();
        let a = pool.obtain(&ObtainFlags::any()).unwrap();
        let b = pool.obtain(&ObtainFlags::any()).unwrap();
        let am = a.as_any().downcast_ref::<LocalhostMachine>().unwrap();
        let bm = b.as_any().downcast_ref::<LocalhostMachine>().unwrap();

        assert!(am.obtain_specific_port(201));
        assert!(bm.obtain_specific_port(202));

        a.close();
        let table = pool.port_reservations();
        assert!(!table.is_claimed(201));
        assert!(table.is_claimed(202));
    }

    #[test]
    fn obtain_port_walks_the_range() {
        let pool = LocalhostProvisioningLocation::new();
        let m = pool.obtain(&ObtainFlags::any()).unwrap();
        let m = m.as_any().downcast_ref::<LocalhostMachine>().unwrap();

        assert!(m.obtain_specific_port(300));
        let range = PortRange::linear(300, 302);
        assert_eq!(m.obtain_port(&range), Some(301));
    }

    #[test]
    fn count_flag_builds_a_closed_pool() {
        let mut bag = ConfigBag::new();
        bag.insert("count", serde_json::json!(2));
        bag.insert("displayName", serde_json::json!("my-localhost"));
        let pool = LocalhostProvisioningLocation::from_flags(bag).unwrap();

        assert_eq!(pool.display_name(), "my-localhost");
        pool.obtain(&ObtainFlags::any()).unwrap();
        pool.obtain(&ObtainFlags::any()).unwrap();
        assert!(pool.obtain(&ObtainFlags::any()).is_err());
    }
}
