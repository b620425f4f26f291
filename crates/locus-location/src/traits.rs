//! The capability traits implemented by concrete location types.

use std::any::Any;
use std::sync::Arc;

use locus_types::{LocationId, PortRange};

use crate::node::LocationCore;

/// A node in the location ownership tree.
///
/// Concrete types (pools, machines, remote channels) embed a
/// [`LocationCore`] and expose it here; all tree and config-inheritance
/// behavior lives on the core and is never overridden.
pub trait Location: Send + Sync + std::fmt::Debug {
    /// The shared tree/config state of this location.
    fn core(&self) -> &LocationCore;

    /// Downcast support for resolvers and callers that need the
    /// concrete type back out of the arena.
    fn as_any(&self) -> &dyn Any;

    /// Releases any held external resources (remote connections,
    /// reserved ports). Called during unmanage; default is a no-op.
    fn close(&self) {}

    /// The stable id of this location.
    fn id(&self) -> LocationId {
        self.core().id()
    }

    /// Human-readable name, falling back to the id.
    fn display_name(&self) -> String {
        self.core().display_name()
    }
}

/// A location that is an addressable machine.
pub trait MachineLocation: Location {
    /// Network address (hostname or IP).
    fn address(&self) -> String;

    /// Login user, when one is configured.
    fn user(&self) -> Option<String> {
        None
    }
}

/// Port bookkeeping offered by machine-like locations.
///
/// Claims are per-location state; releasing a port another caller still
/// uses is the caller's coordination problem (see the mutex table).
pub trait PortSupplier {
    /// Claims exactly `port`. Returns false if this location already
    /// claimed it or the best-effort OS check says it is taken.
    fn obtain_specific_port(&self, port: u16) -> bool;

    /// Claims the first obtainable candidate of `range`, or `None` when
    /// the range is exhausted.
    fn obtain_port(&self, range: &PortRange) -> Option<u16>;

    /// Releases a claimed port. Unknown ports are ignored.
    fn release_port(&self, port: u16);
}

/// Shared handle type stored in the arena.
pub type LocationRef = Arc<dyn Location>;
