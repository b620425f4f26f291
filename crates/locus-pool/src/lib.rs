//! Machine-pool leasing over already-resolved machine locations.
//!
//! Four pool shapes, all implementing [`MachineProvisioner`]:
//!
//! - [`FixedListProvisioningLocation`]: a closed (or optionally
//!   extensible) candidate set with strict lease bookkeeping
//! - [`AggregatingProvisioningLocation`]: round-robins obtains across
//!   upstream pools and routes releases back to the right one
//! - [`MultiLocation`]: exposes sub-locations as availability zones;
//!   leasing delegates to the first sub-location only
//! - [`SingleMachineProvisioningLocation`]: one physical lease shared
//!   by reference count across many logical borrowers
//!
//! Plus [`LocalhostProvisioningLocation`], an extensible localhost
//! flavor whose machines share one explicit port-reservation table.
//!
//! Every mutating operation on a pool is serialized by that pool's own
//! lock: two threads never select or release the same machine
//! concurrently. At all times `in_use ⊆ all` and
//! `pending_removal ⊆ in_use`; the available set is `all − in_use`.

mod aggregating;
mod error;
mod fixed;
mod localhost;
mod multi;
mod single;
mod traits;

pub use aggregating::AggregatingProvisioningLocation;
pub use error::PoolError;
pub use fixed::{FixedListBuilder, FixedListProvisioningLocation, MachineSource};
pub use localhost::{LocalhostMachine, LocalhostProvisioningLocation, PortReservations};
pub use multi::MultiLocation;
pub use single::{SingleMachineProvisioningLocation, UpstreamSource};
pub use traits::{MachineProvisioner, MachineRef, ObtainFlags};
