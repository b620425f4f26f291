//! The location ownership tree.
//!
//! Locations form an acyclic ownership hierarchy: a cloud region owns
//! its pools, a pool owns the machines it leased out, a machine owns
//! its remote-execution channel. This crate holds the tree itself plus
//! the pieces everything above it shares: config inheritance, the
//! consume-at-most-once flag bag, location definitions, and the
//! properties namespace scanned for named locations.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  LocationManager (arena)                                      │
//! │    RwLock<HashMap<LocationId, Arc<dyn Location>>>             │
//! │    set_parent / unmanage enforce symmetric, acyclic links     │
//! └──────────────────────────┬────────────────────────────────────┘
//!                            │ id references (no owning pointers)
//!              ┌─────────────┴─────────────┐
//!              ▼                           ▼
//!      ┌──────────────┐           ┌──────────────┐
//!      │ LocationCore │           │ LocationCore │  per-node state:
//!      │  (node A)    │──parent──►│  (node B)    │  name, config,
//!      └──────────────┘           └──────────────┘  geo, leftovers
//! ```
//!
//! Concrete location types (pools, machines, channels) embed a
//! [`LocationCore`] and implement the [`Location`] trait; the tree
//! logic is written once here and never overridden.

mod arena;
mod config;
mod definition;
mod error;
mod node;
mod properties;
mod traits;

pub use arena::LocationManager;
pub use config::ConfigBag;
pub use node::{BasicLocation, LocationCore};
pub use definition::LocationDefinition;
pub use error::LocationError;
pub use properties::LocationProperties;
pub use traits::{Location, LocationRef, MachineLocation, PortSupplier};
