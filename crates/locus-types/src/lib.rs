//! Core types shared across the locus crates.
//!
//! This is the leaf crate of the workspace: identifier newtypes, the
//! [`ErrorCode`] contract implemented by every locus error enum, geo
//! coordinates, and the [`PortRange`] model with its text format.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  locus-types (THIS CRATE)                                   │
//! │  id        : LocationId, DefinitionId                       │
//! │  error     : ErrorCode trait + test helpers                 │
//! │  geo       : GeoCoordinates                                 │
//! │  port_range: PortRange model, "N,N-M,N+" text format        │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↑
//!        locus-spec, locus-location, locus-remote,
//!        locus-pool, locus-registry
//! ```

mod error;
mod geo;
mod id;
mod port_range;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use geo::GeoCoordinates;
pub use id::{DefinitionId, LocationId};
pub use port_range::{PortRange, PortRangeParseError, MAX_PORT};
