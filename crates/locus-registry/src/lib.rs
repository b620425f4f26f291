//! Location-spec resolution for locus.
//!
//! Turns spec strings into live, managed locations:
//!
//! ```text
//!                 "byon:(hosts=\"10.0.0.1,10.0.0.2\",name=mypool)"
//!                                    |
//!                                    v
//!   +----------------+   prefix   +-------------------+
//!   | LocationSpec   | ---------> | LocationRegistry  |
//!   | (locus-spec)   |            |  prefix->resolver |
//!   +----------------+            +-------------------+
//!                                    |            |
//!                      exact match   |            | bare-spec fallback:
//!                                    v            v id -> named -> default cloud
//!                              +-----------+   +-----------+
//!                              | resolver  |   | resolver  |
//!                              +-----------+   +-----------+
//!                                    |
//!                                    v  managed into the arena
//!                              +-----------+
//!                              | Resolved  |  location + optional provisioner
//!                              +-----------+
//! ```
//!
//! Named and id specs resolve indirectly through the definition store,
//! layering configuration in ascending precedence: generic
//! `location.*` < `location.<prefix>.*` < `location.named.<name>.*` <
//! caller flags. A per-call [`ResolutionContext`] guards against
//! circular definition chains.

mod context;
mod error;
mod registry;
mod resolver;
mod resolvers;

pub use context::ResolutionContext;
pub use error::ResolveError;
pub use registry::LocationRegistry;
pub use resolver::{LocationResolver, Resolved};
pub use resolvers::{
    ByonResolver, CatalogResolver, CloudFactory, CloudResolver, HostResolver, IdResolver,
    LocalhostResolver, MultiResolver, NamedResolver, SingleResolver,
};
