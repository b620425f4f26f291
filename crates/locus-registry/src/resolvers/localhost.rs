//! `localhost`: machines on this host.

use std::sync::Arc;

use locus_location::ConfigBag;
use locus_pool::LocalhostProvisioningLocation;
use locus_spec::LocationSpec;

use crate::context::ResolutionContext;
use crate::error::ResolveError;
use crate::registry::LocationRegistry;
use crate::resolver::{LocationResolver, Resolved};

/// Resolves `localhost` (unbounded) or `localhost:(count=N)` (closed)
/// into a localhost pool whose machines share one port-reservation
/// table.
pub struct LocalhostResolver;

impl LocationResolver for LocalhostResolver {
    fn prefix(&self) -> &str {
        "localhost"
    }

    fn resolve(
        &self,
        spec: &LocationSpec,
        flags: ConfigBag,
        _registry: &LocationRegistry,
        _cx: &mut ResolutionContext,
    ) -> Result<Resolved, ResolveError> {
        let pool = LocalhostProvisioningLocation::from_flags(flags)
            .map_err(|source| ResolveError::build(spec.raw(), source))?;
        Ok(Resolved::pool(Arc::new(pool)))
    }
}
