//! `single`: one shared machine from an upstream pool.

use std::sync::Arc;

use locus_location::{ConfigBag, Location};
use locus_pool::{PoolError, SingleMachineProvisioningLocation, UpstreamSource};
use locus_spec::LocationSpec;

use crate::context::ResolutionContext;
use crate::error::ResolveError;
use crate::registry::LocationRegistry;
use crate::resolver::{LocationResolver, Resolved};

/// Resolves `single:(target=<spec>)` into a reference-counted wrapper
/// around one machine leased from the target pool. The target is
/// resolved lazily, on the first `obtain`.
pub struct SingleResolver;

impl LocationResolver for SingleResolver {
    fn prefix(&self) -> &str {
        "single"
    }

    fn resolve(
        &self,
        spec: &LocationSpec,
        mut flags: ConfigBag,
        registry: &LocationRegistry,
        _cx: &mut ResolutionContext,
    ) -> Result<Resolved, ResolveError> {
        let Some(target) = flags.consume_str("target") else {
            return Err(ResolveError::malformed(
                spec.raw(),
                "single requires a target argument",
            ));
        };
        // surface target syntax errors now, not at first obtain
        target.parse::<LocationSpec>()?;

        let name = flags
            .consume_str("displayName")
            .or_else(|| flags.consume_str("name"))
            .unwrap_or_else(|| format!("single:{target}"));

        // a weak handle avoids an Arc cycle through the arena
        let registry = Arc::downgrade(&registry.shared());
        let upstream_spec = target.clone();
        let pool_name = name.clone();
        let source: UpstreamSource = Box::new(move || {
            let fail = |reason: String| PoolError::UpstreamResolution {
                pool: pool_name.clone(),
                spec: upstream_spec.clone(),
                reason,
            };
            let registry = registry
                .upgrade()
                .ok_or_else(|| fail("registry is gone".to_string()))?;
            registry
                .resolve(&upstream_spec)
                .and_then(|resolved| resolved.require_provisioner(&upstream_spec))
                .map_err(|e| fail(e.to_string()))
        });

        let pool = SingleMachineProvisioningLocation::new(source).named(name);
        pool.core().absorb_leftovers(flags);
        Ok(Resolved::pool(Arc::new(pool)))
    }
}
