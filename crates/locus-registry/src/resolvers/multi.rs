//! `multi`: availability-zone composite.

use std::sync::Arc;

use locus_location::{ConfigBag, Location};
use locus_pool::MultiLocation;
use locus_spec::{split_top_level, LocationSpec};

use crate::context::ResolutionContext;
use crate::error::ResolveError;
use crate::registry::LocationRegistry;
use crate::resolver::{LocationResolver, Resolved};

/// Resolves `multi:(targets="specA,specB")` into a composite exposing
/// each target as an availability zone. Targets resolve eagerly, inside
/// the same resolution context, so circular chains through a multi are
/// caught.
pub struct MultiResolver;

impl LocationResolver for MultiResolver {
    fn prefix(&self) -> &str {
        "multi"
    }

    fn resolve(
        &self,
        spec: &LocationSpec,
        mut flags: ConfigBag,
        registry: &LocationRegistry,
        cx: &mut ResolutionContext,
    ) -> Result<Resolved, ResolveError> {
        let Some(targets) = flags.consume_str("targets") else {
            return Err(ResolveError::malformed(
                spec.raw(),
                "multi requires a targets argument",
            ));
        };

        let mut zones = Vec::new();
        for target in split_top_level(&targets, ',')? {
            let target = target.trim();
            if target.is_empty() {
                continue;
            }
            let resolved = registry.resolve_in(target, ConfigBag::new(), cx)?;
            zones.push(resolved.require_provisioner(target)?);
        }

        let multi = MultiLocation::new(zones)
            .map_err(|source| ResolveError::build(spec.raw(), source))?;
        let multi = match flags
            .consume_str("displayName")
            .or_else(|| flags.consume_str("name"))
        {
            Some(name) => multi.named(name),
            None => multi,
        };
        multi.core().absorb_leftovers(flags);
        Ok(Resolved::pool(Arc::new(multi)))
    }
}
