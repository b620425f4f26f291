//! `byon`: bring your own nodes.

use std::sync::Arc;

use locus_location::ConfigBag;
use locus_pool::FixedListBuilder;
use locus_spec::LocationSpec;

use crate::context::ResolutionContext;
use crate::error::ResolveError;
use crate::registry::LocationRegistry;
use crate::resolver::{LocationResolver, Resolved};

/// Resolves `byon:(hosts="...",user=...,name=...)` into a closed
/// fixed-list pool of ssh machines. The hosts value accepts
/// brace-expansion globs and per-host `user@` overrides.
pub struct ByonResolver;

impl LocationResolver for ByonResolver {
    fn prefix(&self) -> &str {
        "byon"
    }

    fn resolve(
        &self,
        spec: &LocationSpec,
        flags: ConfigBag,
        _registry: &LocationRegistry,
        _cx: &mut ResolutionContext,
    ) -> Result<Resolved, ResolveError> {
        if !flags.contains("hosts") {
            return Err(ResolveError::malformed(
                spec.raw(),
                "byon requires a hosts argument",
            ));
        }
        let pool = FixedListBuilder::new()
            .build_from_flags(flags)
            .map_err(|source| ResolveError::build(spec.raw(), source))?;
        Ok(Resolved::pool(Arc::new(pool)))
    }
}
