//! Cloud-provider resolvers.

use std::sync::Arc;

use locus_location::ConfigBag;
use locus_spec::LocationSpec;

use crate::context::ResolutionContext;
use crate::error::ResolveError;
use crate::registry::LocationRegistry;
use crate::resolver::{LocationResolver, Resolved};

/// Builds the provider's location from a spec and the merged flags.
///
/// Provisioning backends live outside this crate; a provider plugs in
/// by registering a [`CloudResolver`] whose factory wraps whatever it
/// builds in a [`Resolved`].
pub type CloudFactory =
    Arc<dyn Fn(&LocationSpec, ConfigBag) -> Result<Resolved, ResolveError> + Send + Sync>;

/// A resolver for one cloud-provider prefix, backed by a factory
/// closure. Also the hook the `location.defaultCloud` fallback goes
/// through for bare specs.
pub struct CloudResolver {
    prefix: String,
    factory: CloudFactory,
}

impl CloudResolver {
    /// A resolver claiming `prefix`, delegating to `factory`.
    #[must_use]
    pub fn new(prefix: impl Into<String>, factory: CloudFactory) -> Self {
        Self {
            prefix: prefix.into(),
            factory,
        }
    }
}

impl LocationResolver for CloudResolver {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn resolve(
        &self,
        spec: &LocationSpec,
        flags: ConfigBag,
        _registry: &LocationRegistry,
        _cx: &mut ResolutionContext,
    ) -> Result<Resolved, ResolveError> {
        (self.factory)(spec, flags)
    }
}
