//! The fixed resolver set.

use std::sync::Arc;

use locus_location::{ConfigBag, LocationDefinition};
use locus_spec::spec_prefix;

use crate::context::ResolutionContext;
use crate::error::ResolveError;
use crate::registry::LocationRegistry;
use crate::resolver::Resolved;

mod byon;
mod catalog;
mod cloud;
mod host;
mod id;
mod localhost;
mod multi;
mod named;
mod single;

pub use byon::ByonResolver;
pub use catalog::CatalogResolver;
pub use cloud::{CloudFactory, CloudResolver};
pub use host::HostResolver;
pub use id::IdResolver;
pub use localhost::LocalhostResolver;
pub use multi::MultiResolver;
pub use named::NamedResolver;
pub use single::SingleResolver;

/// Installs the statically known resolvers into a fresh registry.
pub(crate) fn register_defaults(registry: &LocationRegistry) {
    registry.register_resolver(Arc::new(ByonResolver));
    registry.register_resolver(Arc::new(LocalhostResolver));
    registry.register_resolver(Arc::new(HostResolver));
    registry.register_resolver(Arc::new(SingleResolver));
    registry.register_resolver(Arc::new(MultiResolver));
    registry.register_resolver(Arc::new(NamedResolver));
    registry.register_resolver(Arc::new(IdResolver));
    registry.register_resolver(Arc::new(CatalogResolver));
}

/// Resolves a definition's target spec with the layered precedence:
/// caller flags > definition config > named overrides > provider scope >
/// generic properties.
pub(crate) fn resolve_definition(
    definition: &LocationDefinition,
    named: Option<&str>,
    mut flags: ConfigBag,
    registry: &LocationRegistry,
    cx: &mut ResolutionContext,
) -> Result<Resolved, ResolveError> {
    let target = definition.spec().to_string();
    let provider = spec_prefix(&target).to_string();
    flags.merge_defaults(&ConfigBag::from_map(definition.config().clone()));
    flags.merge_defaults(&ConfigBag::from_map(
        registry.properties().merged_for(Some(&provider), named),
    ));
    registry.resolve_in(&target, flags, cx)
}
