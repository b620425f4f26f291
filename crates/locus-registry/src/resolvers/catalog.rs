//! `catalog`: resolve a definition held as a catalog item.

use locus_location::ConfigBag;
use locus_spec::LocationSpec;

use crate::context::ResolutionContext;
use crate::error::ResolveError;
use crate::registry::LocationRegistry;
use crate::resolver::{LocationResolver, Resolved};
use crate::resolvers::resolve_definition;

/// Resolves `catalog:<item-id>` through the registry's catalog-item
/// store.
pub struct CatalogResolver;

impl LocationResolver for CatalogResolver {
    fn prefix(&self) -> &str {
        "catalog"
    }

    fn merges_scoped_properties(&self) -> bool {
        false
    }

    fn resolve(
        &self,
        spec: &LocationSpec,
        flags: ConfigBag,
        registry: &LocationRegistry,
        cx: &mut ResolutionContext,
    ) -> Result<Resolved, ResolveError> {
        let item = spec
            .segments()
            .first()
            .cloned()
            .ok_or_else(|| ResolveError::malformed(spec.raw(), "catalog requires an item id"))?;

        let definition =
            registry
                .catalog_item(&item)
                .ok_or_else(|| ResolveError::UnknownDefinition {
                    spec: spec.raw().to_string(),
                    name: item,
                })?;
        resolve_definition(&definition, definition.name(), flags, registry, cx)
    }
}
