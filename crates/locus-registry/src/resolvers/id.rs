//! `id`: resolve a definition by its opaque id.

use locus_location::ConfigBag;
use locus_spec::LocationSpec;
use locus_types::DefinitionId;

use crate::context::ResolutionContext;
use crate::error::ResolveError;
use crate::registry::LocationRegistry;
use crate::resolver::{LocationResolver, Resolved};
use crate::resolvers::resolve_definition;

/// Resolves `id:<definition-id>` (and, as the first fallback for bare
/// specs, `<definition-id>` itself).
pub struct IdResolver;

impl LocationResolver for IdResolver {
    fn prefix(&self) -> &str {
        "id"
    }

    fn accepts(&self, spec: &LocationSpec, registry: &LocationRegistry) -> bool {
        spec.prefix() == "id"
            || registry
                .definition_by_id(&DefinitionId::from(spec.raw()))
                .is_some()
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
        let ident = if spec.prefix() == "id" {
            spec.segments()
                .first()
                .cloned()
                .ok_or_else(|| ResolveError::malformed(spec.raw(), "id requires a definition id"))?
        } else {
            spec.raw().to_string()
        };

        let definition = registry
            .definition_by_id(&DefinitionId::from(ident.as_str()))
            .ok_or_else(|| ResolveError::UnknownDefinition {
                spec: spec.raw().to_string(),
                name: ident,
            })?;
        let named = definition.name().map(str::to_string);
        resolve_definition(&definition, named.as_deref(), flags, registry, cx)
    }
}
