//! `named`: resolve through a named definition.

use locus_location::ConfigBag;
use locus_spec::LocationSpec;

use crate::context::ResolutionContext;
use crate::error::ResolveError;
use crate::registry::LocationRegistry;
use crate::resolver::{LocationResolver, Resolved};
use crate::resolvers::resolve_definition;

/// Resolves `named:<name>` (and, as a fallback, a bare `<name>`) by
/// looking the name up in the definition store and resolving its
/// target spec with the name's property overrides layered in.
pub struct NamedResolver;

impl LocationResolver for NamedResolver {
    fn prefix(&self) -> &str {
        "named"
    }

    fn accepts(&self, spec: &LocationSpec, registry: &LocationRegistry) -> bool {
        spec.prefix() == "named" || registry.definition_by_name(spec.raw()).is_some()
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
        let name = if spec.prefix() == "named" {
            spec.segments()
                .first()
                .cloned()
                .ok_or_else(|| ResolveError::malformed(spec.raw(), "named requires a location name"))?
        } else {
            spec.raw().to_string()
        };

        let definition = registry.definition_by_name(&name).ok_or_else(|| {
            ResolveError::UnknownDefinition {
                spec: spec.raw().to_string(),
                name: name.clone(),
            }
        })?;
        resolve_definition(&definition, Some(&name), flags, registry, cx)
    }
}
