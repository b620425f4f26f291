//! Prefix→resolver dispatch and the definition store.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, warn};

use locus_location::{ConfigBag, LocationDefinition, LocationManager, LocationProperties};
use locus_spec::LocationSpec;
use locus_types::DefinitionId;

use crate::context::ResolutionContext;
use crate::error::ResolveError;
use crate::resolver::{LocationResolver, Resolved};
use crate::resolvers;

/// The entry point for turning spec strings into live locations.
///
/// Holds the resolver table, the named-definition store (scanned from
/// the properties at construction), the catalog-item store, and the
/// arena every resolved location is managed into.
pub struct LocationRegistry {
    weak_self: Weak<LocationRegistry>,
    manager: Arc<LocationManager>,
    properties: LocationProperties,
    resolvers: RwLock<HashMap<String, Arc<dyn LocationResolver>>>,
    definitions: RwLock<HashMap<DefinitionId, LocationDefinition>>,
    catalog: RwLock<HashMap<String, LocationDefinition>>,
}

impl std::fmt::Debug for LocationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationRegistry")
            .field("resolvers", &self.resolvers.read().len())
            .field("definitions", &self.definitions.read().len())
            .field("managed", &self.manager.len())
            .finish()
    }
}

impl LocationRegistry {
    /// Builds a registry over the given properties: registers the
    /// fixed resolver set and scans `location.named.*` into the
    /// definition store.
    #[must_use]
    pub fn new(properties: LocationProperties) -> Arc<Self> {
        let registry = Arc::new_cyclic(|weak| Self {
            weak_self: weak.clone(),
            manager: LocationManager::new(),
            properties,
            resolvers: RwLock::new(HashMap::new()),
            definitions: RwLock::new(HashMap::new()),
            catalog: RwLock::new(HashMap::new()),
        });
        resolvers::register_defaults(&registry);
        registry.scan_definitions();
        registry
    }

    /// A registry with no properties, for programmatic setups.
    #[must_use]
    pub fn empty() -> Arc<Self> {
        Self::new(LocationProperties::new())
    }

    /// The arena holding every resolved location.
    #[must_use]
    pub fn manager(&self) -> &Arc<LocationManager> {
        &self.manager
    }

    /// A shared handle to this registry, for resolvers that defer work
    /// past the current call (lazy upstream resolution).
    #[must_use]
    pub fn shared(&self) -> Arc<Self> {
        // a registry is only ever reachable through its Arc
        self.weak_self.upgrade().expect("registry outlives its borrows")
    }

    /// The external properties this registry reads.
    #[must_use]
    pub fn properties(&self) -> &LocationProperties {
        &self.properties
    }

    /// Registers a resolver, replacing any previous holder of the same
    /// prefix. The replacement is logged and the previous resolver
    /// returned so callers can detect collisions.
    pub fn register_resolver(
        &self,
        resolver: Arc<dyn LocationResolver>,
    ) -> Option<Arc<dyn LocationResolver>> {
        let prefix = resolver.prefix().to_string();
        let previous = self.resolvers.write().insert(prefix.clone(), resolver);
        if previous.is_some() {
            warn!(prefix = %prefix, "replacing already-registered resolver");
        }
        previous
    }

    /// Looks up the resolver for a prefix.
    #[must_use]
    pub fn resolver(&self, prefix: &str) -> Option<Arc<dyn LocationResolver>> {
        self.resolvers.read().get(prefix).cloned()
    }

    /// Registers (or replaces, by id) a location definition.
    pub fn register_definition(&self, definition: LocationDefinition) {
        self.definitions
            .write()
            .insert(definition.id().clone(), definition);
    }

    /// Removes a definition by id, returning it if present.
    pub fn remove_definition(&self, id: &DefinitionId) -> Option<LocationDefinition> {
        self.definitions.write().remove(id)
    }

    /// Looks up a definition by id.
    #[must_use]
    pub fn definition_by_id(&self, id: &DefinitionId) -> Option<LocationDefinition> {
        self.definitions.read().get(id).cloned()
    }

    /// Looks up a definition by human name.
    #[must_use]
    pub fn definition_by_name(&self, name: &str) -> Option<LocationDefinition> {
        self.definitions
            .read()
            .values()
            .find(|d| d.name() == Some(name))
            .cloned()
    }

    /// Registers a catalog item holding a location definition.
    pub fn register_catalog_item(&self, item_id: impl Into<String>, definition: LocationDefinition) {
        self.catalog.write().insert(item_id.into(), definition);
    }

    /// Looks up a catalog item.
    #[must_use]
    pub fn catalog_item(&self, item_id: &str) -> Option<LocationDefinition> {
        self.catalog.read().get(item_id).cloned()
    }

    /// Resolves a spec with no caller flags.
    ///
    /// # Errors
    ///
    /// Any [`ResolveError`].
    pub fn resolve(&self, spec: &str) -> Result<Resolved, ResolveError> {
        self.resolve_with_flags(spec, ConfigBag::new())
    }

    /// Resolves a spec with caller-supplied flags, which outrank every
    /// property layer.
    ///
    /// # Errors
    ///
    /// Any [`ResolveError`].
    pub fn resolve_with_flags(
        &self,
        spec: &str,
        flags: ConfigBag,
    ) -> Result<Resolved, ResolveError> {
        let mut cx = ResolutionContext::new();
        self.resolve_in(spec, flags, &mut cx)
    }

    /// Resolves within an existing context; resolvers use this for
    /// their nested resolutions so the circular guard spans the whole
    /// chain.
    ///
    /// # Errors
    ///
    /// Any [`ResolveError`], including [`ResolveError::CircularReference`]
    /// when `spec` is already on the context's chain.
    pub fn resolve_in(
        &self,
        spec: &str,
        flags: ConfigBag,
        cx: &mut ResolutionContext,
    ) -> Result<Resolved, ResolveError> {
        cx.enter(spec)?;
        let parsed: LocationSpec = spec.parse()?;

        if let Some(resolver) = self.resolver(parsed.prefix()) {
            if resolver.accepts(&parsed, self) {
                return self.dispatch(&resolver, &parsed, flags, cx);
            }
        }

        // bare specs fall back to id, then name, then the default
        // cloud; anything carrying a colon must match a real prefix
        if !parsed.raw().contains(':') {
            for prefix in self.fallback_prefixes() {
                let Some(resolver) = self.resolver(&prefix) else {
                    continue;
                };
                if resolver.accepts(&parsed, self) {
                    debug!(spec = %parsed, fallback = %prefix, "resolving via fallback");
                    return self.dispatch(&resolver, &parsed, flags, cx);
                }
            }
        }

        Err(ResolveError::ResolverNotFound {
            spec: parsed.raw().to_string(),
            prefix: parsed.prefix().to_string(),
        })
    }

    fn fallback_prefixes(&self) -> Vec<String> {
        let mut order = vec!["id".to_string(), "named".to_string()];
        if let Some(cloud) = self.properties.default_cloud() {
            order.push(cloud);
        }
        order
    }

    fn dispatch(
        &self,
        resolver: &Arc<dyn LocationResolver>,
        parsed: &LocationSpec,
        mut flags: ConfigBag,
        cx: &mut ResolutionContext,
    ) -> Result<Resolved, ResolveError> {
        if resolver.merges_scoped_properties() {
            // precedence: caller flags > spec args > scoped/generic properties
            flags.merge_defaults(&ConfigBag::from_string_map(parsed.args()));
            let defaults =
                ConfigBag::from_map(self.properties.merged_for(Some(resolver.prefix()), None));
            flags.merge_defaults(&defaults);
        }
        debug!(spec = %parsed, resolver = resolver.prefix(), "resolving");
        let resolved = resolver.resolve(parsed, flags, self, cx)?;
        self.manager.manage(Arc::clone(resolved.location()));
        Ok(resolved)
    }

    fn scan_definitions(&self) {
        for name in self.properties.named_location_names() {
            if let Some(spec) = self.properties.named_spec(&name) {
                debug!(name = %name, spec = %spec, "scanned named location");
                self.register_definition(LocationDefinition::named(name, spec));
            }
        }
    }
}
