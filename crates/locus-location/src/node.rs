//! Per-node state shared by every concrete location type.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value;

use locus_types::{GeoCoordinates, LocationId};

use crate::arena::LocationManager;
use crate::config::ConfigBag;

/// The tree/config state embedded in every location.
///
/// Holds the stable id, display name, parent/children links (as id
/// references into the arena), the local config map, the
/// leftover-properties bag, and geo info. Concrete types delegate their
/// [`Location`](crate::Location) surface here so the tree behaves the
/// same for every variant.
#[derive(Debug)]
pub struct LocationCore {
    id: LocationId,
    display_name: RwLock<Option<String>>,
    parent: RwLock<Option<LocationId>>,
    children: RwLock<Vec<LocationId>>,
    config: RwLock<BTreeMap<String, Value>>,
    leftovers: RwLock<BTreeMap<String, Value>>,
    geo: RwLock<Option<GeoCoordinates>>,
    manager: RwLock<Weak<LocationManager>>,
}

impl LocationCore {
    /// Creates an unattached core with a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: LocationId::new(),
            display_name: RwLock::new(None),
            parent: RwLock::new(None),
            children: RwLock::new(Vec::new()),
            config: RwLock::new(BTreeMap::new()),
            leftovers: RwLock::new(BTreeMap::new()),
            geo: RwLock::new(None),
            manager: RwLock::new(Weak::new()),
        }
    }

    /// Creates a core and immediately consumes the common flags from
    /// `bag` (`displayName`/`name`, `latitude`+`longitude`).
    #[must_use]
    pub fn configured(bag: &mut ConfigBag) -> Self {
        let core = Self::new();
        core.configure(bag);
        core
    }

    /// The stable id.
    #[must_use]
    pub fn id(&self) -> LocationId {
        self.id
    }

    /// Consumes the flags every location understands.
    ///
    /// Recognized here: `displayName` (alias `name`), and the
    /// `latitude`/`longitude` pair. Everything else stays in the bag
    /// for the concrete type and, ultimately, the leftovers.
    pub fn configure(&self, bag: &mut ConfigBag) {
        if let Some(name) = bag
            .consume_str("displayName")
            .or_else(|| bag.consume_str("name"))
        {
            *self.display_name.write() = Some(name);
        }
        let lat = bag.consume_f64("latitude");
        let long = bag.consume_f64("longitude");
        if let (Some(lat), Some(long)) = (lat, long) {
            self.set_geo(Some(GeoCoordinates::new(lat, long)));
        }
    }

    /// Stores every still-unconsumed flag of `bag` as leftover
    /// properties.
    pub fn absorb_leftovers(&self, bag: ConfigBag) {
        self.leftovers.write().extend(bag.into_unconsumed());
    }

    /// Human-readable name, falling back to the id.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.display_name
            .read()
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }

    /// Sets the display name.
    pub fn set_display_name(&self, name: impl Into<String>) {
        *self.display_name.write() = Some(name.into());
    }

    /// The explicitly configured name, without the id fallback.
    #[must_use]
    pub fn custom_name(&self) -> Option<String> {
        self.display_name.read().clone()
    }

    /// Current parent id, if attached.
    #[must_use]
    pub fn parent(&self) -> Option<LocationId> {
        *self.parent.read()
    }

    /// Snapshot of the children ids, in attach order.
    #[must_use]
    pub fn children(&self) -> Vec<LocationId> {
        self.children.read().clone()
    }

    /// Sets a local config value.
    pub fn set_config(&self, key: impl Into<String>, value: Value) {
        self.config.write().insert(key.into(), value);
    }

    /// Local config value, no inheritance.
    #[must_use]
    pub fn config_value(&self, key: &str) -> Option<Value> {
        self.config
            .read()
            .get(key)
            .cloned()
            .or_else(|| self.leftovers.read().get(key).cloned())
    }

    /// Config lookup with inheritance: local value if present, else the
    /// parent chain, else `None`. Absence is never an error.
    #[must_use]
    pub fn find_property(&self, key: &str) -> Option<Value> {
        if let Some(v) = self.config_value(key) {
            return Some(v);
        }
        let manager = self.manager()?;
        let mut next = self.parent();
        while let Some(id) = next {
            let loc = manager.get(id)?;
            if let Some(v) = loc.core().config_value(key) {
                return Some(v);
            }
            next = loc.core().parent();
        }
        None
    }

    /// Geo info: this location's own, or inherited from the nearest
    /// ancestor that carries one.
    #[must_use]
    pub fn geo(&self) -> Option<GeoCoordinates> {
        if let Some(g) = *self.geo.read() {
            return Some(g);
        }
        let manager = self.manager()?;
        let mut next = self.parent();
        while let Some(id) = next {
            let loc = manager.get(id)?;
            if let Some(g) = *loc.core().geo.read() {
                return Some(g);
            }
            next = loc.core().parent();
        }
        None
    }

    /// Sets geo info. Once set, a later `None` never clears it.
    pub fn set_geo(&self, geo: Option<GeoCoordinates>) {
        if let Some(geo) = geo {
            *self.geo.write() = Some(geo);
        }
    }

    /// The owning arena, while it is alive and this node is managed.
    #[must_use]
    pub fn manager(&self) -> Option<Arc<LocationManager>> {
        self.manager.read().upgrade()
    }

    pub(crate) fn set_manager(&self, manager: Weak<LocationManager>) {
        *self.manager.write() = manager;
    }

    pub(crate) fn clear_manager(&self) {
        *self.manager.write() = Weak::new();
    }

    pub(crate) fn set_parent_id(&self, parent: Option<LocationId>) {
        *self.parent.write() = parent;
    }

    pub(crate) fn add_child_id(&self, child: LocationId) {
        let mut children = self.children.write();
        if !children.contains(&child) {
            children.push(child);
        }
    }

    pub(crate) fn remove_child_id(&self, child: LocationId) {
        self.children.write().retain(|c| *c != child);
    }
}

impl Default for LocationCore {
    fn default() -> Self {
        Self::new()
    }
}

/// A plain tree node with no machine or pool behavior.
///
/// Used for grouping (availability-zone parents, test fixtures) where
/// only the tree and config-inheritance surface matters.
#[derive(Debug, Default)]
pub struct BasicLocation {
    core: LocationCore,
}

impl BasicLocation {
    /// Creates an unconfigured node.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a node from construction flags; unrecognized flags land
    /// in the leftovers.
    #[must_use]
    pub fn from_flags(mut bag: ConfigBag) -> Self {
        let core = LocationCore::configured(&mut bag);
        core.absorb_leftovers(bag);
        Self { core }
    }
}

impl crate::Location for BasicLocation {
    fn core(&self) -> &LocationCore {
        &self.core
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
