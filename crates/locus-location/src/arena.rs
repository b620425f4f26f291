//! The arena that owns every live location.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::debug;

use locus_types::LocationId;

use crate::error::LocationError;
use crate::traits::LocationRef;

/// Id-keyed store of all managed locations.
///
/// Parent/child links are id references resolved through this arena, so
/// the tree has no ownership cycles: the arena holds the only strong
/// `Arc` per location besides whatever callers keep, and nodes refer to
/// the arena weakly.
///
/// All link mutations go through [`set_parent`](Self::set_parent) and
/// [`unmanage`](Self::unmanage), which keep the links symmetric and the
/// tree acyclic.
#[derive(Debug)]
pub struct LocationManager {
    weak_self: Weak<LocationManager>,
    locations: RwLock<HashMap<LocationId, LocationRef>>,
}

impl LocationManager {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            weak_self: weak.clone(),
            locations: RwLock::new(HashMap::new()),
        })
    }

    /// Registers a location and hands back its shared handle.
    ///
    /// Managing an already-managed location is a no-op re-insert.
    pub fn manage(&self, location: LocationRef) -> LocationRef {
        location.core().set_manager(self.weak_self.clone());
        let id = location.id();
        debug!(location = %id, name = %location.display_name(), "managing location");
        self.locations.write().insert(id, Arc::clone(&location));
        location
    }

    /// Looks up a managed location by id.
    #[must_use]
    pub fn get(&self, id: LocationId) -> Option<LocationRef> {
        self.locations.read().get(&id).cloned()
    }

    /// True when the id is currently managed.
    #[must_use]
    pub fn is_managed(&self, id: LocationId) -> bool {
        self.locations.read().contains_key(&id)
    }

    /// Ids of all managed locations, in no particular order.
    #[must_use]
    pub fn managed_ids(&self) -> Vec<LocationId> {
        self.locations.read().keys().copied().collect()
    }

    /// Number of managed locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.read().len()
    }

    /// True when nothing is managed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.read().is_empty()
    }

    /// Re-parents `child` under `parent` (or detaches it with `None`)
    /// as one logical step: symmetric removal from the old parent,
    /// symmetric add to the new one.
    ///
    /// # Errors
    ///
    /// - [`LocationError::NotManaged`] if either id is unknown
    /// - [`LocationError::SelfParent`] for `parent == child`
    /// - [`LocationError::WouldCycle`] if `parent` is `child` or any of
    ///   its descendants, at any depth
    pub fn set_parent(
        &self,
        child: LocationId,
        parent: Option<LocationId>,
    ) -> Result<(), LocationError> {
        let child_loc = self.get(child).ok_or(LocationError::NotManaged { id: child })?;

        if let Some(parent_id) = parent {
            if parent_id == child {
                return Err(LocationError::SelfParent { id: child });
            }
            let parent_loc = self
                .get(parent_id)
                .ok_or(LocationError::NotManaged { id: parent_id })?;

            // walking up from the new parent must never reach the child
            let mut cursor = parent_loc.core().parent();
            while let Some(ancestor) = cursor {
                if ancestor == child {
                    return Err(LocationError::WouldCycle {
                        id: child,
                        parent: parent_id,
                    });
                }
                cursor = self.get(ancestor).and_then(|l| l.core().parent());
            }

            if child_loc.core().parent() == Some(parent_id) {
                return Ok(());
            }
            self.detach_from_parent(&child_loc);
            child_loc.core().set_parent_id(Some(parent_id));
            parent_loc.core().add_child_id(child);
        } else {
            self.detach_from_parent(&child_loc);
            child_loc.core().set_parent_id(None);
        }
        Ok(())
    }

    /// Removes a location and its whole subtree from management.
    ///
    /// The location is detached from its parent, every descendant is
    /// unmanaged bottom-up, and each removed location's `close` runs so
    /// held remote resources are released.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::NotManaged`] for an unknown id.
    pub fn unmanage(&self, id: LocationId) -> Result<(), LocationError> {
        let location = self.get(id).ok_or(LocationError::NotManaged { id })?;
        self.detach_from_parent(&location);
        location.core().set_parent_id(None);
        self.unmanage_subtree(&location);
        Ok(())
    }

    fn unmanage_subtree(&self, location: &LocationRef) {
        for child_id in location.core().children() {
            if let Some(child) = self.get(child_id) {
                self.unmanage_subtree(&child);
            }
        }
        let id = location.id();
        debug!(location = %id, "unmanaging location");
        self.locations.write().remove(&id);
        location.close();
        location.core().clear_manager();
    }

    fn detach_from_parent(&self, location: &LocationRef) {
        if let Some(old_parent) = location.core().parent() {
            if let Some(parent_loc) = self.get(old_parent) {
                parent_loc.core().remove_child_id(location.id());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::BasicLocation;
    use serde_json::json;

    fn node(manager: &Arc<LocationManager>) -> LocationRef {
        manager.manage(Arc::new(BasicLocation::new()))
    }

    #[test]
    fn parent_child_links_are_symmetric() {
        let manager = LocationManager::new();
        let parent = node(&manager);
        let child = node(&manager);

        manager.set_parent(child.id(), Some(parent.id())).unwrap();
        assert_eq!(child.core().parent(), Some(parent.id()));
        assert_eq!(parent.core().children(), vec![child.id()]);

        manager.set_parent(child.id(), None).unwrap();
        assert_eq!(child.core().parent(), None);
        assert!(parent.core().children().is_empty());
    }

    #[test]
    fn reparenting_detaches_from_old_parent() {
        let manager = LocationManager::new();
        let a = node(&manager);
        let b = node(&manager);
        let child = node(&manager);

        manager.set_parent(child.id(), Some(a.id())).unwrap();
        manager.set_parent(child.id(), Some(b.id())).unwrap();
        assert!(a.core().children().is_empty());
        assert_eq!(b.core().children(), vec![child.id()]);
    }

    #[test]
    fn set_parent_to_current_parent_is_noop() {
        let manager = LocationManager::new();
        let parent = node(&manager);
        let child = node(&manager);

        manager.set_parent(child.id(), Some(parent.id())).unwrap();
        manager.set_parent(child.id(), Some(parent.id())).unwrap();
        assert_eq!(parent.core().children(), vec![child.id()]);
    }

    #[test]
    fn self_parent_rejected() {
        let manager = LocationManager::new();
        let a = node(&manager);
        let err = manager.set_parent(a.id(), Some(a.id())).unwrap_err();
        assert!(matches!(err, LocationError::SelfParent { .. }));
    }

    #[test]
    fn transitive_cycle_rejected_at_depth() {
        let manager = LocationManager::new();
        let a = node(&manager);
        let b = node(&manager);
        let c = node(&manager);
        let d = node(&manager);

        manager.set_parent(b.id(), Some(a.id())).unwrap();
        manager.set_parent(c.id(), Some(b.id())).unwrap();
        manager.set_parent(d.id(), Some(c.id())).unwrap();

        // a under d would make a its own ancestor, three levels deep
        let err = manager.set_parent(a.id(), Some(d.id())).unwrap_err();
        assert!(matches!(err, LocationError::WouldCycle { .. }));
    }

    #[test]
    fn find_property_recurses_to_parent_chain() {
        let manager = LocationManager::new();
        let grandparent = node(&manager);
        let parent = node(&manager);
        let child = node(&manager);

        manager.set_parent(parent.id(), Some(grandparent.id())).unwrap();
        manager.set_parent(child.id(), Some(parent.id())).unwrap();

        grandparent.core().set_config("shared", json!("top"));
        parent.core().set_config("near", json!("mid"));

        assert_eq!(child.core().find_property("near"), Some(json!("mid")));
        assert_eq!(child.core().find_property("shared"), Some(json!("top")));
        assert_eq!(child.core().find_property("absent"), None);
    }

    #[test]
    fn geo_inherited_from_parent() {
        use locus_types::GeoCoordinates;

        let manager = LocationManager::new();
        let parent = node(&manager);
        let child = node(&manager);
        manager.set_parent(child.id(), Some(parent.id())).unwrap();

        parent.core().set_geo(Some(GeoCoordinates::new(35.6, 139.7)));
        assert_eq!(child.core().geo(), Some(GeoCoordinates::new(35.6, 139.7)));
    }

    #[test]
    fn unmanage_removes_subtree_and_detaches() {
        let manager = LocationManager::new();
        let root = node(&manager);
        let mid = node(&manager);
        let leaf = node(&manager);

        manager.set_parent(mid.id(), Some(root.id())).unwrap();
        manager.set_parent(leaf.id(), Some(mid.id())).unwrap();

        manager.unmanage(mid.id()).unwrap();
        assert!(manager.is_managed(root.id()));
        assert!(!manager.is_managed(mid.id()));
        assert!(!manager.is_managed(leaf.id()));
        assert!(root.core().children().is_empty());
    }

    #[test]
    fn unmanage_unknown_id_errors() {
        let manager = LocationManager::new();
        let err = manager.unmanage(LocationId::new()).unwrap_err();
        assert!(matches!(err, LocationError::NotManaged { .. }));
    }
}
