//! The resolver seam.

use std::sync::Arc;

use locus_location::{ConfigBag, LocationRef};
use locus_pool::MachineProvisioner;
use locus_spec::LocationSpec;

use crate::context::ResolutionContext;
use crate::error::ResolveError;
use crate::registry::LocationRegistry;

/// The outcome of one resolution.
///
/// Carries the location handle for the arena plus, when the location
/// can lease machines, the same object under its provisioner trait.
/// Both handles point at one instance.
#[derive(Debug, Clone)]
pub struct Resolved {
    location: LocationRef,
    provisioner: Option<Arc<dyn MachineProvisioner>>,
}

impl Resolved {
    /// A resolved machine pool.
    #[must_use]
    pub fn pool<P: MachineProvisioner + 'static>(pool: Arc<P>) -> Self {
        let location: LocationRef = pool.clone();
        let provisioner: Arc<dyn MachineProvisioner> = pool;
        Self {
            location,
            provisioner: Some(provisioner),
        }
    }

    /// A resolved location with no leasing capability.
    #[must_use]
    pub fn plain(location: LocationRef) -> Self {
        Self {
            location,
            provisioner: None,
        }
    }

    /// The location handle.
    #[must_use]
    pub fn location(&self) -> &LocationRef {
        &self.location
    }

    /// The leasing view, when the location is a pool.
    #[must_use]
    pub fn provisioner(&self) -> Option<Arc<dyn MachineProvisioner>> {
        self.provisioner.clone()
    }

    /// The leasing view, or an error naming the spec.
    ///
    /// # Errors
    ///
    /// [`ResolveError::NotAProvisioner`] when the location cannot lease
    /// machines.
    pub fn require_provisioner(&self, spec: &str) -> Result<Arc<dyn MachineProvisioner>, ResolveError> {
        self.provisioner
            .clone()
            .ok_or_else(|| ResolveError::NotAProvisioner {
                spec: spec.to_string(),
            })
    }
}

/// One entry in the prefix→resolver table.
pub trait LocationResolver: Send + Sync {
    /// The prefix this resolver claims.
    fn prefix(&self) -> &str;

    /// Whether this resolver can handle `spec`. Consulted both for
    /// exact prefix matches and for the colon-free fallback chain.
    fn accepts(&self, _spec: &LocationSpec, _registry: &LocationRegistry) -> bool {
        true
    }

    /// Whether the registry should merge `location.<prefix>.*`
    /// properties under the caller flags before calling `resolve`.
    /// Indirection resolvers (named, id, catalog) opt out; their
    /// targets get the merge instead.
    fn merges_scoped_properties(&self) -> bool {
        true
    }

    /// Resolves the spec into a live location.
    ///
    /// # Errors
    ///
    /// Any [`ResolveError`]; messages must carry the original spec.
    fn resolve(
        &self,
        spec: &LocationSpec,
        flags: ConfigBag,
        registry: &LocationRegistry,
        cx: &mut ResolutionContext,
    ) -> Result<Resolved, ResolveError>;
}
