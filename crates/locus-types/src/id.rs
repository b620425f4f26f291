//! Identifier types for locus.
//!
//! All live-object identifiers are UUID-based so they stay unique across
//! processes and can be persisted or sent over the wire without
//! coordination.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a live [`Location`] in the ownership tree.
///
/// Every location (plain node, machine, pool, remote channel) gets one
/// of these at construction and keeps it for life. Parent/child
/// relationships in the arena are expressed as `LocationId` references
/// rather than owning pointers.
///
/// # Example
///
/// ```
/// use locus_types::LocationId;
///
/// let a = LocationId::new();
/// let b = LocationId::new();
/// assert_ne!(a, b);
/// println!("created {}", a);
/// ```
///
/// [`Location`]: https://docs.rs/locus-location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationId(pub Uuid);

#[allow(clippy::new_without_default)] // Default would mint an id unknown to any arena
impl LocationId {
    /// Creates a new [`LocationId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for LocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "loc:{}", self.0)
    }
}

/// Identifier for a [`LocationDefinition`].
///
/// Definitions are registered (from scanned properties or explicit calls)
/// and looked up by this id, or by their human name. Unlike
/// [`LocationId`], a definition id can also be minted from a
/// caller-chosen string, because the `id:` resolver lets users reference
/// definitions by ids they wrote down in configuration.
///
/// # Example
///
/// ```
/// use locus_types::DefinitionId;
///
/// let generated = DefinitionId::new();
/// let explicit = DefinitionId::from("my-fixed-id");
/// assert_eq!(explicit.as_str(), "my-fixed-id");
/// assert_ne!(generated, explicit);
/// ```
///
/// [`LocationDefinition`]: https://docs.rs/locus-location
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DefinitionId(String);

#[allow(clippy::new_without_default)]
impl DefinitionId {
    /// Creates a new random definition id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DefinitionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DefinitionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_ids_are_unique() {
        let a = LocationId::new();
        let b = LocationId::new();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("loc:"));
    }

    #[test]
    fn definition_id_from_string_round_trips() {
        let id = DefinitionId::from("prod-east");
        assert_eq!(id.as_str(), "prod-east");
        assert_eq!(id.to_string(), "prod-east");
    }

    #[test]
    fn generated_definition_ids_differ() {
        assert_ne!(DefinitionId::new(), DefinitionId::new());
    }
}
