//! Named location definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use locus_types::DefinitionId;

/// An immutable record describing a resolvable location.
///
/// Definitions come from scanned properties (`location.named.<name>`)
/// or explicit registration, are looked up by id or name, and are never
/// mutated in place, only replaced or removed. The spec may itself
/// point at another named location; the registry's resolution context
/// bounds such chains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDefinition {
    id: DefinitionId,
    name: Option<String>,
    spec: String,
    config: BTreeMap<String, Value>,
}

impl LocationDefinition {
    /// Creates a definition with an explicit id.
    #[must_use]
    pub fn new(
        id: DefinitionId,
        name: Option<String>,
        spec: impl Into<String>,
        config: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            id,
            name,
            spec: spec.into(),
            config,
        }
    }

    /// Creates a named definition with a generated id and no static
    /// config.
    #[must_use]
    pub fn named(name: impl Into<String>, spec: impl Into<String>) -> Self {
        Self {
            id: DefinitionId::new(),
            name: Some(name.into()),
            spec: spec.into(),
            config: BTreeMap::new(),
        }
    }

    /// The opaque definition id.
    #[must_use]
    pub fn id(&self) -> &DefinitionId {
        &self.id
    }

    /// The human name, when one was given.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The target spec string.
    #[must_use]
    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// The static configuration attached to this definition.
    #[must_use]
    pub fn config(&self) -> &BTreeMap<String, Value> {
        &self.config
    }
}

impl std::fmt::Display for LocationDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({} -> {})", name, self.id, self.spec),
            None => write!(f, "{} -> {}", self.id, self.spec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_definition_round_trips() {
        let def = LocationDefinition::named("prod-east", "byon:(hosts=a)");
        assert_eq!(def.name(), Some("prod-east"));
        assert_eq!(def.spec(), "byon:(hosts=a)");
        assert!(def.config().is_empty());
    }

    #[test]
    fn display_includes_name_and_spec() {
        let def = LocationDefinition::new(
            DefinitionId::from("fixed"),
            Some("prod".into()),
            "localhost",
            BTreeMap::new(),
        );
        let text = def.to_string();
        assert!(text.contains("prod"));
        assert!(text.contains("localhost"));
    }
}
