//! The `location.*` properties namespace.
//!
//! External configuration reaches this core as a flat key space:
//!
//! | Key shape                      | Meaning                              |
//! |--------------------------------|--------------------------------------|
//! | `location.<k>`                 | generic, applies to all locations    |
//! | `location.<prefix>.<k>`        | scoped to one provider prefix        |
//! | `location.named.<name>`        | a named location's target spec       |
//! | `location.named.<name>.<k>`    | per-named-location override          |
//!
//! [`LocationProperties::merged_for`] collapses these into one map in
//! ascending precedence (generic < scoped < named); caller flags merge
//! on top of that in the registry. Deprecated dash-cased keys remap to
//! camelCase, warning once per key.
//!
//! In TOML, a named location's overrides use quoted dotted keys next to
//! its target spec (`prod = "..."` and `"prod.user" = "..."` in the
//! same `[location.named]` table): TOML rejects `prod` as both a value
//! and a `[location.named.prod]` sub-table.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::LocationError;

const NAMED_PREFIX: &str = "location.named.";

/// Flat key→value view of the external properties collaborator.
#[derive(Debug, Default)]
pub struct LocationProperties {
    entries: BTreeMap<String, Value>,
    /// Dash-cased keys already warned about, so each warns once.
    warned: Mutex<HashSet<String>>,
}

impl LocationProperties {
    /// Creates an empty property set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads properties from a TOML file.
    ///
    /// Nested tables flatten into dotted keys, and quoted dotted keys
    /// flatten the same way: `"prod.user" = "x"` under
    /// `[location.named]` becomes `location.named.prod.user`.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError`] when the file cannot be read or is not
    /// valid TOML.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, LocationError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| LocationError::PropertiesRead {
                path: path.to_path_buf(),
                source,
            })?;
        let props = Self::from_toml_str(&content).map_err(|source| {
            LocationError::PropertiesParse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        debug!(path = %path.display(), entries = props.entries.len(), "loaded location properties");
        Ok(props)
    }

    /// Parses properties from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the underlying TOML error for malformed input.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let table: toml::Table = content.parse()?;
        let mut props = Self::new();
        flatten_table("", &table, &mut props.entries);
        Ok(props)
    }

    /// Inserts one property.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Raw lookup of one property.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// True when no properties are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The names of all defined named locations
    /// (`location.named.<name>` entries whose value is the target
    /// spec).
    #[must_use]
    pub fn named_location_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|(k, _)| {
                let rest = k.strip_prefix(NAMED_PREFIX)?;
                if rest.is_empty() || rest.contains('.') {
                    None
                } else {
                    Some(rest.to_string())
                }
            })
            .collect()
    }

    /// The target spec of a named location, if defined.
    #[must_use]
    pub fn named_spec(&self, name: &str) -> Option<String> {
        match self.entries.get(&format!("{}{}", NAMED_PREFIX, name))? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Merges the namespace layers that apply to one resolution, in
    /// ascending precedence: generic `location.*`, then
    /// `location.<provider>.*`, then `location.named.<name>.*`.
    ///
    /// Caller-supplied flags outrank everything here and merge on top
    /// in the registry.
    #[must_use]
    pub fn merged_for(&self, provider: Option<&str>, named: Option<&str>) -> BTreeMap<String, Value> {
        let mut merged = BTreeMap::new();
        self.merge_layer(&mut merged, "location.", |rest| {
            // one level only; deeper keys belong to scoped layers
            (!rest.contains('.') && rest != "defaultCloud").then(|| rest.to_string())
        });
        if let Some(provider) = provider {
            let scope = format!("location.{}.", provider);
            self.merge_layer(&mut merged, &scope, |rest| Some(rest.to_string()));
        }
        if let Some(name) = named {
            let scope = format!("{}{}.", NAMED_PREFIX, name);
            self.merge_layer(&mut merged, &scope, |rest| Some(rest.to_string()));
        }
        merged
    }

    /// The configured default cloud provider prefix, if any
    /// (`location.defaultCloud`).
    #[must_use]
    pub fn default_cloud(&self) -> Option<String> {
        match self.entries.get("location.defaultCloud")? {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn merge_layer<F>(&self, merged: &mut BTreeMap<String, Value>, prefix: &str, keep: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (key, value) in self.entries.range(prefix.to_string()..) {
            let Some(rest) = key.strip_prefix(prefix) else {
                break;
            };
            if rest.starts_with("named.") && prefix == "location." {
                continue;
            }
            if let Some(kept) = keep(rest) {
                merged.insert(self.remap_key(&kept), value.clone());
            }
        }
    }

    /// Remaps a deprecated dash-cased key to camelCase, warning once.
    fn remap_key(&self, key: &str) -> String {
        if !key.contains('-') {
            return key.to_string();
        }
        let remapped = dash_to_camel(key);
        if self.warned.lock().insert(key.to_string()) {
            warn!(
                deprecated = key,
                replacement = %remapped,
                "dash-cased property key is deprecated, use camelCase"
            );
        }
        remapped
    }
}

/// `ssh-user` -> `sshUser`.
fn dash_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for c in key.chars() {
        if c == '-' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn flatten_table(prefix: &str, table: &toml::Table, out: &mut BTreeMap<String, Value>) {
    for (key, value) in table {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            toml::Value::Table(inner) => flatten_table(&full, inner, out),
            other => {
                out.insert(full, toml_to_json(other));
            }
        }
    }
}

fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::from(*i),
        toml::Value::Float(f) => {
            serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number)
        }
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            let mut map = serde_json::Map::new();
            for (k, v) in table {
                map.insert(k.clone(), toml_to_json(v));
            }
            Value::Object(map)
        }
    }
}
