//! Location-tree errors.

use std::path::PathBuf;

use locus_types::{ErrorCode, LocationId};
use thiserror::Error;

/// Error from tree manipulation or properties loading.
#[derive(Debug, Error)]
pub enum LocationError {
    /// A location cannot be its own parent.
    #[error("location {id} cannot be its own parent")]
    SelfParent { id: LocationId },

    /// The requested parent is a descendant of the location, so the
    /// link would close a cycle.
    #[error("setting parent of {id} to {parent} would make {id} its own ancestor")]
    WouldCycle { id: LocationId, parent: LocationId },

    /// The location id is not registered with this manager.
    #[error("location {id} is not managed here")]
    NotManaged { id: LocationId },

    /// A properties file could not be read.
    #[error("cannot read properties file {path}")]
    PropertiesRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A properties file was not valid TOML.
    #[error("cannot parse properties file {path}")]
    PropertiesParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ErrorCode for LocationError {
    fn code(&self) -> &'static str {
        match self {
            Self::SelfParent { .. } => "LOCATION_SELF_PARENT",
            Self::WouldCycle { .. } => "LOCATION_WOULD_CYCLE",
            Self::NotManaged { .. } => "LOCATION_NOT_MANAGED",
            Self::PropertiesRead { .. } => "LOCATION_PROPERTIES_READ",
            Self::PropertiesParse { .. } => "LOCATION_PROPERTIES_PARSE",
        }
    }

    fn is_recoverable(&self) -> bool {
        // tree-shape and config mistakes are not fixed by retrying
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locus_types::assert_error_code;

    #[test]
    fn error_codes() {
        let id = LocationId::new();
        assert_error_code(&LocationError::SelfParent { id }, "LOCATION_");
        assert_error_code(&LocationError::NotManaged { id }, "LOCATION_");
        assert_error_code(
            &LocationError::WouldCycle {
                id,
                parent: LocationId::new(),
            },
            "LOCATION_",
        );
    }
}
