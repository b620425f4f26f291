//! Resolution errors.
//!
//! Everything here is a configuration or programming error surfaced to
//! the caller immediately; the registry never retries. Recoverability
//! only flows through from the pool layer when building the resolved
//! location fails.

use locus_pool::PoolError;
use locus_spec::SpecError;
use locus_types::ErrorCode;
use thiserror::Error;

/// Error from resolving a location spec.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The spec text did not parse.
    #[error(transparent)]
    Spec(#[from] SpecError),

    /// No registered or fallback resolver claims the prefix.
    #[error("no resolver for spec '{spec}' (prefix '{prefix}')")]
    ResolverNotFound { spec: String, prefix: String },

    /// Named-spec resolution revisited a spec already on the chain.
    #[error("circular reference while resolving '{spec}': chain {}", .chain.join(" -> "))]
    CircularReference { spec: String, chain: Vec<String> },

    /// The spec names a definition that does not exist.
    #[error("spec '{spec}' refers to unknown definition '{name}'")]
    UnknownDefinition { spec: String, name: String },

    /// The prefix matched but the arguments are unusable.
    #[error("malformed arguments in spec '{spec}': {reason}")]
    Malformed { spec: String, reason: String },

    /// The spec resolved, but to something that cannot lease machines.
    #[error("spec '{spec}' does not resolve to a provisioning location")]
    NotAProvisioner { spec: String },

    /// Constructing the resolved location failed in the pool layer.
    #[error("building location for spec '{spec}': {source}")]
    Build {
        spec: String,
        #[source]
        source: PoolError,
    },
}

impl ResolveError {
    pub(crate) fn malformed(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn build(spec: impl Into<String>, source: PoolError) -> Self {
        Self::Build {
            spec: spec.into(),
            source,
        }
    }
}

impl ErrorCode for ResolveError {
    fn code(&self) -> &'static str {
        match self {
            Self::Spec(_) => "RESOLVE_SPEC_SYNTAX",
            Self::ResolverNotFound { .. } => "RESOLVE_RESOLVER_NOT_FOUND",
            Self::CircularReference { .. } => "RESOLVE_CIRCULAR_REFERENCE",
            Self::UnknownDefinition { .. } => "RESOLVE_UNKNOWN_DEFINITION",
            Self::Malformed { .. } => "RESOLVE_MALFORMED",
            Self::NotAProvisioner { .. } => "RESOLVE_NOT_A_PROVISIONER",
            Self::Build { .. } => "RESOLVE_BUILD",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Build { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locus_types::assert_error_codes;

    #[test]
    fn error_codes() {
        let syntax = "".parse::<locus_spec::LocationSpec>().unwrap_err();
        assert_error_codes(
            &[
                ResolveError::Spec(syntax),
                ResolveError::ResolverNotFound {
                    spec: "warp:x".into(),
                    prefix: "warp".into(),
                },
                ResolveError::CircularReference {
                    spec: "named:a".into(),
                    chain: vec!["named:a".into()],
                },
                ResolveError::UnknownDefinition {
                    spec: "named:ghost".into(),
                    name: "ghost".into(),
                },
                ResolveError::malformed("single:()", "missing target"),
                ResolveError::NotAProvisioner {
                    spec: "named:plain".into(),
                },
                ResolveError::build(
                    "byon:(hosts=x{)",
                    PoolError::InvalidHosts {
                        value: "x{".into(),
                        reason: "unclosed".into(),
                    },
                ),
            ],
            "RESOLVE_",
        );
    }

    #[test]
    fn circular_message_lists_the_chain() {
        let err = ResolveError::CircularReference {
            spec: "named:a".into(),
            chain: vec!["named:b".into(), "named:a".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("named:b -> named:a"));
    }

    #[test]
    fn only_pool_recoverability_flows_through() {
        let exhausted = ResolveError::build(
            "byon:(hosts=a)",
            PoolError::NoMachinesAvailable {
                pool: "p".into(),
                reason: "all leased".into(),
            },
        );
        assert!(exhausted.is_recoverable());

        let not_found = ResolveError::ResolverNotFound {
            spec: "warp:x".into(),
            prefix: "warp".into(),
        };
        assert!(!not_found.is_recoverable());
    }
}
