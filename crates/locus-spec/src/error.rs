//! Spec-grammar errors.

use locus_types::ErrorCode;
use thiserror::Error;

/// Error produced while parsing a location spec or expanding a glob.
///
/// All variants are validation failures; none are recoverable by
/// retrying.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpecError {
    /// The spec text did not match the grammar.
    #[error("invalid location spec '{spec}': {reason}")]
    Syntax { spec: String, reason: String },

    /// A key in the argument list contained one of the reserved
    /// characters `: ( ) { }`.
    #[error("invalid location spec '{spec}': key '{key}' contains a reserved character")]
    ReservedCharInKey { spec: String, key: String },

    /// A brace-expansion pattern was malformed.
    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },
}

impl SpecError {
    pub(crate) fn syntax(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Syntax {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn glob(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidGlob {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}

impl ErrorCode for SpecError {
    fn code(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "SPEC_SYNTAX",
            Self::ReservedCharInKey { .. } => "SPEC_RESERVED_CHAR_IN_KEY",
            Self::InvalidGlob { .. } => "SPEC_INVALID_GLOB",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locus_types::assert_error_codes;

    #[test]
    fn error_codes() {
        assert_error_codes(
            &[
                SpecError::syntax("x", "bad"),
                SpecError::ReservedCharInKey {
                    spec: "x".into(),
                    key: "a:b".into(),
                },
                SpecError::glob("a{", "unclosed brace"),
            ],
            "SPEC_",
        );
    }

    #[test]
    fn messages_carry_the_spec() {
        let err = SpecError::ReservedCharInKey {
            spec: "byon:(a{b=1)".into(),
            key: "a{b".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("byon:(a{b=1)"));
        assert!(msg.contains("'a{b'"));
    }
}
