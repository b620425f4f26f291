//! The location-spec parser.

use std::collections::BTreeMap;

use crate::error::SpecError;
use crate::kv::parse_key_value_pairs;

/// Returns the resolver prefix of a spec: everything before the first
/// `:` or `(`, whichever comes first.
///
/// Registry dispatch uses this without paying for a full parse.
///
/// # Example
///
/// ```
/// use locus_spec::spec_prefix;
///
/// assert_eq!(spec_prefix("byon:(hosts=a)"), "byon");
/// assert_eq!(spec_prefix("localhost"), "localhost");
/// assert_eq!(spec_prefix("named:prod"), "named");
/// ```
#[must_use]
pub fn spec_prefix(spec: &str) -> &str {
    let end = spec
        .find([':', '('])
        .unwrap_or(spec.len());
    &spec[..end]
}

/// A parsed location spec: prefix, path segments, and argument map.
///
/// Parsing is lossless in the sense that [`raw`](Self::raw) keeps the
/// original text for error messages and re-resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationSpec {
    raw: String,
    prefix: String,
    segments: Vec<String>,
    args: BTreeMap<String, String>,
}

impl LocationSpec {
    /// The original spec text.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The resolver prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The `:`-separated path segments between prefix and arguments.
    ///
    /// Most resolvers ignore these; `named` and `id` read the first one.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The full argument map.
    #[must_use]
    pub fn args(&self) -> &BTreeMap<String, String> {
        &self.args
    }

    /// Looks up one argument value.
    #[must_use]
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(String::as_str)
    }
}

impl std::str::FromStr for LocationSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(SpecError::syntax(s, "spec is empty"));
        }

        let (head, args) = match raw.find('(') {
            Some(open) => {
                if !raw.ends_with(')') {
                    return Err(SpecError::syntax(
                        raw,
                        "argument list is not closed with ')'",
                    ));
                }
                let body = &raw[open + 1..raw.len() - 1];
                if body.contains('(') || body.contains(')') {
                    return Err(SpecError::syntax(raw, "nested parentheses in arguments"));
                }
                (&raw[..open], parse_key_value_pairs(body, raw)?)
            }
            None => {
                if raw.contains(')') {
                    return Err(SpecError::syntax(raw, "')' without matching '('"));
                }
                (raw, BTreeMap::new())
            }
        };

        let (prefix, segments) = match head.split_once(':') {
            Some((prefix, rest)) => {
                let segments: Vec<String> = rest
                    .split(':')
                    .filter(|seg| !seg.is_empty())
                    .map(str::to_string)
                    .collect();
                (prefix, segments)
            }
            None => (head, Vec::new()),
        };

        if prefix.is_empty() {
            return Err(SpecError::syntax(raw, "spec has no prefix"));
        }
        if prefix.contains(['{', '}', '"']) {
            return Err(SpecError::syntax(
                raw,
                format!("prefix '{}' contains a reserved character", prefix),
            ));
        }

        Ok(Self {
            raw: raw.to_string(),
            prefix: prefix.to_string(),
            segments,
            args,
        })
    }
}

impl std::fmt::Display for LocationSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> LocationSpec {
        s.parse().unwrap()
    }

    #[test]
    fn bare_prefix() {
        let spec = parse("localhost");
        assert_eq!(spec.prefix(), "localhost");
        assert!(spec.segments().is_empty());
        assert!(spec.args().is_empty());
    }

    #[test]
    fn prefix_with_trailing_colon() {
        let spec = parse("localhost:");
        assert_eq!(spec.prefix(), "localhost");
        assert!(spec.segments().is_empty());
    }

    #[test]
    fn prefix_with_segments() {
        let spec = parse("named:prod:east");
        assert_eq!(spec.prefix(), "named");
        assert_eq!(spec.segments(), ["prod", "east"]);
    }

    #[test]
    fn prefix_with_args() {
        let spec = parse("byon:(hosts=\"10.0.0.1,10.0.0.2\",name=mypool)");
        assert_eq!(spec.prefix(), "byon");
        assert!(spec.segments().is_empty());
        assert_eq!(spec.arg("hosts"), Some("10.0.0.1,10.0.0.2"));
        assert_eq!(spec.arg("name"), Some("mypool"));
    }

    #[test]
    fn segments_and_args_together() {
        let spec = parse("cloud:region1:zone2(user=admin)");
        assert_eq!(spec.prefix(), "cloud");
        assert_eq!(spec.segments(), ["region1", "zone2"]);
        assert_eq!(spec.arg("user"), Some("admin"));
    }

    #[test]
    fn bare_quoted_arg() {
        let spec = parse("host:(\"10.1.2.3\")");
        assert_eq!(spec.prefix(), "host");
        assert_eq!(spec.arg("10.1.2.3"), Some(""));
    }

    #[test]
    fn unclosed_args_rejected() {
        assert!("byon:(hosts=a".parse::<LocationSpec>().is_err());
        assert!("byon:hosts=a)".parse::<LocationSpec>().is_err());
    }

    #[test]
    fn empty_spec_rejected() {
        assert!("".parse::<LocationSpec>().is_err());
        assert!("  ".parse::<LocationSpec>().is_err());
        assert!(":(a=b)".parse::<LocationSpec>().is_err());
    }

    #[test]
    fn reserved_char_in_key_rejected() {
        let err = "byon:(ho:sts=a)".parse::<LocationSpec>().unwrap_err();
        assert!(matches!(err, SpecError::ReservedCharInKey { .. }));
    }

    #[test]
    fn prefix_helper_matches_parser() {
        for s in ["byon:(a=b)", "localhost", "named:x", "host:(\"h\")"] {
            assert_eq!(spec_prefix(s), parse(s).prefix());
        }
    }

    #[test]
    fn raw_preserved_for_messages() {
        let spec = parse(" byon:(name=x) ");
        assert_eq!(spec.raw(), "byon:(name=x)");
        assert_eq!(spec.to_string(), "byon:(name=x)");
    }
}
