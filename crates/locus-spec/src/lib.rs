//! Location-spec grammar for locus.
//!
//! A location spec is a short text like `byon:(hosts="a,b",name=pool)`
//! naming a resolver prefix, optional path segments, and a key=value
//! argument map. This crate is pure string processing; dispatch to
//! resolvers lives in `locus-registry`.
//!
//! # Grammar
//!
//! ```text
//! spec     := prefix [ ':' segment (':' segment)* ] [ '(' args ')' ]
//! args     := kv ( ',' kv )*
//! kv       := key '=' value | key
//! ```
//!
//! - `prefix` is everything before the first `:` or `(`, whichever
//!   comes first
//! - values may be double-quoted to protect embedded commas; commas
//!   inside `{...}` braces do not split either
//! - the reserved characters `:` `(` `)` `{` `}` may not appear in a key
//!
//! # Example
//!
//! ```
//! use locus_spec::LocationSpec;
//!
//! let spec: LocationSpec = "byon:(hosts=\"10.0.0.1,10.0.0.2\",name=mypool)"
//!     .parse()
//!     .unwrap();
//! assert_eq!(spec.prefix(), "byon");
//! assert_eq!(spec.arg("name"), Some("mypool"));
//! assert_eq!(spec.arg("hosts"), Some("10.0.0.1,10.0.0.2"));
//! ```

mod error;
mod globs;
mod kv;
mod parser;

pub use error::SpecError;
pub use globs::{expand_braces, expand_host_list};
pub use kv::{parse_key_value_pairs, split_top_level};
pub use parser::{spec_prefix, LocationSpec};
