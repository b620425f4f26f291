//! Comma-separated `key=value` parsing with quote and brace awareness.

use std::collections::BTreeMap;

use crate::error::SpecError;

const RESERVED_KEY_CHARS: [char; 5] = [':', '(', ')', '{', '}'];

/// Splits `input` on top-level occurrences of `delimiter`.
///
/// A delimiter inside a double-quoted run or inside `{...}` braces does
/// not split. Quotes may be escaped with a backslash inside a quoted
/// run.
///
/// # Example
///
/// ```
/// use locus_spec::split_top_level;
///
/// let parts = split_top_level("a,\"b,c\",d{e,f}", ',').unwrap();
/// assert_eq!(parts, vec!["a", "\"b,c\"", "d{e,f}"]);
/// ```
pub fn split_top_level(input: &str, delimiter: char) -> Result<Vec<&str>, SpecError> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut prev = '\0';

    for (i, c) in input.char_indices() {
        if in_quote {
            if c == '"' && prev != '\\' {
                in_quote = false;
            }
        } else {
            match c {
                '"' => in_quote = true,
                '{' => depth += 1,
                '}' => {
                    depth = depth.checked_sub(1).ok_or_else(|| {
                        SpecError::syntax(input, "unbalanced '}'")
                    })?;
                }
                _ if c == delimiter && depth == 0 => {
                    parts.push(&input[start..i]);
                    start = i + c.len_utf8();
                }
                _ => {}
            }
        }
        prev = c;
    }
    if in_quote {
        return Err(SpecError::syntax(input, "unterminated double quote"));
    }
    if depth != 0 {
        return Err(SpecError::syntax(input, "unbalanced '{'"));
    }
    parts.push(&input[start..]);
    Ok(parts)
}

/// Parses a parenthesized argument body (`k1=v1,k2="v,2"`) into a map.
///
/// Values may be double-quoted to protect embedded commas; the quotes
/// are stripped. A bare key with no `=` maps to the empty string. Keys
/// are unique; a repeated key keeps the last value. Reserved characters
/// in a key reject the whole spec, naming the key.
///
/// `full_spec` is the original spec text, carried into error messages.
pub fn parse_key_value_pairs(
    args: &str,
    full_spec: &str,
) -> Result<BTreeMap<String, String>, SpecError> {
    let mut map = BTreeMap::new();
    for token in split_top_level(args, ',')? {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        // bare tokens (no '=') may still be quoted, e.g. host:("1.2.3.4");
        // a quoted bare token is a value, so reserved characters inside
        // the quotes pass through to the resolver
        let (key, value, check_reserved) = match token.split_once('=') {
            Some((k, v)) => (k.trim().to_string(), v.trim(), true),
            None if is_quoted(token) => (unquote(token), "", false),
            None => (token.to_string(), "", true),
        };
        if key.is_empty() {
            return Err(SpecError::syntax(
                full_spec,
                format!("argument '{}' has an empty key", token),
            ));
        }
        if check_reserved && key.contains(RESERVED_KEY_CHARS) {
            return Err(SpecError::ReservedCharInKey {
                spec: full_spec.to_string(),
                key,
            });
        }
        map.insert(key, unquote(value));
    }
    Ok(map)
}

fn is_quoted(value: &str) -> bool {
    value.len() >= 2 && value.starts_with('"') && value.ends_with('"')
}

/// Strips one layer of surrounding double quotes and unescapes `\"`.
fn unquote(value: &str) -> String {
    if is_quoted(value) {
        value[1..value.len() - 1].replace("\\\"", "\"")
    } else {
        value.to_string()
    }
}
