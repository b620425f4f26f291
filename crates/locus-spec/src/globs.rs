//! Brace-expansion globs for host lists.
//!
//! `host{1,2}` expands to `host1, host2`; `host{1-3}` expands the
//! numeric range; expansions nest and preserve left-to-right order.

use crate::error::SpecError;
use crate::kv::split_top_level;

/// Expands a brace-glob pattern into its alternatives.
///
/// Given `{..,X,..,Y,..}`, X comes before Y in the result. Numeric
/// ranges (`{1-3}`) expand in ascending order; a leading zero on the
/// lower bound pads every expansion to that width. A pattern with no
/// braces expands to itself.
///
/// # Example
///
/// ```
/// use locus_spec::expand_braces;
///
/// assert_eq!(
///     expand_braces("host{1,3}.example").unwrap(),
///     vec!["host1.example", "host3.example"]
/// );
/// assert_eq!(
///     expand_braces("node{01-03}").unwrap(),
///     vec!["node01", "node02", "node03"]
/// );
/// ```
pub fn expand_braces(pattern: &str) -> Result<Vec<String>, SpecError> {
    let Some(open) = pattern.find('{') else {
        if pattern.contains('}') {
            return Err(SpecError::glob(pattern, "'}' without matching '{'"));
        }
        return Ok(vec![pattern.to_string()]);
    };
    let close = matching_close(pattern, open)
        .ok_or_else(|| SpecError::glob(pattern, "'{' is never closed"))?;

    let head = &pattern[..open];
    let body = &pattern[open + 1..close];
    let tail = &pattern[close + 1..];

    let mut result = Vec::new();
    let tails = expand_braces(tail)?;
    for alternative in split_alternatives(body, pattern)? {
        for expansion in expand_alternative(&alternative, pattern)? {
            // an alternative may itself hold nested groups
            for inner in expand_braces(&expansion)? {
                for rest in &tails {
                    result.push(format!("{}{}{}", head, inner, rest));
                }
            }
        }
    }
    Ok(result)
}

/// Expands a comma-separated host-list value into concrete entries.
///
/// Splits on top-level commas (commas inside braces or quotes do not
/// split), trims whitespace, skips empty entries, and brace-expands each
/// one. Entries keep any `user@` part untouched.
///
/// # Example
///
/// ```
/// use locus_spec::expand_host_list;
///
/// assert_eq!(
///     expand_host_list("10.0.0.1, admin@host{1,2}").unwrap(),
///     vec!["10.0.0.1", "admin@host1", "admin@host2"]
/// );
/// ```
pub fn expand_host_list(value: &str) -> Result<Vec<String>, SpecError> {
    let mut hosts = Vec::new();
    for entry in split_top_level(value, ',')? {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        hosts.extend(expand_braces(entry)?);
    }
    Ok(hosts)
}

/// Index of the `}` matching the `{` at `open`.
fn matching_close(pattern: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in pattern[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits a brace body on commas outside nested braces.
fn split_alternatives(body: &str, pattern: &str) -> Result<Vec<String>, SpecError> {
    let mut alternatives = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in body.chars() {
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| SpecError::glob(pattern, "unbalanced '}' inside braces"))?;
                current.push(c);
            }
            ',' if depth == 0 => {
                alternatives.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    alternatives.push(current);
    Ok(alternatives)
}

/// Expands one alternative: a `N-M` numeric range becomes the run of
/// numbers, anything else is literal.
fn expand_alternative(alt: &str, pattern: &str) -> Result<Vec<String>, SpecError> {
    if let Some((lo, hi)) = alt.split_once('-') {
        if !lo.is_empty()
            && !hi.is_empty()
            && lo.chars().all(|c| c.is_ascii_digit())
            && hi.chars().all(|c| c.is_ascii_digit())
        {
            let start: u64 = lo
                .parse()
                .map_err(|_| SpecError::glob(pattern, format!("range bound '{}' too large", lo)))?;
            let end: u64 = hi
                .parse()
                .map_err(|_| SpecError::glob(pattern, format!("range bound '{}' too large", hi)))?;
            if start > end {
                return Err(SpecError::glob(
                    pattern,
                    format!("descending numeric range '{}'", alt),
                ));
            }
            let width = if lo.starts_with('0') && lo.len() > 1 {
                lo.len()
            } else {
                0
            };
            return Ok((start..=end)
                .map(|n| format!("{:0width$}", n, width = width))
                .collect());
        }
    }
    Ok(vec![alt.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_braces_is_identity() {
        assert_eq!(expand_braces("plainhost").unwrap(), vec!["plainhost"]);
    }

    #[test]
    fn comma_alternatives_keep_order() {
        assert_eq!(
            expand_braces("a{,b,c}").unwrap(),
            vec!["a", "ab", "ac"]
        );
    }

    #[test]
    fn numeric_range_expands() {
        assert_eq!(
            expand_braces("host{1-3}").unwrap(),
            vec!["host1", "host2", "host3"]
        );
    }

    #[test]
    fn numeric_range_keeps_zero_padding() {
        assert_eq!(
            expand_braces("n{08-11}").unwrap(),
            vec!["n08", "n09", "n10", "n11"]
        );
    }

    #[test]
    fn prefix_group_expands() {
        assert_eq!(
            expand_braces("{a,b}-node").unwrap(),
            vec!["a-node", "b-node"]
        );
    }

    #[test]
    fn multiple_groups_expand_left_to_right() {
        assert_eq!(
            expand_braces("{a,b}{1,2}").unwrap(),
            vec!["a1", "a2", "b1", "b2"]
        );
    }

    #[test]
    fn nested_groups_expand() {
        assert_eq!(
            expand_braces("x{y{1,2},z}").unwrap(),
            vec!["xy1", "xy2", "xz"]
        );
    }

    #[test]
    fn malformed_braces_rejected() {
        assert!(expand_braces("a{b").is_err());
        assert!(expand_braces("a}b").is_err());
        assert!(expand_braces("h{3-1}").is_err());
    }

    #[test]
    fn host_list_splits_trims_and_expands() {
        assert_eq!(
            expand_host_list("10.0.0.1, 10.0.0.2").unwrap(),
            vec!["10.0.0.1", "10.0.0.2"]
        );
        assert_eq!(
            expand_host_list("admin@host{1-2}, db.example").unwrap(),
            vec!["admin@host1", "admin@host2", "db.example"]
        );
    }

    #[test]
    fn host_list_skips_empty_entries() {
        assert_eq!(expand_host_list("a,,b,").unwrap(), vec!["a", "b"]);
    }
}
