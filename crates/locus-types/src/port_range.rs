//! Port ranges: finite, ordered, restartable sequences of candidate
//! TCP ports.
//!
//! # Text Format
//!
//! A range is written as a comma-separated list of segments, parsed left
//! to right; empty segments are skipped:
//!
//! | Segment | Meaning |
//! |---------|---------|
//! | `N`     | the single port N |
//! | `N-M`   | N through M inclusive (ascending or descending) |
//! | `N+`    | N through 65535 |
//!
//! Formatting a range and re-parsing the text yields the same ordered
//! candidate sequence.
//!
//! # Example
//!
//! ```
//! use locus_types::PortRange;
//!
//! let range: PortRange = "22,8080-8082,9000+".parse().unwrap();
//! let head: Vec<u16> = range.iter().take(5).collect();
//! assert_eq!(head, vec![22, 8080, 8081, 8082, 9000]);
//! assert_eq!(range.iter().last(), Some(65535));
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ErrorCode;

/// Highest representable TCP port; `N+` segments run up to here.
pub const MAX_PORT: u16 = 65535;

/// A finite, ordered, restartable sequence of candidate port numbers.
///
/// Three shapes: a single port, a linear run (ascending or descending),
/// or an ordered concatenation of other ranges. Iteration is lazy and
/// can be restarted any number of times via [`iter`](Self::iter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortRange {
    /// Exactly one candidate port.
    Single(u16),
    /// Every port from `start` to `end` inclusive, in that direction.
    ///
    /// `start > end` is valid and iterates downwards.
    Linear { start: u16, end: u16 },
    /// Concatenation of sub-ranges, iterated in order.
    Aggregate(Vec<PortRange>),
}

/// Error parsing the `N,N-M,N+` port-range text format.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PortRangeParseError {
    /// A segment was not a number, `N-M` pair, or `N+`.
    #[error("invalid port range segment '{segment}' in '{input}'")]
    InvalidSegment { segment: String, input: String },
    /// The input contained no usable segments at all.
    #[error("empty port range '{0}'")]
    Empty(String),
}

impl ErrorCode for PortRangeParseError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidSegment { .. } => "PORT_RANGE_INVALID_SEGMENT",
            Self::Empty(_) => "PORT_RANGE_EMPTY",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

impl PortRange {
    /// A linear range, ascending or descending depending on argument
    /// order.
    #[must_use]
    pub fn linear(start: u16, end: u16) -> Self {
        Self::Linear { start, end }
    }

    /// The range `start` through [`MAX_PORT`].
    #[must_use]
    pub fn at_least(start: u16) -> Self {
        Self::Linear {
            start,
            end: MAX_PORT,
        }
    }

    /// Returns a fresh iterator over the candidate sequence.
    ///
    /// Each call restarts from the beginning.
    #[must_use]
    pub fn iter(&self) -> PortIter<'_> {
        PortIter {
            stack: vec![Frame::Range(self)],
        }
    }

    /// Number of candidate ports in the sequence.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Linear { start, end } => (start.abs_diff(*end) as usize) + 1,
            Self::Aggregate(parts) => parts.iter().map(PortRange::len).sum(),
        }
    }

    /// True when the range holds no candidates (only possible for an
    /// empty aggregate).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::str::FromStr for PortRange {
    type Err = PortRangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = Vec::new();
        for segment in s.split(',') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            parts.push(parse_segment(segment, s)?);
        }
        match parts.len() {
            0 => Err(PortRangeParseError::Empty(s.to_string())),
            1 => Ok(parts.into_iter().next().unwrap_or(PortRange::Single(0))),
            _ => Ok(PortRange::Aggregate(parts)),
        }
    }
}

fn parse_segment(segment: &str, input: &str) -> Result<PortRange, PortRangeParseError> {
    let invalid = || PortRangeParseError::InvalidSegment {
        segment: segment.to_string(),
        input: input.to_string(),
    };

    if let Some(start) = segment.strip_suffix('+') {
        let start: u16 = start.trim().parse().map_err(|_| invalid())?;
        return Ok(PortRange::at_least(start));
    }
    if let Some((start, end)) = segment.split_once('-') {
        let start: u16 = start.trim().parse().map_err(|_| invalid())?;
        let end: u16 = end.trim().parse().map_err(|_| invalid())?;
        return Ok(PortRange::linear(start, end));
    }
    let port: u16 = segment.parse().map_err(|_| invalid())?;
    Ok(PortRange::Single(port))
}

impl std::fmt::Display for PortRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(p) => write!(f, "{}", p),
            Self::Linear { start, end } if end == &MAX_PORT && start != end => {
                write!(f, "{}+", start)
            }
            Self::Linear { start, end } if start == end => write!(f, "{}", start),
            Self::Linear { start, end } => write!(f, "{}-{}", start, end),
            Self::Aggregate(parts) => {
                let mut first = true;
                for part in parts {
                    if !first {
                        f.write_str(",")?;
                    }
                    first = false;
                    write!(f, "{}", part)?;
                }
                Ok(())
            }
        }
    }
}

enum Frame<'a> {
    Range(&'a PortRange),
    Linear { next: u16, end: u16, done: bool },
}

/// Lazy iterator over a [`PortRange`]'s candidate sequence.
pub struct PortIter<'a> {
    // depth-first walk; aggregates are pushed in reverse so the first
    // sub-range is popped first
    stack: Vec<Frame<'a>>,
}

impl Iterator for PortIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        loop {
            match self.stack.pop()? {
                Frame::Range(PortRange::Single(p)) => return Some(*p),
                Frame::Range(PortRange::Linear { start, end }) => {
                    self.stack.push(Frame::Linear {
                        next: *start,
                        end: *end,
                        done: false,
                    });
                }
                Frame::Range(PortRange::Aggregate(parts)) => {
                    for part in parts.iter().rev() {
                        self.stack.push(Frame::Range(part));
                    }
                }
                Frame::Linear { next, end, done } => {
                    if done {
                        continue;
                    }
                    if next == end {
                        return Some(next);
                    }
                    let step = if next < end { next + 1 } else { next - 1 };
                    self.stack.push(Frame::Linear {
                        next: step,
                        end,
                        done: false,
                    });
                    return Some(next);
                }
            }
        }
    }
}
