//! Reference Sequencer: parses page identifiers and expands a range into every
//! page side between its endpoints.
//!
//! A page identifier is `<Tractate>_<leaf><side>` or `<Tractate>.<leaf><side>`,
//! with `side` being `a` (front) or `b` (back). Pages are ordered by `(leaf, side)`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between the two endpoints of a range string.
pub const RANGE_SEPARATOR: char = '-';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("invalid page: {0}")]
    InvalidPage(String),

    #[error("cross-tractate range: {start} .. {end}")]
    CrossTractate { start: String, end: String },

    #[error("start after end: {start} .. {end}")]
    StartAfterEnd { start: String, end: String },
}

// ────────────────────────────────────────────────────────────────────────────
// PageRef
// ────────────────────────────────────────────────────────────────────────────

/// Side of a leaf. `Front < Back`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Front,
    Back,
}

impl Side {
    pub fn from_char(c: char) -> Option<Side> {
        match c {
            'a' => Some(Side::Front),
            'b' => Some(Side::Back),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Side::Front => 'a',
            Side::Back => 'b',
        }
    }
}

/// One side of one leaf of a tractate. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRef {
    pub tractate: String,
    pub leaf: u32,
    pub side: Side,
}

impl PageRef {
    pub fn new(tractate: impl Into<String>, leaf: u32, side: Side) -> Self {
        Self {
            tractate: tractate.into(),
            leaf,
            side,
        }
    }

    /// Position within the tractate; the total order used for range checks.
    pub fn position(&self) -> (u32, Side) {
        (self.leaf, self.side)
    }

    /// The `<leaf><side>` part, e.g. `3a`.
    pub fn daf(&self) -> String {
        format!("{}{}", self.leaf, self.side.as_char())
    }

    /// The following page side: `a → b` on the same leaf, `b → a` on the next leaf.
    /// `None` past the last representable leaf.
    pub fn next(&self) -> Option<PageRef> {
        match self.side {
            Side::Front => Some(PageRef::new(self.tractate.clone(), self.leaf, Side::Back)),
            Side::Back => {
                let leaf = self.leaf.checked_add(1)?;
                Some(PageRef::new(self.tractate.clone(), leaf, Side::Front))
            }
        }
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.tractate, self.daf())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Parsing
// ────────────────────────────────────────────────────────────────────────────

/// Decomposes `Berakhot_3a` / `Berakhot.3a` into `(tractate, leaf, side)`.
///
/// The last `_` or `.` separates the tractate, so multi-word names such as
/// `Bava_Metzia_2a` keep their inner underscores.
pub fn parse_page_ref(s: &str) -> Result<PageRef, RangeError> {
    let s = s.trim();
    let invalid = || RangeError::InvalidPage(s.to_string());

    let split_at = s.rfind(['_', '.']).ok_or_else(invalid)?;
    let (tractate, page_side) = (&s[..split_at], &s[split_at + 1..]);
    if tractate.is_empty() {
        return Err(invalid());
    }

    let side_char = page_side.chars().last().ok_or_else(invalid)?;
    let side = Side::from_char(side_char).ok_or_else(invalid)?;

    let leaf_digits = &page_side[..page_side.len() - side_char.len_utf8()];
    if leaf_digits.is_empty() || !leaf_digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let leaf: u32 = leaf_digits.parse().map_err(|_| invalid())?;
    if leaf == 0 {
        return Err(invalid());
    }

    Ok(PageRef::new(tractate, leaf, side))
}

/// Splits a range string once on `-`. Without a separator both ends are `s`.
pub fn split_range_string(s: &str) -> (&str, &str) {
    match s.split_once(RANGE_SEPARATOR) {
        Some((start, end)) => (start.trim(), end.trim()),
        None => (s.trim(), s.trim()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Expansion
// ────────────────────────────────────────────────────────────────────────────

/// Number of page sides from `start` to `end`, inclusive, without enumerating them.
///
/// Fails when the endpoints name different tractates or when `start` comes after `end`.
pub fn range_len(start: &PageRef, end: &PageRef) -> Result<u64, RangeError> {
    if start.tractate != end.tractate {
        return Err(RangeError::CrossTractate {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    if start.position() > end.position() {
        return Err(RangeError::StartAfterEnd {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok(ordinal(end) - ordinal(start) + 1)
}

fn ordinal(page: &PageRef) -> u64 {
    2 * u64::from(page.leaf) + u64::from(page.side == Side::Back)
}

/// Enumerates every page side from `start` to `end`, inclusive.
///
/// Fails before iterating on the same conditions as [`range_len`]. Callers bound the
/// size with [`range_len`] first; this allocates one entry per page side.
pub fn expand_range(start: &PageRef, end: &PageRef) -> Result<Vec<PageRef>, RangeError> {
    range_len(start, end)?;

    let mut refs = Vec::new();
    let mut current = start.clone();
    while current.position() < end.position() {
        let Some(following) = current.next() else {
            break;
        };
        refs.push(current);
        current = following;
    }
    refs.push(current);
    Ok(refs)
}

/// Parses the two endpoints of a range string (`"Berakhot_3a-Berakhot_5b"` or a single ref).
pub fn parse_endpoints(range: &str) -> Result<(PageRef, PageRef), RangeError> {
    let (start, end) = split_range_string(range);
    Ok((parse_page_ref(start)?, parse_page_ref(end)?))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
