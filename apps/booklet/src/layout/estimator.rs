//! Segment Size Estimator: heuristic footprint of a segment and its commentary.
//!
//! Nothing is measured. Both estimators count characters (Unicode scalar values),
//! so they are monotonic in text length and never negative.

use crate::layout::style::StyleTable;
use crate::models::booklet::{CommentaryEntry, Segment};

pub const DEFAULT_CHARS_PER_LINE: usize = 60;
/// Font size assumed for commentary sources missing from the style table.
pub const DEFAULT_COMMENTARY_FONT_SIZE: u32 = 8;

/// Which part of a segment a piece of text plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role<'a> {
    Primary,
    Commentary { source_name: &'a str },
}

/// Common contract of both estimators.
pub trait SizeEstimator {
    /// Footprint of a single text unit.
    fn weight(&self, text: &str, role: Role<'_>) -> f64;

    /// Footprint of a segment: its own text plus every attached commentary entry.
    fn segment_weight(&self, segment: &Segment) -> f64 {
        self.weight(&segment.text, Role::Primary)
            + segment
                .commentaries
                .iter()
                .map(|c| self.weight(&c.text, commentary_role(c)))
                .sum::<f64>()
    }
}

fn commentary_role(entry: &CommentaryEntry) -> Role<'_> {
    Role::Commentary {
        source_name: &entry.source_name,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Line-count estimator
// ────────────────────────────────────────────────────────────────────────────

/// `lines(text) = max(1, floor(len / chars_per_line) + 1)`, regardless of role.
#[derive(Debug, Clone, Copy)]
pub struct LineCountEstimator {
    pub chars_per_line: usize,
}

impl Default for LineCountEstimator {
    fn default() -> Self {
        Self {
            chars_per_line: DEFAULT_CHARS_PER_LINE,
        }
    }
}

impl LineCountEstimator {
    pub fn new(chars_per_line: usize) -> Self {
        Self { chars_per_line }
    }

    pub fn lines(&self, text: &str) -> u32 {
        let chars = text.chars().count();
        let per_line = self.chars_per_line.max(1);
        u32::try_from(chars / per_line + 1).unwrap_or(u32::MAX).max(1)
    }

    pub fn segment_lines(&self, segment: &Segment) -> u32 {
        segment
            .commentaries
            .iter()
            .fold(self.lines(&segment.text), |acc, c| {
                acc.saturating_add(self.lines(&c.text))
            })
    }
}

impl SizeEstimator for LineCountEstimator {
    fn weight(&self, text: &str, _role: Role<'_>) -> f64 {
        f64::from(self.lines(text))
    }

    fn segment_weight(&self, segment: &Segment) -> f64 {
        f64::from(self.segment_lines(segment))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Weighted-score estimator
// ────────────────────────────────────────────────────────────────────────────

/// Roughly one point per 100 characters; commentary is scaled by `font_size / 10`
/// so smaller-font sources count for less.
#[derive(Debug, Clone, Copy)]
pub struct WeightedScoreEstimator<'a> {
    pub styles: &'a StyleTable,
}

impl<'a> WeightedScoreEstimator<'a> {
    pub fn new(styles: &'a StyleTable) -> Self {
        Self { styles }
    }

    fn source_font_size(&self, source_name: &str) -> u32 {
        self.styles
            .get(source_name)
            .map_or(DEFAULT_COMMENTARY_FONT_SIZE, |s| s.font_size)
    }
}

impl SizeEstimator for WeightedScoreEstimator<'_> {
    fn weight(&self, text: &str, role: Role<'_>) -> f64 {
        let base = text.chars().count() as f64 / 100.0;
        match role {
            Role::Primary => base,
            Role::Commentary { source_name } => {
                base * (f64::from(self.source_font_size(source_name)) / 10.0)
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::style::StyleSpec;

    fn styles() -> StyleTable {
        StyleTable::from_specs(
            &[
                StyleSpec {
                    source_name: "Rashi".to_string(),
                    size_hint: Some(5),
                    color: None,
                },
                StyleSpec {
                    source_name: "Tosafot".to_string(),
                    size_hint: None,
                    color: None,
                },
            ],
            12,
        )
    }

    // ── line-count ──────────────────────────────────────────────────────────

    #[test]
    fn test_empty_text_is_one_line() {
        let est = LineCountEstimator::default();
        assert_eq!(est.lines(""), 1);
    }

    #[test]
    fn test_line_boundaries() {
        let est = LineCountEstimator::new(60);
        assert_eq!(est.lines(&"x".repeat(59)), 1);
        assert_eq!(est.lines(&"x".repeat(60)), 2);
        assert_eq!(est.lines(&"x".repeat(125)), 3);
    }

    #[test]
    fn test_lines_count_characters_not_bytes() {
        let est = LineCountEstimator::new(4);
        // 4 Hebrew letters, 8 bytes in UTF-8
        assert_eq!(est.lines("אבגד"), 2);
        assert_eq!(est.lines("אבג"), 1);
    }

    #[test]
    fn test_segment_lines_sum_commentary() {
        let est = LineCountEstimator::new(10);
        let seg = Segment::with_commentaries(
            "x".repeat(25),
            vec![
                CommentaryEntry::new("Rashi", "y".repeat(5)),
                CommentaryEntry::new("Tosafot", "z".repeat(10)),
            ],
        );
        assert_eq!(est.segment_lines(&seg), 3 + 1 + 2);
        assert_eq!(est.segment_weight(&seg), 6.0);
    }

    #[test]
    fn test_no_commentary_adds_nothing() {
        let est = LineCountEstimator::new(10);
        assert_eq!(est.segment_lines(&Segment::new("abc")), 1);
    }

    #[test]
    fn test_zero_chars_per_line_does_not_panic() {
        let est = LineCountEstimator::new(0);
        assert_eq!(est.lines("abc"), 4);
    }

    #[test]
    fn test_lines_monotonic_in_length() {
        let est = LineCountEstimator::new(7);
        let counts: Vec<u32> = (0..50).map(|n| est.lines(&"x".repeat(n))).collect();
        assert!(counts.windows(2).all(|w| w[0] <= w[1]));
    }

    // ── weighted-score ──────────────────────────────────────────────────────

    #[test]
    fn test_primary_score_is_chars_over_hundred() {
        let table = styles();
        let est = WeightedScoreEstimator::new(&table);
        assert!((est.weight(&"x".repeat(250), Role::Primary) - 2.5).abs() < 1e-9);
        assert_eq!(est.weight("", Role::Primary), 0.0);
    }

    #[test]
    fn test_commentary_scaled_by_source_font_size() {
        let table = styles();
        let est = WeightedScoreEstimator::new(&table);
        let text = "x".repeat(100);
        // Rashi explicit 5pt → 0.5; Tosafot defaults to 12 - 2 = 10pt → 1.0; unknown → 8pt → 0.8
        let rashi = est.weight(&text, Role::Commentary { source_name: "Rashi" });
        let tosafot = est.weight(&text, Role::Commentary { source_name: "Tosafot" });
        let unknown = est.weight(&text, Role::Commentary { source_name: "Meiri" });
        assert!((rashi - 0.5).abs() < 1e-9);
        assert!((tosafot - 1.0).abs() < 1e-9);
        assert!((unknown - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_segment_score_includes_commentary() {
        let table = styles();
        let est = WeightedScoreEstimator::new(&table);
        let seg = Segment::with_commentaries(
            "x".repeat(100),
            vec![CommentaryEntry::new("Rashi", "y".repeat(200))],
        );
        assert!((est.segment_weight(&seg) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_segment_score_is_zero_not_nan() {
        let table = styles();
        let est = WeightedScoreEstimator::new(&table);
        let score = est.segment_weight(&Segment::new(""));
        assert_eq!(score, 0.0);
        assert!(!score.is_nan());
    }
}
