//! Pagination Planner: partitions an ordered segment list into batches.
//!
//! # Policies
//! - `LineBudgetPolicy`: page-oriented. Each batch is one printed page whose line budget
//!   starts at a fixed header cost.
//! - `WeightThresholdPolicy`: print-optimized. Batches are content blocks that the renderer
//!   keeps together; a batch closes once the weighted score would pass the target.
//!
//! Both are greedy, deterministic, and share one contract: batches preserve the input order,
//! no segment is split, dropped, or duplicated, and a segment too large for an empty batch
//! is still placed alone (forced overflow).

use serde::{Deserialize, Serialize};

use crate::layout::estimator::{LineCountEstimator, SizeEstimator, WeightedScoreEstimator};
use crate::layout::style::StyleTable;
use crate::models::booklet::Segment;

pub const DEFAULT_HEADER_LINES: u32 = 3;
pub const DEFAULT_MAX_LINES_PER_PAGE: u32 = 40;
pub const DEFAULT_TARGET_BATCH_SIZE: f64 = 10.0;

// ────────────────────────────────────────────────────────────────────────────
// Batch
// ────────────────────────────────────────────────────────────────────────────

/// A contiguous run of segments assigned to one page or one render block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub segments: Vec<Segment>,
    /// 1-based position of the first segment in the planner's input.
    pub first_index: usize,
    /// Accumulated cost when the batch was closed (lines incl. header, or weighted score).
    pub fill: f64,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// 1-based position of the last segment.
    pub fn last_index(&self) -> usize {
        self.first_index + self.segments.len().saturating_sub(1)
    }

    /// `"4"` for a single segment, `"4–6"` for a run.
    pub fn index_caption(&self) -> String {
        if self.segments.len() <= 1 {
            self.first_index.to_string()
        } else {
            format!("{}–{}", self.first_index, self.last_index())
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Policy trait
// ────────────────────────────────────────────────────────────────────────────

/// Strategy seam for pagination. Swap implementations without touching the assembler.
pub trait PaginationPolicy: Send + Sync {
    /// Splits `segments` into ordered batches. Empty input yields no batches.
    fn plan(&self, segments: Vec<Segment>) -> Vec<Batch>;

    /// True when every batch is a physical page (forces a page break between batches).
    fn batches_are_pages(&self) -> bool;

    fn name(&self) -> &'static str;
}

/// Which policy a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Weight-threshold batching (print-optimized).
    #[default]
    Weight,
    /// Line-budget pagination (one batch per page).
    Lines,
}

/// Capacity knobs shared by both policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    pub target_batch_size: f64,
    pub max_lines_per_page: u32,
    pub chars_per_line: usize,
    pub header_lines: u32,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            target_batch_size: DEFAULT_TARGET_BATCH_SIZE,
            max_lines_per_page: DEFAULT_MAX_LINES_PER_PAGE,
            chars_per_line: crate::layout::estimator::DEFAULT_CHARS_PER_LINE,
            header_lines: DEFAULT_HEADER_LINES,
        }
    }
}

impl CapacityConfig {
    /// Rejects values that would make either policy meaningless.
    pub fn validate(&self) -> Result<(), String> {
        if !self.target_batch_size.is_finite() || self.target_batch_size <= 0.0 {
            return Err(format!(
                "target_batch_size must be a positive number, got {}",
                self.target_batch_size
            ));
        }
        if self.chars_per_line == 0 {
            return Err("chars_per_line must be at least 1".to_string());
        }
        if self.max_lines_per_page <= self.header_lines {
            return Err(format!(
                "max_lines_per_page ({}) must exceed header_lines ({})",
                self.max_lines_per_page, self.header_lines
            ));
        }
        Ok(())
    }
}

/// Builds the policy selected by `kind`.
pub fn build_policy(
    kind: PolicyKind,
    capacity: &CapacityConfig,
    styles: &StyleTable,
) -> Box<dyn PaginationPolicy> {
    match kind {
        PolicyKind::Weight => Box::new(WeightThresholdPolicy::new(
            capacity.target_batch_size,
            styles.clone(),
        )),
        PolicyKind::Lines => Box::new(LineBudgetPolicy {
            estimator: LineCountEstimator::new(capacity.chars_per_line),
            max_lines_per_page: capacity.max_lines_per_page,
            header_lines: capacity.header_lines,
        }),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Shared greedy partition
// ────────────────────────────────────────────────────────────────────────────

/// Greedy partition: close the open batch when adding the next segment would push the
/// accumulated cost past `capacity`, unless the batch is still empty.
fn greedy_partition<F>(segments: Vec<Segment>, base: f64, capacity: f64, cost: F) -> Vec<Batch>
where
    F: Fn(&Segment) -> f64,
{
    let mut batches = Vec::new();
    let mut current: Vec<Segment> = Vec::new();
    let mut used = base;
    let mut first_index = 1;

    for (i, segment) in segments.into_iter().enumerate() {
        let seg_cost = cost(&segment);
        if !current.is_empty() && used + seg_cost > capacity {
            batches.push(Batch {
                segments: std::mem::take(&mut current),
                first_index,
                fill: used,
            });
            used = base;
            first_index = i + 1;
        }
        used += seg_cost;
        current.push(segment);
    }

    if !current.is_empty() {
        batches.push(Batch {
            segments: current,
            first_index,
            fill: used,
        });
    }
    batches
}

// ────────────────────────────────────────────────────────────────────────────
// Line-budget policy
// ────────────────────────────────────────────────────────────────────────────

/// One batch per printed page. `used_lines` starts at `header_lines` on every page.
#[derive(Debug, Clone)]
pub struct LineBudgetPolicy {
    pub estimator: LineCountEstimator,
    pub max_lines_per_page: u32,
    pub header_lines: u32,
}

impl Default for LineBudgetPolicy {
    fn default() -> Self {
        Self {
            estimator: LineCountEstimator::default(),
            max_lines_per_page: DEFAULT_MAX_LINES_PER_PAGE,
            header_lines: DEFAULT_HEADER_LINES,
        }
    }
}

impl PaginationPolicy for LineBudgetPolicy {
    fn plan(&self, segments: Vec<Segment>) -> Vec<Batch> {
        let estimator = self.estimator;
        greedy_partition(
            segments,
            f64::from(self.header_lines),
            f64::from(self.max_lines_per_page),
            |seg| f64::from(estimator.segment_lines(seg)),
        )
    }

    fn batches_are_pages(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "line-budget"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Weight-threshold policy
// ────────────────────────────────────────────────────────────────────────────

/// Batches close when the weighted score would pass `target_batch_size`.
#[derive(Debug, Clone)]
pub struct WeightThresholdPolicy {
    pub target_batch_size: f64,
    styles: StyleTable,
}

impl WeightThresholdPolicy {
    pub fn new(target_batch_size: f64, styles: StyleTable) -> Self {
        Self {
            target_batch_size,
            styles,
        }
    }
}

impl PaginationPolicy for WeightThresholdPolicy {
    fn plan(&self, segments: Vec<Segment>) -> Vec<Batch> {
        let estimator = WeightedScoreEstimator::new(&self.styles);
        greedy_partition(segments, 0.0, self.target_batch_size, |seg| {
            estimator.segment_weight(seg)
        })
    }

    fn batches_are_pages(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "weight-threshold"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
