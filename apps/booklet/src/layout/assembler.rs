//! Layout Assembler: turns fetched pages into the layout description handed to a renderer.
//!
//! Each source page is planned on its own (segment numbering restarts per page), then
//! every batch becomes one block:
//! - optimized mode: the batch's primary text, then one group per commentary source
//! - traditional mode: each segment immediately followed by its own commentary

use serde::{Deserialize, Serialize};

use crate::layout::grouping::{group_by_type, unlisted_sources, CommentaryGroup};
use crate::layout::planner::{Batch, PaginationPolicy};
use crate::layout::style::StyleTable;
use crate::logging::LogSink;
use crate::models::booklet::{CommentaryEntry, SourcePage};

/// Formatting mode selected per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// All primary text of a batch, then each commentary source as a contiguous block.
    #[default]
    Optimized,
    /// Each segment followed inline by its commentary; no regrouping.
    Traditional,
}

#[derive(Debug, Clone, Default)]
pub struct AssemblyOptions {
    pub mode: LayoutMode,
    pub cover: Option<String>,
    /// Insert blank pages so each source page starts on an even output page index.
    /// Only meaningful when batches are pages.
    pub double_sided: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Layout description
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDescription {
    pub cover: Option<String>,
    pub mode: LayoutMode,
    /// True when every block must start on a new physical page.
    pub paged: bool,
    pub sections: Vec<LayoutSection>,
}

impl LayoutDescription {
    pub fn block_count(&self) -> usize {
        self.sections.iter().map(|s| s.blocks.len()).sum()
    }

    /// Physical pages implied by a paged layout (cover, blank padding, one per block).
    pub fn page_count(&self) -> Option<usize> {
        self.paged.then(|| {
            usize::from(self.cover.is_some())
                + self
                    .sections
                    .iter()
                    .map(|s| usize::from(s.leading_blank) + s.blocks.len())
                    .sum::<usize>()
        })
    }
}

/// Everything printed for one source page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSection {
    pub header: String,
    pub leading_blank: bool,
    pub blocks: Vec<LayoutBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberedText {
    pub position: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineSegment {
    pub position: usize,
    pub text: String,
    pub commentaries: Vec<CommentaryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutBlock {
    Grouped {
        caption: String,
        segments: Vec<NumberedText>,
        groups: Vec<CommentaryGroup>,
    },
    Inline {
        caption: String,
        segments: Vec<InlineSegment>,
    },
}

impl LayoutBlock {
    pub fn caption(&self) -> &str {
        match self {
            LayoutBlock::Grouped { caption, .. } | LayoutBlock::Inline { caption, .. } => caption,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Assembly
// ────────────────────────────────────────────────────────────────────────────

/// Plans every source page with `policy` and builds the layout description.
pub fn assemble(
    pages: Vec<SourcePage>,
    policy: &dyn PaginationPolicy,
    styles: &StyleTable,
    options: &AssemblyOptions,
    log: &dyn LogSink,
) -> LayoutDescription {
    let paged = policy.batches_are_pages();
    let pad = paged && options.double_sided;
    let mut pages_emitted = usize::from(options.cover.is_some());

    let sections = pages
        .into_iter()
        .map(|page| {
            let batches = policy.plan(page.segments);
            let leading_blank = pad && pages_emitted % 2 == 1;
            pages_emitted += usize::from(leading_blank) + batches.len();

            let blocks = batches
                .iter()
                .map(|batch| build_block(batch, options.mode, styles, log))
                .collect();

            LayoutSection {
                header: page.header,
                leading_blank,
                blocks,
            }
        })
        .collect();

    LayoutDescription {
        cover: options.cover.clone(),
        mode: options.mode,
        paged,
        sections,
    }
}

fn build_block(
    batch: &Batch,
    mode: LayoutMode,
    styles: &StyleTable,
    log: &dyn LogSink,
) -> LayoutBlock {
    let caption = batch.index_caption();
    let numbered = batch
        .segments
        .iter()
        .enumerate()
        .map(|(offset, seg)| (batch.first_index + offset, seg));

    match mode {
        LayoutMode::Optimized => {
            for source in unlisted_sources(batch, styles.source_order()) {
                log.warn(&format!(
                    "commentary source '{source}' has no configured order and is omitted"
                ));
            }
            LayoutBlock::Grouped {
                caption,
                segments: numbered
                    .map(|(position, seg)| NumberedText {
                        position,
                        text: seg.text.clone(),
                    })
                    .collect(),
                groups: group_by_type(batch, styles.source_order()),
            }
        }
        LayoutMode::Traditional => LayoutBlock::Inline {
            caption,
            segments: numbered
                .map(|(position, seg)| InlineSegment {
                    position,
                    text: seg.text.clone(),
                    commentaries: seg.commentaries.clone(),
                })
                .collect(),
        },
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
