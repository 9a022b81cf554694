//! Commentary Grouping: regroups a batch's commentary by source for the
//! "all primary text, then one block per commentary source" layout.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::layout::planner::Batch;

/// One commentary excerpt tagged with the position of the segment it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedItem {
    pub position: usize,
    pub text: String,
}

/// All excerpts of one source within a batch, in ascending segment position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentaryGroup {
    pub source_name: String,
    pub items: Vec<GroupedItem>,
}

/// Groups the batch's commentary entries by source, emitting groups in `source_order`.
///
/// Positions count from `batch.first_index`. Sources with no entries are skipped.
/// Sources missing from `source_order` are not emitted; callers pass an order that
/// covers every active source (see `unlisted_sources`).
pub fn group_by_type(batch: &Batch, source_order: &[String]) -> Vec<CommentaryGroup> {
    let mut by_source: HashMap<&str, Vec<GroupedItem>> = HashMap::new();
    for (offset, segment) in batch.segments.iter().enumerate() {
        let position = batch.first_index + offset;
        for entry in &segment.commentaries {
            by_source
                .entry(entry.source_name.as_str())
                .or_default()
                .push(GroupedItem {
                    position,
                    text: entry.text.clone(),
                });
        }
    }

    source_order
        .iter()
        .filter_map(|name| {
            by_source
                .remove(name.as_str())
                .map(|items| CommentaryGroup {
                    source_name: name.clone(),
                    items,
                })
        })
        .collect()
}

/// Sources present in `batch` that `source_order` does not list, in first-seen order.
pub fn unlisted_sources(batch: &Batch, source_order: &[String]) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();
    for entry in batch.segments.iter().flat_map(|s| s.commentaries.iter()) {
        if !source_order.contains(&entry.source_name) && !missing.contains(&entry.source_name) {
            missing.push(entry.source_name.clone());
        }
    }
    missing
}
