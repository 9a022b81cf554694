//! Booklet Generator: orchestrates one run end to end.
//!
//! 1. Validate options and expand the reference range (fatal on error, before any fetch)
//! 2. Fetch each page and its commentary sequentially (failures degrade to placeholders)
//! 3. Plan and assemble the layout with the configured policy and mode
//! 4. Render through the selected backend (fatal on error)

use std::time::Instant;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::errors::BookletError;
use crate::layout::assembler::{assemble, AssemblyOptions, LayoutDescription};
use crate::layout::planner::build_policy;
use crate::layout::style::StyleTable;
use crate::logging::LogSink;
use crate::models::booklet::{CommentaryEntry, Segment, SourcePage};
use crate::reference::{expand_range, parse_endpoints, range_len, PageRef};
use crate::render::Renderer;
use crate::source::TextSource;

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

/// Counters reported after a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub pages_requested: usize,
    pub pages_missing: usize,
    pub segments: usize,
    pub commentary_entries: usize,
    pub blocks: usize,
}

/// A planned booklet, ready to render.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedBooklet {
    pub layout: LayoutDescription,
    #[serde(skip)]
    pub styles: StyleTable,
    pub stats: RunStats,
}

/// A rendered booklet.
#[derive(Debug, Clone)]
pub struct GeneratedBooklet {
    pub bytes: Bytes,
    pub content_type: &'static str,
    pub stats: RunStats,
}

// ────────────────────────────────────────────────────────────────────────────
// Public entry points
// ────────────────────────────────────────────────────────────────────────────

/// Fetches and plans a booklet without rendering it.
pub async fn plan_booklet(
    config: &RunConfig,
    source: &dyn TextSource,
    log: &dyn LogSink,
) -> Result<PlannedBooklet, BookletError> {
    config.validate()?;
    let (start, end) = parse_endpoints(&config.range)?;
    let page_count = range_len(&start, &end)?;
    if page_count > config.max_pages as u64 {
        return Err(BookletError::InvalidConfig(format!(
            "range '{}' spans {page_count} pages, more than the limit of {}",
            config.range, config.max_pages
        )));
    }
    let refs = expand_range(&start, &end)?;
    let (Some(first), Some(last)) = (refs.first(), refs.last()) else {
        return Err(BookletError::InvalidConfig(format!(
            "range '{}' expands to no pages",
            config.range
        )));
    };

    let styles = StyleTable::parse(&config.commentaries, config.font_size, log);
    let sources = styles.source_order().join(", ");
    log.info(&format!("Commentaries: {sources}"));
    log.info(&format!(
        "Processing {} pages from {first} to {last}",
        refs.len()
    ));

    let pages = collect_pages(&refs, source, &styles, log).await;
    let mut stats = RunStats {
        pages_requested: refs.len(),
        ..RunStats::default()
    };
    for page in &pages {
        stats.segments += page.segments.len();
        stats.commentary_entries += page
            .segments
            .iter()
            .map(|s| s.commentaries.len())
            .sum::<usize>();
    }
    stats.pages_missing = pages
        .iter()
        .zip(&refs)
        .filter(|(page, r)| page.segments == [Segment::placeholder(r)])
        .count();

    let policy = build_policy(config.policy, &config.capacity, &styles);
    let options = AssemblyOptions {
        mode: config.layout_mode,
        cover: config.cover.then(|| cover_title(first)),
        double_sided: config.double_sided,
    };
    let layout = assemble(pages, policy.as_ref(), &styles, &options, log);
    stats.blocks = layout.block_count();
    log.info(&format!(
        "Planned {} blocks with the {} policy",
        stats.blocks,
        policy.name()
    ));

    Ok(PlannedBooklet {
        layout,
        styles,
        stats,
    })
}

/// Plans and renders a booklet.
pub async fn generate_booklet(
    config: &RunConfig,
    source: &dyn TextSource,
    renderer: &dyn Renderer,
    log: &dyn LogSink,
) -> Result<GeneratedBooklet, BookletError> {
    let started = Instant::now();
    let planned = plan_booklet(config, source, log).await?;

    log.info("Rendering booklet");
    let bytes = renderer
        .render(&planned.layout, &planned.styles, &config.render_settings())
        .await?;

    log.info(&format!(
        "Booklet generated ({} bytes) in {:.2} seconds",
        bytes.len(),
        started.elapsed().as_secs_f64()
    ));
    Ok(GeneratedBooklet {
        bytes,
        content_type: renderer.content_type(),
        stats: planned.stats,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Retrieval
// ────────────────────────────────────────────────────────────────────────────

/// Fetches every page in order. A failed page becomes a single placeholder segment.
pub async fn collect_pages(
    refs: &[PageRef],
    source: &dyn TextSource,
    styles: &StyleTable,
    log: &dyn LogSink,
) -> Vec<SourcePage> {
    let mut pages = Vec::with_capacity(refs.len());
    for page_ref in refs {
        pages.push(fetch_page(page_ref, source, styles, log).await);
    }
    pages
}

async fn fetch_page(
    page_ref: &PageRef,
    source: &dyn TextSource,
    styles: &StyleTable,
    log: &dyn LogSink,
) -> SourcePage {
    let reference = page_ref.to_string();
    log.info(&format!("Fetching {reference}"));

    match source.fetch(&reference).await {
        Ok(doc) => {
            let title = doc.title.clone().unwrap_or_else(|| page_ref.tractate.clone());
            let mut segments = Vec::new();
            for (i, text) in doc.segments().into_iter().enumerate() {
                let commentaries = fetch_commentaries(page_ref, i + 1, source, styles, log).await;
                segments.push(Segment::with_commentaries(text, commentaries));
            }
            SourcePage {
                header: format!("{title} {}", page_ref.daf()),
                page_ref: page_ref.clone(),
                segments,
            }
        }
        Err(e) => {
            log.warn(&format!("Error fetching {reference}: {e}"));
            SourcePage {
                header: format!("{} {}", page_ref.tractate, page_ref.daf()),
                page_ref: page_ref.clone(),
                segments: vec![Segment::placeholder(page_ref)],
            }
        }
    }
}

/// Commentary reference for the `segment_no`-th segment (1-based) of a page.
pub fn commentary_ref(source_name: &str, page_ref: &PageRef, segment_no: usize) -> String {
    format!("{source_name}.{}.{segment_no}", page_ref.daf())
}

async fn fetch_commentaries(
    page_ref: &PageRef,
    segment_no: usize,
    source: &dyn TextSource,
    styles: &StyleTable,
    log: &dyn LogSink,
) -> Vec<CommentaryEntry> {
    let mut entries = Vec::new();
    for source_name in styles.source_order() {
        let reference = commentary_ref(source_name, page_ref, segment_no);
        match source.fetch(&reference).await {
            Ok(doc) => entries.extend(
                doc.segments()
                    .into_iter()
                    .map(|text| CommentaryEntry::new(source_name.clone(), text)),
            ),
            Err(e) => log.debug(&format!(
                "Missing commentary {source_name} on {page_ref}.{segment_no}: {e}"
            )),
        }
    }
    entries
}

fn cover_title(first: &PageRef) -> String {
    format!("מסכת {}", first.tractate.replace('_', " "))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::layout::assembler::{LayoutBlock, LayoutMode};
    use crate::layout::planner::PolicyKind;
    use crate::layout::style::StyleTable;
    use crate::logging::RecordingSink;
    use crate::models::booklet::SourceDocument;
    use crate::reference::RangeError;
    use crate::render::{HtmlRenderer, RenderError, RenderSettings};
    use crate::source::FetchError;

    /// In-memory text service. Unknown references fail with HTTP 404.
    #[derive(Default)]
    struct FakeSource {
        docs: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn with(mut self, reference: &str, json: &str) -> Self {
            self.docs.insert(reference.to_string(), json.to_string());
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextSource for FakeSource {
        async fn fetch(&self, reference: &str) -> Result<SourceDocument, FetchError> {
            self.requests.lock().unwrap().push(reference.to_string());
            match self.docs.get(reference) {
                Some(body) => crate::source::parse_document(body),
                None => Err(FetchError::Status(404)),
            }
        }
    }

    struct FailingRenderer;

    #[async_trait]
    impl Renderer for FailingRenderer {
        async fn render(
            &self,
            _layout: &LayoutDescription,
            _styles: &StyleTable,
            _settings: &RenderSettings,
        ) -> Result<Bytes, RenderError> {
            Err(RenderError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "no display".to_string(),
            })
        }

        fn content_type(&self) -> &'static str {
            "application/pdf"
        }
    }

    fn berakhot_source() -> FakeSource {
        FakeSource::default()
            .with(
                "Berakhot_3a",
                r#"{"title": "Berakhot", "versions": [{"text": ["first", "second"]}]}"#,
            )
            .with(
                "Rashi_on_Berakhot.3a.1",
                r#"{"versions": [{"text": ["rashi one"]}]}"#,
            )
            .with(
                "Tosafot_on_Berakhot.3a.2",
                r#"{"versions": [{"text": "tosafot two"}]}"#,
            )
            .with(
                "Rashi_on_Berakhot.3a.2",
                r#"{"versions": [{"text": ["rashi two a", "rashi two b"]}]}"#,
            )
    }

    fn run_config(range: &str) -> RunConfig {
        RunConfig::new(range)
    }

    #[test]
    fn test_commentary_ref_format() {
        let page = PageRef::new("Berakhot", 3, crate::reference::Side::Front);
        assert_eq!(
            commentary_ref("Rashi_on_Berakhot", &page, 2),
            "Rashi_on_Berakhot.3a.2"
        );
    }

    #[tokio::test]
    async fn test_plan_groups_fetched_commentary() {
        let source = berakhot_source();
        let log = RecordingSink::new();
        let planned = plan_booklet(&run_config("Berakhot_3a"), &source, &log)
            .await
            .unwrap();

        assert_eq!(planned.stats.pages_requested, 1);
        assert_eq!(planned.stats.pages_missing, 0);
        assert_eq!(planned.stats.segments, 2);
        assert_eq!(planned.stats.commentary_entries, 4);

        let section = &planned.layout.sections[0];
        assert_eq!(section.header, "Berakhot 3a");
        match &section.blocks[0] {
            LayoutBlock::Grouped { groups, .. } => {
                assert_eq!(groups[0].source_name, "Rashi_on_Berakhot");
                let positions: Vec<usize> = groups[0].items.iter().map(|i| i.position).collect();
                assert_eq!(positions, vec![1, 2, 2]);
                assert_eq!(groups[1].source_name, "Tosafot_on_Berakhot");
                assert_eq!(groups[1].items[0].position, 2);
            }
            other => panic!("expected grouped block, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_becomes_placeholder_and_run_continues() {
        let source = berakhot_source();
        let log = RecordingSink::new();
        let planned = plan_booklet(&run_config("Berakhot_2b-Berakhot_3a"), &source, &log)
            .await
            .unwrap();

        assert_eq!(planned.stats.pages_missing, 1);
        assert_eq!(planned.layout.sections.len(), 2);
        let missing = &planned.layout.sections[0];
        assert_eq!(missing.header, "Berakhot 2b");
        match &missing.blocks[0] {
            LayoutBlock::Grouped {
                segments, groups, ..
            } => {
                assert_eq!(segments[0].text, "[missing text for Berakhot_2b]");
                assert!(groups.is_empty());
            }
            other => panic!("expected grouped block, got {other:?}"),
        }
        assert!(log.warnings().iter().any(|w| w.contains("Berakhot_2b")));
        // No commentary lookups for the missing page.
        assert!(!source.requests().iter().any(|r| r.contains(".2b.")));
    }

    #[tokio::test]
    async fn test_fetches_run_in_reference_order() {
        let source = berakhot_source();
        plan_booklet(&run_config("Berakhot_3a"), &source, &RecordingSink::new())
            .await
            .unwrap();
        assert_eq!(
            source.requests(),
            vec![
                "Berakhot_3a",
                "Rashi_on_Berakhot.3a.1",
                "Tosafot_on_Berakhot.3a.1",
                "Rashi_on_Berakhot.3a.2",
                "Tosafot_on_Berakhot.3a.2",
            ]
        );
    }

    #[tokio::test]
    async fn test_range_error_aborts_before_any_fetch() {
        let source = berakhot_source();
        let err = plan_booklet(
            &run_config("Berakhot_3a-Shabbat_2a"),
            &source,
            &RecordingSink::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            BookletError::Range(RangeError::CrossTractate { .. })
        ));
        assert!(source.requests().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_aborts_before_any_fetch() {
        let source = berakhot_source();
        let mut config = run_config("Berakhot_3a");
        config.capacity.chars_per_line = 0;
        let err = plan_booklet(&config, &source, &RecordingSink::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BookletError::InvalidConfig(_)));
        assert!(source.requests().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_range_is_rejected_before_any_fetch() {
        let source = berakhot_source();
        let err = plan_booklet(
            &run_config("Berakhot_1a-Berakhot_4294967295b"),
            &source,
            &RecordingSink::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BookletError::InvalidConfig(ref m) if m.contains("limit")));
        assert!(source.requests().is_empty());
    }

    #[tokio::test]
    async fn test_range_at_page_limit_is_accepted() {
        let source = berakhot_source();
        let config = RunConfig {
            max_pages: 2,
            ..run_config("Berakhot_2b-Berakhot_3a")
        };
        let planned = plan_booklet(&config, &source, &RecordingSink::new())
            .await
            .unwrap();
        assert_eq!(planned.stats.pages_requested, 2);

        let config = RunConfig {
            max_pages: 1,
            ..config
        };
        let err = plan_booklet(&config, &source, &RecordingSink::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BookletError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_traditional_mode_with_line_policy_and_cover() {
        let source = berakhot_source();
        let config = RunConfig {
            layout_mode: LayoutMode::Traditional,
            policy: PolicyKind::Lines,
            cover: true,
            ..run_config("Berakhot_3a")
        };
        let planned = plan_booklet(&config, &source, &RecordingSink::new())
            .await
            .unwrap();
        assert!(planned.layout.paged);
        assert_eq!(planned.layout.cover.as_deref(), Some("מסכת Berakhot"));
        assert!(matches!(
            planned.layout.sections[0].blocks[0],
            LayoutBlock::Inline { .. }
        ));
    }

    #[tokio::test]
    async fn test_bad_commentary_spec_is_non_fatal() {
        let source = berakhot_source();
        let log = RecordingSink::new();
        let config = RunConfig {
            commentaries: vec!["Rashi_on_Berakhot:big".to_string()],
            ..run_config("Berakhot_3a")
        };
        let planned = plan_booklet(&config, &source, &log).await.unwrap();
        assert_eq!(planned.styles.style_for("Rashi_on_Berakhot").font_size, 8);
        assert_eq!(log.warnings().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_html_end_to_end() {
        let source = berakhot_source();
        let booklet = generate_booklet(
            &run_config("Berakhot_3a"),
            &source,
            &HtmlRenderer,
            &RecordingSink::new(),
        )
        .await
        .unwrap();
        let html = String::from_utf8(booklet.bytes.to_vec()).unwrap();
        assert_eq!(booklet.content_type, "text/html; charset=utf-8");
        assert!(html.contains("rashi two b"));
        assert!(html.contains("size: 105mm 148mm;"));
        assert_eq!(booklet.stats.blocks, 1);
    }

    #[tokio::test]
    async fn test_render_failure_is_fatal() {
        let source = berakhot_source();
        let err = generate_booklet(
            &run_config("Berakhot_3a"),
            &source,
            &FailingRenderer,
            &RecordingSink::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BookletError::Render(_)));
    }

    #[tokio::test]
    async fn test_planning_twice_is_identical() {
        let source = berakhot_source();
        let config = run_config("Berakhot_3a");
        let a = plan_booklet(&config, &source, &RecordingSink::new()).await.unwrap();
        let b = plan_booklet(&config, &source, &RecordingSink::new()).await.unwrap();
        assert_eq!(a.layout, b.layout);
    }
}
