use std::sync::Arc;

use crate::config::{Config, OutputFormat};
use crate::logging::LogSink;
use crate::render::Renderer;
use crate::source::TextSource;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Text service client. Default: SefariaClient with the on-disk cache.
    pub source: Arc<dyn TextSource>,
    /// PDF backend. Default: ChromiumRenderer.
    pub pdf_renderer: Arc<dyn Renderer>,
    pub html_renderer: Arc<dyn Renderer>,
    pub log: Arc<dyn LogSink>,
}

impl AppState {
    pub fn renderer_for(&self, format: OutputFormat) -> Arc<dyn Renderer> {
        match format {
            OutputFormat::Pdf => self.pdf_renderer.clone(),
            OutputFormat::Html => self.html_renderer.clone(),
        }
    }
}
