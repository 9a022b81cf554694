//! Rendering backends: turn a layout description into output bytes.
//!
//! `HtmlRenderer` emits the assembled markup itself. `ChromiumRenderer` prints that markup
//! to PDF with a headless Chromium (`--print-to-pdf`). Page size and margins travel in the
//! markup's `@page` rule, so any backend honoring CSS paged media produces the same sheet.
//! Renderer failures are fatal for the run and are never retried.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;

use crate::layout::assembler::LayoutDescription;
use crate::layout::html::render_html;
use crate::layout::style::StyleTable;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to start renderer '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("renderer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("renderer timed out after {0:?}")]
    Timeout(Duration),

    #[error("renderer I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ────────────────────────────────────────────────────────────────────────────
// Page format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown page format '{0}' (expected A0–A6, Letter, Legal, Tabloid or Ledger)")]
pub struct UnknownPageFormat(pub String);

/// Paper size token, e.g. `A4` or `A6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PageFormat {
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    #[default]
    A6,
    Letter,
    Legal,
    Tabloid,
    Ledger,
}

impl PageFormat {
    pub const ALL: [PageFormat; 11] = [
        PageFormat::A0,
        PageFormat::A1,
        PageFormat::A2,
        PageFormat::A3,
        PageFormat::A4,
        PageFormat::A5,
        PageFormat::A6,
        PageFormat::Letter,
        PageFormat::Legal,
        PageFormat::Tabloid,
        PageFormat::Ledger,
    ];

    /// Sheet size as a CSS `size` value (width then height).
    pub fn css_size(self) -> &'static str {
        match self {
            PageFormat::A0 => "841mm 1189mm",
            PageFormat::A1 => "594mm 841mm",
            PageFormat::A2 => "420mm 594mm",
            PageFormat::A3 => "297mm 420mm",
            PageFormat::A4 => "210mm 297mm",
            PageFormat::A5 => "148mm 210mm",
            PageFormat::A6 => "105mm 148mm",
            PageFormat::Letter => "8.5in 11in",
            PageFormat::Legal => "8.5in 14in",
            PageFormat::Tabloid => "11in 17in",
            PageFormat::Ledger => "17in 11in",
        }
    }

    fn token(self) -> &'static str {
        match self {
            PageFormat::A0 => "A0",
            PageFormat::A1 => "A1",
            PageFormat::A2 => "A2",
            PageFormat::A3 => "A3",
            PageFormat::A4 => "A4",
            PageFormat::A5 => "A5",
            PageFormat::A6 => "A6",
            PageFormat::Letter => "Letter",
            PageFormat::Legal => "Legal",
            PageFormat::Tabloid => "Tabloid",
            PageFormat::Ledger => "Ledger",
        }
    }
}

impl fmt::Display for PageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for PageFormat {
    type Err = UnknownPageFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = match s.trim().to_ascii_lowercase().as_str() {
            "a0" => PageFormat::A0,
            "a1" => PageFormat::A1,
            "a2" => PageFormat::A2,
            "a3" => PageFormat::A3,
            "a4" => PageFormat::A4,
            "a5" => PageFormat::A5,
            "a6" => PageFormat::A6,
            "letter" => PageFormat::Letter,
            "legal" => PageFormat::Legal,
            "tabloid" => PageFormat::Tabloid,
            "ledger" => PageFormat::Ledger,
            _ => return Err(UnknownPageFormat(s.to_string())),
        };
        Ok(format)
    }
}

impl TryFrom<String> for PageFormat {
    type Error = UnknownPageFormat;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PageFormat> for String {
    fn from(value: PageFormat) -> Self {
        value.token().to_string()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Render settings
// ────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_MARGINS: &str = "15mm 10mm";

const MARGIN_UNITS: [&str; 5] = ["mm", "cm", "in", "pt", "px"];

/// CSS margin shorthand: one to four lengths such as `15mm` or `0.5in`, or a bare `0`.
pub fn is_valid_margins(margins: &str) -> bool {
    let lengths: Vec<&str> = margins.split_whitespace().collect();
    (1..=4).contains(&lengths.len()) && lengths.iter().all(|len| is_css_length(len))
}

fn is_css_length(token: &str) -> bool {
    if token == "0" {
        return true;
    }
    let Some(number) = MARGIN_UNITS.iter().find_map(|unit| token.strip_suffix(unit)) else {
        return false;
    };
    let mut parts = number.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    digits(whole) && parts.next().map_or(true, digits)
}

/// Everything a renderer needs beyond the layout itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub font_size: u32,
    pub page_format: PageFormat,
    /// CSS margin shorthand for the `@page` rule.
    pub margins: String,
    /// Local Hebrew font embedded via `@font-face`; system fonts are used when absent.
    pub font_path: Option<PathBuf>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            font_size: crate::config::DEFAULT_FONT_SIZE,
            page_format: PageFormat::default(),
            margins: DEFAULT_MARGINS.to_string(),
            font_path: None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Renderer trait
// ────────────────────────────────────────────────────────────────────────────

/// Rendering backend. Carried in `AppState` as `Arc<dyn Renderer>`.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(
        &self,
        layout: &LayoutDescription,
        styles: &StyleTable,
        settings: &RenderSettings,
    ) -> Result<Bytes, RenderError>;

    /// MIME type of the produced bytes.
    fn content_type(&self) -> &'static str;
}

/// Emits the HTML markup as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

#[async_trait]
impl Renderer for HtmlRenderer {
    async fn render(
        &self,
        layout: &LayoutDescription,
        styles: &StyleTable,
        settings: &RenderSettings,
    ) -> Result<Bytes, RenderError> {
        Ok(Bytes::from(render_html(layout, styles, settings)))
    }

    fn content_type(&self) -> &'static str {
        "text/html; charset=utf-8"
    }
}

/// Prints the HTML markup to PDF through a headless Chromium binary.
#[derive(Debug, Clone)]
pub struct ChromiumRenderer {
    pub browser_bin: PathBuf,
    pub timeout: Duration,
}

impl ChromiumRenderer {
    pub fn new(browser_bin: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            browser_bin: browser_bin.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn render(
        &self,
        layout: &LayoutDescription,
        styles: &StyleTable,
        settings: &RenderSettings,
    ) -> Result<Bytes, RenderError> {
        let html = render_html(layout, styles, settings);

        // The temp directory is removed when `workdir` drops, on every return path.
        let workdir = tempfile::tempdir()?;
        let html_path = workdir.path().join("booklet.html");
        let pdf_path = workdir.path().join("booklet.pdf");
        tokio::fs::write(&html_path, html).await?;

        let program = self.browser_bin.display().to_string();
        let mut command = Command::new(&self.browser_bin);
        command
            .arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-pdf-header-footer")
            .arg(format!("--print-to-pdf={}", pdf_path.display()))
            .arg(format!("file://{}", html_path.display()))
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| RenderError::Timeout(self.timeout))?
            .map_err(|source| RenderError::Spawn { program, source })?;

        if !output.status.success() {
            return Err(RenderError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let pdf = tokio::fs::read(&pdf_path).await?;
        Ok(Bytes::from(pdf))
    }

    fn content_type(&self) -> &'static str {
        "application/pdf"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
