use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::errors::BookletError;
use crate::layout::assembler::LayoutMode;
use crate::layout::planner::{CapacityConfig, PolicyKind};
use crate::render::{is_valid_margins, PageFormat, RenderSettings, DEFAULT_MARGINS};
use crate::source::DEFAULT_TEXT_SERVICE_URL;

pub const DEFAULT_FONT_SIZE: u32 = 10;
pub const DEFAULT_OUTPUT: &str = "output.pdf";
pub const DEFAULT_MAX_PAGES: usize = 200;
/// Ceiling for `max_pages`; a request cannot raise its own limit past this.
pub const MAX_PAGES_LIMIT: usize = 2_000;
pub const DEFAULT_COMMENTARIES: [&str; 2] =
    ["Rashi_on_Berakhot:8:#0000FF", "Tosafot_on_Berakhot:8:#008000"];

/// Service configuration loaded from environment variables. Every key has a default.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub text_service_url: String,
    pub cache_dir: PathBuf,
    pub browser_bin: PathBuf,
    pub render_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
            text_service_url: env_or("TEXT_SERVICE_URL", DEFAULT_TEXT_SERVICE_URL),
            cache_dir: PathBuf::from(env_or("CACHE_DIR", "data")),
            browser_bin: PathBuf::from(env_or("BROWSER_BIN", "chromium")),
            render_timeout: Duration::from_secs(
                env_or("RENDER_TIMEOUT_SECS", "120")
                    .parse::<u64>()
                    .context("RENDER_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

// ────────────────────────────────────────────────────────────────────────────
// Per-run options
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Pdf,
    Html,
}

/// Options for one booklet run. Deserialized from API requests or built from CLI flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// `"<Ref>"` or `"<Ref1>-<Ref2>"`.
    pub range: String,
    #[serde(default = "default_commentaries")]
    pub commentaries: Vec<String>,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default)]
    pub cover: bool,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default)]
    pub page_format: PageFormat,
    #[serde(default = "default_margins")]
    pub margins: String,
    #[serde(default)]
    pub layout_mode: LayoutMode,
    #[serde(default)]
    pub policy: PolicyKind,
    #[serde(default)]
    pub capacity: CapacityConfig,
    #[serde(default)]
    pub double_sided: bool,
    /// Largest number of page sides one run may expand to.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Local font file. Set from the command line only, never from a request body.
    #[serde(skip)]
    pub font_path: Option<PathBuf>,
}

fn default_commentaries() -> Vec<String> {
    DEFAULT_COMMENTARIES.iter().map(|s| s.to_string()).collect()
}

fn default_font_size() -> u32 {
    DEFAULT_FONT_SIZE
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_margins() -> String {
    DEFAULT_MARGINS.to_string()
}

impl RunConfig {
    pub fn new(range: impl Into<String>) -> Self {
        Self {
            range: range.into(),
            commentaries: default_commentaries(),
            font_size: DEFAULT_FONT_SIZE,
            cover: false,
            output_format: OutputFormat::default(),
            output: default_output(),
            page_format: PageFormat::default(),
            margins: default_margins(),
            layout_mode: LayoutMode::default(),
            policy: PolicyKind::default(),
            capacity: CapacityConfig::default(),
            double_sided: false,
            max_pages: DEFAULT_MAX_PAGES,
            font_path: None,
        }
    }

    /// Rejects option values no run could use. Checked before any fetch.
    pub fn validate(&self) -> Result<(), BookletError> {
        if self.font_size < 3 {
            return Err(BookletError::InvalidConfig(format!(
                "font_size must be at least 3, got {}",
                self.font_size
            )));
        }
        if !is_valid_margins(&self.margins) {
            return Err(BookletError::InvalidConfig(format!(
                "margins must be one to four CSS lengths (mm, cm, in, pt, px), got '{}'",
                self.margins
            )));
        }
        if !(1..=MAX_PAGES_LIMIT).contains(&self.max_pages) {
            return Err(BookletError::InvalidConfig(format!(
                "max_pages must be between 1 and {MAX_PAGES_LIMIT}, got {}",
                self.max_pages
            )));
        }
        self.capacity
            .validate()
            .map_err(BookletError::InvalidConfig)
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            font_size: self.font_size,
            page_format: self.page_format,
            margins: self.margins.clone(),
            font_path: self.font_path.clone(),
        }
    }
}
