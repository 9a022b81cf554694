mod config;
mod errors;
mod generation;
mod layout;
mod logging;
mod models;
mod reference;
mod render;
mod routes;
mod source;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, OutputFormat, RunConfig};
use crate::generation::generator::generate_booklet;
use crate::layout::{LayoutMode, PolicyKind};
use crate::logging::{LogSink, TracingSink};
use crate::render::{ChromiumRenderer, HtmlRenderer, PageFormat};
use crate::routes::build_router;
use crate::source::{DiskCache, SefariaClient};
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "booklet")]
#[command(version, about = "Talmud study booklets with grouped commentary", long_about = None)]
#[command(after_help = "EXAMPLES:
    booklet generate Berakhot_2a-Berakhot_3b --cover
    booklet generate Berakhot_3a --commentaries Rashi_on_Berakhot:9:0000FF --format html
    booklet serve")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a booklet for a page or range of pages
    Generate(GenerateArgs),
    /// Run the HTTP API
    Serve,
}

#[derive(Args)]
struct GenerateArgs {
    /// Page or range, e.g. `Berakhot_3a` or `Berakhot_2a-Berakhot_5b`
    #[arg(value_name = "RANGE")]
    range: String,

    /// Commentary specs `Name[:size[:color]]`, in display order
    #[arg(short, long, num_args = 1..)]
    commentaries: Vec<String>,

    /// Base font size in points
    #[arg(long)]
    font_size: Option<u32>,

    /// Add a cover page with the tractate name
    #[arg(long)]
    cover: bool,

    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Output file (defaults to output.pdf or output.html)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Paper size token, e.g. A6 or Letter
    #[arg(long)]
    page_format: Option<PageFormat>,

    /// CSS margin shorthand, e.g. "15mm 10mm"
    #[arg(long)]
    margins: Option<String>,

    #[arg(long, value_enum)]
    layout: Option<LayoutMode>,

    #[arg(long, value_enum)]
    policy: Option<PolicyKind>,

    /// Pad with blank pages so every source page starts on a right-hand page
    #[arg(long)]
    double_sided: bool,

    /// Font file embedded via @font-face
    #[arg(long)]
    font: Option<PathBuf>,

    /// Refuse ranges longer than this many page sides
    #[arg(long)]
    max_pages: Option<usize>,

    #[arg(long)]
    target_batch_size: Option<f64>,

    #[arg(long)]
    max_lines: Option<u32>,

    #[arg(long)]
    chars_per_line: Option<usize>,
}

impl GenerateArgs {
    fn into_run_config(self) -> RunConfig {
        let mut run = RunConfig::new(self.range);
        if !self.commentaries.is_empty() {
            run.commentaries = self.commentaries;
        }
        if let Some(size) = self.font_size {
            run.font_size = size;
        }
        run.cover = self.cover;
        if let Some(format) = self.format {
            run.output_format = format;
        }
        run.output = self.output.unwrap_or_else(|| match run.output_format {
            OutputFormat::Pdf => PathBuf::from(config::DEFAULT_OUTPUT),
            OutputFormat::Html => PathBuf::from("output.html"),
        });
        if let Some(format) = self.page_format {
            run.page_format = format;
        }
        if let Some(margins) = self.margins {
            run.margins = margins;
        }
        if let Some(mode) = self.layout {
            run.layout_mode = mode;
        }
        if let Some(policy) = self.policy {
            run.policy = policy;
        }
        run.double_sided = self.double_sided;
        // Resolved once here so rendering never touches the filesystem for it.
        run.font_path = self
            .font
            .map(|path| std::fs::canonicalize(&path).unwrap_or(path));
        if let Some(max_pages) = self.max_pages {
            run.max_pages = max_pages;
        }
        if let Some(target) = self.target_batch_size {
            run.capacity.target_batch_size = target;
        }
        if let Some(max_lines) = self.max_lines {
            run.capacity.max_lines_per_page = max_lines;
        }
        if let Some(chars) = self.chars_per_line {
            run.capacity.chars_per_line = chars;
        }
        run
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let log: Arc<dyn LogSink> = Arc::new(TracingSink);
    let cache = DiskCache::new(&config.cache_dir);
    let source = SefariaClient::new(config.text_service_url.clone(), cache, log.clone())
        .context("failed to build the text service client")?;
    let pdf_renderer = ChromiumRenderer::new(config.browser_bin.clone(), config.render_timeout);

    let state = AppState {
        config: config.clone(),
        source: Arc::new(source),
        pdf_renderer: Arc::new(pdf_renderer),
        html_renderer: Arc::new(HtmlRenderer),
        log,
    };

    match cli.command {
        Command::Generate(args) => generate(&state, args.into_run_config()).await,
        Command::Serve => serve(state).await,
    }
}

async fn generate(state: &AppState, run: RunConfig) -> Result<()> {
    info!("Starting booklet v{}", env!("CARGO_PKG_VERSION"));
    let renderer = state.renderer_for(run.output_format);
    let booklet = generate_booklet(
        &run,
        state.source.as_ref(),
        renderer.as_ref(),
        state.log.as_ref(),
    )
    .await?;

    tokio::fs::write(&run.output, &booklet.bytes)
        .await
        .with_context(|| format!("failed to write {}", run.output.display()))?;
    info!(
        "Wrote {} ({} pages requested, {} missing)",
        run.output.display(),
        booklet.stats.pages_requested,
        booklet.stats.pages_missing
    );
    Ok(())
}

async fn serve(state: AppState) -> Result<()> {
    info!("Starting booklet API v{}", env!("CARGO_PKG_VERSION"));
    let port = state.config.port;

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_match_run_config() {
        let cli = Cli::parse_from(["booklet", "generate", "Berakhot_3a"]);
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.into_run_config(), RunConfig::new("Berakhot_3a"));
    }

    #[test]
    fn test_cli_flags_override_run_config() {
        let cli = Cli::parse_from([
            "booklet",
            "generate",
            "Berakhot_2a-Berakhot_3b",
            "--commentaries",
            "Rashi_on_Berakhot:9",
            "Ramban:7:ff0000",
            "--format",
            "html",
            "--page-format",
            "a5",
            "--layout",
            "traditional",
            "--policy",
            "lines",
            "--max-lines",
            "30",
            "--max-pages",
            "12",
            "--cover",
        ]);
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        let run = args.into_run_config();
        assert_eq!(run.commentaries.len(), 2);
        assert_eq!(run.output_format, OutputFormat::Html);
        assert_eq!(run.output, PathBuf::from("output.html"));
        assert_eq!(run.page_format, PageFormat::A5);
        assert_eq!(run.layout_mode, LayoutMode::Traditional);
        assert_eq!(run.policy, PolicyKind::Lines);
        assert_eq!(run.capacity.max_lines_per_page, 30);
        assert_eq!(run.max_pages, 12);
        assert!(run.cover);
    }

    #[test]
    fn test_cli_resolves_font_path_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let font = dir.path().join("font.ttf");
        std::fs::write(&font, b"").unwrap();
        let relative = dir.path().join(".").join("font.ttf");

        let cli = Cli::parse_from([
            "booklet",
            "generate",
            "Berakhot_3a",
            "--font",
            relative.to_str().unwrap(),
        ]);
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        let run = args.into_run_config();
        assert_eq!(run.font_path, Some(std::fs::canonicalize(&font).unwrap()));
    }

    #[test]
    fn test_cli_rejects_unknown_page_format() {
        let parsed = Cli::try_parse_from([
            "booklet",
            "generate",
            "Berakhot_3a",
            "--page-format",
            "folio",
        ]);
        assert!(parsed.is_err());
    }
}
