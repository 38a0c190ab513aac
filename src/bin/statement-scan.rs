//! CLI binary for statement-scan.
//!
//! Drives one [`Shell`] over the files on the command line: submit, print
//! the rendered state, optionally export, reset, next.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use statement_scan::display::render_state;
use statement_scan::export::to_json;
use statement_scan::{
    write_export, BackendError, Credential, ExtractionProgressCallback, ExtractionRequest,
    GeminiBackend, PdfiumRasterizer, ProgressCallback, ProviderBackend, ScanConfig, Shell,
    ShellError, ShellState, StatementExtractor, Upload, VisionBackend,
};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner shown while the shell is Loading. A fresh bar per run.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn set_message(&self, msg: String) {
        if let Some(bar) = self.bar.lock().unwrap().as_ref() {
            bar.set_message(msg);
        }
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, pdf_bytes: usize) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Analyzing");
        bar.set_message(format!("rendering {} KiB…", pdf_bytes / 1024));
        bar.enable_steady_tick(Duration::from_millis(80));
        *self.bar.lock().unwrap() = Some(bar);
    }

    fn on_pages_rendered(&self, page_count: usize) {
        self.set_message(format!("{page_count} pages rendered"));
    }

    fn on_request_sent(&self, page_count: usize, image_bytes: usize) {
        self.set_message(format!(
            "waiting for the model ({page_count} pages, {} KiB)…",
            image_bytes / 1024
        ));
    }

    fn on_extraction_complete(&self, _success: bool) {
        if let Some(bar) = self.bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }
}

// ── Backend selection ────────────────────────────────────────────────────────

/// The backend picked on the command line.
enum CliBackend {
    Gemini(GeminiBackend),
    Provider(ProviderBackend),
}

impl VisionBackend for CliBackend {
    fn name(&self) -> &str {
        match self {
            CliBackend::Gemini(b) => b.name(),
            CliBackend::Provider(b) => b.name(),
        }
    }

    async fn generate(&self, request: &ExtractionRequest) -> Result<String, BackendError> {
        match self {
            CliBackend::Gemini(b) => b.generate(request).await,
            CliBackend::Provider(b) => b.generate(request).await,
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract and print a summary
  statement-scan nov-2025.pdf

  # Several statements, exporting <name>_data.json next to each other
  statement-scan --export-dir out/ sep.pdf oct.pdf nov.pdf

  # Print the JSON instead of the summary
  statement-scan --json nov-2025.pdf > nov.json

  # Encrypted statement
  statement-scan --password 'DDMMYYYY' nov-2025.pdf

  # Another vision provider through edgequake-llm
  statement-scan --provider openai --model gpt-4.1 nov-2025.pdf

ENVIRONMENT VARIABLES:
  API_KEY                  Gemini API key (required; GEMINI_API_KEY also accepted)
  PDFIUM_DYNAMIC_LIB_PATH  Path to an existing libpdfium
  RUST_LOG                 Log filter, e.g. statement_scan=debug
"#;

/// Extract structured data from credit-card statement PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "statement-scan",
    version,
    about = "Extract structured data from credit-card statement PDFs",
    long_about = "Render each statement page, send every page to a vision model in one \
request together with a JSON schema, and show the validated card details, dues and \
transactions.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Statement PDF files.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Write `<name>_data.json` for each successful file into this directory.
    #[arg(long, env = "STATEMENT_SCAN_EXPORT_DIR")]
    export_dir: Option<PathBuf>,

    /// Print the extracted JSON instead of the summary.
    #[arg(long, env = "STATEMENT_SCAN_JSON")]
    json: bool,

    /// Model ID.
    #[arg(long, env = "STATEMENT_SCAN_MODEL")]
    model: Option<String>,

    /// Use an edgequake-llm provider (openai, anthropic, ollama, …) instead
    /// of the native Gemini backend.
    #[arg(long, env = "STATEMENT_SCAN_PROVIDER")]
    provider: Option<String>,

    /// Page render scale factor (0.5–4.0).
    #[arg(long, env = "STATEMENT_SCAN_SCALE", default_value_t = 1.5)]
    scale: f32,

    /// PDF user password for encrypted statements.
    #[arg(long, env = "STATEMENT_SCAN_PASSWORD")]
    password: Option<String>,

    /// Model call timeout in seconds.
    #[arg(long, env = "STATEMENT_SCAN_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Disable the spinner.
    #[arg(long, env = "STATEMENT_SCAN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "STATEMENT_SCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "STATEMENT_SCAN_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Credential: fatal before anything else ───────────────────────────
    let credential = Credential::from_env()?;

    // ── Build config and backend ─────────────────────────────────────────
    let config = build_config(&cli)?;
    let backend = match cli.provider.as_deref() {
        None | Some("gemini") => CliBackend::Gemini(GeminiBackend::new(credential, &config)?),
        Some(name) => CliBackend::Provider(ProviderBackend::from_name(name, &config)?),
    };

    let rasterizer = PdfiumRasterizer::new(&config);
    rasterizer
        .verify()
        .context("PDFium is required to render statements")?;

    let mut extractor = StatementExtractor::new(rasterizer, &backend, &config);
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        extractor = extractor.with_progress(cb);
    }

    // ── Process files ────────────────────────────────────────────────────
    let mut shell = Shell::new();
    let mut failures = 0usize;
    for path in &cli.files {
        let upload = match Upload::from_path(path).await {
            Ok(u) => u,
            Err(e) => {
                eprintln!("{} {}", red("✘"), e);
                failures += 1;
                continue;
            }
        };
        let source_name = upload.name.clone();

        let state = match shell.submit(upload, &extractor).await {
            Ok(state) => state.clone(),
            Err(ShellError::Rejected(e)) => {
                eprintln!("{} {}: {}", red("✘"), source_name, e.user_message());
                failures += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        match &state {
            ShellState::Success { data, .. } => {
                if cli.json {
                    println!("{}", to_json(data)?);
                } else if !cli.quiet {
                    println!("{}", render_state(&state));
                }
                if let Some(ref dir) = cli.export_dir {
                    let written = write_export(dir, &source_name, data).await?;
                    if !cli.quiet {
                        eprintln!(
                            "{} {}",
                            green("✔"),
                            dim(&format!("exported {}", written.display()))
                        );
                    }
                }
            }
            other => {
                eprintln!("{} {}: {}", red("✘"), source_name, render_state(other));
                failures += 1;
            }
        }

        shell.reset()?;
    }

    if failures > 0 {
        anyhow::bail!("{} of {} statements failed", failures, cli.files.len());
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<ScanConfig> {
    let mut builder = ScanConfig::builder()
        .render_scale(cli.scale)
        .api_timeout_secs(cli.api_timeout);
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    builder.build().context("Invalid configuration")
}
