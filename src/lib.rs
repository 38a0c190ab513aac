//! # statement-scan
//!
//! Extract structured data from credit-card statement PDFs with a hosted
//! vision model.
//!
//! Statements are laid out for print, not for parsing: tables wrap across
//! pages, columns drift between issuers, totals sit in sidebars. Instead of
//! parsing text, this crate rasterises every page and asks a vision model to
//! fill a fixed JSON schema, then validates the answer before trusting it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Intake  accept only a declared application/pdf
//!  ├─ 2. Render  rasterise pages via pdfium (spawn_blocking)
//!  ├─ 3. Encode  JPEG → base64 page images
//!  ├─ 4. Model   ONE call: instruction + all pages + response schema
//!  └─ 5. Parse   validate against the schema → StatementData
//! ```
//!
//! The [`Shell`] wraps the pipeline in the Idle / Loading / Success / Error
//! state machine a front-end drives; [`display`] renders it as text and
//! [`export`] writes `<name>_data.json`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use statement_scan::{
//!     Credential, GeminiBackend, PdfiumRasterizer, ScanConfig, Shell,
//!     StatementExtractor, Upload,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Fails fast when API_KEY is not set.
//!     let credential = Credential::from_env()?;
//!     let config = ScanConfig::default();
//!     let backend = GeminiBackend::new(credential, &config)?;
//!     let extractor =
//!         StatementExtractor::new(PdfiumRasterizer::new(&config), &backend, &config);
//!
//!     let mut shell = Shell::new();
//!     let upload = Upload::from_path("statement.pdf").await?;
//!     let state = shell.submit(upload, &extractor).await?;
//!     println!("{}", statement_scan::display::render_state(state));
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `statement-scan` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod schema;
pub mod shell;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{ExtractionRequest, GeminiBackend, ProviderBackend, VisionBackend};
pub use config::{Credential, ScanConfig, ScanConfigBuilder};
pub use error::{BackendError, ScanError};
pub use export::{write_export, StatementExport};
pub use extract::StatementExtractor;
pub use output::{ExtractionReport, StatementData, Transaction};
pub use pipeline::input::Upload;
pub use pipeline::render::{PageRasterizer, PdfiumRasterizer};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use shell::{Shell, ShellError, ShellState, Ticket, TicketId};
