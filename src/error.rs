//! Error types for the statement-scan library.
//!
//! Two layers of failure exist:
//!
//! * [`ScanError`]: what the pipeline and the UI shell deal in. Every
//!   variant maps to exactly one user-facing message via
//!   [`ScanError::user_message`]; the `Display` form carries the detail
//!   that goes to the logs.
//!
//! * [`BackendError`]: what a [`crate::backend::VisionBackend`] returns
//!   when the hosted model call itself fails. The extractor folds it into
//!   [`ScanError::Extraction`]; the distinction only matters for logging.
//!
//! Nothing here is retried. A failed run is discarded as a whole and the
//! user resubmits.

use thiserror::Error;

/// Message shown when intake refuses a file.
pub const MSG_INVALID_FILE_TYPE: &str = "Invalid file type. Please upload a PDF.";

/// Message shown when the file itself cannot be read.
pub const MSG_READ: &str = "Error reading file.";

/// Message shown when the PDF engine cannot open the document.
pub const MSG_DOCUMENT: &str = "Failed to process PDF file. Ensure it is a valid PDF.";

/// Message shown when the document opened but had nothing to render.
pub const MSG_EMPTY_DOCUMENT: &str = "Could not extract any pages from the PDF.";

/// Message shown for any failure of the hosted model call or its response.
pub const MSG_EXTRACTION: &str = "Failed to get a valid response from the AI model. \
The document might be unsupported or the API key may be invalid.";

/// All errors surfaced by the statement-scan library.
#[derive(Debug, Error)]
pub enum ScanError {
    // ── Intake ────────────────────────────────────────────────────────────
    /// The upload's declared type is not `application/pdf`.
    #[error("Rejected '{name}': declared type '{declared_type}' is not application/pdf")]
    UnsupportedFileType { name: String, declared_type: String },

    /// The file could not be read from disk.
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ── Document ──────────────────────────────────────────────────────────
    /// The bytes are not a PDF PDFium can open (corrupt, truncated,
    /// encrypted without the right password) or a page failed to render.
    #[error("PDF could not be processed: {detail}")]
    Document { detail: String },

    /// The PDF opened but has zero pages.
    #[error("PDF contains no renderable pages")]
    EmptyDocument,

    // ── Extraction ────────────────────────────────────────────────────────
    /// The model call failed, or its output was not a valid statement.
    #[error("Extraction failed: {detail}")]
    Extraction { detail: String },

    // ── Output ────────────────────────────────────────────────────────────
    /// The JSON export could not be serialised.
    #[error("Failed to serialise export: {0}")]
    ExportFailed(String),

    /// The JSON export could not be written.
    #[error("Failed to write export file '{path}': {source}")]
    OutputWriteFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Environment ───────────────────────────────────────────────────────
    /// Missing credential or invalid settings. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No PDFium library could be bound.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_DYNAMIC_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumUnavailable(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScanError {
    /// The single message the UI shows for this error.
    pub fn user_message(&self) -> String {
        match self {
            ScanError::UnsupportedFileType { .. } => MSG_INVALID_FILE_TYPE.to_string(),
            ScanError::Read { .. } => MSG_READ.to_string(),
            ScanError::Document { .. } => MSG_DOCUMENT.to_string(),
            ScanError::EmptyDocument => MSG_EMPTY_DOCUMENT.to_string(),
            ScanError::Extraction { .. } => MSG_EXTRACTION.to_string(),
            other => other.to_string(),
        }
    }

    /// True for the failures the shell turns into its Error state.
    pub fn is_pipeline_error(&self) -> bool {
        matches!(
            self,
            ScanError::Read { .. }
                | ScanError::Document { .. }
                | ScanError::EmptyDocument
                | ScanError::Extraction { .. }
        )
    }
}

/// Failure of a single hosted-model call.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// HTTP 401/403: the credential was refused.
    #[error("Authentication error from '{provider}': {detail}")]
    Auth { provider: String, detail: String },

    /// HTTP 429.
    #[error("Rate limit exceeded for '{provider}'")]
    RateLimited { provider: String },

    /// Any other non-success HTTP status.
    #[error("'{provider}' returned HTTP {status}: {detail}")]
    Status {
        provider: String,
        status: u16,
        detail: String,
    },

    /// The call did not finish within the configured timeout.
    #[error("'{provider}' did not respond within {secs}s")]
    Timeout { provider: String, secs: u64 },

    /// Connection, TLS or body-decoding failure.
    #[error("Transport error talking to '{provider}': {detail}")]
    Transport { provider: String, detail: String },

    /// The call succeeded but carried no text (blocked or empty candidate).
    #[error("'{provider}' returned no text: {reason}")]
    EmptyResponse { provider: String, reason: String },
}

impl From<BackendError> for ScanError {
    fn from(e: BackendError) -> Self {
        ScanError::Extraction {
            detail: e.to_string(),
        }
    }
}
