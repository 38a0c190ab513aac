//! File intake: what the user hands over, and the gate it must pass.
//!
//! Intake trusts the *declared* type only, the way a browser file picker
//! reports it. Content is not sniffed here; a mislabelled or broken file is
//! caught later when pdfium refuses to open it.

use crate::error::ScanError;
use std::path::Path;
use tracing::debug;

/// The only declared type intake accepts.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A file submitted for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// File name without directories, e.g. `nov-2025.pdf`.
    pub name: String,
    /// MIME type as declared by the source of the file.
    pub declared_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            bytes,
        }
    }

    /// Read a local file, declaring its type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| ScanError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let declared_type = declared_type_for(&name).to_string();
        debug!("Read {} ({} bytes, {})", name, bytes.len(), declared_type);
        Ok(Self {
            name,
            declared_type,
            bytes,
        })
    }

    /// Accept PDFs, reject everything else.
    pub fn check(&self) -> Result<(), ScanError> {
        if is_pdf_type(&self.declared_type) {
            Ok(())
        } else {
            Err(ScanError::UnsupportedFileType {
                name: self.name.clone(),
                declared_type: self.declared_type.clone(),
            })
        }
    }
}

/// True when a declared MIME type names a PDF. Parameters such as
/// `; charset=binary` are ignored.
pub fn is_pdf_type(declared_type: &str) -> bool {
    declared_type
        .split(';')
        .next()
        .map(|t| t.trim().eq_ignore_ascii_case(PDF_MIME_TYPE))
        .unwrap_or(false)
}

/// MIME type a browser would report for `file_name`, by extension.
/// Empty when the extension is unknown.
pub fn declared_type_for(file_name: &str) -> &'static str {
    mime_guess::from_path(file_name).first_raw().unwrap_or("")
}
