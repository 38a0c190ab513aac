//! JSON export of an extracted statement.
//!
//! The export is the camelCase JSON of [`StatementData`], pretty-printed
//! with two-space indentation, named after the source file.

use crate::error::ScanError;
use crate::output::StatementData;
use std::path::{Path, PathBuf};
use tracing::info;

/// Appended to the source name, after a trailing `.pdf` is dropped.
pub const EXPORT_SUFFIX: &str = "_data.json";

/// A ready-to-save export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementExport {
    pub file_name: String,
    pub json: String,
}

/// `nov.pdf` → `nov_data.json`. The `.pdf` match ignores case; names
/// without it just get the suffix.
pub fn export_file_name(source_name: &str) -> String {
    let stem = match source_name.len().checked_sub(4) {
        Some(cut)
            if source_name.is_char_boundary(cut)
                && source_name[cut..].eq_ignore_ascii_case(".pdf") =>
        {
            &source_name[..cut]
        }
        _ => source_name,
    };
    format!("{stem}{EXPORT_SUFFIX}")
}

pub fn to_json(data: &StatementData) -> Result<String, ScanError> {
    serde_json::to_string_pretty(data).map_err(|e| ScanError::ExportFailed(e.to_string()))
}

/// Read an export back.
pub fn from_json(json: &str) -> Result<StatementData, ScanError> {
    serde_json::from_str(json).map_err(|e| ScanError::ExportFailed(e.to_string()))
}

pub fn export(data: &StatementData, source_name: &str) -> Result<StatementExport, ScanError> {
    Ok(StatementExport {
        file_name: export_file_name(source_name),
        json: to_json(data)?,
    })
}

/// Write the export of `data` into `dir` and return its path.
///
/// Uses atomic write (temp file + rename) so a reader never sees a
/// partial file.
pub async fn write_export(
    dir: impl AsRef<Path>,
    source_name: &str,
    data: &StatementData,
) -> Result<PathBuf, ScanError> {
    let out = export(data, source_name)?;
    let dir = dir.as_ref();
    let path = dir.join(&out.file_name);
    let write_err = |e| ScanError::OutputWriteFailed {
        path: path.clone(),
        source: e,
    };

    tokio::fs::create_dir_all(dir).await.map_err(write_err)?;

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, out.json.as_bytes())
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(write_err)?;

    info!("Exported {}", path.display());
    Ok(path)
}
