//! PDF rasterisation: render every page of a statement to a `DynamicImage`.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and blocks for the whole render. [`render_pages`] moves the work to
//! the blocking pool so the async side only waits on one join handle.
//!
//! ## Binding per call
//!
//! `Pdfium` is not `Send`, so [`PdfiumRasterizer`] stores only the settings
//! and binds the library inside each call. The OS caches the `dlopen`, so a
//! repeat bind is close to free.

use crate::config::ScanConfig;
use crate::error::ScanError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit pdfium library file.
pub const PDFIUM_LIB_ENV: &str = "PDFIUM_DYNAMIC_LIB_PATH";

/// Turns PDF bytes into one image per page, in page order.
pub trait PageRasterizer: Send + Sync + 'static {
    /// Render all pages, first to last.
    ///
    /// Fails with [`ScanError::Document`] when the bytes cannot be opened
    /// and with [`ScanError::EmptyDocument`] when there is nothing to render.
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<DynamicImage>, ScanError>;
}

/// Run a rasterizer on the blocking pool.
pub async fn render_pages<R: PageRasterizer>(
    rasterizer: Arc<R>,
    pdf: Arc<Vec<u8>>,
) -> Result<Vec<DynamicImage>, ScanError> {
    let start = Instant::now();
    let images = tokio::task::spawn_blocking(move || rasterizer.rasterize(&pdf))
        .await
        .map_err(|e| ScanError::Internal(format!("Render task panicked: {}", e)))??;

    info!(
        "Rendered {} pages in {}ms",
        images.len(),
        start.elapsed().as_millis()
    );
    Ok(images)
}

/// [`PageRasterizer`] backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    scale: f32,
    max_pixels: u32,
    password: Option<String>,
    lib_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            scale: config.render_scale,
            max_pixels: config.max_rendered_pixels,
            password: config.password.clone(),
            lib_path: config.pdfium_lib_path.clone(),
        }
    }

    /// Bind once to check the library is present, so a missing pdfium
    /// shows up at startup rather than on the first upload.
    pub fn verify(&self) -> Result<(), ScanError> {
        bind_pdfium(self.lib_path.as_ref()).map(|_| ())
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<DynamicImage>, ScanError> {
        let pdfium = bind_pdfium(self.lib_path.as_ref())?;

        let document = pdfium
            .load_pdf_from_byte_slice(pdf, self.password.as_deref())
            .map_err(|e| map_load_error(e, self.password.is_some()))?;

        let pages = document.pages();
        let total = pages.len() as usize;
        info!("PDF loaded: {} pages", total);
        if total == 0 {
            return Err(ScanError::EmptyDocument);
        }

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.scale)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        let mut images = Vec::with_capacity(total);
        for (idx, page) in pages.iter().enumerate() {
            let bitmap =
                page.render_with_config(&render_config)
                    .map_err(|e| ScanError::Document {
                        detail: format!("page {} failed to render: {:?}", idx + 1, e),
                    })?;
            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            images.push(image);
        }

        Ok(images)
    }
}

/// Map a pdfium load failure, calling out password problems.
fn map_load_error(e: PdfiumError, password_given: bool) -> ScanError {
    let err_str = format!("{:?}", e);
    let detail = if err_str.to_lowercase().contains("password") {
        if password_given {
            "wrong password for encrypted PDF".to_string()
        } else {
            "PDF is encrypted and requires a password".to_string()
        }
    } else {
        err_str
    };
    ScanError::Document { detail }
}

/// Bind to pdfium.
///
/// Discovery order:
/// 1. `explicit` (from [`ScanConfig::pdfium_lib_path`])
/// 2. [`PDFIUM_LIB_ENV`]
/// 3. alongside the running executable
/// 4. system library search paths
fn bind_pdfium(explicit: Option<&PathBuf>) -> Result<Pdfium, ScanError> {
    let configured = explicit
        .cloned()
        .or_else(|| std::env::var(PDFIUM_LIB_ENV).ok().map(PathBuf::from));

    if let Some(path) = configured {
        debug!("Binding pdfium from {}", path.display());
        let bindings = Pdfium::bind_to_library(&path).map_err(|e| {
            ScanError::PdfiumUnavailable(format!("{}: {:?}", path.display(), e))
        })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let lib = Pdfium::pdfium_platform_library_name_at_path(
                dir.to_string_lossy().as_ref(),
            );
            if let Ok(bindings) = Pdfium::bind_to_library(&lib) {
                debug!("Bound pdfium next to executable: {}", lib.display());
                return Ok(Pdfium::new(bindings));
            }
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        warn!("pdfium not found on the system library path");
        ScanError::PdfiumUnavailable(format!("{:?}", e))
    })?;
    Ok(Pdfium::new(bindings))
}
