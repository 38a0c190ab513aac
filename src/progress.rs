//! Progress-callback trait for extraction milestones.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::extract::StatementExtractor::with_progress`] to hear about a run
//! as it moves through rendering and the model call. The terminal front-end
//! uses it to drive its spinner; a library user can forward the events to
//! whatever shows progress in their host application.
//!
//! # Example
//!
//! ```rust
//! use statement_scan::ExtractionProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct PageCounter(AtomicUsize);
//!
//! impl ExtractionProgressCallback for PageCounter {
//!     fn on_pages_rendered(&self, page_count: usize) {
//!         self.0.store(page_count, Ordering::SeqCst);
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called by the extractor at each milestone of a run.
///
/// All methods default to no-ops so implementors override only what they
/// need. Events for one run arrive in order, from the task that awaits
/// [`crate::extract::StatementExtractor::extract`].
pub trait ExtractionProgressCallback: Send + Sync {
    /// Rendering is about to start.
    fn on_extraction_start(&self, pdf_bytes: usize) {
        let _ = pdf_bytes;
    }

    /// Every page is rendered and encoded.
    fn on_pages_rendered(&self, page_count: usize) {
        let _ = page_count;
    }

    /// The single model request is on its way.
    ///
    /// # Arguments
    /// * `page_count` : images in the request
    /// * `image_bytes`: total base64 payload size
    fn on_request_sent(&self, page_count: usize, image_bytes: usize) {
        let _ = (page_count, image_bytes);
    }

    /// The run has ended, successfully or not.
    fn on_extraction_complete(&self, success: bool) {
        let _ = success;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias for the type the extractor stores.
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ExtractionProgressCallback for Recorder {
        fn on_pages_rendered(&self, page_count: usize) {
            self.0.lock().unwrap().push(format!("rendered:{page_count}"));
        }

        fn on_extraction_complete(&self, success: bool) {
            self.0.lock().unwrap().push(format!("done:{success}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start(1024);
        cb.on_pages_rendered(3);
        cb.on_request_sent(3, 4096);
        cb.on_extraction_complete(false);
    }

    #[test]
    fn overridden_methods_receive_events() {
        let rec = Recorder::default();
        rec.on_extraction_start(10);
        rec.on_pages_rendered(2);
        rec.on_request_sent(2, 100);
        rec.on_extraction_complete(true);
        assert_eq!(*rec.0.lock().unwrap(), vec!["rendered:2", "done:true"]);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_pages_rendered(1);
    }
}
