//! Shell and pipeline integration tests.
//!
//! The rasterizer and the model are fakes, so these run anywhere: no pdfium,
//! no network, no credential.

use image::{DynamicImage, Rgb, RgbImage};
use rust_decimal::Decimal;
use statement_scan::display::{render_state, NO_TRANSACTIONS};
use statement_scan::error::{MSG_DOCUMENT, MSG_EMPTY_DOCUMENT, MSG_EXTRACTION, MSG_INVALID_FILE_TYPE};
use statement_scan::export::from_json;
use statement_scan::shell::MSG_ABANDONED;
use statement_scan::{
    write_export, BackendError, ExtractionRequest, PageRasterizer, ScanConfig, ScanError, Shell,
    ShellError, ShellState, StatementExtractor, Upload, VisionBackend,
};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Renders `pages` solid images whose red channel is the page index.
#[derive(Clone)]
struct FakeRasterizer {
    outcome: Result<usize, &'static str>,
    calls: Arc<AtomicUsize>,
}

impl FakeRasterizer {
    fn pages(n: usize) -> Self {
        Self {
            outcome: Ok(n),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing(kind: &'static str) -> Self {
        Self {
            outcome: Err(kind),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl PageRasterizer for FakeRasterizer {
    fn rasterize(&self, _pdf: &[u8]) -> Result<Vec<DynamicImage>, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.outcome {
            Ok(0) | Err("empty") => Err(ScanError::EmptyDocument),
            Ok(n) => Ok((0..n)
                .map(|i| DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([i as u8 * 40, 0, 0]))))
                .collect()),
            Err(detail) => Err(ScanError::Document {
                detail: detail.to_string(),
            }),
        }
    }
}

/// Answers every request with a canned reply and records what it saw.
struct FakeBackend {
    reply: Result<String, BackendError>,
    calls: AtomicUsize,
    seen_pages: Mutex<Vec<usize>>,
}

impl FakeBackend {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            seen_pages: Mutex::new(Vec::new()),
        }
    }

    fn failing(err: BackendError) -> Self {
        Self {
            reply: Err(err),
            calls: AtomicUsize::new(0),
            seen_pages: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VisionBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate(&self, request: &ExtractionRequest) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_pages.lock().unwrap() = request.images.iter().map(|i| i.page_num).collect();
        self.reply.clone()
    }
}

/// Never answers.
struct StalledBackend;

impl VisionBackend for StalledBackend {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn generate(&self, _request: &ExtractionRequest) -> Result<String, BackendError> {
        std::future::pending().await
    }
}

const STATEMENT: &str = r#"{
    "cardType": "HDFC Regalia",
    "cardHolderName": "Priya Sharma",
    "cardLastFourDigits": "4321",
    "billingCycle": "02 Oct - 02 Nov 2025",
    "paymentDueDate": "22 Nov 2025",
    "totalDues": 123456.78,
    "transactions": [
        {"date": "05/10/2025", "description": "AMAZON", "amount": 1299.00},
        {"date": "11/10/2025", "description": "SWIGGY", "amount": 432.10},
        {"date": "20/10/2025", "description": "PAYMENT RECEIVED", "amount": -500}
    ]
}"#;

fn pdf_upload(name: &str) -> Upload {
    Upload::new(name, "application/pdf", b"%PDF-1.7 fake".to_vec())
}

// ── Intake ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn non_pdf_is_rejected_without_running_the_pipeline() {
    let config = ScanConfig::default();
    let rasterizer = FakeRasterizer::pages(2);
    let calls = Arc::clone(&rasterizer.calls);
    let backend = FakeBackend::replying(STATEMENT);
    let extractor = StatementExtractor::new(rasterizer, &backend, &config);

    let mut shell = Shell::new();
    let err = shell
        .submit(Upload::new("scan.png", "image/png", vec![0x89, b'P']), &extractor)
        .await
        .unwrap_err();

    assert!(matches!(err, ShellError::Rejected(ScanError::UnsupportedFileType { .. })));
    assert_eq!(
        *shell.state(),
        ShellState::Idle {
            intake_error: Some(MSG_INVALID_FILE_TYPE.into())
        }
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(backend.calls(), 0);
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn every_page_goes_out_in_one_request_in_order() {
    let config = ScanConfig::default();
    let backend = FakeBackend::replying(STATEMENT);
    let extractor = StatementExtractor::new(FakeRasterizer::pages(4), &backend, &config);

    let report = extractor
        .extract_with_report(b"%PDF".to_vec())
        .await
        .unwrap();

    assert_eq!(backend.calls(), 1);
    assert_eq!(*backend.seen_pages.lock().unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(report.page_count, 4);
    assert!(report.image_bytes > 0);
    assert_eq!(report.data.transactions.len(), 3);
}

#[tokio::test]
async fn corrupt_or_empty_document_fails_before_the_model_call() {
    let config = ScanConfig::default();

    for (rasterizer, expected) in [
        (FakeRasterizer::failing("bad xref"), MSG_DOCUMENT),
        (FakeRasterizer::failing("empty"), MSG_EMPTY_DOCUMENT),
        (FakeRasterizer::pages(0), MSG_EMPTY_DOCUMENT),
    ] {
        let backend = FakeBackend::replying(STATEMENT);
        let extractor = StatementExtractor::new(rasterizer, &backend, &config);
        let mut shell = Shell::new();

        let state = shell.submit(pdf_upload("s.pdf"), &extractor).await.unwrap();
        assert_eq!(
            *state,
            ShellState::Error {
                message: expected.into()
            }
        );
        assert_eq!(backend.calls(), 0);
    }
}

#[tokio::test]
async fn backend_failure_becomes_generic_extraction_message() {
    let config = ScanConfig::default();
    let backend = FakeBackend::failing(BackendError::Auth {
        provider: "fake".into(),
        detail: "API key not valid".into(),
    });
    let extractor = StatementExtractor::new(FakeRasterizer::pages(1), &backend, &config);

    let err = extractor.extract(b"%PDF".to_vec()).await.unwrap_err();
    assert!(matches!(err, ScanError::Extraction { .. }));
    assert_eq!(err.user_message(), MSG_EXTRACTION);
}

#[tokio::test]
async fn nonconforming_reply_is_an_extraction_error() {
    let config = ScanConfig::default();
    let missing_field = STATEMENT.replace("\"paymentDueDate\": \"22 Nov 2025\",", "");
    let wrong_type = STATEMENT.replace("123456.78", "\"123456.78\"");

    for reply in [missing_field, wrong_type, "I could not read this statement.".to_string()] {
        let backend = FakeBackend::replying(&reply);
        let extractor = StatementExtractor::new(FakeRasterizer::pages(1), &backend, &config);
        let err = extractor.extract(b"%PDF".to_vec()).await.unwrap_err();
        assert!(matches!(err, ScanError::Extraction { .. }), "reply: {reply}");
    }
}

// ── Shell flow ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn success_displays_currency_and_transactions_in_order() {
    let config = ScanConfig::default();
    let backend = FakeBackend::replying(STATEMENT);
    let extractor = StatementExtractor::new(FakeRasterizer::pages(2), &backend, &config);
    let mut shell = Shell::new();

    let state = shell.submit(pdf_upload("nov.pdf"), &extractor).await.unwrap();
    let text = render_state(state);

    assert!(text.contains("Summary from nov.pdf"));
    assert!(text.contains("**** 4321"));
    assert!(text.contains("₹1,23,456.78"));
    assert!(text.contains("-₹500.00"));
    assert!(!text.contains(NO_TRANSACTIONS));
    let positions: Vec<usize> = ["AMAZON", "SWIGGY", "PAYMENT RECEIVED"]
        .iter()
        .map(|d| text.find(d).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
}

#[tokio::test]
async fn export_round_trips_the_held_statement() {
    let config = ScanConfig::default();
    let backend = FakeBackend::replying(STATEMENT);
    let extractor = StatementExtractor::new(FakeRasterizer::pages(1), &backend, &config);
    let mut shell = Shell::new();
    shell.submit(pdf_upload("Nov 2025.pdf"), &extractor).await.unwrap();

    let held = match shell.state() {
        ShellState::Success { data, .. } => data.clone(),
        other => panic!("expected Success, got {other:?}"),
    };

    let export = shell.export().unwrap();
    assert_eq!(export.file_name, "Nov 2025_data.json");
    assert_eq!(from_json(&export.json).unwrap(), held);

    let dir = tempfile::tempdir().unwrap();
    let path = write_export(dir.path(), "Nov 2025.pdf", &held).await.unwrap();
    let on_disk = from_json(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(on_disk, held);
    assert_eq!(on_disk.total_dues, Decimal::from_str("123456.78").unwrap());
}

#[tokio::test]
async fn reset_returns_to_clean_idle_from_success_and_error() {
    let config = ScanConfig::default();

    let ok_backend = FakeBackend::replying(STATEMENT);
    let ok = StatementExtractor::new(FakeRasterizer::pages(1), &ok_backend, &config);
    let bad_backend = FakeBackend::replying("not json");
    let bad = StatementExtractor::new(FakeRasterizer::pages(1), &bad_backend, &config);

    let mut shell = Shell::new();
    shell.submit(pdf_upload("a.pdf"), &ok).await.unwrap();
    assert!(matches!(shell.state(), ShellState::Success { .. }));
    shell.reset().unwrap();
    assert_eq!(*shell.state(), ShellState::default());
    assert!(matches!(shell.export(), Err(ShellError::NothingToExport)));

    shell.submit(pdf_upload("b.pdf"), &bad).await.unwrap();
    assert!(matches!(shell.state(), ShellState::Error { .. }));
    shell.reset().unwrap();
    assert_eq!(*shell.state(), ShellState::default());
}

#[tokio::test]
async fn busy_shell_refuses_a_second_submission() {
    let config = ScanConfig::default();
    let backend = FakeBackend::replying(STATEMENT);
    let extractor = StatementExtractor::new(FakeRasterizer::pages(1), &backend, &config);
    let mut shell = Shell::new();

    let ticket = shell.begin(pdf_upload("first.pdf")).unwrap();
    let err = shell
        .submit(pdf_upload("second.pdf"), &extractor)
        .await
        .unwrap_err();
    assert!(matches!(err, ShellError::Busy));
    assert_eq!(backend.calls(), 0);

    let result = extractor.extract(ticket.pdf).await;
    assert!(shell.complete(ticket.id, result));
    assert!(
        matches!(shell.state(), ShellState::Success { file_name, .. } if file_name == "first.pdf")
    );
}

#[tokio::test]
async fn empty_transaction_list_is_a_valid_statement() {
    let config = ScanConfig::default();
    let reply = r#"{
        "cardType": "Visa", "cardHolderName": "X", "cardLastFourDigits": "0001",
        "billingCycle": "Oct", "paymentDueDate": "Nov", "totalDues": 0,
        "transactions": []
    }"#;
    let backend = FakeBackend::replying(reply);
    let extractor = StatementExtractor::new(FakeRasterizer::pages(1), &backend, &config);
    let mut shell = Shell::new();

    let state = shell.submit(pdf_upload("x.pdf"), &extractor).await.unwrap();
    assert!(render_state(state).contains(NO_TRANSACTIONS));
}

#[tokio::test]
async fn dropped_submission_lands_in_error_and_can_be_reset() {
    let config = ScanConfig::default();
    let backend = StalledBackend;
    let extractor = StatementExtractor::new(FakeRasterizer::pages(1), &backend, &config);
    let mut shell = Shell::new();

    let timed_out = tokio::time::timeout(
        Duration::from_millis(100),
        shell.submit(pdf_upload("a.pdf"), &extractor),
    )
    .await;
    assert!(timed_out.is_err());

    assert_eq!(
        *shell.state(),
        ShellState::Error {
            message: MSG_ABANDONED.into()
        }
    );
    shell.reset().unwrap();
    assert!(shell.begin(pdf_upload("b.pdf")).is_ok());
}
