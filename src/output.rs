//! Extracted statement data and per-run statistics.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One line of the statement's transaction list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Date as printed on the statement, e.g. `05/10/2025`.
    pub date: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
}

/// Everything extracted from one statement.
///
/// Produced in one piece by a successful extraction and never modified
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementData {
    /// Card product name, e.g. `HDFC Regalia`.
    pub card_type: String,
    pub card_holder_name: String,
    pub card_last_four_digits: String,
    /// Billing period as printed, e.g. `02 Oct – 02 Nov 2025`.
    pub billing_cycle: String,
    pub payment_due_date: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub total_dues: Decimal,
    /// In the order the model returned them.
    pub transactions: Vec<Transaction>,
}

/// A successful extraction plus the numbers worth logging about it.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub data: StatementData,
    /// Pages rendered and sent to the model.
    pub page_count: usize,
    /// Total base64 payload size across all page images.
    pub image_bytes: usize,
    pub render_duration_ms: u64,
    pub model_duration_ms: u64,
    pub total_duration_ms: u64,
}
