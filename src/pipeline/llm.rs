//! Model interaction: build the single extraction request and turn the
//! model's text back into a [`StatementData`].
//!
//! The parse is strict and all-or-nothing. The text is cleaned of wrapper
//! noise (surrounding whitespace, a Markdown code fence), parsed as JSON,
//! checked against [`crate::schema`], and only then deserialised. Any
//! failure along the way is an [`ScanError::Extraction`]; there is no
//! repair pass and no partial result.

use crate::backend::ExtractionRequest;
use crate::error::ScanError;
use crate::output::StatementData;
use crate::pipeline::encode::PageImage;
use crate::prompts::DEFAULT_INSTRUCTION;
use crate::schema::{statement_schema, validate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

/// How many schema violations to spell out in the error detail.
const MAX_REPORTED_VIOLATIONS: usize = 5;

/// Assemble the request for one statement.
pub fn build_request(images: Vec<PageImage>, instruction: Option<&str>) -> ExtractionRequest {
    ExtractionRequest {
        instruction: instruction.unwrap_or(DEFAULT_INSTRUCTION).to_string(),
        images,
        schema: statement_schema(),
    }
}

static RE_CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n(.*?)\r?\n?```$").unwrap());

/// Strip surrounding whitespace and an outer Markdown code fence.
///
/// Schema-constrained backends never fence their output; prompt-only
/// backends sometimes do despite being told not to.
pub fn sanitize_response(raw: &str) -> &str {
    let trimmed = raw.trim().trim_start_matches('\u{feff}');
    match RE_CODE_FENCE.captures(trimmed) {
        Some(caps) => caps.get(1).map(|m| m.as_str().trim()).unwrap_or(trimmed),
        None => trimmed,
    }
}

/// Parse and validate the model's answer.
pub fn parse_statement(raw: &str) -> Result<StatementData, ScanError> {
    let text = sanitize_response(raw);
    if text.is_empty() {
        return Err(ScanError::Extraction {
            detail: "model returned an empty response".to_string(),
        });
    }

    let value: Value = serde_json::from_str(text).map_err(|e| {
        warn!("Model response is not JSON: {}", e);
        ScanError::Extraction {
            detail: format!("response is not valid JSON: {e}"),
        }
    })?;

    if let Err(violations) = validate(&value) {
        warn!("Model response violates schema: {} issue(s)", violations.len());
        let listed: Vec<String> = violations
            .iter()
            .take(MAX_REPORTED_VIOLATIONS)
            .map(|v| v.to_string())
            .collect();
        let more = violations.len().saturating_sub(MAX_REPORTED_VIOLATIONS);
        let mut detail = format!("response does not match schema: {}", listed.join("; "));
        if more > 0 {
            detail.push_str(&format!(" (and {more} more)"));
        }
        return Err(ScanError::Extraction { detail });
    }

    let data: StatementData = serde_json::from_value(value).map_err(|e| ScanError::Extraction {
        detail: format!("response could not be converted: {e}"),
    })?;
    debug!(
        "Parsed statement: {} transactions, total dues {}",
        data.transactions.len(),
        data.total_dues
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const GOOD: &str = r#"{
        "cardType": "SBI SimplyCLICK",
        "cardHolderName": "Priya Sharma",
        "cardLastFourDigits": "9876",
        "billingCycle": "02 Oct – 02 Nov 2025",
        "paymentDueDate": "22 Nov 2025",
        "totalDues": 45210.75,
        "transactions": [
            {"date": "03/10/2025", "description": "SWIGGY", "amount": 432.10},
            {"date": "07/10/2025", "description": "PAYMENT RECEIVED", "amount": -15000}
        ]
    }"#;

    #[test]
    fn parses_conforming_response() {
        let data = parse_statement(GOOD).unwrap();
        assert_eq!(data.card_type, "SBI SimplyCLICK");
        assert_eq!(data.total_dues, Decimal::from_str("45210.75").unwrap());
        assert_eq!(data.transactions.len(), 2);
        assert_eq!(data.transactions[0].amount, Decimal::from_str("432.10").unwrap());
        assert_eq!(data.transactions[1].amount, Decimal::from(-15000));
        assert_eq!(data.transactions[1].description, "PAYMENT RECEIVED");
    }

    #[test]
    fn fenced_response_is_accepted() {
        let fenced = format!("```json\n{GOOD}\n```");
        assert!(parse_statement(&fenced).is_ok());
    }

    #[test]
    fn sanitize_leaves_plain_json_alone() {
        assert_eq!(sanitize_response("  {\"a\":1}\n"), "{\"a\":1}");
        assert_eq!(sanitize_response("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn empty_response_is_extraction_error() {
        let err = parse_statement("   ").unwrap_err();
        assert!(matches!(err, ScanError::Extraction { .. }));
    }

    #[test]
    fn non_json_is_extraction_error() {
        let err = parse_statement("I could not read this statement.").unwrap_err();
        assert!(err.to_string().contains("not valid JSON"), "got: {err}");
    }

    #[test]
    fn missing_field_is_extraction_error() {
        let mut v: Value = serde_json::from_str(GOOD).unwrap();
        v.as_object_mut().unwrap().remove("totalDues");
        let err = parse_statement(&v.to_string()).unwrap_err();
        assert!(err.to_string().contains("$.totalDues"), "got: {err}");
    }

    #[test]
    fn string_amount_is_extraction_error() {
        let mut v: Value = serde_json::from_str(GOOD).unwrap();
        v["transactions"][1]["amount"] = Value::String("₹15,000".into());
        let err = parse_statement(&v.to_string()).unwrap_err();
        assert!(err.to_string().contains("$.transactions[1].amount"));
    }

    #[test]
    fn empty_transaction_list_is_valid() {
        let mut v: Value = serde_json::from_str(GOOD).unwrap();
        v["transactions"] = Value::Array(vec![]);
        let data = parse_statement(&v.to_string()).unwrap();
        assert!(data.transactions.is_empty());
    }

    #[test]
    fn violation_list_is_capped() {
        let err = parse_statement("{}").unwrap_err();
        assert!(err.to_string().contains("(and 2 more)"), "got: {err}");
    }

    #[test]
    fn request_uses_default_instruction_and_schema() {
        let req = build_request(vec![], None);
        assert_eq!(req.instruction, DEFAULT_INSTRUCTION);
        assert_eq!(req.schema, statement_schema());

        let req = build_request(vec![], Some("custom"));
        assert_eq!(req.instruction, "custom");
    }
}
