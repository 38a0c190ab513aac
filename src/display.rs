//! Plain-text rendering of the shell for a terminal.
//!
//! Display is read-only: nothing here edits the extracted data.

use crate::output::StatementData;
use crate::shell::ShellState;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt::Write;

pub const IDLE_TEXT: &str = "Upload a PDF statement to get started.";
pub const LOADING_TEXT: &str = "Analyzing your statement...\nThis might take a moment.";
pub const TRY_AGAIN_HINT: &str = "Reset and submit the file again to try again.";
pub const NO_TRANSACTIONS: &str = "No transactions found.";

/// Indian rupees, en-IN grouping: `₹1,23,456.78`, `-₹500.00`.
pub fn format_inr(amount: Decimal) -> String {
    let mut value = amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .abs();
    value.rescale(2);
    let negative = amount.is_sign_negative() && !value.is_zero();

    let text = value.to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let sign = if negative { "-" } else { "" };
    format!("{sign}₹{}.{frac_part}", group_indian(int_part))
}

/// Last three digits, then pairs: `1234567` → `12,34,567`.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (mut head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    while head.len() > 2 {
        let (rest, pair) = head.split_at(head.len() - 2);
        groups.push(pair);
        head = rest;
    }
    if !head.is_empty() {
        groups.push(head);
    }
    groups.reverse();
    format!("{},{}", groups.join(","), tail)
}

/// `1234` → `**** 1234`.
pub fn mask_card(last_four: &str) -> String {
    format!("**** {last_four}")
}

/// Summary and transaction table for one statement.
pub fn render_statement(data: &StatementData, file_name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Extracted Data");
    let _ = writeln!(out, "Summary from {file_name}");
    let _ = writeln!(out);

    let summary = [
        ("Card Type", data.card_type.clone()),
        ("Card Holder", data.card_holder_name.clone()),
        ("Last 4 Digits", mask_card(&data.card_last_four_digits)),
        ("Billing Cycle", data.billing_cycle.clone()),
        ("Payment Due Date", data.payment_due_date.clone()),
        ("Total Due", format_inr(data.total_dues)),
    ];
    let label_width = summary.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    for (label, value) in &summary {
        let _ = writeln!(out, "  {label:<label_width$}  {value}");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Transactions");
    if data.transactions.is_empty() {
        let _ = writeln!(out, "  {NO_TRANSACTIONS}");
        return out;
    }

    let amounts: Vec<String> = data
        .transactions
        .iter()
        .map(|t| format_inr(t.amount))
        .collect();
    let date_w = width("DATE", data.transactions.iter().map(|t| t.date.as_str()));
    let desc_w = width(
        "DESCRIPTION",
        data.transactions.iter().map(|t| t.description.as_str()),
    );
    let amount_w = width("AMOUNT", amounts.iter().map(String::as_str));

    let _ = writeln!(
        out,
        "  {:<date_w$}  {:<desc_w$}  {:>amount_w$}",
        "DATE", "DESCRIPTION", "AMOUNT"
    );
    for (t, amount) in data.transactions.iter().zip(&amounts) {
        let _ = writeln!(
            out,
            "  {:<date_w$}  {:<desc_w$}  {:>amount_w$}",
            t.date, t.description, amount
        );
    }
    out
}

fn width<'a>(header: &str, cells: impl Iterator<Item = &'a str>) -> usize {
    cells
        .map(|c| c.chars().count())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0)
}

/// Text for whatever state the shell is in.
pub fn render_state(state: &ShellState) -> String {
    match state {
        ShellState::Idle { intake_error: None } => IDLE_TEXT.to_string(),
        ShellState::Idle {
            intake_error: Some(e),
        } => format!("{IDLE_TEXT}\n{e}"),
        ShellState::Loading { .. } => LOADING_TEXT.to_string(),
        ShellState::Success { file_name, data } => render_statement(data, file_name),
        ShellState::Error { message } => format!("{message}\n{TRY_AGAIN_HINT}"),
    }
}
