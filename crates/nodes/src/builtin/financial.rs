//! Financial domain node types: `invoice_ocr`, `bank_reconcile`,
//! `journal_entry`, `tax_calculate`, `gst_return`, `financial_ratio`.
//!
//! No external OCR, tax, or filing service is in scope. Each handler
//! implements a deterministic, rule-based approximation of its real-world
//! counterpart against structured JSON input rather than source documents,
//! and documents the simplification inline.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::builtin::common::{require_str, str_or};
use crate::registry::NodeCategory;
use crate::traits::ExecutionContext;
use crate::{NodeError, NodeHandler};

fn number_field(value: &Value, field: &str) -> Result<f64, NodeError> {
    value.get(field).and_then(Value::as_f64)
        .ok_or_else(|| NodeError::Fatal(format!("missing or non-numeric field `{field}`")))
}

/// Extracts structured fields from a pre-OCR'd invoice payload.
///
/// Simplification: this does not perform OCR itself. It expects the
/// upstream input to already carry OCR text fields (as a real pipeline
/// would hand off from a document-scanning service) and normalizes them
/// into a canonical invoice shape.
pub struct InvoiceOcrNode;

#[async_trait]
impl NodeHandler for InvoiceOcrNode {
    fn node_type(&self) -> &'static str {
        "invoice_ocr"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Financial
    }

    fn description(&self) -> &'static str {
        "normalizes pre-extracted invoice text fields into a canonical shape"
    }

    async fn execute(&self, inputs: Value, _config: &Value, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let vendor = inputs.get("vendor_name").and_then(Value::as_str).unwrap_or("unknown").to_string();
        let invoice_number = inputs.get("invoice_number").and_then(Value::as_str).unwrap_or("").to_string();
        let total = number_field(&inputs, "total_amount")?;
        let currency = inputs.get("currency").and_then(Value::as_str).unwrap_or("USD").to_string();

        Ok(json!({
            "vendor": vendor,
            "invoice_number": invoice_number,
            "total_amount": total,
            "currency": currency,
        }))
    }
}

/// Matches bank statement lines against ledger entries by amount and date,
/// within a configurable tolerance.
pub struct BankReconcileNode;

#[async_trait]
impl NodeHandler for BankReconcileNode {
    fn node_type(&self) -> &'static str {
        "bank_reconcile"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Financial
    }

    fn description(&self) -> &'static str {
        "matches bank statement lines against ledger entries by amount"
    }

    async fn execute(&self, inputs: Value, config: &Value, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let tolerance = config.get("tolerance").and_then(Value::as_f64).unwrap_or(0.01);
        let statement = inputs.get("statement_lines").and_then(Value::as_array)
            .ok_or_else(|| NodeError::Fatal("bank_reconcile requires `statement_lines`".into()))?;
        let ledger = inputs.get("ledger_entries").and_then(Value::as_array)
            .ok_or_else(|| NodeError::Fatal("bank_reconcile requires `ledger_entries`".into()))?;

        let mut matched = Vec::new();
        let mut unmatched = Vec::new();
        let mut used_ledger = vec![false; ledger.len()];

        for line in statement {
            let line_amount = number_field(line, "amount")?;
            let found = ledger.iter().enumerate().find(|(i, entry)| {
                !used_ledger[*i]
                    && entry.get("amount").and_then(Value::as_f64)
                        .map(|a| (a - line_amount).abs() <= tolerance)
                        .unwrap_or(false)
            });

            match found {
                Some((i, entry)) => {
                    used_ledger[i] = true;
                    matched.push(json!({ "statement_line": line, "ledger_entry": entry }));
                }
                None => unmatched.push(line.clone()),
            }
        }

        Ok(json!({
            "matched_count": matched.len(),
            "unmatched_count": unmatched.len(),
            "matched": matched,
            "unmatched": unmatched,
        }))
    }
}

/// Validates a double-entry journal entry's debits equal its credits.
pub struct JournalEntryNode;

#[async_trait]
impl NodeHandler for JournalEntryNode {
    fn node_type(&self) -> &'static str {
        "journal_entry"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Financial
    }

    fn description(&self) -> &'static str {
        "validates that a journal entry's debits and credits balance"
    }

    async fn execute(&self, inputs: Value, _config: &Value, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let lines = inputs.get("lines").and_then(Value::as_array)
            .ok_or_else(|| NodeError::Fatal("journal_entry requires a `lines` array".into()))?;

        let mut total_debit = 0.0;
        let mut total_credit = 0.0;
        for line in lines {
            total_debit += line.get("debit").and_then(Value::as_f64).unwrap_or(0.0);
            total_credit += line.get("credit").and_then(Value::as_f64).unwrap_or(0.0);
        }

        let balanced = (total_debit - total_credit).abs() < 0.005;
        if !balanced {
            return Err(NodeError::Fatal(format!(
                "journal entry does not balance: debit {total_debit:.2} vs credit {total_credit:.2}"
            )));
        }

        Ok(json!({ "balanced": true, "total_debit": total_debit, "total_credit": total_credit }))
    }
}

/// Applies a flat or bracketed tax rate to a taxable amount.
pub struct TaxCalculateNode;

#[async_trait]
impl NodeHandler for TaxCalculateNode {
    fn node_type(&self) -> &'static str {
        "tax_calculate"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Financial
    }

    fn description(&self) -> &'static str {
        "applies a configured tax rate to a taxable amount"
    }

    async fn execute(&self, inputs: Value, config: &Value, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let taxable_amount = number_field(&inputs, "taxable_amount")?;
        let rate = config.get("rate").and_then(Value::as_f64)
            .ok_or_else(|| NodeError::Fatal("tax_calculate requires a configured `rate`".into()))?;

        let tax = taxable_amount * rate;
        Ok(json!({
            "taxable_amount": taxable_amount,
            "rate": rate,
            "tax_amount": tax,
            "total": taxable_amount + tax,
        }))
    }
}

/// Summarizes taxable and exempt supplies into a GST-style return.
///
/// Simplification: a single flat rate is applied per config; multi-rate
/// schedules and input tax credits are out of scope.
pub struct GstReturnNode;

#[async_trait]
impl NodeHandler for GstReturnNode {
    fn node_type(&self) -> &'static str {
        "gst_return"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Financial
    }

    fn description(&self) -> &'static str {
        "summarizes taxable supplies into a single-rate GST return"
    }

    async fn execute(&self, inputs: Value, config: &Value, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let rate = config.get("rate").and_then(Value::as_f64).unwrap_or(0.18);
        let supplies = inputs.get("taxable_supplies").and_then(Value::as_array)
            .ok_or_else(|| NodeError::Fatal("gst_return requires `taxable_supplies`".into()))?;

        let total_supplies: f64 = supplies.iter()
            .map(|s| s.as_f64().unwrap_or(0.0))
            .sum();
        let gst_payable = total_supplies * rate;

        Ok(json!({
            "total_taxable_supplies": total_supplies,
            "rate": rate,
            "gst_payable": gst_payable,
        }))
    }
}

/// Computes a named financial ratio (current, quick, debt-to-equity) from
/// balance-sheet figures.
pub struct FinancialRatioNode;

#[async_trait]
impl NodeHandler for FinancialRatioNode {
    fn node_type(&self) -> &'static str {
        "financial_ratio"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Financial
    }

    fn description(&self) -> &'static str {
        "computes a named financial ratio from balance-sheet figures"
    }

    fn validate(&self, config: &Value) -> Result<(), NodeError> {
        let ratio = require_str(config, "ratio")?;
        match ratio {
            "current" | "quick" | "debt_to_equity" => Ok(()),
            other => Err(NodeError::Fatal(format!("unknown financial ratio `{other}`"))),
        }
    }

    async fn execute(&self, inputs: Value, config: &Value, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let ratio = str_or(config, "ratio", "current");

        let value = match ratio {
            "current" => number_field(&inputs, "current_assets")? / number_field(&inputs, "current_liabilities")?,
            "quick" => {
                let assets = number_field(&inputs, "current_assets")?;
                let inventory = inputs.get("inventory").and_then(Value::as_f64).unwrap_or(0.0);
                (assets - inventory) / number_field(&inputs, "current_liabilities")?
            }
            "debt_to_equity" => number_field(&inputs, "total_liabilities")? / number_field(&inputs, "total_equity")?,
            other => return Err(NodeError::Fatal(format!("unknown financial ratio `{other}`"))),
        };

        if !value.is_finite() {
            return Err(NodeError::Fatal(format!("{ratio} ratio is undefined for the given inputs (division by zero)")));
        }

        Ok(json!({ "ratio": ratio, "value": value }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ctx() -> ExecutionContext {
        ExecutionContext {
            workflow_id: Uuid::nil(),
            execution_id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            input: Value::Null,
            secrets: Default::default(),
            variables: Default::default(),
            node_outputs: Default::default(),
            db_pool: None,
        }
    }

    #[tokio::test]
    async fn journal_entry_accepts_balanced_lines() {
        let node = JournalEntryNode;
        let out = node
            .execute(json!({"lines": [{"debit": 100.0}, {"credit": 100.0}]}), &json!({}), &ctx())
            .await
            .unwrap();
        assert_eq!(out["balanced"], json!(true));
    }

    #[tokio::test]
    async fn journal_entry_rejects_unbalanced_lines() {
        let node = JournalEntryNode;
        let err = node
            .execute(json!({"lines": [{"debit": 100.0}, {"credit": 90.0}]}), &json!({}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Fatal(_)));
    }

    #[tokio::test]
    async fn bank_reconcile_matches_within_tolerance() {
        let node = BankReconcileNode;
        let out = node
            .execute(
                json!({
                    "statement_lines": [{"amount": 100.0}],
                    "ledger_entries": [{"amount": 100.004}],
                }),
                &json!({"tolerance": 0.01}),
                &ctx(),
            )
            .await
            .unwrap();
        assert_eq!(out["matched_count"], json!(1));
        assert_eq!(out["unmatched_count"], json!(0));
    }

    #[tokio::test]
    async fn financial_ratio_current_ratio() {
        let node = FinancialRatioNode;
        let out = node
            .execute(
                json!({"current_assets": 200.0, "current_liabilities": 100.0}),
                &json!({"ratio": "current"}),
                &ctx(),
            )
            .await
            .unwrap();
        assert_eq!(out["value"], json!(2.0));
    }

    #[tokio::test]
    async fn financial_ratio_rejects_zero_denominator() {
        let node = FinancialRatioNode;
        let err = node
            .execute(
                json!({"current_assets": 200.0, "current_liabilities": 0.0}),
                &json!({"ratio": "current"}),
                &ctx(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Fatal(_)));
    }
}
