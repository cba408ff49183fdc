//! Invoice form validation.
//!
//! One schema serves both call sites: lenient callers get the field errors back
//! as data, strict callers get them as an `Err`.
use crate::model::InvoiceStatus;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

pub const FIELD_CUSTOMER_ID: &str = "customerId";
pub const FIELD_AMOUNT: &str = "amount";
pub const FIELD_STATUS: &str = "status";

/// Process-wide invoice schema.
pub static INVOICE_SCHEMA: Lazy<InvoiceSchema> = Lazy::new(InvoiceSchema::default);

static DECIMAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-])?(?:(\d+)(?:\.(\d*))?|\.(\d+))(?:[eE]([+-]?\d+))?$")
        .expect("decimal pattern compiles")
});

/// Raw form fields as submitted. Absent fields stay `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvoiceDraft {
    #[serde(rename = "customerId", default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Field errors are returned to the caller for display.
    #[default]
    Lenient,
    /// Field errors abort the action. Kept for the legacy create/update path.
    Strict,
}

/// Field name → messages for every field that failed.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq, Error)]
#[error("invalid invoice fields: {}", .0.keys().cloned().collect::<Vec<_>>().join(", "))]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn push(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Most significant digits a `Decimal` holds exactly.
const DECIMAL_DIGITS: usize = 28;

/// A dollar amount as submitted, with its value in whole cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amount {
    value: Decimal,
    cents: i64,
}

impl Amount {
    /// Parse a numeric form value. Surrounding whitespace is ignored and an
    /// empty string reads as zero. Accepts an optional sign, a fractional part
    /// and an exponent (`1.5e2`). Returns `None` for anything else, or when the
    /// value is too large to be stored as cents.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let value = if trimmed.is_empty() {
            Decimal::ZERO
        } else {
            let caps = DECIMAL.captures(trimmed)?;
            let sign = match caps.get(1).map(|m| m.as_str()) {
                Some("-") => "-",
                _ => "",
            };
            let (int_part, frac_part) = match caps.get(4) {
                Some(frac) => ("0", frac.as_str()),
                None => (
                    caps.get(2).map_or("0", |m| m.as_str()),
                    caps.get(3).map_or("", |m| m.as_str()),
                ),
            };
            match caps.get(5) {
                Some(exp) => {
                    let mantissa = literal(sign, int_part, frac_part, frac_part.len());
                    let scientific = format!("{mantissa}e{}", exp.as_str());
                    Decimal::from_scientific(&scientific).ok()?
                }
                None => {
                    // Cutting digits past the third decimal place cannot move a
                    // value across a half-cent boundary.
                    let significant = int_part.trim_start_matches('0').len();
                    let keep = DECIMAL_DIGITS.saturating_sub(significant).max(3);
                    Decimal::from_str(&literal(sign, int_part, frac_part, keep)).ok()?
                }
            }
        };
        let cents = value
            .checked_mul(Decimal::ONE_HUNDRED)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()?;
        Some(Self { value, cents })
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn is_positive(&self) -> bool {
        self.value > Decimal::ZERO
    }

    /// Amount in cents, rounded half-up (`19.999` → `2000`, `1.005` → `101`).
    pub fn to_cents(&self) -> i64 {
        self.cents
    }
}

fn literal(sign: &str, int_part: &str, frac_part: &str, max_frac: usize) -> String {
    let int_part = match int_part.trim_start_matches('0') {
        "" => "0",
        digits => digits,
    };
    let frac_part = &frac_part[..frac_part.len().min(max_frac)];
    if frac_part.is_empty() {
        format!("{sign}{int_part}")
    } else {
        format!("{sign}{int_part}.{frac_part}")
    }
}

/// An invoice that passed the schema and is safe to normalize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInvoice {
    pub customer_id: String,
    pub amount: Amount,
    pub status: InvoiceStatus,
}

/// Result of a lenient check, or of a strict check that passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checked {
    Valid(ValidatedInvoice),
    Invalid(FieldErrors),
}

/// Messages shown next to each field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceSchema {
    pub customer_message: &'static str,
    pub amount_message: &'static str,
    pub status_message: &'static str,
}

impl Default for InvoiceSchema {
    fn default() -> Self {
        Self {
            customer_message: "Please select a customer.",
            amount_message: "Please enter an amount greater than $0.",
            status_message: "Please select an invoice status.",
        }
    }
}

impl InvoiceSchema {
    /// Validate every field, collecting one message per failing field.
    pub fn parse(&self, draft: &InvoiceDraft) -> Result<ValidatedInvoice, FieldErrors> {
        let mut errors = FieldErrors::default();

        let customer_id = match draft.customer_id.as_deref() {
            Some(id) if !id.trim().is_empty() => Some(id.to_string()),
            _ => {
                errors.push(FIELD_CUSTOMER_ID, self.customer_message);
                None
            }
        };

        // An absent amount coerces to zero and fails the positivity rule.
        let amount = Amount::parse(draft.amount.as_deref().unwrap_or(""))
            .filter(|a| a.is_positive() && a.to_cents() >= 1);
        if amount.is_none() {
            errors.push(FIELD_AMOUNT, self.amount_message);
        }

        let status = draft
            .status
            .as_deref()
            .and_then(InvoiceStatus::parse_status);
        if status.is_none() {
            errors.push(FIELD_STATUS, self.status_message);
        }

        match (customer_id, amount, status) {
            (Some(customer_id), Some(amount), Some(status)) => Ok(ValidatedInvoice {
                customer_id,
                amount,
                status,
            }),
            _ => Err(errors),
        }
    }

    /// Validate under `mode`. Lenient never fails; strict turns field errors
    /// into `Err`.
    pub fn check(
        &self,
        draft: &InvoiceDraft,
        mode: ValidationMode,
    ) -> Result<Checked, FieldErrors> {
        match (self.parse(draft), mode) {
            (Ok(valid), _) => Ok(Checked::Valid(valid)),
            (Err(errors), ValidationMode::Lenient) => Ok(Checked::Invalid(errors)),
            (Err(errors), ValidationMode::Strict) => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(customer: Option<&str>, amount: Option<&str>, status: Option<&str>) -> InvoiceDraft {
        InvoiceDraft {
            customer_id: customer.map(str::to_string),
            amount: amount.map(str::to_string),
            status: status.map(str::to_string),
        }
    }

    fn cents(raw: &str) -> Option<i64> {
        Amount::parse(raw).map(|a| a.to_cents())
    }

    #[test]
    fn cents_conversion_rounds_half_up() {
        assert_eq!(cents("12.50"), Some(1250));
        assert_eq!(cents("15.00"), Some(1500));
        assert_eq!(cents("19.999"), Some(2000));
        assert_eq!(cents("19.994"), Some(1999));
        assert_eq!(cents("1.005"), Some(101));
        assert_eq!(cents("0.1"), Some(10));
        assert_eq!(cents("42"), Some(4200));
        assert_eq!(cents(".5"), Some(50));
        assert_eq!(cents("7."), Some(700));
    }

    #[test]
    fn parse_accepts_js_style_numbers() {
        assert_eq!(cents(" 12 "), Some(1200));
        assert_eq!(cents("1.5e2"), Some(15000));
        assert_eq!(cents("1250e-2"), Some(1250));
        assert_eq!(cents("+3"), Some(300));
        assert_eq!(cents("-3"), Some(-300));
        assert_eq!(cents(""), Some(0));
    }

    #[test]
    fn parse_rejects_non_numeric() {
        assert_eq!(Amount::parse("abc"), None);
        assert_eq!(Amount::parse("12,50"), None);
        assert_eq!(Amount::parse("$12"), None);
        assert_eq!(Amount::parse("NaN"), None);
        assert_eq!(Amount::parse("Infinity"), None);
        assert_eq!(Amount::parse("1e400"), None);
        assert_eq!(Amount::parse("."), None);
    }

    #[test]
    fn tiny_exponent_is_not_a_positive_amount() {
        let errors = INVOICE_SCHEMA
            .parse(&draft(Some("c1"), Some("1e-60"), Some("paid")))
            .unwrap_err();
        assert!(errors.get(FIELD_AMOUNT).is_some());
    }

    #[test]
    fn long_digit_strings_are_rounded_not_rejected() {
        assert_eq!(cents("1.0000000000000000000000000000000000000000"), Some(100));
        assert_eq!(cents("0.1234567890123456789012345678901234567891"), Some(12));
        assert_eq!(cents("0000000000000000000000000000000000000042.5"), Some(4250));
        assert_eq!(cents("0.0049999999999999999999999999999999"), Some(0));
        assert_eq!(cents("0.0050000000000000000000000000000001"), Some(1));

        let v = INVOICE_SCHEMA
            .parse(&draft(
                Some("c1"),
                Some("1.0000000000000000000000000000000000000000"),
                Some("paid"),
            ))
            .unwrap();
        assert_eq!(v.amount.to_cents(), 100);
    }

    #[test]
    fn amounts_beyond_i64_cents_are_rejected() {
        assert_eq!(Amount::parse("100000000000000000000"), None);
        assert_eq!(cents("92233720368547758.07"), Some(i64::MAX));
    }

    #[test]
    fn valid_draft_parses() {
        let v = INVOICE_SCHEMA
            .parse(&draft(Some("c1"), Some("15.00"), Some("pending")))
            .unwrap();
        assert_eq!(v.customer_id, "c1");
        assert_eq!(v.amount.to_cents(), 1500);
        assert_eq!(v.status, InvoiceStatus::Pending);
    }

    #[test]
    fn non_positive_or_non_numeric_amount_is_rejected() {
        for raw in [Some("0"), Some("-5"), Some("abc"), Some(""), None, Some("0.004")] {
            let errors = INVOICE_SCHEMA
                .parse(&draft(Some("c1"), raw, Some("paid")))
                .unwrap_err();
            assert_eq!(
                errors.get(FIELD_AMOUNT),
                Some(&["Please enter an amount greater than $0.".to_string()][..]),
                "amount {raw:?}"
            );
            assert_eq!(errors.len(), 1);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        for raw in [Some("overdue"), Some("Paid"), None] {
            let errors = INVOICE_SCHEMA
                .parse(&draft(Some("c1"), Some("1"), raw))
                .unwrap_err();
            assert_eq!(
                errors.get(FIELD_STATUS),
                Some(&["Please select an invoice status.".to_string()][..])
            );
        }
    }

    #[test]
    fn missing_customer_is_rejected() {
        for raw in [None, Some(""), Some("   ")] {
            let errors = INVOICE_SCHEMA
                .parse(&draft(raw, Some("1"), Some("paid")))
                .unwrap_err();
            assert_eq!(
                errors.get(FIELD_CUSTOMER_ID),
                Some(&["Please select a customer.".to_string()][..])
            );
        }
    }

    #[test]
    fn all_failing_fields_are_reported_together() {
        let errors = INVOICE_SCHEMA.parse(&InvoiceDraft::default()).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.get(FIELD_CUSTOMER_ID).is_some());
        assert!(errors.get(FIELD_AMOUNT).is_some());
        assert!(errors.get(FIELD_STATUS).is_some());
    }

    #[test]
    fn check_respects_mode() {
        let bad = draft(Some("c1"), Some("0"), Some("paid"));
        match INVOICE_SCHEMA.check(&bad, ValidationMode::Lenient) {
            Ok(Checked::Invalid(errors)) => assert!(errors.get(FIELD_AMOUNT).is_some()),
            other => panic!("unexpected {other:?}"),
        }
        let err = INVOICE_SCHEMA
            .check(&bad, ValidationMode::Strict)
            .unwrap_err();
        assert!(err.to_string().contains("amount"));

        let good = draft(Some("c1"), Some("2"), Some("paid"));
        assert!(matches!(
            INVOICE_SCHEMA.check(&good, ValidationMode::Strict),
            Ok(Checked::Valid(_))
        ));
    }

    #[test]
    fn draft_deserializes_from_form_field_names() {
        let d: InvoiceDraft =
            serde_json::from_str(r#"{"customerId":"c9","amount":"3.10"}"#).unwrap();
        assert_eq!(d.customer_id.as_deref(), Some("c9"));
        assert_eq!(d.amount.as_deref(), Some("3.10"));
        assert_eq!(d.status, None);
    }
}
