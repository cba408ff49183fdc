//! Storage-ready values derived from a validated invoice.
use crate::model::InvoiceStatus;
use crate::validation::ValidatedInvoice;
use chrono::{NaiveDate, Utc};

/// Column values for a single insert or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedInvoice {
    pub customer_id: String,
    pub amount_cents: i64,
    pub status: InvoiceStatus,
    /// `YYYY-MM-DD`
    pub date: String,
}

pub fn normalize(invoice: &ValidatedInvoice, today: NaiveDate) -> NormalizedInvoice {
    NormalizedInvoice {
        customer_id: invoice.customer_id.clone(),
        amount_cents: invoice.amount.to_cents(),
        status: invoice.status,
        date: today.format("%Y-%m-%d").to_string(),
    }
}

/// Current UTC date.
pub fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}
