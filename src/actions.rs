//! Create, update and delete actions behind the invoice forms.
//!
//! Each action validates the submitted fields, runs one statement and then
//! revalidates the invoice list. Database failures are logged and swallowed:
//! the caller is redirected as if the write had succeeded.
use crate::db::{self, Pool};
use crate::normalize::{normalize, utc_today};
use crate::revalidate::Revalidate;
use crate::validation::{
    Checked, FieldErrors, InvoiceDraft, ValidatedInvoice, ValidationMode, INVOICE_SCHEMA,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument};

pub const DEFAULT_INVOICES_PATH: &str = "/dashboard/invoices";

const CREATE_MISSING_FIELDS: &str = "Missing Fields. Failed to Create Invoice.";
const UPDATE_MISSING_FIELDS: &str = "Missing Fields. Failed to Update Invoice.";

/// What the form shows after a rejected submission.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct FormState {
    pub errors: FieldErrors,
    pub message: Option<String>,
}

impl FormState {
    fn rejected(errors: FieldErrors, message: &str) -> Self {
        Self {
            errors,
            message: Some(message.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Navigate to this path. Nothing runs after it.
    Redirect(String),
    /// Validation failed; re-render the form with this state.
    Invalid(FormState),
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Validation(#[from] FieldErrors),
}

#[derive(Clone)]
pub struct InvoiceActions {
    pool: Pool,
    revalidator: Arc<dyn Revalidate>,
    mode: ValidationMode,
    invoices_path: String,
    today: fn() -> NaiveDate,
}

impl fmt::Debug for InvoiceActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvoiceActions")
            .field("mode", &self.mode)
            .field("invoices_path", &self.invoices_path)
            .finish_non_exhaustive()
    }
}

impl InvoiceActions {
    pub fn new(pool: Pool, revalidator: Arc<dyn Revalidate>) -> Self {
        Self {
            pool,
            revalidator,
            mode: ValidationMode::Lenient,
            invoices_path: DEFAULT_INVOICES_PATH.to_string(),
            today: utc_today,
        }
    }

    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_invoices_path(mut self, path: impl Into<String>) -> Self {
        self.invoices_path = path.into();
        self
    }

    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    pub fn invoices_path(&self) -> &str {
        &self.invoices_path
    }

    fn validate(
        &self,
        draft: &InvoiceDraft,
        message: &str,
    ) -> Result<Result<ValidatedInvoice, FormState>, ActionError> {
        Ok(match INVOICE_SCHEMA.check(draft, self.mode)? {
            Checked::Valid(invoice) => Ok(invoice),
            Checked::Invalid(errors) => Err(FormState::rejected(errors, message)),
        })
    }

    #[instrument(skip_all)]
    pub async fn create_invoice(&self, draft: &InvoiceDraft) -> Result<ActionOutcome, ActionError> {
        let invoice = match self.validate(draft, CREATE_MISSING_FIELDS)? {
            Ok(invoice) => invoice,
            Err(state) => return Ok(ActionOutcome::Invalid(state)),
        };
        let row = normalize(&invoice, (self.today)());

        match db::insert_invoice(&self.pool, &row).await {
            Ok(id) => info!(%id, amount = row.amount_cents, "created invoice"),
            Err(err) => error!(?err, "Database Error: Failed to Create Invoice."),
        }

        self.revalidator.revalidate_path(&self.invoices_path).await;
        Ok(ActionOutcome::Redirect(self.invoices_path.clone()))
    }

    /// No existence check: an unknown `id` updates nothing and still redirects.
    #[instrument(skip_all)]
    pub async fn update_invoice(
        &self,
        id: &str,
        draft: &InvoiceDraft,
    ) -> Result<ActionOutcome, ActionError> {
        let invoice = match self.validate(draft, UPDATE_MISSING_FIELDS)? {
            Ok(invoice) => invoice,
            Err(state) => return Ok(ActionOutcome::Invalid(state)),
        };
        let row = normalize(&invoice, (self.today)());

        match db::update_invoice(&self.pool, id, &row).await {
            Ok(affected) => info!(id, affected, "updated invoice"),
            Err(err) => error!(?err, id, "Database Error: Failed to Update Invoice."),
        }

        self.revalidator.revalidate_path(&self.invoices_path).await;
        Ok(ActionOutcome::Redirect(self.invoices_path.clone()))
    }

    /// Unlike create and update, the list is only revalidated when the delete
    /// statement succeeds. There is no redirect; the caller stays where it is.
    #[instrument(skip_all)]
    pub async fn delete_invoice(&self, id: &str) {
        match db::delete_invoice(&self.pool, id).await {
            Ok(affected) => {
                info!(id, affected, "deleted invoice");
                self.revalidator.revalidate_path(&self.invoices_path).await;
            }
            Err(err) => error!(?err, id, "Database Error: Failed to Delete Invoice."),
        }
    }
}
