//! HTTP routes for the invoice dashboard.
use crate::actions::{ActionError, ActionOutcome, InvoiceActions};
use crate::db::{self, Pool};
use crate::model::Invoice;
use crate::revalidate::RouteCache;
use crate::validation::InvoiceDraft;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::json;
use std::fmt::Write;
use tracing::error;

#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: Pool,
    pub actions: InvoiceActions,
    pub cache: RouteCache,
}

pub fn router(state: AppState) -> Router {
    let base = state.actions.invoices_path().to_string();
    Router::new()
        .route(&base, get(list_invoices))
        .route(&format!("{base}/create"), post(create_invoice))
        .route(&format!("{base}/{{id}}/edit"), post(update_invoice))
        .route(&format!("{base}/{{id}}/delete"), post(delete_invoice))
        .with_state(state)
}

async fn list_invoices(State(state): State<AppState>) -> Response {
    let path = state.actions.invoices_path();
    if let Some(page) = state.cache.get(path).await {
        return Html(page).into_response();
    }
    let generation = state.cache.generation().await;
    match db::list_invoices(&state.pool).await {
        Ok(invoices) => {
            let page = render_invoices(&invoices);
            state
                .cache
                .insert_if_current(path, page.clone(), generation)
                .await;
            Html(page).into_response()
        }
        Err(err) => {
            error!(?err, "Database Error: Failed to Fetch Invoices.");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch invoices.").into_response()
        }
    }
}

async fn create_invoice(
    State(state): State<AppState>,
    Form(draft): Form<InvoiceDraft>,
) -> Response {
    respond(state.actions.create_invoice(&draft).await)
}

async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(draft): Form<InvoiceDraft>,
) -> Response {
    respond(state.actions.update_invoice(&id, &draft).await)
}

/// The form posts from the list view; send the browser back there.
async fn delete_invoice(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.actions.delete_invoice(&id).await;
    Redirect::to(state.actions.invoices_path()).into_response()
}

fn respond(result: Result<ActionOutcome, ActionError>) -> Response {
    match result {
        Ok(ActionOutcome::Redirect(path)) => Redirect::to(&path).into_response(),
        Ok(ActionOutcome::Invalid(form)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(form)).into_response()
        }
        Err(ActionError::Validation(errors)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "Validation failed",
                "errors": errors,
            })),
        )
            .into_response(),
    }
}

/// `1250` → `$12.50`
pub fn format_currency(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_invoices(invoices: &[Invoice]) -> String {
    let mut page = String::from(
        "<!doctype html>\n<html><head><title>Invoices</title></head><body>\n\
         <h1>Invoices</h1>\n<table>\n\
         <tr><th>Customer</th><th>Amount</th><th>Date</th><th>Status</th></tr>\n",
    );
    for invoice in invoices {
        // Writing into a String cannot fail.
        let _ = writeln!(
            page,
            "<tr id=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&invoice.id),
            escape_html(&invoice.customer_id),
            format_currency(invoice.amount),
            escape_html(&invoice.date),
            invoice.status.as_str(),
        );
    }
    page.push_str("</table>\n</body></html>\n");
    page
}
