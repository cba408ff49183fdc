use crate::model::{Invoice, InvoiceStatus};
use crate::normalize::NormalizedInvoice;
use anyhow::{anyhow, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory URLs untouched. Returns possibly-updated URL.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = format!("sqlite://{expanded_path}");
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn map_invoice_row(row: &SqliteRow) -> Result<Invoice> {
    let status: String = row.try_get("status")?;
    Ok(Invoice {
        id: row.try_get("id")?,
        customer_id: row.try_get("customer_id")?,
        amount: row.try_get("amount")?,
        status: InvoiceStatus::parse_status(&status)
            .ok_or_else(|| anyhow!("unknown invoice status {status:?}"))?,
        date: row.try_get("date")?,
    })
}

/// Insert a new invoice and return the id the store generated for it.
#[instrument(skip_all)]
pub async fn insert_invoice(pool: &Pool, invoice: &NormalizedInvoice) -> Result<String> {
    let id: String = sqlx::query_scalar(
        "INSERT INTO invoices (customer_id, amount, status, date) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(&invoice.customer_id)
    .bind(invoice.amount_cents)
    .bind(invoice.status.as_str())
    .bind(&invoice.date)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Overwrite customer, amount and status of invoice `id`. The date is left as
/// it was. Returns the number of rows affected (zero for an unknown id).
#[instrument(skip_all)]
pub async fn update_invoice(pool: &Pool, id: &str, invoice: &NormalizedInvoice) -> Result<u64> {
    let res = sqlx::query(
        "UPDATE invoices SET customer_id = ?, amount = ?, status = ? WHERE id = ?",
    )
    .bind(&invoice.customer_id)
    .bind(invoice.amount_cents)
    .bind(invoice.status.as_str())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

/// Returns the number of rows deleted (zero for an unknown id).
#[instrument(skip_all)]
pub async fn delete_invoice(pool: &Pool, id: &str) -> Result<u64> {
    let res = sqlx::query("DELETE FROM invoices WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

#[instrument(skip_all)]
pub async fn get_invoice(pool: &Pool, id: &str) -> Result<Option<Invoice>> {
    let row = sqlx::query("SELECT id, customer_id, amount, status, date FROM invoices WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(map_invoice_row).transpose()
}

/// All invoices, newest first.
#[instrument(skip_all)]
pub async fn list_invoices(pool: &Pool) -> Result<Vec<Invoice>> {
    let rows = sqlx::query(
        "SELECT id, customer_id, amount, status, date FROM invoices ORDER BY date DESC, id ASC",
    )
    .fetch_all(pool)
    .await?;
    rows.iter().map(map_invoice_row).collect()
}

#[instrument(skip_all)]
pub async fn count_invoices(pool: &Pool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
