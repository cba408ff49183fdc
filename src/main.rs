use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use invoice_actions::actions::InvoiceActions;
use invoice_actions::config;
use invoice_actions::db;
use invoice_actions::revalidate::RouteCache;
use invoice_actions::web::{self, AppState};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;

    let cache = RouteCache::new();
    let actions = InvoiceActions::new(pool.clone(), Arc::new(cache.clone()))
        .with_mode(cfg.actions.validation)
        .with_invoices_path(cfg.actions.invoices_path.clone());
    let app = web::router(AppState {
        pool,
        actions,
        cache,
    });

    let addr = cfg.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, mode = ?cfg.actions.validation, "serving invoice dashboard");
    axum::serve(listener, app).await?;

    Ok(())
}
