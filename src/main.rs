use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stash_api::config::{self, AppConfig};
use stash_api::store::{MemoryStore, PgStore, Store};
use stash_api::{app, AppState};

#[derive(Parser)]
#[command(name = "stash-api")]
#[command(about = "REST backend for breweries, beers, bottle stashes and ratings")]
#[command(version)]
struct Args {
    #[arg(long, help = "Port to listen on (overrides PORT)")]
    port: Option<u16>,

    #[arg(long, help = "PostgreSQL connection URL (overrides DATABASE_URL)")]
    database_url: Option<String>,

    #[arg(long, help = "Keep all data in process memory, ignoring any database URL")]
    memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config: AppConfig = config::config().clone();
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(url) = args.database_url {
        config.database.url = Some(url);
    }
    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set in {:?} mode", config.environment);
    }

    tracing::info!("Starting stash API in {:?} mode", config.environment);

    let mut postgres = None;
    let store: Arc<dyn Store> = match config.database.url.as_deref() {
        Some(url) if !args.memory => {
            let pg = Arc::new(PgStore::connect(url, &config.database).await.context("connecting to database")?);
            pg.migrate().await.context("applying schema")?;
            postgres = Some(pg.clone());
            pg
        }
        _ => {
            tracing::warn!("No database configured; data lives in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(store, config.security.clone());
    let router = app(state, &config);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(pg) = postgres {
        pg.close().await;
    }
    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
