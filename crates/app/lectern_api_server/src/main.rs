//! Lectern API server binary.
//!
//! Reads configuration from the environment (and `.env`), connects to
//! PostgreSQL, runs migrations and serves the REST API. `--in-memory` skips
//! the database entirely, which is handy for demos and smoke tests.

use std::sync::Arc;

use clap::Parser;
use lectern_api::config::ApiConfig;
use lectern_api::{AppState, router};
use lectern_core::store::{MemoryStore, PgStore, Store};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "lectern_api_server", about = "Lectern classroom API server")]
struct Args {
    /// Port to listen on. Overrides the port in `BIND_ADDR`.
    #[arg(long)]
    port: Option<u16>,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/lectern"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Keep all state in process memory instead of PostgreSQL.
    #[arg(long, default_value_t = false)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,lectern_api=debug,lectern_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    config.database_url = args.database_url;
    if let Some(port) = args.port {
        let host = config
            .bind_addr
            .rsplit_once(':')
            .map_or("127.0.0.1", |(host, _)| host);
        config.bind_addr = format!("{host}:{port}");
    }

    let (store, pool): (Arc<dyn Store>, _) = if args.in_memory {
        warn!("running with in-memory store; all data is lost on exit");
        (Arc::new(MemoryStore::new()), None)
    } else {
        info!(max_connections = args.max_connections, "configuring connection pool");
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(&config.database_url)
            .await?;

        info!("running database migrations");
        lectern_api::migrate(&pool).await?;
        (Arc::new(PgStore::new(pool.clone())), Some(pool))
    };

    let mailer = config.mailer()?;
    let bind_addr = config.bind_addr.clone();
    let app = router(AppState::new(config, store, mailer, pool));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("shutting down"),
                Err(e) => {
                    warn!("cannot listen for shutdown signal: {e}");
                    std::future::pending::<()>().await;
                }
            }
        })
        .await?;

    Ok(())
}
