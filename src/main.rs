//! Process entry point: load config, init logging, connect the durable
//! order log, bootstrap the fast coordinator, start the gateway.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use flashgate::config::AppConfig;
use flashgate::core::types::SaleId;
use flashgate::core::{InMemoryCoordinator, PostgresOrderLog};
use flashgate::gateway::{run_server, state::AppState};
use flashgate::logging::init_logging;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: configuration error: {e}");
            std::process::exit(1);
        }
    };

    let _log_guard = init_logging(&config);
    tracing::info!(bind_addr = %config.bind_addr, "starting flashgate");

    let pool = match PgPoolOptions::new()
        .max_connections(config.pg_pool_size)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to durable order log");
            std::process::exit(1);
        }
    };
    tracing::info!("durable order log connection pool established");

    let dol = Arc::new(PostgresOrderLog::new(pool));
    let fc = Arc::new(InMemoryCoordinator::new(config.user_mark_ttl));

    let state = Arc::new(AppState::new(
        fc.clone(),
        dol.clone(),
        config.default_sale_id.clone(),
    ));

    if let Err(e) = state
        .admin
        .bootstrap(&[SaleId::from(config.default_sale_id.clone())])
        .await
    {
        tracing::error!(error = %e, "bootstrap failed, continuing with empty fast coordinator state");
    }

    let sweep_interval = config.stale_mark_sweep_interval;
    let sweeper_fc = fc.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            sweeper_fc.sweep_expired();
        }
    });

    run_server(&config.bind_addr, state).await;
}
