//! carerisk-engine - risk prediction bridge and dashboard rollup service
//!
//! Startup order: tracing, build identification, configuration, prediction
//! store, model bridge, HTTP server.

use anyhow::{Context, Result};
use carerisk_common::config::{resolve_config_path, EngineConfig, CONFIG_ENV_VAR};
use carerisk_common::db::init_database;
use carerisk_engine::bridge::Bridge;
use carerisk_engine::{build_router, AppState};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(version, about = "Risk prediction bridge and tiered financial aggregation service")]
struct Args {
    /// Config file (overrides CARERISK_CONFIG and the platform config dir)
    #[arg(short, long)]
    config: Option<String>,

    /// Prediction store path (overrides the config file)
    #[arg(short, long, env = "CARERISK_DATABASE")]
    database: Option<PathBuf>,

    /// Listen address (overrides the config file)
    #[arg(short, long, env = "CARERISK_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carerisk_engine=info,carerisk_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any slow startup work
    info!(
        "Starting CareRisk engine v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);
    let mut config =
        EngineConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    if let Some(database) = args.database {
        config.database_path = database;
    }
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    info!("Database path: {}", config.database_path.display());
    let pool = match init_database(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open prediction store: {}", e);
            return Err(e.into());
        }
    };

    info!(
        program = %config.model.program,
        script = ?config.model.script,
        timeout_secs = ?config.model.timeout_secs,
        max_concurrent = config.model.max_concurrent,
        "Risk model configured"
    );
    let bridge = Bridge::from_config(&config.model);

    let state = AppState::new(pool, bridge);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!("carerisk-engine listening on http://{}", config.server.bind_addr);
    info!("Health check: http://{}/health", config.server.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
