#![allow(non_snake_case)]

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use telemon_api::middleware::auth::AppState;
use telemon_providers::Collector;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, EnvFilter};

/// Host telemetry collector serving JSON snapshots over HTTP.
#[derive(Parser, Debug)]
#[command(name = "telemond", version)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "telemon.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let appConfig = config::load(&args.config);
    tracing::info!(
        "loaded config from {}: bind={}:{}",
        args.config.display(),
        appConfig.server.bind,
        appConfig.server.port
    );
    if appConfig.auth.token.is_none() {
        tracing::info!("no auth token configured, API routes are open");
    }

    let collector = Collector::new(appConfig.collector.to_collector_config());
    let appState = AppState {
        collector: Arc::new(collector),
        auth_token: appConfig.auth.token.clone(),
    };

    let mut app = telemon_api::api_router(appState).layer(TraceLayer::new_for_http());
    if appConfig.cors.allow_any_origin {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = format!("{}:{}", appConfig.server.bind, appConfig.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    tracing::info!("listening on {addr}");

    axum::serve(listener, app.into_make_service())
        .await
        .context("server exited with error")?;
    Ok(())
}
