use axum::{
    Router,
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use clap::Parser;
use common::config::{Config, ProcessorConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;

use crate::{
    model::{GenericError, TypologyEvent},
    processor::TypologyProcessor,
    scorers::Scorer,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "typology/config/dev.yaml")]
    pub config: String,
}

pub fn initialize_executable() -> Result<Config, GenericError> {
    // Best-effort .env load; ignore if missing
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let config = Config::load(&args.config)?;

    init_tracing(&config.processor.log_level);
    tracing::info!(
        config = %args.config,
        project = %config.common.project_name,
        "Loaded configuration"
    );

    Ok(config)
}

/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

pub fn install_metrics_exporter(address: &str) -> Result<(), GenericError> {
    let address: SocketAddr = address.parse()?;
    PrometheusBuilder::new()
        .with_http_listener(address)
        .install()?;
    tracing::info!(%address, "Serving prometheus metrics");
    Ok(())
}

pub fn create_router<S>(processor: Arc<TypologyProcessor<S>>) -> Router
where
    S: Scorer + 'static,
{
    Router::new()
        .route("/execute", post(execute::<S>))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(processor)
}

pub async fn run_processor<S>(
    config: ProcessorConfig,
    processor: Arc<TypologyProcessor<S>>,
) -> Result<(), GenericError>
where
    S: Scorer + 'static,
{
    let app = create_router(processor);

    tracing::info!("Starting typology processor at {}", config.server_address);
    let listener = tokio::net::TcpListener::bind(&config.server_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub async fn execute<S>(
    State(processor): State<Arc<TypologyProcessor<S>>>,
    Json(event): Json<TypologyEvent>,
) -> impl IntoResponse
where
    S: Scorer + 'static,
{
    let outcome = processor.process(event).await;
    if outcome.is_aborted() {
        tracing::warn!(cache_key = %outcome.cache_key, "Rule result was not processed");
    }
    (StatusCode::OK, Json(outcome))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}
