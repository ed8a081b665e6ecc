use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::TracerProvider;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use http_telemetry::{
    HandlerErrors, HttpTelemetry, SpanStarter, init_logging, load_config, prometheus_registry,
};

/// Demo server instrumented with http-telemetry
#[derive(Parser, Debug)]
#[command(name = "http-telemetry-demo", version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, env = "TELEMETRY_CONFIG")]
    config: Option<PathBuf>,

    /// Server port
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.logging)?;

    let recorder = Arc::new(prometheus_registry(&config.namespace, &config.api_name)?);
    let metrics_handle = recorder.handle();

    // Spans get real ids for log correlation; no exporter is attached.
    let provider = TracerProvider::builder().build();
    let tracer: Arc<dyn SpanStarter> = Arc::new(provider.tracer(config.service.name.clone()));

    let telemetry = HttpTelemetry::from_config(&config, recorder, tracer)?;
    let app = create_router(&telemetry, metrics_handle);

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;
    info!(%addr, service = %config.service.name, "Demo server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    let _ = provider.force_flush();
    info!("Server shutdown complete");
    Ok(())
}

/// Instrumented API routes plus an uninstrumented `/metrics` scrape endpoint.
fn create_router(telemetry: &HttpTelemetry, metrics_handle: PrometheusHandle) -> Router {
    let api = Router::new()
        .route("/hello", get(hello))
        .route("/fail", get(fail))
        .route("/health", get(health));

    telemetry.instrument(api).merge(
        Router::new()
            .route("/metrics", get(render_metrics))
            .with_state(metrics_handle),
    )
}

async fn hello() -> &'static str {
    "Hello, World!"
}

async fn fail() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        HandlerErrors::from("simulated downstream failure"),
        "internal error",
    )
}

async fn health() -> &'static str {
    "OK"
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
