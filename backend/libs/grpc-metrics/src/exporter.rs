//! Prometheus scrape endpoint

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use grpc_app::{App, AppError, AppOption, Phase};
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Deserialize;
use tracing::{error, info};

/// Where the scrape endpoint listens
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PrometheusConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_endpoint() -> String {
    "/metrics".to_string()
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
            endpoint: default_endpoint(),
        }
    }
}

/// Router serving the text exposition of `registry` at `endpoint`
pub fn metrics_router(registry: Registry, endpoint: &str) -> Router {
    Router::new()
        .route(endpoint, get(render_metrics))
        .with_state(registry)
}

async fn render_metrics(State(registry): State<Registry>) -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    match encoder.encode(&registry.gather(), &mut buffer) {
        Ok(()) => (
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            buffer,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Serves a Prometheus registry over HTTP in the background
///
/// The listener is bound while the option is applied, so an unusable
/// address fails server assembly instead of surfacing later.
pub struct PrometheusOption {
    config: PrometheusConfig,
    registry: Registry,
}

impl PrometheusOption {
    /// Serve the process-global registry
    pub fn new(config: PrometheusConfig) -> Self {
        Self::with_registry(config, prometheus::default_registry().clone())
    }

    pub fn with_registry(config: PrometheusConfig, registry: Registry) -> Self {
        Self { config, registry }
    }
}

impl AppOption for PrometheusOption {
    fn name(&self) -> &str {
        "PrometheusOption"
    }

    fn phase(&self) -> Phase {
        Phase::BeforeMeterProvider
    }

    fn apply(self: Box<Self>, _app: &mut App) -> grpc_app::Result<()> {
        let PrometheusOption { config, registry } = *self;
        let bind_addr = format!("{}:{}", config.addr, config.port);

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            AppError::configuration(format!("prometheus endpoint needs a tokio runtime: {e}"))
        })?;

        let listener = std::net::TcpListener::bind(&bind_addr)
            .and_then(|listener| {
                listener.set_nonblocking(true)?;
                Ok(listener)
            })
            .map_err(|e| {
                AppError::configuration(format!("cannot bind prometheus endpoint {bind_addr}: {e}"))
            })?;

        let _guard = runtime.enter();
        let listener = tokio::net::TcpListener::from_std(listener).map_err(|e| {
            AppError::configuration(format!("cannot bind prometheus endpoint {bind_addr}: {e}"))
        })?;

        let router = metrics_router(registry, &config.endpoint);
        runtime.spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(error = %e, "Prometheus endpoint stopped");
            }
        });

        info!(addr = %bind_addr, endpoint = %config.endpoint, "Prometheus endpoint started");
        Ok(())
    }
}
