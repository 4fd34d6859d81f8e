//! OTLP span export option

use crate::config::TracingConfig;
use grpc_app::{App, AppError, AppOption, Phase};
use opentelemetry::KeyValue;
use opentelemetry_otlp::{SpanExporterBuilder, WithExportConfig};
use opentelemetry_sdk::runtime;
use tracing::info;

/// Exports server spans to an OTLP/gRPC collector
///
/// Contributes a batch span exporter, the configured sampler, and the
/// `service.version` / `deployment.environment` resource attributes before
/// the tracer provider is built.
#[derive(Debug, Clone)]
pub struct OtlpTracingOption {
    config: TracingConfig,
}

impl OtlpTracingOption {
    pub fn new(config: TracingConfig) -> Self {
        Self { config }
    }
}

impl AppOption for OtlpTracingOption {
    fn name(&self) -> &str {
        "OtlpTracingOption"
    }

    fn phase(&self) -> Phase {
        Phase::BeforeTracerProvider
    }

    fn apply(self: Box<Self>, app: &mut App) -> grpc_app::Result<()> {
        let config = self.config;

        // The exporter channel and batch processor are spawned on the runtime.
        tokio::runtime::Handle::try_current().map_err(|e| {
            AppError::telemetry(format!("OTLP exporter needs a tokio runtime: {e}"))
        })?;

        let exporter = SpanExporterBuilder::from(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(config.otlp_endpoint.clone()),
        )
        .build_span_exporter()
        .map_err(|e| AppError::telemetry(format!("OTLP span exporter: {e}")))?;

        app.configure_tracer_provider(|builder| {
            builder.with_batch_exporter(exporter, runtime::Tokio)
        })?;
        app.set_sampler(config.sampler())?;
        app.add_resource_attributes([
            KeyValue::new("service.version", config.service_version.clone()),
            KeyValue::new("deployment.environment", config.environment.clone()),
        ])?;

        info!(
            endpoint = %config.otlp_endpoint,
            sample_rate = config.sample_rate,
            "OTLP span export configured"
        );
        Ok(())
    }
}
