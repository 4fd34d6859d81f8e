//! Tracing configuration structures

use opentelemetry_sdk::trace::Sampler;
use serde::{Deserialize, Serialize};

/// Configuration for distributed tracing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracingConfig {
    /// Export spans (default: false)
    pub enabled: bool,

    /// OTLP/gRPC collector endpoint
    /// Example: "http://jaeger:4317" (Jaeger with OTLP support)
    /// Example: "http://tempo:4317" (Grafana Tempo)
    pub otlp_endpoint: String,

    /// Sample rate (0.0 to 1.0)
    /// - 0.0: No traces
    /// - 0.1: Sample 10% of traces
    /// - 1.0: Sample all traces
    pub sample_rate: f64,

    /// Service version (from Git tag or semantic versioning)
    pub service_version: String,

    /// Deployment environment (development, staging, production)
    pub environment: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
            sample_rate: 1.0,
            service_version: "dev".to_string(),
            environment: "development".to_string(),
        }
    }
}

impl TracingConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `ENABLE_TRACING`: Export spans (true/false)
    /// - `OTLP_ENDPOINT`: OTLP collector endpoint (default: http://localhost:4317)
    /// - `TRACING_SAMPLE_RATE`: Sample rate (0.0-1.0)
    /// - `SERVICE_VERSION`: Service version
    /// - `APP_ENV`: Environment (development/staging/production)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let enabled = std::env::var("ENABLE_TRACING")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.enabled);

        let otlp_endpoint = std::env::var("OTLP_ENDPOINT").unwrap_or(defaults.otlp_endpoint);

        let sample_rate = std::env::var("TRACING_SAMPLE_RATE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(defaults.sample_rate)
            .clamp(0.0, 1.0);

        let service_version =
            std::env::var("SERVICE_VERSION").unwrap_or(defaults.service_version);

        let environment = std::env::var("APP_ENV").unwrap_or(defaults.environment);

        Self {
            enabled,
            otlp_endpoint,
            sample_rate,
            service_version,
            environment,
        }
    }

    /// Parent-based sampler honoring `sample_rate` for root spans
    pub fn sampler(&self) -> Sampler {
        let root = if self.sample_rate >= 1.0 {
            Sampler::AlwaysOn
        } else if self.sample_rate <= 0.0 {
            Sampler::AlwaysOff
        } else {
            Sampler::TraceIdRatioBased(self.sample_rate)
        };
        Sampler::ParentBased(Box::new(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.sample_rate, 1.0);
        assert_eq!(config.otlp_endpoint, "http://localhost:4317");
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("ENABLE_TRACING", "true");
        std::env::set_var("OTLP_ENDPOINT", "http://tempo:4317");
        std::env::set_var("SERVICE_VERSION", "1.2.3");
        let config = TracingConfig::from_env();
        std::env::remove_var("ENABLE_TRACING");
        std::env::remove_var("OTLP_ENDPOINT");
        std::env::remove_var("SERVICE_VERSION");

        assert!(config.enabled);
        assert_eq!(config.otlp_endpoint, "http://tempo:4317");
        assert_eq!(config.service_version, "1.2.3");
        assert_eq!(config.environment, "development");
    }

    #[test]
    #[serial]
    fn test_sample_rate_clamping() {
        std::env::set_var("TRACING_SAMPLE_RATE", "2.5");
        let config = TracingConfig::from_env();
        assert_eq!(config.sample_rate, 1.0); // Should be clamped to 1.0
        std::env::remove_var("TRACING_SAMPLE_RATE");
    }

    #[test]
    fn test_sampler_selection() {
        let mut config = TracingConfig::default();
        assert_eq!(format!("{:?}", config.sampler()), "ParentBased(AlwaysOn)");

        config.sample_rate = 0.25;
        assert_eq!(
            format!("{:?}", config.sampler()),
            "ParentBased(TraceIdRatioBased(0.25))"
        );
    }
}
