//! OpenTelemetry Configuration Library
//!
//! Tracing configuration read from the environment, and the option that
//! exports the server's spans over OTLP (the protocol spoken by Jaeger,
//! Tempo, and other observability backends).
//!
//! # Example
//! ```no_run
//! use grpc_app::AppOption;
//! use opentelemetry_config::{OtlpTracingOption, TracingConfig};
//!
//! let config = TracingConfig::from_env();
//! let mut options: Vec<Box<dyn AppOption>> = Vec::new();
//! if config.enabled {
//!     options.push(Box::new(OtlpTracingOption::new(config)));
//! }
//! ```

pub mod config;
pub mod option;

pub use config::TracingConfig;
pub use option::OtlpTracingOption;
