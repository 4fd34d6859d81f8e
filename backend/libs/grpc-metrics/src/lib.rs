//! gRPC call metrics
//!
//! - **MetricsInterceptor**: counts every call into `grpc_server_calls_total`
//! - **PrometheusOption**: serves a Prometheus registry over HTTP
//!
//! Usage:
//! ```ignore
//! use grpc_app::InterceptorOption;
//! use grpc_metrics::{MetricsInterceptor, PrometheusConfig, PrometheusOption};
//!
//! let options: Vec<Box<dyn grpc_app::AppOption>> = vec![
//!     Box::new(PrometheusOption::new(PrometheusConfig::default())),
//!     Box::new(InterceptorOption::new(MetricsInterceptor::new()?)),
//! ];
//! ```

pub mod exporter;
pub mod interceptor;
mod metrics;

pub use exporter::{metrics_router, PrometheusConfig, PrometheusOption};
pub use interceptor::MetricsInterceptor;
pub use metrics::{default_labels, CallCounter, CALLS_TOTAL_HELP, CALLS_TOTAL_NAME};
