//! Phase-ordered gRPC server assembly
//!
//! A server is described as a list of options. Each option declares the
//! [`Phase`] it belongs to; [`App::new`] applies them in phase order, running
//! its own lifecycle steps in between:
//!
//! | After phase              | Built-in step                                  |
//! |--------------------------|------------------------------------------------|
//! | `BeforeTracerProvider`   | build and install the tracer provider          |
//! | `BeforeMeterProvider`    | build and install the meter provider, if any   |
//! | `BeforeServerCreate`     | freeze the interceptor chain, create server    |
//! | `BeforeServicesAdded`    | services are set                               |
//!
//! Every call passes through the interceptor chain, in registration order,
//! before it reaches the service handler.
//!
//! # Example
//!
//! ```rust,ignore
//! use grpc_app::{App, AppConfig, AppOption, HealthCheckOption, ReflectionOption, ServiceOption};
//!
//! let options: Vec<Box<dyn AppOption>> = vec![
//!     Box::new(ServiceOption::new(MyServiceServer::new(MyService))),
//!     Box::new(HealthCheckOption::new()),
//!     Box::new(ReflectionOption::new()),
//! ];
//!
//! let mut app = App::new(6565, AppConfig::new("my-service"), options)?;
//! app.run(None).await?;
//! ```

pub mod app;
pub mod chain;
pub mod error;
pub mod interceptor;
pub mod interceptors;
pub mod option;
pub mod opts;
pub mod phase;
pub mod signals;
mod telemetry;

pub use app::{App, AppConfig, LifecycleState};
pub use chain::{InterceptorLayer, InterceptorService};
pub use error::{AppError, Result};
pub use interceptor::{CallDetails, CallResponse, CallResult, Next, ServerInterceptor};
pub use interceptors::{LoggingInterceptor, TracingInterceptor};
pub use option::{AppOption, InterceptorOption, ServiceOption};
pub use opts::{HealthCheckOption, ReflectionOption};
pub use phase::Phase;
