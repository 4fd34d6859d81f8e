//! Options for the standard gRPC services

mod health;
mod reflection;

pub use health::HealthCheckOption;
pub use reflection::{ReflectionOption, REFLECTION_SERVICE_NAME};
