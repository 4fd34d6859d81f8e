//! Built-in interceptors

mod logging;
mod span;

pub use self::logging::LoggingInterceptor;
pub use self::span::TracingInterceptor;
