use crate::interceptor::{CallDetails, CallResult, Next, ServerInterceptor};
use async_trait::async_trait;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, dispatcher, Dispatch};

/// Logs the called method at debug level before forwarding
///
/// Without a dispatcher the interceptor only forwards. Emitting a record
/// cannot fail the call: a panicking subscriber is contained and the call
/// proceeds.
#[derive(Clone, Default)]
pub struct LoggingInterceptor {
    dispatch: Option<Dispatch>,
}

impl LoggingInterceptor {
    /// Log through the given subscriber
    pub fn new(dispatch: Dispatch) -> Self {
        Self {
            dispatch: Some(dispatch),
        }
    }

    /// Log through whatever subscriber is the global default
    pub fn global() -> Self {
        Self::new(dispatcher::get_default(Dispatch::clone))
    }

    /// Pure pass-through
    pub fn disabled() -> Self {
        Self { dispatch: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.dispatch.is_some()
    }
}

impl std::fmt::Debug for LoggingInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingInterceptor")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[async_trait]
impl ServerInterceptor for LoggingInterceptor {
    fn name(&self) -> &str {
        "LoggingInterceptor"
    }

    async fn intercept(&self, call: CallDetails, next: Next) -> CallResult {
        if let Some(dispatch) = &self.dispatch {
            let method = call.method();
            let _ = catch_unwind(AssertUnwindSafe(|| {
                dispatcher::with_default(dispatch, || {
                    debug!(method = %method, "method");
                });
            }));
        }
        next.run(call).await
    }
}
