use crate::metrics::CallCounter;
use async_trait::async_trait;
use grpc_app::{CallDetails, CallResult, Next, ServerInterceptor};
use prometheus::Registry;

/// Counts every call before forwarding it
///
/// The increment happens before the rest of the chain runs, so rejected and
/// failed calls are counted too. The result is passed through unchanged.
#[derive(Clone, Debug)]
pub struct MetricsInterceptor {
    counter: CallCounter,
}

impl MetricsInterceptor {
    /// Count into the process-global registry with the default labels
    pub fn new() -> prometheus::Result<Self> {
        Self::with_registry(prometheus::default_registry(), Vec::new())
    }

    /// Count into `registry`; empty `labels` means the default labels
    pub fn with_registry(
        registry: &Registry,
        labels: Vec<(String, String)>,
    ) -> prometheus::Result<Self> {
        Ok(Self {
            counter: CallCounter::register(registry, labels)?,
        })
    }

    pub fn counter(&self) -> &CallCounter {
        &self.counter
    }
}

#[async_trait]
impl ServerInterceptor for MetricsInterceptor {
    fn name(&self) -> &str {
        "MetricsInterceptor"
    }

    async fn intercept(&self, call: CallDetails, next: Next) -> CallResult {
        self.counter.inc();
        next.run(call).await
    }
}
