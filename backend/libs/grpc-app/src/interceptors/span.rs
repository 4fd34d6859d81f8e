//! Server span per call
//!
//! Always installed first by the builder, so every other interceptor and the
//! handler run inside the call's span context.

use crate::interceptor::{CallDetails, CallResult, Next, ServerInterceptor};
use async_trait::async_trait;
use opentelemetry::propagation::Extractor;
use opentelemetry::trace::{FutureExt, SpanKind, Status as SpanStatus, TraceContextExt, Tracer};
use opentelemetry::{global, KeyValue};
use tonic::metadata::{KeyRef, MetadataMap};
use tonic::Status;

const INSTRUMENTATION_NAME: &str = "grpc-app";

/// gRPC metadata extractor for trace context propagation
pub(crate) struct MetadataExtractor<'a>(pub(crate) &'a MetadataMap);

impl Extractor for MetadataExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0
            .keys()
            .map(|k| match k {
                KeyRef::Ascii(k) => k.as_str(),
                KeyRef::Binary(k) => k.as_str(),
            })
            .collect()
    }
}

/// Opens a server span named after the called method
#[derive(Debug, Default, Clone)]
pub struct TracingInterceptor;

impl TracingInterceptor {
    pub fn new() -> Self {
        Self
    }
}

/// `/pkg.Service/Method` split into service and method
fn split_method(path: &str) -> (&str, &str) {
    let trimmed = path.trim_start_matches('/');
    trimmed.split_once('/').unwrap_or((trimmed, ""))
}

#[async_trait]
impl ServerInterceptor for TracingInterceptor {
    fn name(&self) -> &str {
        "TracingInterceptor"
    }

    async fn intercept(&self, call: CallDetails, next: Next) -> CallResult {
        let parent_cx = global::get_text_map_propagator(|propagator| {
            propagator.extract(&MetadataExtractor(call.metadata()))
        });

        let (service, method) = split_method(call.method());
        let tracer = global::tracer(INSTRUMENTATION_NAME);
        let span = tracer
            .span_builder(call.method().to_string())
            .with_kind(SpanKind::Server)
            .with_attributes(vec![
                KeyValue::new("rpc.system", "grpc"),
                KeyValue::new("rpc.service", service.to_string()),
                KeyValue::new("rpc.method", method.to_string()),
            ])
            .start_with_context(&tracer, &parent_cx);
        let cx = parent_cx.with_span(span);

        let result = next.run(call).with_context(cx.clone()).await;

        let code = match &result {
            Ok(response) => Status::from_header_map(response.headers())
                .map(|status| status.code())
                .unwrap_or(tonic::Code::Ok),
            Err(status) => status.code(),
        };

        let span = cx.span();
        span.set_attribute(KeyValue::new("rpc.grpc.status_code", code as i64));
        if code != tonic::Code::Ok {
            let message = match &result {
                Err(status) => status.message().to_string(),
                Ok(_) => code.description().to_string(),
            };
            span.set_status(SpanStatus::error(message));
        }
        span.end();

        result
    }
}
