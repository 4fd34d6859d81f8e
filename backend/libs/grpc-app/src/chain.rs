//! Tower integration for the interceptor chain
//!
//! `InterceptorLayer` wraps the server's routes so every call, whatever the
//! service, runs through the frozen interceptor list before reaching its
//! handler. Rejections are rendered as gRPC trailers-only responses.
//!
//! Once the abort signal fires, calls still in flight are dropped and
//! answered with `UNAVAILABLE`.

use crate::interceptor::{CallDetails, CallResponse, InterceptorChain, Next, ServerInterceptor};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tonic::body::BoxBody;
use tonic::metadata::MetadataMap;
use tokio::sync::watch;
use tonic::Status;
use tower::{Layer, Service};

/// Layer applying a fixed interceptor chain
#[derive(Clone)]
pub struct InterceptorLayer {
    chain: InterceptorChain,
    abort: watch::Receiver<bool>,
}

impl InterceptorLayer {
    /// A chain whose calls are never aborted
    pub fn new(interceptors: Vec<Arc<dyn ServerInterceptor>>) -> Self {
        let (_, abort) = watch::channel(false);
        Self {
            chain: Arc::from(interceptors),
            abort,
        }
    }

    /// Abort in-flight and later calls once `abort` holds `true`
    pub fn with_abort_signal(mut self, abort: watch::Receiver<bool>) -> Self {
        self.abort = abort;
        self
    }

    /// Names of the interceptors in invocation order
    pub fn names(&self) -> Vec<&str> {
        self.chain.iter().map(|i| i.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

impl fmt::Debug for InterceptorLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorLayer")
            .field("interceptors", &self.names())
            .finish()
    }
}

impl<S> Layer<S> for InterceptorLayer {
    type Service = InterceptorService<S>;

    fn layer(&self, service: S) -> Self::Service {
        InterceptorService {
            inner: service,
            chain: Arc::clone(&self.chain),
            abort: self.abort.clone(),
        }
    }
}

/// Service produced by [`InterceptorLayer`]
#[derive(Clone)]
pub struct InterceptorService<S> {
    inner: S,
    chain: InterceptorChain,
    abort: watch::Receiver<bool>,
}

/// Resolves once the abort flag is raised; never if its sender is gone first
async fn aborted(mut abort: watch::Receiver<bool>) {
    if abort.wait_for(|raised| *raised).await.is_err() {
        std::future::pending::<()>().await;
    }
}

impl<S, B> Service<http::Request<B>> for InterceptorService<S>
where
    S: Service<http::Request<B>, Response = http::Response<BoxBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    B: Send + 'static,
{
    type Response = CallResponse;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        // The ready service handles this call; the clone takes its place.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let (mut parts, body) = req.into_parts();
        let method = parts.uri.path().to_string();
        let metadata = MetadataMap::from_headers(std::mem::take(&mut parts.headers));
        let extensions = std::mem::take(&mut parts.extensions);
        let call = CallDetails::new(method, metadata).with_extensions(extensions);

        let next = Next::new(Arc::clone(&self.chain), move |call: CallDetails| async move {
            let (_, metadata, extensions) = call.into_parts();
            parts.headers = metadata.into_headers();
            parts.extensions = extensions;

            inner
                .call(http::Request::from_parts(parts, body))
                .await
                .map_err(|e| Status::internal(e.to_string()))
        });

        let abort = self.abort.clone();
        Box::pin(async move {
            let result = tokio::select! {
                result = next.run(call) => result,
                _ = aborted(abort) => Err(Status::unavailable("server is shutting down")),
            };
            match result {
                Ok(response) => Ok(response),
                Err(status) => Ok(status.into_http()),
            }
        })
    }
}
