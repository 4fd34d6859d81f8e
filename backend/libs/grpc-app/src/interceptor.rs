//! Server Interceptor Contract
//!
//! An interceptor sees every call before the service handler does. It
//! receives the call details and a one-shot continuation ([`Next`]) and
//! either:
//!
//! 1. forwards by awaiting `next.run(call)` and returning its result,
//! 2. rejects by returning `Err(Status)` without running `next`, or
//! 3. forwards and post-processes the result before returning it.
//!
//! Interceptors registered as `[I1, I2, ..., In]` behave like
//! `I1(I2(...In(handler)))`: the first registered sees the call first on the
//! way in and last on the way out.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use tonic::body::BoxBody;
use tonic::metadata::MetadataMap;
use tonic::Status;

/// Response produced by the handler (or by a rejecting interceptor)
pub type CallResponse = http::Response<BoxBody>;

/// Outcome of a call as seen by interceptors
pub type CallResult = Result<CallResponse, Status>;

/// Shared, frozen interceptor list
pub type InterceptorChain = Arc<[Arc<dyn ServerInterceptor>]>;

type Terminal = Box<dyn FnOnce(CallDetails) -> BoxFuture<'static, CallResult> + Send>;

/// Per-call details visible to interceptors
///
/// Changes made to metadata or extensions are visible to the following
/// interceptors and to the service handler.
#[derive(Debug)]
pub struct CallDetails {
    method: String,
    metadata: MetadataMap,
    extensions: http::Extensions,
}

impl CallDetails {
    pub fn new(method: impl Into<String>, metadata: MetadataMap) -> Self {
        Self {
            method: method.into(),
            metadata,
            extensions: http::Extensions::new(),
        }
    }

    pub fn with_extensions(mut self, extensions: http::Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    /// Full method path, e.g. `/grpc.health.v1.Health/Check`
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut MetadataMap {
        &mut self.metadata
    }

    pub fn extensions(&self) -> &http::Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut http::Extensions {
        &mut self.extensions
    }

    pub fn into_parts(self) -> (String, MetadataMap, http::Extensions) {
        (self.method, self.metadata, self.extensions)
    }
}

/// A unit of per-call cross-cutting behavior
#[async_trait]
pub trait ServerInterceptor: Send + Sync + 'static {
    /// Display name used in startup logs
    fn name(&self) -> &str;

    async fn intercept(&self, call: CallDetails, next: Next) -> CallResult;
}

/// Continuation to the rest of the chain
///
/// Consumed by [`Next::run`], so a call proceeds at most once.
pub struct Next {
    chain: InterceptorChain,
    position: usize,
    terminal: Terminal,
}

impl Next {
    /// Build a continuation over `chain`, ending in `terminal`
    pub fn new<F, Fut>(chain: InterceptorChain, terminal: F) -> Self
    where
        F: FnOnce(CallDetails) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = CallResult> + Send + 'static,
    {
        Self {
            chain,
            position: 0,
            terminal: Box::new(move |call| Box::pin(terminal(call))),
        }
    }

    /// Continuation that goes straight to `terminal`
    pub fn terminal<F, Fut>(terminal: F) -> Self
    where
        F: FnOnce(CallDetails) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = CallResult> + Send + 'static,
    {
        Self::new(Arc::from(Vec::new()), terminal)
    }

    /// Proceed to the next interceptor, or to the handler at the end
    pub fn run(self, call: CallDetails) -> BoxFuture<'static, CallResult> {
        Box::pin(async move {
            let Next {
                chain,
                position,
                terminal,
            } = self;

            match chain.get(position).cloned() {
                Some(interceptor) => {
                    let next = Next {
                        chain,
                        position: position + 1,
                        terminal,
                    };
                    interceptor.intercept(call, next).await
                }
                None => terminal(call).await,
            }
        })
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.chain.len().saturating_sub(self.position))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    struct Reject;

    #[async_trait]
    impl ServerInterceptor for Reject {
        fn name(&self) -> &str {
            "Reject"
        }

        async fn intercept(&self, _call: CallDetails, _next: Next) -> CallResult {
            Err(Status::permission_denied("rejected"))
        }
    }

    struct TagMetadata(&'static str);

    #[async_trait]
    impl ServerInterceptor for TagMetadata {
        fn name(&self) -> &str {
            "TagMetadata"
        }

        async fn intercept(&self, mut call: CallDetails, next: Next) -> CallResult {
            call.metadata_mut()
                .append("x-tag", self.0.parse().expect("ascii tag"));
            next.run(call).await
        }
    }

    fn ok_response() -> CallResponse {
        http::Response::new(tonic::body::empty_body())
    }

    #[tokio::test]
    async fn test_empty_chain_runs_terminal() {
        let next = Next::terminal(|call: CallDetails| async move {
            assert_eq!(call.method(), "/pkg.Svc/Do");
            Ok(ok_response())
        });

        let result = next
            .run(CallDetails::new("/pkg.Svc/Do", MetadataMap::new()))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_rejecting_interceptor_skips_terminal() {
        let chain: InterceptorChain = Arc::from(vec![Arc::new(Reject) as Arc<dyn ServerInterceptor>]);
        let next = Next::new(chain, |_call: CallDetails| async move {
            let reached: CallResult = Err(Status::internal("terminal reached"));
            reached
        });

        let status = next
            .run(CallDetails::new("/pkg.Svc/Do", MetadataMap::new()))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::PermissionDenied);
    }

    #[tokio::test]
    async fn test_metadata_changes_reach_terminal() {
        let chain: InterceptorChain = Arc::from(vec![
            Arc::new(TagMetadata("first")) as Arc<dyn ServerInterceptor>,
            Arc::new(TagMetadata("second")),
        ]);
        let next = Next::new(chain, |call: CallDetails| async move {
            let tags: Vec<_> = call
                .metadata()
                .get_all("x-tag")
                .iter()
                .map(|v| v.to_str().unwrap().to_string())
                .collect();
            assert_eq!(tags, vec!["first", "second"]);
            Ok(ok_response())
        });

        next.run(CallDetails::new("/pkg.Svc/Do", MetadataMap::new()))
            .await
            .unwrap();
    }
}
