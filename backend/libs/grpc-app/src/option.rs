//! Option contract and the two core options

use crate::app::App;
use crate::error::Result;
use crate::interceptor::ServerInterceptor;
use crate::phase::Phase;
use std::convert::Infallible;
use std::sync::Arc;
use tonic::body::BoxBody;
use tonic::server::NamedService;
use tower::Service;

/// A self-describing unit of server configuration
///
/// Each option is applied exactly once, in the phase it declares. Options in
/// the same phase are applied in the order they were supplied.
pub trait AppOption: Send {
    /// Display name used in startup logs
    fn name(&self) -> &str;

    fn phase(&self) -> Phase;

    fn apply(self: Box<Self>, app: &mut App) -> Result<()>;
}

/// Appends one interceptor to the chain before the server is created
pub struct InterceptorOption {
    name: String,
    interceptor: Arc<dyn ServerInterceptor>,
}

impl InterceptorOption {
    pub fn new<I: ServerInterceptor>(interceptor: I) -> Self {
        Self::from_arc(Arc::new(interceptor))
    }

    pub fn from_arc(interceptor: Arc<dyn ServerInterceptor>) -> Self {
        Self {
            name: format!("InterceptorOption[{}]", interceptor.name()),
            interceptor,
        }
    }
}

impl AppOption for InterceptorOption {
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> Phase {
        Phase::BeforeServerCreate
    }

    fn apply(self: Box<Self>, app: &mut App) -> Result<()> {
        app.add_interceptor(self.interceptor)
    }
}

/// Registers one service implementation under its full name
pub struct ServiceOption<S> {
    name: String,
    service: S,
    file_descriptor_set: Option<&'static [u8]>,
}

impl<S: NamedService> ServiceOption<S> {
    pub fn new(service: S) -> Self {
        Self {
            name: format!("ServiceOption[{}]", S::NAME),
            service,
            file_descriptor_set: None,
        }
    }

    /// Encoded descriptor set describing the service, served by reflection
    pub fn with_file_descriptor_set(mut self, encoded: &'static [u8]) -> Self {
        self.file_descriptor_set = Some(encoded);
        self
    }
}

impl<S> AppOption for ServiceOption<S>
where
    S: Service<http::Request<BoxBody>, Response = http::Response<BoxBody>, Error = Infallible>
        + NamedService
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> Phase {
        Phase::BeforeServicesAdded
    }

    fn apply(self: Box<Self>, app: &mut App) -> Result<()> {
        let ServiceOption {
            service,
            file_descriptor_set,
            ..
        } = *self;
        app.add_service_with_descriptor(service, file_descriptor_set)
    }
}
