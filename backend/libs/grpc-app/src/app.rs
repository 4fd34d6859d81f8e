//! Phase-ordered gRPC server builder

use crate::chain::InterceptorLayer;
use crate::error::{AppError, Result};
use crate::interceptor::ServerInterceptor;
use crate::interceptors::TracingInterceptor;
use crate::option::AppOption;
use crate::phase::Phase;
use crate::signals;
use crate::telemetry::Telemetry;
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::reader::MetricReader;
use opentelemetry_sdk::metrics::{MeterProviderBuilder, SdkMeterProvider};
use opentelemetry_sdk::trace::{self as sdktrace, Sampler};
use std::convert::Infallible;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tonic::body::BoxBody;
use tonic::server::NamedService;
use tonic::service::RoutesBuilder;
use tonic::transport::server::TcpIncoming;
use tonic::transport::Server;
use tonic_health::server::HealthReporter;
use tonic_health::ServingStatus;
use tower::layer::util::{Identity, Stack};
use tower::Service;
use tracing::{info, warn};

type LayeredServer = Server<Stack<InterceptorLayer, Identity>>;

/// How long aborted calls get to unwind before the server task is dropped
const FORCED_CLOSE_WAIT: Duration = Duration::from_secs(1);

/// Builder-wide settings that are not options
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Telemetry resource identity (`service.name`)
    pub service_name: String,
    /// Upper bound on waiting for in-flight calls during shutdown
    pub shutdown_grace: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "app".to_string(),
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Self::default()
        }
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

/// Where the builder is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Interceptors and telemetry may still be contributed
    Configuring,
    /// Interceptor chain is frozen; services may be registered
    ServerCreated,
    /// `run` has been called; nothing may change
    Running,
}

/// The server builder
///
/// Owns the interceptor list, the service registry and the telemetry
/// providers. All mutation happens inside [`App::new`] while options are
/// applied; afterwards the only operation is [`App::run`].
pub struct App {
    port: u16,
    config: AppConfig,
    state: LifecycleState,
    interceptors: Vec<Arc<dyn ServerInterceptor>>,
    server: Option<LayeredServer>,
    routes: RoutesBuilder,
    service_names: Vec<String>,
    file_descriptor_sets: Vec<&'static [u8]>,
    telemetry: Telemetry,
    health_reporter: Option<HealthReporter>,
    abort_calls: watch::Sender<bool>,
}

impl App {
    /// Apply `options` in phase order and create the server
    ///
    /// Fails on the first option that cannot be applied; no partially
    /// configured server is returned.
    pub fn new(port: u16, config: AppConfig, options: Vec<Box<dyn AppOption>>) -> Result<Self> {
        let telemetry = Telemetry::new(&config.service_name);
        let mut app = Self {
            port,
            config,
            state: LifecycleState::Configuring,
            interceptors: vec![Arc::new(TracingInterceptor::new())],
            server: None,
            routes: RoutesBuilder::default(),
            service_names: Vec::new(),
            file_descriptor_sets: Vec::new(),
            telemetry,
            health_reporter: None,
            abort_calls: watch::channel(false).0,
        };

        let mut options = options;
        options.sort_by_key(|option| option.phase());
        let mut pending = options.into_iter().peekable();

        for phase in Phase::ALL {
            info!(phase = %phase, "Entering phase");
            while let Some(option) = pending.next_if(|option| option.phase() == phase) {
                let name = option.name().to_string();
                option.apply(&mut app).map_err(|e| {
                    warn!(option = %name, phase = %phase, error = %e, "Failed to apply option");
                    e
                })?;
                info!(option = %name, phase = %phase, "Option applied");
            }
            app.complete_phase(phase)?;
        }

        Ok(app)
    }

    /// Built-in lifecycle step run once the options of `phase` are applied
    fn complete_phase(&mut self, phase: Phase) -> Result<()> {
        match phase {
            Phase::BeforeTracerProvider => self.telemetry.install_tracer_provider(),
            Phase::BeforeMeterProvider => self.telemetry.install_meter_provider(),
            Phase::BeforeServerCreate => self.create_server(),
            Phase::BeforeServicesAdded => {
                info!(services = ?self.service_names, "Services set");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn create_server(&mut self) -> Result<()> {
        if self.state != LifecycleState::Configuring {
            return Err(AppError::configuration("server is already created"));
        }

        let layer = InterceptorLayer::new(self.interceptors.clone())
            .with_abort_signal(self.abort_calls.subscribe());
        info!(interceptors = ?layer.names(), "Server created");

        self.server = Some(Server::builder().layer(layer));
        self.state = LifecycleState::ServerCreated;
        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Append an interceptor; fails once the server exists
    pub fn add_interceptor(&mut self, interceptor: Arc<dyn ServerInterceptor>) -> Result<()> {
        if self.state != LifecycleState::Configuring {
            return Err(AppError::configuration(format!(
                "cannot add interceptor '{}': interceptor chain is frozen once the server is created",
                interceptor.name()
            )));
        }
        self.interceptors.push(interceptor);
        Ok(())
    }

    /// Interceptor names in invocation order
    pub fn interceptor_names(&self) -> Vec<&str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    pub fn add_service<S>(&mut self, service: S) -> Result<()>
    where
        S: Service<http::Request<BoxBody>, Response = http::Response<BoxBody>, Error = Infallible>
            + NamedService
            + Clone
            + Send
            + 'static,
        S::Future: Send + 'static,
    {
        self.add_service_with_descriptor(service, None)
    }

    /// Register a service, optionally with the encoded descriptor set that
    /// describes it
    pub fn add_service_with_descriptor<S>(
        &mut self,
        service: S,
        file_descriptor_set: Option<&'static [u8]>,
    ) -> Result<()>
    where
        S: Service<http::Request<BoxBody>, Response = http::Response<BoxBody>, Error = Infallible>
            + NamedService
            + Clone
            + Send
            + 'static,
        S::Future: Send + 'static,
    {
        match self.state {
            LifecycleState::ServerCreated => {}
            LifecycleState::Configuring => {
                return Err(AppError::configuration(format!(
                    "cannot add service '{}' before the server is created",
                    S::NAME
                )))
            }
            LifecycleState::Running => {
                return Err(AppError::configuration(format!(
                    "cannot add service '{}' while the server is running",
                    S::NAME
                )))
            }
        }

        self.routes.add_service(service);
        self.service_names.push(S::NAME.to_string());
        if let Some(encoded) = file_descriptor_set {
            self.file_descriptor_sets.push(encoded);
        }
        Ok(())
    }

    /// Full names of registered services, in registration order
    pub fn service_names(&self) -> &[String] {
        &self.service_names
    }

    pub fn file_descriptor_sets(&self) -> &[&'static [u8]] {
        &self.file_descriptor_sets
    }

    /// Contribute to the tracer provider (exporters, processors, limits)
    pub fn configure_tracer_provider<F>(&mut self, configure: F) -> Result<()>
    where
        F: FnOnce(sdktrace::Builder) -> sdktrace::Builder,
    {
        self.telemetry.configure_tracer(configure)
    }

    pub fn set_sampler(&mut self, sampler: Sampler) -> Result<()> {
        self.telemetry.set_sampler(sampler)
    }

    /// Extra telemetry resource attributes; `service.name` is always present
    pub fn add_resource_attributes<I>(&mut self, attributes: I) -> Result<()>
    where
        I: IntoIterator<Item = KeyValue>,
    {
        self.telemetry.add_resource_attributes(attributes)
    }

    pub fn add_metric_reader<R: MetricReader>(&mut self, reader: R) -> Result<()> {
        self.telemetry.add_metric_reader(reader)
    }

    pub fn configure_meter_provider<F>(&mut self, configure: F) -> Result<()>
    where
        F: FnOnce(MeterProviderBuilder) -> MeterProviderBuilder,
    {
        self.telemetry.configure_meter(configure)
    }

    pub fn tracer_provider(&self) -> Option<&sdktrace::TracerProvider> {
        self.telemetry.tracer_provider()
    }

    pub fn meter_provider(&self) -> Option<&SdkMeterProvider> {
        self.telemetry.meter_provider()
    }

    pub fn set_health_reporter(&mut self, reporter: HealthReporter) -> Result<()> {
        if self.health_reporter.is_some() {
            return Err(AppError::configuration("health reporter is already set"));
        }
        self.health_reporter = Some(reporter);
        Ok(())
    }

    pub fn health_reporter(&self) -> Option<&HealthReporter> {
        self.health_reporter.as_ref()
    }

    async fn set_serving_status(&mut self, status: ServingStatus) {
        let Some(reporter) = self.health_reporter.as_mut() else {
            return;
        };

        reporter.set_service_status("", status).await;
        for name in &self.service_names {
            reporter.set_service_status(name, status).await;
        }
    }

    /// Serve until Ctrl+C, SIGTERM, or `termination_timeout` elapses
    ///
    /// On termination the server stops accepting calls and in-flight calls
    /// get up to `AppConfig::shutdown_grace` to finish; calls still running
    /// after that are answered with `UNAVAILABLE`. Telemetry is flushed
    /// before returning. A listener that cannot be bound is a
    /// [`AppError::Transport`].
    pub async fn run(&mut self, termination_timeout: Option<Duration>) -> Result<()> {
        let mut server = match self.state {
            LifecycleState::ServerCreated => self
                .server
                .take()
                .ok_or_else(|| AppError::configuration("server has not been created"))?,
            LifecycleState::Configuring => {
                return Err(AppError::configuration("server has not been created"))
            }
            LifecycleState::Running => {
                return Err(AppError::configuration("server is already running"))
            }
        };
        self.state = LifecycleState::Running;

        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port));
        info!(%addr, services = ?self.service_names, "Server starting");

        let incoming = match TcpIncoming::new(addr, true, None) {
            Ok(incoming) => incoming,
            Err(e) => {
                warn!(%addr, error = %e, "Failed to bind listener");
                if let Err(flush) = self.telemetry.shutdown() {
                    warn!(error = %flush, "Telemetry shutdown failed");
                }
                return Err(AppError::Transport(e));
            }
        };

        let routes = std::mem::take(&mut self.routes).routes();
        let router = server.add_routes(routes);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        self.set_serving_status(ServingStatus::Serving).await;

        let mut serving = tokio::spawn(router.serve_with_incoming_shutdown(incoming, async move {
            let _ = stop_rx.await;
        }));
        info!(%addr, "Server started");

        let exited = tokio::select! {
            joined = &mut serving => Some(joined),
            _ = signals::wait_for_termination(termination_timeout) => None,
        };

        let served = match exited {
            Some(joined) => joined.map_err(AppError::from).and_then(|r| r.map_err(AppError::from)),
            None => {
                self.set_serving_status(ServingStatus::NotServing).await;
                let _ = stop_tx.send(());

                match tokio::time::timeout(self.config.shutdown_grace, &mut serving).await {
                    Ok(joined) => joined
                        .map_err(AppError::from)
                        .and_then(|r| r.map_err(AppError::from)),
                    Err(_) => {
                        warn!(
                            grace_secs = self.config.shutdown_grace.as_secs_f64(),
                            "In-flight calls did not finish in time, aborting them"
                        );
                        self.abort_calls.send_replace(true);

                        match tokio::time::timeout(FORCED_CLOSE_WAIT, &mut serving).await {
                            Ok(joined) => joined
                                .map_err(AppError::from)
                                .and_then(|r| r.map_err(AppError::from)),
                            Err(_) => {
                                serving.abort();
                                Ok(())
                            }
                        }
                    }
                }
            }
        };

        if let Err(e) = &served {
            warn!(error = %e, "Server stopped with an error");
        }

        let flushed = self.telemetry.shutdown();
        info!("Server terminated");

        served?;
        flushed
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("port", &self.port)
            .field("config", &self.config)
            .field("state", &self.state)
            .field("interceptors", &self.interceptor_names())
            .field("services", &self.service_names)
            .finish()
    }
}
