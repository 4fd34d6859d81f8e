use crate::app::App;
use crate::error::Result;
use crate::option::AppOption;
use crate::phase::Phase;

/// Registers the standard `grpc.health.v1.Health` service
///
/// The builder keeps the reporter and flips every registered service to
/// `SERVING` when `run` starts and to `NOT_SERVING` when it stops.
#[derive(Debug, Default, Clone, Copy)]
pub struct HealthCheckOption;

impl HealthCheckOption {
    pub fn new() -> Self {
        Self
    }
}

impl AppOption for HealthCheckOption {
    fn name(&self) -> &str {
        "HealthCheckOption"
    }

    fn phase(&self) -> Phase {
        Phase::BeforeServicesAdded
    }

    fn apply(self: Box<Self>, app: &mut App) -> Result<()> {
        let (reporter, service) = tonic_health::server::health_reporter();
        app.add_service_with_descriptor(service, Some(tonic_health::pb::FILE_DESCRIPTOR_SET))?;
        app.set_health_reporter(reporter)
    }
}
