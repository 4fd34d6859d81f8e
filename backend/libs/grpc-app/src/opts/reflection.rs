use crate::app::App;
use crate::error::{AppError, Result};
use crate::option::AppOption;
use crate::phase::Phase;

pub const REFLECTION_SERVICE_NAME: &str = "grpc.reflection.v1alpha.ServerReflection";

/// Registers server reflection listing every service added so far
///
/// Runs after the services phase so the listing is complete. Only services
/// registered with a descriptor set can be described in detail.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReflectionOption;

impl ReflectionOption {
    pub fn new() -> Self {
        Self
    }
}

impl AppOption for ReflectionOption {
    fn name(&self) -> &str {
        "ReflectionOption"
    }

    fn phase(&self) -> Phase {
        Phase::AfterServicesAdded
    }

    fn apply(self: Box<Self>, app: &mut App) -> Result<()> {
        let mut builder = tonic_reflection::server::Builder::configure();
        for encoded in app.file_descriptor_sets().iter().copied() {
            builder = builder.register_encoded_file_descriptor_set(encoded);
        }
        for name in app.service_names() {
            builder = builder.with_service_name(name.clone());
        }
        builder = builder.with_service_name(REFLECTION_SERVICE_NAME);

        let service = builder
            .build_v1alpha()
            .map_err(|e| AppError::configuration(format!("reflection service: {e}")))?;
        app.add_service(service)
    }
}
