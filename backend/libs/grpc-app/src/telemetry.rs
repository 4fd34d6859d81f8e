//! Tracer and meter provider slots
//!
//! Options contribute exporters, readers and resource attributes while a slot
//! is open. The builder closes each slot exactly once, between the
//! `Before*`/`After*` phases, by building the SDK provider and installing it
//! globally. Contributions after that are configuration errors.

use crate::error::{AppError, Result};
use opentelemetry::{global, KeyValue};
use opentelemetry_sdk::metrics::reader::MetricReader;
use opentelemetry_sdk::metrics::{MeterProviderBuilder, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{self as sdktrace, Sampler};
use opentelemetry_sdk::Resource;
use tracing::{info, warn};

pub(crate) struct Telemetry {
    resource_attributes: Vec<KeyValue>,
    sampler: Sampler,
    tracer_builder: Option<sdktrace::Builder>,
    tracer_provider: Option<sdktrace::TracerProvider>,
    meter_builder: Option<MeterProviderBuilder>,
    meter_readers: usize,
    meter_provider: Option<SdkMeterProvider>,
}

impl Telemetry {
    pub(crate) fn new(service_name: &str) -> Self {
        Self {
            resource_attributes: vec![KeyValue::new("service.name", service_name.to_string())],
            sampler: Sampler::ParentBased(Box::new(Sampler::AlwaysOn)),
            tracer_builder: Some(sdktrace::TracerProvider::builder()),
            tracer_provider: None,
            meter_builder: Some(SdkMeterProvider::builder()),
            meter_readers: 0,
            meter_provider: None,
        }
    }

    fn resource(&self) -> Resource {
        Resource::new(self.resource_attributes.clone())
    }

    fn tracer_slot(&mut self) -> Result<&mut Option<sdktrace::Builder>> {
        if self.tracer_builder.is_none() {
            return Err(AppError::configuration("tracer provider is already set"));
        }
        Ok(&mut self.tracer_builder)
    }

    fn meter_slot(&mut self) -> Result<&mut Option<MeterProviderBuilder>> {
        if self.meter_builder.is_none() {
            return Err(AppError::configuration("meter provider is already set"));
        }
        Ok(&mut self.meter_builder)
    }

    pub(crate) fn configure_tracer<F>(&mut self, configure: F) -> Result<()>
    where
        F: FnOnce(sdktrace::Builder) -> sdktrace::Builder,
    {
        let slot = self.tracer_slot()?;
        *slot = slot.take().map(configure);
        Ok(())
    }

    pub(crate) fn set_sampler(&mut self, sampler: Sampler) -> Result<()> {
        self.tracer_slot()?;
        self.sampler = sampler;
        Ok(())
    }

    /// Resource attributes apply to both providers, so they close with the
    /// first one.
    pub(crate) fn add_resource_attributes<I>(&mut self, attributes: I) -> Result<()>
    where
        I: IntoIterator<Item = KeyValue>,
    {
        self.tracer_slot()?;
        self.resource_attributes.extend(attributes);
        Ok(())
    }

    pub(crate) fn add_metric_reader<R>(&mut self, reader: R) -> Result<()>
    where
        R: MetricReader,
    {
        let slot = self.meter_slot()?;
        *slot = slot.take().map(|builder| builder.with_reader(reader));
        self.meter_readers += 1;
        Ok(())
    }

    pub(crate) fn configure_meter<F>(&mut self, configure: F) -> Result<()>
    where
        F: FnOnce(MeterProviderBuilder) -> MeterProviderBuilder,
    {
        let slot = self.meter_slot()?;
        *slot = slot.take().map(configure);
        Ok(())
    }

    /// Close the tracer slot and install the provider globally
    pub(crate) fn install_tracer_provider(&mut self) -> Result<()> {
        let builder = self.tracer_slot()?.take().unwrap_or_default();
        let config = sdktrace::Config::default()
            .with_sampler(self.sampler.clone())
            .with_resource(self.resource());

        let provider = builder.with_config(config).build();

        global::set_text_map_propagator(TraceContextPropagator::new());
        let _ = global::set_tracer_provider(provider.clone());
        self.tracer_provider = Some(provider);

        info!("Tracer provider set");
        Ok(())
    }

    /// Close the meter slot; the provider is only built when a reader exists
    pub(crate) fn install_meter_provider(&mut self) -> Result<()> {
        let builder = self.meter_slot()?.take();

        match builder {
            Some(builder) if self.meter_readers > 0 => {
                let provider = builder.with_resource(self.resource()).build();
                global::set_meter_provider(provider.clone());
                self.meter_provider = Some(provider);
                info!(readers = self.meter_readers, "Meter provider set");
            }
            _ => info!("No metric readers configured, meter provider not set"),
        }
        Ok(())
    }

    pub(crate) fn tracer_provider(&self) -> Option<&sdktrace::TracerProvider> {
        self.tracer_provider.as_ref()
    }

    pub(crate) fn meter_provider(&self) -> Option<&SdkMeterProvider> {
        self.meter_provider.as_ref()
    }

    /// Flush and release both providers
    pub(crate) fn shutdown(&mut self) -> Result<()> {
        if let Some(provider) = self.tracer_provider.take() {
            for result in provider.force_flush() {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to flush spans");
                }
            }
            drop(provider);
            global::shutdown_tracer_provider();
        }

        if let Some(provider) = self.meter_provider.take() {
            provider
                .shutdown()
                .map_err(|e| AppError::telemetry(format!("meter provider shutdown: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_sdk::metrics::ManualReader;

    #[test]
    fn test_tracer_slot_closes_after_install() {
        let mut telemetry = Telemetry::new("test");
        telemetry
            .add_resource_attributes([KeyValue::new("service.version", "1.0.0")])
            .unwrap();
        telemetry.install_tracer_provider().unwrap();
        assert!(telemetry.tracer_provider().is_some());

        let err = telemetry.configure_tracer(|b| b).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert!(telemetry.set_sampler(Sampler::AlwaysOff).is_err());
        assert!(telemetry.install_tracer_provider().is_err());
    }

    #[test]
    fn test_meter_provider_requires_reader() {
        let mut telemetry = Telemetry::new("test");
        telemetry.install_meter_provider().unwrap();
        assert!(telemetry.meter_provider().is_none());

        let err = telemetry
            .add_metric_reader(ManualReader::builder().build())
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_meter_provider_built_with_reader() {
        let mut telemetry = Telemetry::new("test");
        telemetry
            .add_metric_reader(ManualReader::builder().build())
            .unwrap();
        telemetry.install_meter_provider().unwrap();
        assert!(telemetry.meter_provider().is_some());

        telemetry.shutdown().unwrap();
        assert!(telemetry.meter_provider().is_none());
    }
}
