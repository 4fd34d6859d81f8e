//! Maps configuration toggles to server options

use crate::config::Config;
use crate::section_proto::{section_server::SectionServer, FILE_DESCRIPTOR_SET};
use crate::service::SectionServiceImpl;
use anyhow::{bail, Context};
use grpc_app::{
    AppOption, HealthCheckOption, InterceptorOption, LoggingInterceptor, ReflectionOption,
    ServiceOption,
};
use grpc_auth::{AuthorizationInterceptor, JwtTokenValidator, PermissionAction};
use grpc_metrics::{MetricsInterceptor, PrometheusOption};
use opentelemetry_config::OtlpTracingOption;
use prometheus::Registry;
use std::sync::Arc;
use tracing::info;

/// Options for every enabled feature, followed by the section service
///
/// Metrics are counted into and scraped from `registry`.
pub fn build_options(config: &Config, registry: &Registry) -> anyhow::Result<Vec<Box<dyn AppOption>>> {
    let mut options: Vec<Box<dyn AppOption>> = Vec::new();

    if config.features.prometheus {
        options.push(Box::new(PrometheusOption::with_registry(
            config.prometheus.clone(),
            registry.clone(),
        )));
    }
    if config.features.health_checking {
        options.push(Box::new(HealthCheckOption::new()));
    }
    if config.features.reflection {
        options.push(Box::new(ReflectionOption::new()));
    }
    if config.tracing.enabled {
        options.push(Box::new(OtlpTracingOption::new(config.tracing.clone())));
    }

    if config.plugin.auth_enabled {
        let Some(public_key) = config.plugin.auth_jwt_public_key.as_deref() else {
            bail!("PLUGIN_GRPC_SERVER_AUTH_JWT_PUBLIC_KEY is required when authorization is enabled");
        };
        let validator = JwtTokenValidator::from_rsa_pem(public_key.as_bytes())
            .context("invalid PLUGIN_GRPC_SERVER_AUTH_JWT_PUBLIC_KEY")?;
        let action = PermissionAction::from_bits(config.plugin.auth_action);

        info!(
            resource = %config.plugin.auth_resource,
            %action,
            namespace = %config.accelbyte.namespace,
            "Authorization enabled"
        );
        options.push(Box::new(InterceptorOption::new(AuthorizationInterceptor::new(
            config.plugin.auth_resource.clone(),
            action,
            config.accelbyte.namespace.clone(),
            Arc::new(validator),
        ))));
    }

    if config.plugin.logging_enabled {
        options.push(Box::new(InterceptorOption::new(LoggingInterceptor::global())));
    }

    if config.plugin.metrics_enabled {
        let interceptor = MetricsInterceptor::with_registry(registry, Vec::new())
            .context("failed to register call counter")?;
        options.push(Box::new(InterceptorOption::new(interceptor)));
    }

    let service = SectionServiceImpl::new(config.service.backfill_item_policy);
    options.push(Box::new(
        ServiceOption::new(SectionServer::new(service)).with_file_descriptor_set(FILE_DESCRIPTOR_SET),
    ));

    Ok(options)
}
