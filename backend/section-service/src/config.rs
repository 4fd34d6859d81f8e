use crate::service::BackfillPolicy;
use grpc_metrics::PrometheusConfig;
use opentelemetry_config::TracingConfig;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    pub accelbyte: AccelByteConfig,
    pub features: FeatureToggles,
    pub plugin: PluginServerConfig,
    pub prometheus: PrometheusConfig,
    pub tracing: TracingConfig,
}

/// Unprefixed service settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default)]
    pub backfill_item_policy: BackfillPolicy,
    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// `AB_*`
#[derive(Debug, Clone, Deserialize)]
pub struct AccelByteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub security_client_id: Option<String>,
    pub security_client_secret: Option<String>,
}

/// `ENABLE_*`
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureToggles {
    #[serde(default = "enabled")]
    pub health_checking: bool,
    #[serde(default = "enabled")]
    pub reflection: bool,
    #[serde(default = "enabled")]
    pub prometheus: bool,
}

/// `PLUGIN_GRPC_SERVER_*`
#[derive(Debug, Clone, Deserialize)]
pub struct PluginServerConfig {
    #[serde(default)]
    pub auth_enabled: bool,
    #[serde(default = "default_auth_resource")]
    pub auth_resource: String,
    #[serde(default = "default_auth_action")]
    pub auth_action: u32,
    /// RS256 public key (PEM) that access tokens are verified with
    pub auth_jwt_public_key: Option<String>,
    #[serde(default)]
    pub logging_enabled: bool,
    #[serde(default = "enabled")]
    pub metrics_enabled: bool,
}

fn default_service_name() -> String {
    "app".to_string()
}

fn default_base_url() -> String {
    "https://demo.accelbyte.io".to_string()
}

fn default_namespace() -> String {
    "accelbyte".to_string()
}

fn default_auth_resource() -> String {
    "ADMIN:NAMESPACE:{namespace}:PIRGRPCSERVICE:CONFIG".to_string()
}

fn default_auth_action() -> u32 {
    // READ | UPDATE
    6
}

fn enabled() -> bool {
    true
}

impl Config {
    /// Load `.env` (if present) and then read the environment
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    pub fn from_env() -> Result<Self, envy::Error> {
        Ok(Config {
            service: envy::from_env()?,
            accelbyte: envy::prefixed("AB_").from_env()?,
            features: envy::prefixed("ENABLE_").from_env()?,
            plugin: envy::prefixed("PLUGIN_GRPC_SERVER_").from_env()?,
            prometheus: envy::prefixed("PROMETHEUS_").from_env()?,
            tracing: TracingConfig::from_env(),
        })
    }
}
