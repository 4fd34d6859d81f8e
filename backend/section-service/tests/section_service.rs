//! Section handlers and the assembled plugin server

use grpc_app::{App, AppConfig};
use grpc_metrics::PrometheusConfig;
use opentelemetry_config::TracingConfig;
use prometheus::Registry;
use section_service::bootstrap::build_options;
use section_service::config::{
    AccelByteConfig, Config, FeatureToggles, LogFormat, PluginServerConfig, ServiceConfig,
};
use section_service::section_proto::section_client::SectionClient;
use section_service::section_proto::{
    BackfillRequest, GetRotationItemsRequest, RotationItemObject, SectionItemObject, SectionObject,
};
use section_service::service::{backfill_items, rotation_items};
use section_service::BackfillPolicy;
use std::time::Duration;
use tonic::transport::Channel;

fn section_items(skus: &[&str]) -> Vec<SectionItemObject> {
    skus.iter()
        .map(|sku| SectionItemObject {
            item_id: uuid::Uuid::new_v4().simple().to_string(),
            item_sku: sku.to_string(),
        })
        .collect()
}

fn rotation_items_owning_first(skus: &[&str]) -> Vec<RotationItemObject> {
    skus.iter()
        .enumerate()
        .map(|(i, sku)| RotationItemObject {
            item_id: uuid::Uuid::new_v4().simple().to_string(),
            item_sku: sku.to_string(),
            owned: i == 0,
            index: i as i32 + 10,
        })
        .collect()
}

fn test_config() -> Config {
    Config {
        service: ServiceConfig {
            service_name: "section-test".to_string(),
            backfill_item_policy: BackfillPolicy::Generated,
            log_format: LogFormat::Text,
        },
        accelbyte: AccelByteConfig {
            base_url: "https://demo.accelbyte.io".to_string(),
            namespace: "accelbyte".to_string(),
            security_client_id: None,
            security_client_secret: None,
        },
        features: FeatureToggles {
            health_checking: true,
            reflection: true,
            prometheus: false,
        },
        plugin: PluginServerConfig {
            auth_enabled: false,
            auth_resource: "ADMIN:NAMESPACE:{namespace}:PIRGRPCSERVICE:CONFIG".to_string(),
            auth_action: 6,
            auth_jwt_public_key: None,
            logging_enabled: false,
            metrics_enabled: true,
        },
        prometheus: PrometheusConfig::default(),
        tracing: TracingConfig::default(),
    }
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

async fn connect(port: u16) -> SectionClient<Channel> {
    let endpoint = format!("http://127.0.0.1:{port}");
    for _ in 0..50 {
        if let Ok(client) = SectionClient::connect(endpoint.clone()).await {
            return client;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("server did not start on port {port}");
}

#[test]
fn test_rotation_at_noon_picks_middle_item() {
    let items = section_items(&["S1", "S2", "S3", "S4", "S5", "S6", "S7", "S8"]);

    let response = rotation_items(&items, 12).unwrap();

    assert_eq!(response.expired_at, 0);
    assert_eq!(response.items, vec![items[4].clone()]);
}

#[test]
fn test_backfill_replaces_only_owned_items() {
    let items = rotation_items_owning_first(&["S1", "S2", "S3"]);

    let response = backfill_items(&items, BackfillPolicy::Generated);

    assert_eq!(response.backfilled_items.len(), 1);
    assert_eq!(response.backfilled_items[0].index, items[0].index);
    assert_ne!(response.backfilled_items[0].item_id, items[0].item_id);
}

#[test]
fn test_options_follow_toggles() {
    let registry = Registry::new();
    let options = build_options(&test_config(), &registry).unwrap();
    let names: Vec<&str> = options.iter().map(|option| option.name()).collect();

    assert_eq!(
        names,
        vec![
            "HealthCheckOption",
            "ReflectionOption",
            "InterceptorOption[MetricsInterceptor]",
            "ServiceOption[accelbyte.platform.catalog.section.v1.Section]",
        ]
    );
}

#[test]
fn test_everything_disabled_leaves_only_the_service() {
    let mut config = test_config();
    config.features.health_checking = false;
    config.features.reflection = false;
    config.plugin.metrics_enabled = false;

    let options = build_options(&config, &Registry::new()).unwrap();

    assert_eq!(options.len(), 1);
    assert_eq!(
        options[0].name(),
        "ServiceOption[accelbyte.platform.catalog.section.v1.Section]"
    );
}

#[test]
fn test_authorization_requires_public_key() {
    let mut config = test_config();
    config.plugin.auth_enabled = true;

    let err = build_options(&config, &Registry::new()).err().expect("expected build_options to fail");
    assert!(err.to_string().contains("PLUGIN_GRPC_SERVER_AUTH_JWT_PUBLIC_KEY"));

    config.plugin.auth_jwt_public_key = Some("not a pem".to_string());
    assert!(build_options(&config, &Registry::new()).is_err());
}

#[tokio::test]
async fn test_serves_section_calls_end_to_end() {
    let port = free_port();
    let registry = Registry::new();
    let options = build_options(&test_config(), &registry).unwrap();

    let mut app = App::new(port, AppConfig::new("section-test"), options).unwrap();
    assert!(app
        .service_names()
        .contains(&"accelbyte.platform.catalog.section.v1.Section".to_string()));

    let client = tokio::spawn(async move {
        let mut client = connect(port).await;

        let items = section_items(&["S1", "S2", "S3", "S4", "S5", "S6", "S7", "S8"]);
        let rotation = client
            .get_rotation_items(GetRotationItemsRequest {
                user_id: "user".to_string(),
                namespace: "accelbyte".to_string(),
                section_object: Some(SectionObject {
                    items: items.clone(),
                    ..Default::default()
                }),
            })
            .await
            .unwrap()
            .into_inner();
        assert_eq!(rotation.items.len(), 1);
        assert!(items.contains(&rotation.items[0]));

        let owned = rotation_items_owning_first(&["S1", "S2", "S3"]);
        let backfill = client
            .backfill(BackfillRequest {
                items: owned.clone(),
                ..Default::default()
            })
            .await
            .unwrap()
            .into_inner();
        assert_eq!(backfill.backfilled_items.len(), 1);
        assert_eq!(backfill.backfilled_items[0].index, owned[0].index);

        let empty = client
            .get_rotation_items(GetRotationItemsRequest::default())
            .await
            .unwrap_err();
        assert_eq!(empty.code(), tonic::Code::InvalidArgument);
    });

    app.run(Some(Duration::from_secs(3))).await.unwrap();
    client.await.unwrap();

    let families = registry.gather();
    let calls = families
        .iter()
        .find(|family| family.get_name() == "grpc_server_calls_total")
        .unwrap();
    assert_eq!(calls.get_metric()[0].get_counter().get_value() as u64, 3);
}
