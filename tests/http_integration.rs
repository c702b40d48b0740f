//! Integration tests against a mocked Confluent Cloud API using wiremock
//!
//! Each test starts its own mock server and points a provider at it, then
//! drives full lifecycle operations and checks both the resulting state and
//! the requests the server received.

use serde_json::{json, Value};
use tfconfluent::config::ProviderConfig;
use tfconfluent::error::ApiError;
use tfconfluent::lifecycle::{LifecycleState, ResourceInstance};
use tfconfluent::schema::ResourceData;
use tfconfluent::{Provider, ProviderError, StoredState};
use wiremock::matchers::{basic_auth, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "TESTKEY0123456789";
const API_SECRET: &str = "test-secret";

fn provider(server: &MockServer) -> Provider {
    let config = ProviderConfig {
        endpoint: Some(server.uri()),
        cloud_api_key: Some(API_KEY.to_string()),
        cloud_api_secret: Some(API_SECRET.to_string()),
        acceptance_test_mode: true,
    };
    Provider::new(&config).expect("provider should configure")
}

fn managed(provider: &Provider, type_name: &str, state: Value) -> ResourceInstance {
    let schema = provider.resource(type_name).unwrap().schema();
    ResourceInstance::managed(ResourceData::from_json(&schema, &state).unwrap())
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map(|r| r.len()).unwrap_or_default()
}

/// HTTP client status handling
mod http_client_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_sends_basic_auth_and_parses_json() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/org/v2/environments/env-1"))
            .and(basic_auth(API_KEY, API_SECRET))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "env-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server);
        let client = provider.client();
        let body: Value = client
            .http
            .get(&client.org_url("environments/env-1"), &[])
            .await
            .expect("request should succeed");

        assert_eq!(body["id"], "env-1");
    }

    #[tokio::test]
    async fn test_error_status_carries_server_detail() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/iam/v2/service-accounts/sa-1"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "errors": [{"status": "500", "detail": "internal failure"}]
            })))
            .mount(&server)
            .await;

        let provider = provider(&server);
        let client = provider.client();
        let err = client
            .http
            .get::<Value>(&client.iam_url("service-accounts/sa-1"), &[])
            .await
            .unwrap_err();

        match err {
            ApiError::Status { status, detail } => {
                assert_eq!(status, 500);
                assert_eq!(detail, "internal failure");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_not_found_and_forbidden_classify_as_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/iam/v2/api-keys/GONE"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/iam/v2/api-keys/HIDDEN"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let provider = provider(&server);
        let client = provider.client();
        for key in ["GONE", "HIDDEN"] {
            let err = client
                .http
                .get::<Value>(&client.iam_url(&format!("api-keys/{}", key)), &[])
                .await
                .unwrap_err();
            assert!(err.is_not_found(), "{} should be not found", key);
        }
    }
}

/// Listing data sources follow page tokens
mod pagination_tests {
    use super::*;

    async fn mount_two_pages(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/org/v2/environments"))
            .and(query_param("page_token", "tok2"))
            .and(query_param("page_size", "99"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "api_version": "org/v2",
                "kind": "EnvironmentList",
                "metadata": {"first": format!("{}/org/v2/environments", server.uri())},
                "data": [{"id": "env-3", "display_name": "dev"}]
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/org/v2/environments"))
            .and(query_param_is_missing("page_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "api_version": "org/v2",
                "kind": "EnvironmentList",
                "metadata": {
                    "next": format!("{}/org/v2/environments?page_size=99&page_token=tok2", server.uri())
                },
                "data": [
                    {"id": "env-1", "display_name": "prod"},
                    {"id": "env-2", "display_name": "staging"}
                ]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_environments_collects_every_page() {
        let server = MockServer::start().await;
        mount_two_pages(&server).await;

        let result = provider(&server)
            .read_data("confluent_environments", &json!({}))
            .await
            .unwrap();

        assert_eq!(result["ids"], json!(["env-1", "env-2", "env-3"]));
        assert_eq!(request_count(&server).await, 2);
    }

    #[tokio::test]
    async fn test_environment_lookup_by_display_name_spans_pages() {
        let server = MockServer::start().await;
        mount_two_pages(&server).await;

        let result = provider(&server)
            .read_data("confluent_environment", &json!({"display_name": "dev"}))
            .await
            .unwrap();

        assert_eq!(result["id"], "env-3");
    }

    #[tokio::test]
    async fn test_repeated_token_is_a_pagination_loop() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/iam/v2/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metadata": {"next": "/iam/v2/users?page_token=same"},
                "data": [{"id": "u-1"}]
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .read_data("confluent_users", &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::PaginationLoop { .. }));
        assert_eq!(request_count(&server).await, 2);
    }
}

/// Create, Update, Read, Delete and Import through the orchestrator
mod lifecycle_tests {
    use super::*;

    fn cluster_body(phase: &str) -> Value {
        json!({
            "api_version": "cmk/v2",
            "kind": "Cluster",
            "id": "lkc-1",
            "spec": {
                "display_name": "inventory",
                "availability": "SINGLE_ZONE",
                "cloud": "AWS",
                "region": "us-east-2",
                "config": {"kind": "Basic"},
                "environment": {"id": "env-1"},
                "kafka_bootstrap_endpoint": "SASL_SSL://pkc-1.us-east-2.aws.confluent.cloud:9092",
                "http_endpoint": "https://pkc-1.us-east-2.aws.confluent.cloud:443"
            },
            "status": {"phase": phase},
            "metadata": {"resource_name": "crn://confluent.cloud/organization=o-1/environment=env-1/cloud-cluster=lkc-1"}
        })
    }

    #[tokio::test]
    async fn test_kafka_cluster_create_polls_then_reads() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/cmk/v2/clusters"))
            .respond_with(ResponseTemplate::new(202).set_body_json(cluster_body("PROVISIONING")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cmk/v2/clusters/lkc-1"))
            .and(query_param("environment", "env-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cluster_body("PROVISIONING")))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cmk/v2/clusters/lkc-1"))
            .and(query_param("environment", "env-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cluster_body("PROVISIONED")))
            .mount(&server)
            .await;

        let provider = provider(&server);
        let declared = provider
            .declared(
                "confluent_kafka_cluster",
                &json!({
                    "display_name": "inventory",
                    "availability": "SINGLE_ZONE",
                    "cloud": "AWS",
                    "region": "us-east-2",
                    "basic": {},
                    "environment": {"id": "env-1"}
                }),
            )
            .unwrap();

        let instance = provider
            .lifecycle("confluent_kafka_cluster")
            .unwrap()
            .create(declared)
            .await
            .unwrap();

        assert_eq!(instance.state, LifecycleState::Created);
        assert_eq!(instance.data.id(), "lkc-1");
        assert!(!instance.data.is_new_resource());
        assert_eq!(
            instance.data.get_str("bootstrap_endpoint"),
            Some("SASL_SSL://pkc-1.us-east-2.aws.confluent.cloud:9092")
        );
        assert!(instance.data.has_block("basic"));

        // 1 create, 3 polls (2 PROVISIONING + 1 PROVISIONED), 1 read
        assert_eq!(request_count(&server).await, 5);
    }

    #[tokio::test]
    async fn test_kafka_cluster_provisioning_failure_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/cmk/v2/clusters"))
            .respond_with(ResponseTemplate::new(202).set_body_json(cluster_body("PROVISIONING")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cmk/v2/clusters/lkc-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cluster_body("FAILED")))
            .mount(&server)
            .await;

        let provider = provider(&server);
        let declared = provider
            .declared(
                "confluent_kafka_cluster",
                &json!({
                    "display_name": "inventory",
                    "availability": "SINGLE_ZONE",
                    "cloud": "AWS",
                    "region": "us-east-2",
                    "standard": [{}],
                    "environment": [{"id": "env-1"}]
                }),
            )
            .unwrap();

        let err = provider
            .lifecycle("confluent_kafka_cluster")
            .unwrap()
            .create(declared)
            .await
            .unwrap_err();

        assert!(matches!(err.error, ProviderError::ProvisioningFailed { ref status, .. } if status == "FAILED"));

        let tainted = err.tainted.expect("created cluster stays tracked");
        assert_eq!(tainted.state, LifecycleState::Tainted);
        assert_eq!(tainted.data.id(), "lkc-1");

        let resource = provider.resource("confluent_kafka_cluster").unwrap();
        let stored = StoredState::capture(resource, &tainted);
        assert!(stored.tainted);
        assert_eq!(stored.id, "lkc-1");
        let restored = stored.restore(resource).unwrap();
        assert_eq!(restored.state, LifecycleState::Tainted);
        assert_eq!(restored.data.id(), "lkc-1");
    }

    #[tokio::test]
    async fn test_private_link_attachment_cloud_change_sends_nothing() {
        let server = MockServer::start().await;
        let provider = provider(&server);

        let mut instance = managed(
            &provider,
            "confluent_private_link_attachment",
            json!({
                "id": "platt-1",
                "display_name": "staging-platt",
                "cloud": "AWS",
                "region": "us-east-1",
                "environment": [{"id": "env-1"}],
                "aws": [{"vpc_endpoint_service_name": "com.amazonaws.vpce.us-east-1.vpce-svc-1"}],
                "azure": [],
                "gcp": []
            }),
        );
        let declared = provider
            .declared(
                "confluent_private_link_attachment",
                &json!({
                    "display_name": "staging-platt",
                    "cloud": "GCP",
                    "region": "us-east-1",
                    "environment": {"id": "env-1"}
                }),
            )
            .unwrap();

        let err = provider
            .lifecycle("confluent_private_link_attachment")
            .unwrap()
            .update(&mut instance, declared)
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(err.to_string().contains("\"cloud\""));
        assert_eq!(instance.data.get_str("cloud"), Some("AWS"));
        assert_eq!(request_count(&server).await, 0);
    }

    #[tokio::test]
    async fn test_private_link_attachment_delete_waits_until_gone() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/networking/v1/private-link-attachments/platt-1"))
            .and(query_param("environment", "env-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/networking/v1/private-link-attachments/platt-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "platt-1",
                "spec": {"cloud": "AWS", "region": "us-east-1", "environment": {"id": "env-1"}},
                "status": {"phase": "READY"}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/networking/v1/private-link-attachments/platt-1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = provider(&server);
        let mut instance = managed(
            &provider,
            "confluent_private_link_attachment",
            json!({
                "id": "platt-1",
                "cloud": "AWS",
                "region": "us-east-1",
                "environment": [{"id": "env-1"}]
            }),
        );

        provider
            .lifecycle("confluent_private_link_attachment")
            .unwrap()
            .delete(&mut instance)
            .await
            .unwrap();

        assert_eq!(instance.state, LifecycleState::Deleted);
        assert_eq!(instance.data.id(), "");
        assert_eq!(request_count(&server).await, 3);
    }

    #[tokio::test]
    async fn test_read_not_found_removes_resource_from_state() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/org/v2/environments/env-gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "errors": [{"status": "404", "detail": "Not Found"}]
            })))
            .mount(&server)
            .await;

        let provider = provider(&server);
        let mut instance = managed(
            &provider,
            "confluent_environment",
            json!({"id": "env-gone", "display_name": "old"}),
        );

        provider
            .lifecycle("confluent_environment")
            .unwrap()
            .read(&mut instance)
            .await
            .expect("drift is not an error");

        assert_eq!(instance.state, LifecycleState::Unmanaged);
        assert!(!instance.data.is_tracked());
    }

    #[tokio::test]
    async fn test_delete_not_found_counts_as_deleted() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/org/v2/environments/env-gone"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server);
        let mut instance = managed(
            &provider,
            "confluent_environment",
            json!({"id": "env-gone", "display_name": "old"}),
        );

        provider
            .lifecycle("confluent_environment")
            .unwrap()
            .delete(&mut instance)
            .await
            .unwrap();

        assert_eq!(instance.state, LifecycleState::Deleted);
    }

    #[tokio::test]
    async fn test_conflict_on_create_has_actionable_diagnostic() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/iam/v2/service-accounts"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "errors": [{"status": "409", "detail": "Service name is already in use"}]
            })))
            .mount(&server)
            .await;

        let provider = provider(&server);
        let declared = provider
            .declared("confluent_service_account", &json!({"display_name": "app-manager"}))
            .unwrap();
        let err = provider
            .lifecycle("confluent_service_account")
            .unwrap()
            .create(declared)
            .await
            .unwrap_err();

        assert!(err.tainted.is_none());
        let diagnostic = err.error.diagnostic();
        assert!(diagnostic.summary.contains("already exist"));
        assert_eq!(diagnostic.detail.as_deref(), Some("Service name is already in use"));
    }
}

/// Composite-id import reproduces created state
mod import_tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    const CONNECTORS_PATH: &str = "/connect/v1/environments/env-abc123/clusters/lkc-xyz987/connectors";

    /// Mount create and lookup for `my-connector`. `injected` holds settings
    /// the server reports on top of what was declared.
    async fn mount_connector(server: &MockServer, injected: Value) {
        Mock::given(method("POST"))
            .and(path(CONNECTORS_PATH))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "name": "my-connector",
                "config": {"name": "my-connector"},
                "tasks": [],
                "type": "source"
            })))
            .mount(server)
            .await;

        let mut config = json!({
            "name": "my-connector",
            "connector.class": "DatagenSource",
            "kafka.topic": "orders",
            "kafka.auth.mode": "KAFKA_API_KEY",
            "kafka.api.key": "KEY123",
            "kafka.api.secret": "****************"
        });
        if let (Some(config), Some(injected)) = (config.as_object_mut(), injected.as_object()) {
            config.extend(injected.clone());
        }

        Mock::given(method("GET"))
            .and(path(CONNECTORS_PATH))
            .and(query_param("expand", "info,status,id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "my-connector": {
                    "id": {"id": "lcc-abc", "id_type": "ID"},
                    "info": {
                        "name": "my-connector",
                        "type": "source",
                        "config": config
                    },
                    "status": {
                        "name": "my-connector",
                        "connector": {"state": "RUNNING", "worker_id": "my-connector"},
                        "tasks": [],
                        "type": "source"
                    }
                }
            })))
            .mount(server)
            .await;
    }

    fn declared_connector(provider: &Provider) -> ResourceData {
        provider
            .declared(
                "confluent_connector",
                &json!({
                    "environment": {"id": "env-abc123"},
                    "kafka_cluster": {"id": "lkc-xyz987"},
                    "config_sensitive": {"kafka.api.secret": "TOPSECRET-XYZ"},
                    "config_nonsensitive": {
                        "name": "my-connector",
                        "connector.class": "DatagenSource",
                        "kafka.topic": "orders",
                        "kafka.auth.mode": "KAFKA_API_KEY",
                        "kafka.api.key": "KEY123"
                    }
                }),
            )
            .unwrap()
    }

    /// Collects formatted log lines in memory
    #[derive(Clone, Default)]
    struct LogCapture(Arc<Mutex<Vec<u8>>>);

    impl LogCapture {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogCapture {
        type Writer = LogCapture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_connector_import_matches_create() {
        let server = MockServer::start().await;
        mount_connector(&server, json!({})).await;
        let provider = provider(&server);
        let lifecycle = provider.lifecycle("confluent_connector").unwrap();

        let created = lifecycle.create(declared_connector(&provider)).await.unwrap();
        let imported = lifecycle.import("env-abc123/lkc-xyz987/my-connector").await.unwrap();

        let resource = provider.resource("confluent_connector").unwrap();
        assert_eq!(imported.data.id(), "lcc-abc");
        assert!(created
            .data
            .equal_ignoring(&imported.data, &resource.import_verify_ignore()));
        assert!(!created.data.equal_ignoring(&imported.data, &[]));
    }

    #[tokio::test]
    async fn test_connector_server_settings_do_not_cause_updates() {
        let server = MockServer::start().await;
        mount_connector(
            &server,
            json!({"kafka.endpoint": "SASL_SSL://pkc-1.us-east-2.aws.confluent.cloud:9092"}),
        )
        .await;
        let provider = provider(&server);
        let lifecycle = provider.lifecycle("confluent_connector").unwrap();

        let mut instance = lifecycle.create(declared_connector(&provider)).await.unwrap();
        assert!(!instance
            .data
            .get_map("config_nonsensitive")
            .contains_key("kafka.endpoint"));

        lifecycle
            .update(&mut instance, declared_connector(&provider))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap_or_default();
        assert!(requests.iter().all(|r| r.method.as_str() != "PUT"));
    }

    #[tokio::test]
    async fn test_connector_create_log_hides_secrets() {
        let server = MockServer::start().await;
        mount_connector(&server, json!({})).await;
        let provider = provider(&server);

        let capture = LogCapture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(capture.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        provider
            .lifecycle("confluent_connector")
            .unwrap()
            .create(declared_connector(&provider))
            .await
            .unwrap();

        let logs = capture.contents();
        assert!(logs.contains("Connector request"));
        assert!(logs.contains("<redacted>"));
        assert!(!logs.contains("TOPSECRET-XYZ"));

        let requests = server.received_requests().await.unwrap_or_default();
        let post = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
        let body: Value = serde_json::from_slice(&post.body).unwrap();
        assert_eq!(body["config"]["kafka.api.secret"], "TOPSECRET-XYZ");
    }

    #[tokio::test]
    async fn test_import_with_wrong_part_count_sends_nothing() {
        let server = MockServer::start().await;
        let provider = provider(&server);

        let err = provider
            .lifecycle("confluent_connector")
            .unwrap()
            .import("env-abc123/my-connector")
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::InvalidImportId { .. }));
        assert!(err.to_string().contains("<environment_id>/<kafka_cluster_id>/<connector_name>"));
        assert_eq!(request_count(&server).await, 0);
    }

    #[tokio::test]
    async fn test_import_of_missing_connector_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONNECTORS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let err = provider(&server)
            .lifecycle("confluent_connector")
            .unwrap()
            .import("env-abc123/lkc-xyz987/my-connector")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }
}
