//! Application startup, record flow and teardown.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fhir_submission_consumer::config::{ApplicationProperties, RootConfiguration};
use fhir_submission_consumer::consumer::aggregate::{ACTIVE_CONSUMERS, TOTAL_ERRORS, TOTAL_MESSAGES};
use fhir_submission_consumer::consumer::{ConnectorError, ConsumerRecord, LogHandler};
use fhir_submission_consumer::lifecycle::signals::shutdown_on;
use fhir_submission_consumer::lifecycle::{Application, ResourceLifecycleManager, StartupError};
use fhir_submission_consumer::observability::{MetricRegistry, MetricValue};

mod common;
use common::{yaml_file, RecordingHandler};

const CONFIG: &str = r#"
allowedConsumerDelayMs: 60000
healthReportingIntervalMs: 50
metrics:
  log_interval_secs: 1
connectors:
  submissions:
    bootstrap_servers: ["localhost:9092"]
    topic: fhir-submission
    group_id: fhir-submission-consumer
    consumers: 2
    poll_timeout_ms: 20
  acknowledgements:
    bootstrap_servers: ["localhost:9092"]
    topic: fhir-ack
    group_id: fhir-submission-consumer
"#;

fn snapshot(metrics: &MetricRegistry) -> HashMap<String, MetricValue> {
    metrics.snapshot().into_iter().collect()
}

#[tokio::test]
async fn test_start_builds_connectors_and_registers_resources() {
    let file = yaml_file(CONFIG);
    let app = Application::start(ApplicationProperties::new(file.path())).unwrap();

    let connectors = app.connectors();
    assert_eq!(connectors.len(), 2);
    assert_eq!(connectors["submissions"].len(), 2);
    assert_eq!(connectors["acknowledgements"].len(), 1);

    // Health reporter, log reporter and three consumers.
    assert_eq!(app.lifecycle().len(), 5);

    assert_eq!(
        app.health().names(),
        vec![
            "kafka.consumer.acknowledgements.0",
            "kafka.consumer.submissions.0",
            "kafka.consumer.submissions.1",
        ]
    );
    let results = app.health().run_health_checks();
    assert!(results.values().all(|status| status.is_healthy()));

    let description = connectors["submissions"][0].to_string();
    assert!(description.contains("topic=fhir-submission"));
    assert!(description.contains("client=fhir-submission-submissions-0-"));

    app.shutdown();
}

#[tokio::test]
async fn test_records_flow_through_handler_and_metrics() {
    let file = yaml_file(CONFIG);
    let handler = Arc::new(RecordingHandler::default());
    let app = Application::start_with(ApplicationProperties::new(file.path()), handler.clone()).unwrap();

    let consumer = &app.connectors()["submissions"][0];
    let ingress = consumer.ingress();
    ingress
        .send(ConsumerRecord::new("fhir-submission", 0, 1, b"{}".to_vec()).with_key("ok-1"))
        .await
        .unwrap();
    ingress
        .send(ConsumerRecord::new("fhir-submission", 0, 2, b"{}".to_vec()).with_key("bad-2"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(*handler.keys.lock().unwrap(), vec!["ok-1", "bad-2"]);
    let values = snapshot(app.metrics());
    assert_eq!(values["kafka.consumer.submissions.0.messages"], MetricValue::Counter(1));
    assert_eq!(values["kafka.consumer.submissions.0.errors"], MetricValue::Counter(1));
    assert_eq!(values[TOTAL_MESSAGES], MetricValue::Gauge(1));
    assert_eq!(values[TOTAL_ERRORS], MetricValue::Gauge(1));
    assert_eq!(values[ACTIVE_CONSUMERS], MetricValue::Gauge(3));

    app.shutdown();
}

#[tokio::test]
async fn test_shutdown_stops_consumers_and_is_idempotent() {
    let file = yaml_file(CONFIG);
    let app = Application::start(ApplicationProperties::new(file.path())).unwrap();
    let consumers: Vec<_> = app.connectors().values().flatten().cloned().collect();

    app.shutdown();
    app.shutdown();

    assert!(app.lifecycle().is_shut_down());
    assert!(app.lifecycle().is_empty());
    assert!(consumers.iter().all(|c| c.is_stopped()));
    assert!(app.health().is_empty());
    assert_eq!(snapshot(app.metrics())[ACTIVE_CONSUMERS], MetricValue::Gauge(0));
}

#[tokio::test]
async fn test_termination_after_startup_releases_everything() {
    let file = yaml_file(CONFIG);
    let lifecycle = Arc::new(ResourceLifecycleManager::new());
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let on_signal = shutdown_on(lifecycle.clone(), rx);

    let app = Application::start_in(
        lifecycle.clone(),
        ApplicationProperties::new(file.path()),
        Arc::new(LogHandler),
    )
    .unwrap();
    let consumers: Vec<_> = app.connectors().values().flatten().cloned().collect();
    assert_eq!(lifecycle.len(), 5);

    tx.send(()).unwrap();
    on_signal.await.unwrap().unwrap();

    assert!(lifecycle.is_shut_down());
    assert!(lifecycle.is_empty());
    assert!(consumers.iter().all(|c| c.is_stopped()));
    assert!(app.health().is_empty());
}

#[tokio::test]
async fn test_termination_during_startup_releases_late_resources() {
    let file = yaml_file(CONFIG);
    let lifecycle = Arc::new(ResourceLifecycleManager::new());
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let on_signal = shutdown_on(lifecycle.clone(), rx);

    // The signal lands before startup has acquired anything.
    tx.send(()).unwrap();
    on_signal.await.unwrap().unwrap();

    let app = Application::start_in(
        lifecycle.clone(),
        ApplicationProperties::new(file.path()),
        Arc::new(LogHandler),
    )
    .unwrap();

    assert!(lifecycle.is_empty());
    assert!(app.connectors().values().flatten().all(|c| c.is_stopped()));
    assert!(app.health().is_empty());
    assert_eq!(snapshot(app.metrics())[ACTIVE_CONSUMERS], MetricValue::Gauge(0));
}

#[tokio::test]
async fn test_missing_config_is_configuration_error() {
    let props = ApplicationProperties::new(PathBuf::from("/nonexistent/consumer.yaml"));
    let err = Application::start(props).err().unwrap();
    assert!(matches!(err, StartupError::Config(_)));
}

#[tokio::test]
async fn test_connector_failure_fails_startup() {
    let file = yaml_file(
        r#"
connectors:
  a-good:
    bootstrap_servers: ["localhost:9092"]
    topic: t
    group_id: g
  b-broken:
    bootstrap_servers: ["no-port"]
    topic: t
    group_id: g
"#,
    );
    let err = Application::start(ApplicationProperties::new(file.path())).err().unwrap();
    assert!(matches!(
        err,
        StartupError::Connector(ConnectorError::InvalidBootstrapServer { .. })
    ));
}

#[tokio::test]
async fn test_partial_connector_startup_is_unwound() {
    let mut config: RootConfiguration = serde_yaml::from_str(
        r#"
connectors:
  a-good:
    bootstrap_servers: ["localhost:9092"]
    topic: t
    group_id: g
    consumers: 2
  b-broken:
    bootstrap_servers: ["localhost:9092", "kafka:notaport"]
    topic: t
    group_id: g
"#,
    )
    .unwrap();
    config.allowed_consumer_delay_ms = 1_000;

    let lifecycle = ResourceLifecycleManager::new();
    let metrics = Arc::new(MetricRegistry::new());
    let props = ApplicationProperties::new("unused.yaml").with_application_name("test");

    let result = lifecycle.guard_startup(|lc| {
        config.init_connectors_with(lc, &metrics, &props, Arc::new(LogHandler))
    });

    match result {
        Err(ConnectorError::InvalidBootstrapServer { connector, server }) => {
            assert_eq!(connector, "b-broken");
            assert_eq!(server, "kafka:notaport");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(lifecycle.is_shut_down());
    assert!(metrics.is_empty(), "consumer metrics left behind: {:?}", metrics.snapshot());
}
