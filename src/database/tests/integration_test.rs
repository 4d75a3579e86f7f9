//! Integration tests for the nearest-node connect flow
//!
//! The database driver is replaced by an in-memory connector; telemetry runs
//! through the real HTTP sink against a wiremock server.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use pgedge_connect::{
    ConnectOptions, ConnectSettings, ConnectionConfig, DatabaseClient, DatabaseConnector,
    EdgeConnector, HttpTelemetrySink, RoutingError, CLUSTER_ID_KEY, LATENCY_URL_KEY, NODES_KEY,
};
use pgedge_connect::{ConfigurationError, DatabaseError};
use pgedge_shared::{DeliveryMode, GeoMetadata, RequestContext};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_NODES: &str = r#"[
  {
    "id": "node-1",
    "connection": {
      "host": "h1",
      "port": 5432,
      "username": "u1",
      "password": "p1",
      "database": "d1"
    },
    "location": {
      "latitude": 5,
      "longitude": 10
    }
  },
  {
    "id": "node-2",
    "connection": {
      "host": "h2",
      "port": 5432,
      "username": "u2",
      "password": "p2",
      "database": "d2"
    },
    "location": {
      "latitude": 90,
      "longitude": -30
    }
  }
]"#;

// ============================================================================
// TEST DOUBLES
// ============================================================================

/// Connection handed back by the fake driver
struct FakeClient {
    config: ConnectionConfig,
    queries: usize,
}

#[async_trait]
impl DatabaseClient for FakeClient {
    async fn query_timestamps(&mut self, _sql: &str) -> Result<Vec<DateTime<Utc>>, DatabaseError> {
        self.queries += 1;
        Ok(vec![server_time()])
    }
}

#[derive(Clone, Default)]
struct FakeConnector {
    attempts: Arc<AtomicUsize>,
    refuse: bool,
}

#[async_trait]
impl DatabaseConnector for FakeConnector {
    type Client = FakeClient;

    async fn connect(&self, config: &ConnectionConfig) -> Result<FakeClient, DatabaseError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(DatabaseError::Connection(format!(
                "connection to {}:{} refused",
                config.host, config.port
            )));
        }

        Ok(FakeClient {
            config: config.clone(),
            queries: 0,
        })
    }
}

fn server_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()
}

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn awaited_settings(sample_rate: f64) -> ConnectSettings {
    let mut settings = ConnectSettings::default();
    settings.sample_rate = sample_rate;
    settings.telemetry.delivery = DeliveryMode::Awaited;
    settings.telemetry.request_timeout_seconds = 2;
    settings
}

fn edge(
    connector: FakeConnector,
    settings: ConnectSettings,
) -> EdgeConnector<FakeConnector, HttpTelemetrySink> {
    let sink = HttpTelemetrySink::new(&settings.telemetry).unwrap();
    EdgeConnector::with_sink(connector, sink, settings)
}

fn options(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

// ============================================================================
// SELECTION AND CONFIGURATION
// ============================================================================

#[tokio::test]
async fn test_connect_selects_nearest_node() {
    let connector = edge(FakeConnector::default(), ConnectSettings::default());

    let client = connector
        .connect(ConnectOptions::from_env(env(&[(NODES_KEY, TEST_NODES)])).with_location((6.0, 11.0)))
        .await
        .unwrap();
    assert_eq!(client.config.host, "h1");
    assert_eq!(client.config.user, "u1");
    assert_eq!(client.config.option("query_timeout"), None);

    let client = connector
        .connect(
            ConnectOptions::from_env(env(&[(NODES_KEY, TEST_NODES)]))
                .with_location((92.0, -29.0))
                .with_config(options(json!({"query_timeout": 33}))),
        )
        .await
        .unwrap();
    assert_eq!(client.config.host, "h2");
    assert_eq!(client.config.password, "p2");
    assert_eq!(client.config.option("query_timeout"), Some(&json!(33)));
}

#[tokio::test]
async fn test_connect_without_location_uses_default() {
    let connector = edge(FakeConnector::default(), ConnectSettings::default());

    let client = connector
        .connect(ConnectOptions::from_env(env(&[(NODES_KEY, TEST_NODES)])))
        .await
        .unwrap();

    assert_eq!(client.config.host, "h2");
}

#[tokio::test]
async fn test_connect_accepts_numeric_strings() {
    let connector = edge(FakeConnector::default(), ConnectSettings::default());

    let location: pgedge_connect::CoordinateInput =
        serde_json::from_value(json!({"latitude": "6", "longitude": "11"})).unwrap();
    let client = connector
        .connect(ConnectOptions::from_env(env(&[(NODES_KEY, TEST_NODES)])).with_location(location))
        .await
        .unwrap();

    assert_eq!(client.config.host, "h1");
}

#[tokio::test]
async fn test_connect_uses_request_geo_data() {
    let connector = edge(FakeConnector::default(), ConnectSettings::default());
    let request = RequestContext::default().with_geo(GeoMetadata {
        latitude: Some("4.05".into()),
        longitude: Some("9.7".into()),
        city: Some("Douala".to_string()),
        ..Default::default()
    });

    // the default location alone would select h2
    let fallback = connector
        .connect(ConnectOptions::from_env(env(&[(NODES_KEY, TEST_NODES)])))
        .await
        .unwrap();
    assert_eq!(fallback.config.host, "h2");

    let client = connector
        .connect(ConnectOptions::from_env(env(&[(NODES_KEY, TEST_NODES)])).with_request(request.clone()))
        .await
        .unwrap();
    assert_eq!(client.config.host, "h1");

    // an explicit location still takes precedence over request geo data
    let client = connector
        .connect(
            ConnectOptions::from_env(env(&[(NODES_KEY, TEST_NODES)]))
                .with_location((88.0, -28.0))
                .with_request(request),
        )
        .await
        .unwrap();
    assert_eq!(client.config.host, "h2");
}

#[tokio::test]
async fn test_caller_cannot_redirect_connection() {
    let connector = edge(FakeConnector::default(), ConnectSettings::default());

    let client = connector
        .connect(
            ConnectOptions::from_env(env(&[(NODES_KEY, TEST_NODES)]))
                .with_location((6.0, 11.0))
                .with_config(options(json!({
                    "host": "attacker.example.com",
                    "password": "guess",
                    "ssl": true
                }))),
        )
        .await
        .unwrap();

    assert_eq!(client.config.host, "h1");
    assert_eq!(client.config.password, "p1");
    assert_eq!(client.config.option("ssl"), Some(&json!(true)));
    assert_eq!(client.config.option("host"), None);
}

#[tokio::test]
async fn test_concurrent_connects_select_independently() {
    let connector = edge(FakeConnector::default(), ConnectSettings::default());

    let (north, south) = tokio::join!(
        connector.connect(
            ConnectOptions::from_env(env(&[(NODES_KEY, TEST_NODES)])).with_location((88.0, -28.0))
        ),
        connector.connect(
            ConnectOptions::from_env(env(&[(NODES_KEY, TEST_NODES)])).with_location((0.0, 0.0))
        ),
    );

    assert_eq!(north.unwrap().config.host, "h2");
    assert_eq!(south.unwrap().config.host, "h1");
}

// ============================================================================
// ERRORS
// ============================================================================

#[tokio::test]
async fn test_empty_node_list_fails_without_connecting() {
    let fake = FakeConnector::default();
    let connector = edge(fake.clone(), ConnectSettings::default());

    let result = connector.connect(ConnectOptions::from_nodes(Vec::new())).await;
    match result {
        Err(RoutingError::Configuration(ConfigurationError::NoNodes)) => {}
        Err(other) => panic!("expected invalid options, got {}", other),
        Ok(_) => panic!("expected invalid options"),
    }

    let result = connector
        .connect(ConnectOptions::from_env(env(&[(NODES_KEY, "[]")])))
        .await;
    match result {
        Err(error) => assert_eq!(error.to_string(), "PGEDGE_NODES array is empty"),
        Ok(_) => panic!("expected empty registry error"),
    }

    let result = connector
        .connect(ConnectOptions::from_env(env(&[(NODES_KEY, "{not json")])))
        .await;
    assert!(matches!(result, Err(RoutingError::Deserialization(_))));

    assert_eq!(fake.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_connection_failure_propagates() {
    let fake = FakeConnector {
        refuse: true,
        ..Default::default()
    };
    let connector = edge(fake.clone(), ConnectSettings::default());

    let result = connector
        .connect(ConnectOptions::from_env(env(&[(NODES_KEY, TEST_NODES)])).with_location((6.0, 11.0)))
        .await;

    match result {
        Err(RoutingError::Database(DatabaseError::Connection(message))) => {
            assert_eq!(message, "connection to h1:5432 refused");
        }
        Err(other) => panic!("expected connection error, got {}", other),
        Ok(_) => panic!("expected connection error"),
    }
    assert_eq!(fake.attempts.load(Ordering::SeqCst), 1);
}

// ============================================================================
// LATENCY TELEMETRY
// ============================================================================

#[tokio::test]
async fn test_latency_sample_is_posted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/latency"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = format!("{}/latency", server.uri());
    let lookup = env(&[(NODES_KEY, TEST_NODES), (LATENCY_URL_KEY, &endpoint)]);
    let request = RequestContext::default()
        .with_header("CF-Ray", "8c1f2a")
        .with_geo(GeoMetadata {
            country: Some("DE".to_string()),
            colo: Some("FRA".to_string()),
            ..Default::default()
        });

    let connector = edge(FakeConnector::default(), awaited_settings(0.0));
    let client = connector
        .connect(
            ConnectOptions::from_env(lookup)
                .with_location((6.0, 11.0))
                .with_request(request)
                .with_sample_rate(1.0),
        )
        .await
        .unwrap();

    assert_eq!(client.config.host, "h1");
    assert_eq!(client.queries, 1);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let batch = body.as_array().unwrap();
    assert_eq!(batch.len(), 1);

    let sample = &batch[0];
    assert_eq!(sample["node_id"], "node-1");
    assert!(sample["value"].as_f64().unwrap() >= 0.0);
    assert!(sample["time"].is_string());
    assert_eq!(sample["source"], "pgedge-connect-rs");
    assert_eq!(sample["location"]["latitude"], 6.0);
    assert_eq!(sample["location"]["longitude"], 11.0);
    assert_eq!(sample["location"]["country"], "DE");
    assert_eq!(sample["location"]["colo"], "FRA");
    assert_eq!(sample["meta"]["query"], "SELECT NOW()");
    assert_eq!(sample["meta"]["result"], json!(server_time()));
    assert_eq!(sample["meta"]["trace_id"], "8c1f2a");
}

#[tokio::test]
async fn test_telemetry_failures_do_not_fail_connect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let connector = edge(FakeConnector::default(), awaited_settings(1.0));

    let lookup = env(&[(NODES_KEY, TEST_NODES), (LATENCY_URL_KEY, &server.uri())]);
    let client = connector
        .connect(ConnectOptions::from_env(lookup).with_location((6.0, 11.0)))
        .await
        .unwrap();
    assert_eq!(client.config.host, "h1");
    assert_eq!(client.queries, 1);

    let lookup = env(&[
        (NODES_KEY, TEST_NODES),
        (LATENCY_URL_KEY, "http://127.0.0.1:1/latency"),
    ]);
    let client = connector
        .connect(ConnectOptions::from_env(lookup).with_location((6.0, 11.0)))
        .await
        .unwrap();
    assert_eq!(client.config.host, "h1");
}

#[tokio::test]
async fn test_unsampled_connect_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let connector = edge(FakeConnector::default(), awaited_settings(1.0));
    let lookup = env(&[(NODES_KEY, TEST_NODES), (LATENCY_URL_KEY, &server.uri())]);

    let client = connector
        .connect(ConnectOptions::from_env(lookup).with_sample_rate(0.0))
        .await
        .unwrap();

    assert_eq!(client.queries, 0);
}

#[tokio::test]
async fn test_explicit_nodes_skip_latency_reporting() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let nodes = pgedge_connect::load_nodes_from_str(TEST_NODES)
        .unwrap()
        .into_inner();
    let connector = edge(FakeConnector::default(), awaited_settings(1.0));

    let client = connector
        .connect(ConnectOptions::from_nodes(nodes).with_location((6.0, 11.0)))
        .await
        .unwrap();

    assert_eq!(client.config.host, "h1");
    assert_eq!(client.queries, 0);
}

#[tokio::test]
async fn test_cluster_id_with_unreachable_domain_is_contained() {
    let mut settings = awaited_settings(1.0);
    settings.telemetry.service_domain = "invalid.localhost".to_string();
    let connector = edge(FakeConnector::default(), settings);

    let lookup = env(&[(NODES_KEY, TEST_NODES), (CLUSTER_ID_KEY, "c-1")]);
    let client = connector
        .connect(ConnectOptions::from_env(lookup).with_location((6.0, 11.0)))
        .await
        .unwrap();

    assert_eq!(client.config.host, "h1");
    assert_eq!(client.queries, 1);
}
