//! Nearest-node connect flow

use pgedge_shared::{ConnectSettings, Coordinate, CoordinateInput, DatabaseNode, RequestContext};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::connections::{build_connection_config, DatabaseConnector};
use crate::env::Lookup;
use crate::registry::load_nodes;
use crate::selector::closest;
use crate::telemetry::{
    resolve_endpoint, HttpTelemetrySink, LatencyReporter, SamplingRate, TelemetrySink,
};
use crate::{ConfigurationError, Result};

#[cfg(feature = "postgres")]
use crate::connections::{PostgresClient, PostgresConnector};

/// Where the candidate nodes come from
#[derive(Clone)]
pub enum NodeSource {
    /// Read `PGEDGE_NODES` (and the telemetry keys) from a lookup
    Environment(Arc<dyn Lookup>),
    /// Caller-supplied nodes; latency reporting is skipped
    Nodes(Vec<DatabaseNode>),
}

impl fmt::Debug for NodeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeSource::Environment(_) => f.write_str("Environment(..)"),
            NodeSource::Nodes(nodes) => f.debug_tuple("Nodes").field(&nodes.len()).finish(),
        }
    }
}

/// Options for one connect call
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub source: NodeSource,
    pub location: Option<CoordinateInput>,
    pub request: Option<RequestContext>,
    pub config: Option<Map<String, Value>>,
    pub sample_rate: Option<f64>,
}

impl ConnectOptions {
    pub fn new(source: NodeSource) -> Self {
        Self {
            source,
            location: None,
            request: None,
            config: None,
            sample_rate: None,
        }
    }

    pub fn from_env(lookup: impl Lookup + 'static) -> Self {
        Self::new(NodeSource::Environment(Arc::new(lookup)))
    }

    pub fn from_nodes(nodes: Vec<DatabaseNode>) -> Self {
        Self::new(NodeSource::Nodes(nodes))
    }

    pub fn with_location(mut self, location: impl Into<CoordinateInput>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_config(mut self, config: Map<String, Value>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_sample_rate(mut self, rate: f64) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    /// Client coordinate: explicit option, then request geo data, then `default`
    pub fn resolve_location(&self, default: Coordinate) -> Coordinate {
        if let Some(location) = &self.location {
            return location.resolve(default);
        }

        self.request
            .as_ref()
            .and_then(RequestContext::coordinate)
            .map(|location| location.resolve(default))
            .unwrap_or(default)
    }
}

/// Selects the nearest node, connects to it and samples latency
pub struct EdgeConnector<C, S = HttpTelemetrySink> {
    connector: C,
    /// `None` when the telemetry client could not be built
    reporter: Option<LatencyReporter<S>>,
    settings: ConnectSettings,
}

#[cfg(feature = "postgres")]
impl EdgeConnector<PostgresConnector, HttpTelemetrySink> {
    /// PostgreSQL connections with HTTP telemetry
    pub fn new(settings: ConnectSettings) -> Self {
        Self::with_http_sink(PostgresConnector, settings)
    }
}

impl<C: DatabaseConnector> EdgeConnector<C, HttpTelemetrySink> {
    /// Any connector with HTTP telemetry; reporting is disabled if the
    /// HTTP client cannot be built
    pub fn with_http_sink(connector: C, settings: ConnectSettings) -> Self {
        match HttpTelemetrySink::new(&settings.telemetry) {
            Ok(sink) => Self::with_sink(connector, sink, settings),
            Err(e) => {
                warn!("Latency reporting disabled: {}", e);
                Self {
                    connector,
                    reporter: None,
                    settings,
                }
            }
        }
    }
}

impl<C, S> EdgeConnector<C, S>
where
    C: DatabaseConnector,
    S: TelemetrySink + 'static,
{
    pub fn with_sink(connector: C, sink: S, settings: ConnectSettings) -> Self {
        let reporter = LatencyReporter::new(sink, settings.telemetry.clone());
        Self {
            connector,
            reporter: Some(reporter),
            settings,
        }
    }

    pub fn settings(&self) -> &ConnectSettings {
        &self.settings
    }

    pub fn reports_latency(&self) -> bool {
        self.reporter.is_some()
    }

    /// Open a connection to the node nearest the client
    ///
    /// Option and registry errors surface before any connection attempt.
    /// Latency reporting never fails the call.
    pub async fn connect(&self, options: ConnectOptions) -> Result<C::Client> {
        let location = options.resolve_location(self.settings.default_location);
        let ConnectOptions {
            source,
            request,
            config,
            sample_rate,
            ..
        } = options;

        let (nodes, lookup) = match source {
            NodeSource::Environment(lookup) => {
                let nodes = load_nodes(lookup.as_ref())?.into_inner();
                (nodes, Some(lookup))
            }
            NodeSource::Nodes(nodes) if nodes.is_empty() => {
                return Err(ConfigurationError::NoNodes.into());
            }
            NodeSource::Nodes(nodes) => (nodes, None),
        };

        let node = closest(&nodes, location)?;
        info!(
            "Connecting to node {} ({}:{}) for client at {}",
            node.label(),
            node.connection.host,
            node.connection.port,
            location
        );

        let connection_config = build_connection_config(node, config.as_ref());
        let mut client = self.connector.connect(&connection_config).await?;

        let (Some(lookup), Some(reporter)) = (lookup, &self.reporter) else {
            return Ok(client);
        };

        let rate = SamplingRate::new(sample_rate.unwrap_or(self.settings.sample_rate));
        if !rate.decide() {
            return Ok(client);
        }

        match resolve_endpoint(lookup.as_ref(), &self.settings.telemetry) {
            Some(endpoint) => {
                reporter
                    .measure_and_report(&mut client, node, location, request.as_ref(), &endpoint)
                    .await;
            }
            None => debug!("No latency endpoint configured, skipping measurement"),
        }

        Ok(client)
    }
}

/// Connect with default settings, PostgreSQL and HTTP telemetry
#[cfg(feature = "postgres")]
pub async fn connect(options: ConnectOptions) -> Result<PostgresClient> {
    EdgeConnector::new(ConnectSettings::default())
        .connect(options)
        .await
}
