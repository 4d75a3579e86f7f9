//! Latency sampling and measurement

use chrono::Utc;
use pgedge_shared::{
    Coordinate, DatabaseNode, DeliveryMode, LatencySample, RequestContext, SampleLocation,
    SampleMeta, TelemetrySettings,
};
use rand::Rng;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{TelemetryError, TelemetrySink};
use crate::connections::DatabaseClient;

/// Server-time query timed by the reporter
pub const SERVER_TIME_QUERY: &str = "SELECT NOW()";

/// Probability that a connect call measures latency
///
/// `>= 1` always samples, `<= 0` (or NaN) never does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingRate(f64);

impl SamplingRate {
    pub const NEVER: SamplingRate = SamplingRate(0.0);
    pub const ALWAYS: SamplingRate = SamplingRate(1.0);

    pub fn new(rate: f64) -> Self {
        Self(rate)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Decide using the supplied random source
    pub fn decide_with<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        let rate = self.0;
        if rate.is_nan() || rate <= 0.0 {
            false
        } else if rate >= 1.0 {
            true
        } else {
            rng.gen::<f64>() < rate
        }
    }

    /// Decide using the thread-local generator
    pub fn decide(&self) -> bool {
        self.decide_with(&mut rand::thread_rng())
    }
}

/// Measures query latency on a fresh connection and ships the sample
pub struct LatencyReporter<S> {
    sink: Arc<S>,
    settings: TelemetrySettings,
}

impl<S: TelemetrySink + 'static> LatencyReporter<S> {
    pub fn new(sink: S, settings: TelemetrySettings) -> Self {
        Self {
            sink: Arc::new(sink),
            settings,
        }
    }

    pub fn settings(&self) -> &TelemetrySettings {
        &self.settings
    }

    fn trace_id(&self, request: Option<&RequestContext>) -> Option<String> {
        let request = request?;
        self.settings
            .trace_headers
            .iter()
            .find_map(|name| request.header(name))
            .map(str::to_string)
    }

    /// Time one server-time round trip and build the sample
    pub async fn measure<C: DatabaseClient>(
        &self,
        client: &mut C,
        node: &DatabaseNode,
        location: Coordinate,
        request: Option<&RequestContext>,
    ) -> Result<LatencySample, TelemetryError> {
        let time = Utc::now();
        let start = Instant::now();
        let rows = client.query_timestamps(SERVER_TIME_QUERY).await?;
        let value = start.elapsed().as_secs_f64();

        let result = match rows.as_slice() {
            [server_time] => Some(*server_time),
            _ => None,
        };

        debug!(
            "Server time query against {} took {:.3} ms",
            node.label(),
            value * 1000.0
        );

        Ok(LatencySample {
            node_id: node.id.clone(),
            value,
            time,
            location: SampleLocation::new(location, request.and_then(|r| r.geo.as_ref())),
            source: self.settings.source.clone(),
            meta: SampleMeta {
                query: SERVER_TIME_QUERY.to_string(),
                result,
                trace_id: self.trace_id(request),
            },
        })
    }

    /// Hand a sample to the sink; failures are logged, never returned
    pub async fn report(&self, endpoint: &str, sample: LatencySample) {
        let sink = Arc::clone(&self.sink);
        let endpoint = endpoint.to_string();
        let delivery = async move {
            match sink.deliver(&endpoint, &[sample]).await {
                Ok(()) => debug!("Latency sample delivered to {}", endpoint),
                Err(e) => warn!("Failed to deliver latency sample to {}: {}", endpoint, e),
            }
        };

        match (self.settings.delivery, tokio::runtime::Handle::try_current()) {
            (DeliveryMode::Detached, Ok(handle)) => {
                handle.spawn(delivery);
            }
            _ => delivery.await,
        }
    }

    /// Measure and report, containing every failure
    pub async fn measure_and_report<C: DatabaseClient>(
        &self,
        client: &mut C,
        node: &DatabaseNode,
        location: Coordinate,
        request: Option<&RequestContext>,
        endpoint: &str,
    ) {
        match self.measure(client, node, location, request).await {
            Ok(sample) => {
                info!(
                    "Measured {:.3} ms round trip to node {}",
                    sample.value * 1000.0,
                    node.label()
                );
                self.report(endpoint, sample).await;
            }
            Err(e) => warn!("Latency measurement against {} failed: {}", node.label(), e),
        }
    }
}
