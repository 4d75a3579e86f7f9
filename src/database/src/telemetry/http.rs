//! HTTP POST delivery of latency samples

use async_trait::async_trait;
use pgedge_shared::{LatencySample, TelemetrySettings};
use reqwest::Client;
use tracing::debug;

use super::{TelemetryError, TelemetrySink};

/// Posts sample batches as JSON
#[derive(Clone)]
pub struct HttpTelemetrySink {
    client: Client,
}

impl HttpTelemetrySink {
    pub fn new(settings: &TelemetrySettings) -> Result<Self, TelemetryError> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .user_agent(&settings.user_agent)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl TelemetrySink for HttpTelemetrySink {
    async fn deliver(&self, endpoint: &str, batch: &[LatencySample]) -> Result<(), TelemetryError> {
        debug!("Posting {} latency sample(s) to {}", batch.len(), endpoint);

        let response = self
            .client
            .post(endpoint)
            .header("Content-Type", "application/json")
            .json(batch)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("Latency samples accepted by {}", endpoint);
            Ok(())
        } else {
            Err(TelemetryError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}
