use alloc::string::String;

use crate::config::InfluxConfig;
use crate::error::{Error, Result};
use crate::line_protocol::MetricLine;

use super::{DeliveryOutcome, HttpClient, HttpResponse};

pub const CONTENT_TYPE: &str = "application/octet-stream";

/// Writes metric lines to an InfluxDB 1.x `/write` endpoint, one request
/// per line and without retries.
pub struct TelemetrySender<H>
where
    H: HttpClient,
{
    client: H,
    url: String,
}

impl<H> TelemetrySender<H>
where
    H: HttpClient,
{
    pub fn new(client: H, influxdb: &InfluxConfig) -> Self {
        Self {
            client,
            url: influxdb.write_url(),
        }
    }

    pub fn write_url(&self) -> &str {
        &self.url
    }

    pub fn client(&self) -> &H {
        &self.client
    }

    /// Sends one line and classifies the response status. Only a transport
    /// failure is an error; every answered request yields an outcome.
    pub fn send(&mut self, line: &MetricLine) -> Result<DeliveryOutcome> {
        let response = self
            .client
            .post(&self.url, &[("Content-Type", CONTENT_TYPE)], line.as_bytes())
            .map_err(|e| {
                log::error!("Failed to send metric line: {:?}", e);
                Error::TransportError
            })?;

        let outcome = DeliveryOutcome::from_status(response.status());
        drop(response);

        match outcome {
            DeliveryOutcome::Accepted => log::info!("{}", outcome),
            _ => log::warn!("{}", outcome),
        }

        Ok(outcome)
    }
}
