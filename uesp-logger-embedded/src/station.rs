use alloc::string::String;
use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;

use crate::error::Error;
use crate::identifier::{SensorIdentifier, encode_identifier};
use crate::line_protocol::{LineProtocolBuilder, MetricLine, TagSet};
use crate::network::{NetworkAssociation, WirelessInterface};
use crate::onewire::{Address, TemperatureBus};
use crate::telemetry::{DeliveryOutcome, HttpClient, TelemetrySender};

pub const MEASUREMENT: &str = "temp";
pub const TEMPERATURE_FIELD: &str = "temp";
pub const SENSOR_TAG: &str = "sensor";
pub const DEVICE_TAG: &str = "esp_uid";

#[derive(Debug, Clone, PartialEq)]
pub enum SensorResult {
    ReadFailed(Error),
    Delivered {
        temperature: f32,
        outcome: DeliveryOutcome,
    },
    SendFailed {
        temperature: f32,
        error: Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorReport {
    pub address: Address,
    pub identifier: SensorIdentifier,
    pub result: SensorResult,
}

impl SensorReport {
    pub fn temperature(&self) -> Option<f32> {
        match self.result {
            SensorResult::Delivered { temperature, .. }
            | SensorResult::SendFailed { temperature, .. } => Some(temperature),
            SensorResult::ReadFailed(_) => None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(
            self.result,
            SensorResult::Delivered { outcome, .. } if outcome.is_accepted()
        )
    }
}

/// What happened to every sensor during one pass, in scan order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    /// Failed association attempts before the pass could start
    pub association_retries: u32,
    pub sensors: Vec<SensorReport>,
}

impl PassReport {
    pub fn accepted(&self) -> usize {
        self.sensors.iter().filter(|report| report.is_accepted()).count()
    }

    pub fn failed(&self) -> usize {
        self.sensors.len() - self.accepted()
    }
}

/// One logger: a sensor bus, the wireless link and the database it writes
/// to.
pub struct Station<B, W, D, H>
where
    B: TemperatureBus,
    W: WirelessInterface,
    D: DelayNs,
    H: HttpClient,
{
    sensors: B,
    network: NetworkAssociation<W, D>,
    sender: TelemetrySender<H>,
    device_id: String,
    tags: TagSet,
}

impl<B, W, D, H> Station<B, W, D, H>
where
    B: TemperatureBus,
    W: WirelessInterface,
    D: DelayNs,
    H: HttpClient,
{
    pub fn new(
        sensors: B,
        network: NetworkAssociation<W, D>,
        sender: TelemetrySender<H>,
        device_id: impl Into<String>,
        tags: TagSet,
    ) -> Self {
        Self {
            sensors,
            network,
            sender,
            device_id: device_id.into(),
            tags,
        }
    }

    pub fn sensors(&self) -> &B {
        &self.sensors
    }

    pub fn network(&self) -> &NetworkAssociation<W, D> {
        &self.network
    }

    pub fn sender(&self) -> &TelemetrySender<H> {
        &self.sender
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Associates, then reads every sensor once and sends each reading.
    /// Sensors are handled one after another in scan order; a failure only
    /// affects its own sensor.
    pub fn run_once(&mut self) -> PassReport {
        let mut report = PassReport {
            association_retries: self.network.ensure_associated(),
            sensors: Vec::new(),
        };

        log::info!("Tags");
        for (key, value) in self.tags.iter() {
            log::info!("{}: {}", key, value);
        }

        let addresses = match self.sensors.scan() {
            Ok(addresses) => addresses,
            Err(e) => {
                log::error!("Bus scan failed: {}", e);
                return report;
            }
        };
        log::info!("Found {} devices.", addresses.len());
        if addresses.is_empty() {
            return report;
        }

        if let Err(e) = self.sensors.start_conversion() {
            log::error!("Failed to start conversion: {}", e);
            report.sensors = addresses
                .into_iter()
                .map(|address| SensorReport {
                    identifier: encode_identifier(&address),
                    address,
                    result: SensorResult::ReadFailed(e.clone()),
                })
                .collect();
            return report;
        }
        self.sensors.wait_for_conversion();

        log::info!("Temperatures:");
        for address in addresses {
            let identifier = encode_identifier(&address);
            let result = self.process(&address, &identifier);
            report.sensors.push(SensorReport {
                address,
                identifier,
                result,
            });
        }

        log::info!(
            "Pass complete: {} accepted, {} failed",
            report.accepted(),
            report.failed()
        );

        report
    }

    /// The line a reading of `identifier` is sent as.
    pub fn metric_line(&self, identifier: &SensorIdentifier, temperature: f32) -> MetricLine {
        LineProtocolBuilder::new(MEASUREMENT)
            .tag(SENSOR_TAG, identifier.as_str())
            .tag(DEVICE_TAG, &self.device_id)
            .tags(&self.tags)
            .field(TEMPERATURE_FIELD, temperature)
    }

    fn process(&mut self, address: &Address, identifier: &SensorIdentifier) -> SensorResult {
        let temperature = match self.sensors.read_temperature(address) {
            Ok(temperature) => temperature,
            Err(e) => {
                log::warn!("{}: read failed: {}", identifier, e);
                return SensorResult::ReadFailed(e);
            }
        };
        log::info!("{}: {}", identifier, temperature);

        let line = self.metric_line(identifier, temperature);
        match self.sender.send(&line) {
            Ok(outcome) => SensorResult::Delivered {
                temperature,
                outcome,
            },
            Err(error) => SensorResult::SendFailed { temperature, error },
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;
    use crate::config::{InfluxConfig, NetworkConfig};
    use crate::mock::{MockHttpClient, MockInterface, NoopDelay, SimDevice, SimulatedBus};
    use crate::onewire::{ConversionState, Ds18x20};

    type TestStation = Station<Ds18x20<SimulatedBus, NoopDelay>, MockInterface, NoopDelay, MockHttpClient>;

    fn station(devices: Vec<SimDevice>, client: MockHttpClient) -> TestStation {
        station_on(SimulatedBus::new(devices), client)
    }

    fn station_on(bus: SimulatedBus, client: MockHttpClient) -> TestStation {
        let network = NetworkAssociation::new(
            MockInterface::associated(),
            NoopDelay,
            NetworkConfig {
                ssid: "home".to_string(),
                password: "secret".to_string(),
            },
        );
        let influxdb = InfluxConfig {
            host: "10.0.0.2".to_string(),
            port: 8086,
            database: "sensors".to_string(),
            username: "logger".to_string(),
            password: "hunter2".to_string(),
        };

        Station::new(
            Ds18x20::new(bus, NoopDelay),
            network,
            TelemetrySender::new(client, &influxdb),
            "0xabc123",
            TagSet::new().with_tag("location", "my room"),
        )
    }

    #[test]
    fn test_metric_line_tag_order() {
        let station = station(vec![], MockHttpClient::new());
        let identifier: SensorIdentifier = "28-00000728e7b0".parse().unwrap();

        assert_eq!(
            station.metric_line(&identifier, 21.6).as_str(),
            r"temp,sensor=28-00000728e7b0,esp_uid=0xabc123,location=my\ room temp=21.6"
        );
    }

    #[test]
    fn test_run_once_sends_every_sensor() {
        let first = SimDevice::ds18b20([0x01, 0, 0, 0, 0, 0], 21.5);
        let second = SimDevice::ds18b20([0x02, 0, 0, 0, 0, 0], 19.0);
        let client = MockHttpClient::new();
        let mut station = station(vec![first, second], client.clone());

        let report = station.run_once();

        assert_eq!(report.sensors.len(), 2);
        assert_eq!(report.accepted(), 2);
        assert_eq!(client.requests().len(), 2);
        assert_eq!(station.sensors().bus().conversions(), 1);
    }

    #[test]
    fn test_run_once_empty_bus() {
        let client = MockHttpClient::new();
        let mut station = station(vec![], client.clone());

        let report = station.run_once();

        assert!(report.sensors.is_empty());
        assert!(client.requests().is_empty());
        assert_eq!(station.sensors().bus().conversions(), 0);
    }

    #[test]
    fn test_read_failure_skips_sensor() {
        let good = SimDevice::ds18b20([0x01, 0, 0, 0, 0, 0], 21.5);
        let bad = SimDevice::ds18b20([0x02, 0, 0, 0, 0, 0], 19.0).with_corrupted_scratchpad();
        let client = MockHttpClient::new();
        let mut station = station(vec![good, bad], client.clone());

        let report = station.run_once();

        assert_eq!(report.sensors.len(), 2);
        assert_eq!(report.accepted(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.sensors.iter().any(|sensor| matches!(
            sensor.result,
            SensorResult::ReadFailed(Error::ScratchpadCrcMismatch)
        )));
        assert_eq!(client.requests().len(), 1);
    }

    #[test]
    fn test_conversion_start_failure_fails_every_sensor() {
        let first = SimDevice::ds18b20([0x01, 0, 0, 0, 0, 0], 21.5);
        let second = SimDevice::ds18b20([0x02, 0, 0, 0, 0, 0], 19.0);
        // one reset per device found during the scan, then the line sticks
        let bus = SimulatedBus::new(vec![first.clone(), second.clone()]).holding_line_low_after(2);
        let client = MockHttpClient::new();
        let mut station = station_on(bus, client.clone());

        let report = station.run_once();

        assert_eq!(report.sensors.len(), 2);
        assert_eq!(report.failed(), 2);
        for sensor in report.sensors.iter() {
            assert_eq!(sensor.result, SensorResult::ReadFailed(Error::BusHeldLow));
            assert_eq!(sensor.identifier, encode_identifier(&sensor.address));
        }

        let mut addresses: Vec<_> = report.sensors.iter().map(|sensor| sensor.address).collect();
        addresses.sort_by_key(|address| address.0);
        assert_eq!(addresses, vec![first.address, second.address]);

        assert!(client.requests().is_empty());
        assert_eq!(station.sensors().bus().conversions(), 0);
        assert_eq!(station.sensors().state(), ConversionState::Idle);
    }

    #[test]
    fn test_send_failure_continues() {
        let first = SimDevice::ds18b20([0x01, 0, 0, 0, 0, 0], 21.5);
        let second = SimDevice::ds18b20([0x02, 0, 0, 0, 0, 0], 19.0);
        let client = MockHttpClient::new().with_failures(&[true]);
        let mut station = station(vec![first, second], client.clone());

        let report = station.run_once();

        assert!(matches!(
            report.sensors[0].result,
            SensorResult::SendFailed {
                error: Error::TransportError,
                ..
            }
        ));
        assert!(report.sensors[0].temperature().is_some());
        assert!(report.sensors[1].is_accepted());
        assert_eq!(client.requests().len(), 2);
    }

    #[test]
    fn test_rejected_outcomes_reported() {
        let device = SimDevice::ds18b20([0x01, 0, 0, 0, 0, 0], 21.5);
        let client = MockHttpClient::with_statuses(&[401]);
        let mut station = station(vec![device], client);

        let report = station.run_once();

        assert_eq!(
            report.sensors[0].result,
            SensorResult::Delivered {
                temperature: 21.5,
                outcome: DeliveryOutcome::Unauthorized,
            }
        );
        assert_eq!(report.failed(), 1);
    }
}
