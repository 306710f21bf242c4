use uesp_logger_embedded::mock::{
    MockHttpClient, MockInterface, RecordingDelay, SimDevice, SimulatedBus,
};
use uesp_logger_embedded::{Ds18x20, LoggerConfig, NetworkAssociation, Station, TelemetrySender};

pub const CONFIG: &str = r#"{
    "network": { "ssid": "home", "password": "secret" },
    "influxdb": {
        "host": "192.168.1.10",
        "port": 8086,
        "database": "sensors",
        "username": "logger",
        "password": "hunter2"
    },
    "esp": { "1wire_pin": 4 },
    "tags": { "location": "my room", "site": "north,2" }
}"#;

pub const DEVICE_ID: &str = "0xabc123";

pub type SimStation =
    Station<Ds18x20<SimulatedBus, RecordingDelay>, MockInterface, RecordingDelay, MockHttpClient>;

pub struct MockStation {
    pub station: SimStation,
    pub interface: MockInterface,
    pub client: MockHttpClient,
    pub delay: RecordingDelay,
}

impl MockStation {
    pub fn new(devices: Vec<SimDevice>, interface: MockInterface, client: MockHttpClient) -> Self {
        let config = LoggerConfig::from_json(CONFIG.as_bytes()).unwrap();
        let delay = RecordingDelay::new();

        let sensors = Ds18x20::new(SimulatedBus::new(devices), delay.clone())
            .with_conversion_time(config.timings.conversion());
        let network = NetworkAssociation::new(interface.clone(), delay.clone(), config.network)
            .with_timings(config.timings.association());
        let sender = TelemetrySender::new(client.clone(), &config.influxdb);

        Self {
            station: Station::new(sensors, network, sender, DEVICE_ID, config.tags),
            interface,
            client,
            delay,
        }
    }

    pub fn associated(devices: Vec<SimDevice>) -> Self {
        Self::new(devices, MockInterface::associated(), MockHttpClient::new())
    }
}
