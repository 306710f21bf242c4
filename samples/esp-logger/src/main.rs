mod error;
mod http;
mod wifi;

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::Delay;
use esp_idf_svc::hal::gpio::{AnyIOPin, PinDriver, Pull};
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{info, warn};
use uesp_logger_embedded::{
    Ds18x20, LoggerConfig, NetworkAssociation, OpenDrainPin, SensorResult, Station,
    TelemetrySender, device_identifier,
};

use crate::http::EspHttpClient;
use crate::wifi::EspWirelessInterface;

const CONFIG: &[u8] = include_bytes!("../config.json");

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    info!("Welcome to uESP-logger");
    info!("======================");

    let config = LoggerConfig::from_json(CONFIG)?;

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    let wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs_partition))?,
        sys_loop,
    )?;
    let interface = EspWirelessInterface::new(wifi);
    let device_id = device_identifier(&interface.mac()?)?;
    info!("Device {}", device_id);

    // SAFETY: the configured pin is not claimed anywhere else
    let pin = unsafe { AnyIOPin::new(i32::from(config.esp.one_wire_pin)) };
    let mut pin = PinDriver::input_output_od(pin)?;
    pin.set_pull(Pull::Up)?;
    let bus = OpenDrainPin::new(pin)?;

    let sensors = Ds18x20::new(bus, Delay::new_default())
        .with_conversion_time(config.timings.conversion());
    let network = NetworkAssociation::new(interface, Delay::new_default(), config.network.clone())
        .with_timings(config.timings.association());
    let sender = TelemetrySender::new(EspHttpClient::new()?, &config.influxdb);

    let mut station = Station::new(sensors, network, sender, device_id, config.tags);
    let report = station.run_once();

    for sensor in report.sensors.iter() {
        match &sensor.result {
            SensorResult::Delivered { outcome, .. } if outcome.is_accepted() => {}
            SensorResult::Delivered { outcome, .. } => {
                warn!("{}: {}", sensor.identifier, outcome)
            }
            SensorResult::SendFailed { error, .. } => warn!("{}: {}", sensor.identifier, error),
            SensorResult::ReadFailed(error) => warn!("{}: {}", sensor.identifier, error),
        }
    }
    info!(
        "{} of {} readings delivered",
        report.accepted(),
        report.sensors.len()
    );

    Ok(())
}
