use esp_idf_svc::wifi::*;
use log::info;
use uesp_logger_embedded::WirelessInterface;

use crate::error::{LoggerError, Result};

/// Station-mode WiFi driven by the association loop.
pub struct EspWirelessInterface {
    wifi: BlockingWifi<EspWifi<'static>>,
}

impl EspWirelessInterface {
    pub fn new(wifi: BlockingWifi<EspWifi<'static>>) -> Self {
        Self { wifi }
    }

    pub fn mac(&self) -> Result<[u8; 6]> {
        Ok(self.wifi.wifi().sta_netif().get_mac()?)
    }
}

impl WirelessInterface for EspWirelessInterface {
    type Error = LoggerError;

    fn is_active(&self) -> bool {
        self.wifi.is_started().unwrap_or(false)
    }

    fn activate(&mut self) -> Result<()> {
        self.wifi
            .set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
        self.wifi.start()?;
        info!("WiFi started");
        Ok(())
    }

    fn connect(&mut self, ssid: &str, password: &str) -> Result<()> {
        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        self.wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| LoggerError::Wifi("Invalid SSID".to_string()))?,
            password: password
                .try_into()
                .map_err(|_| LoggerError::Wifi("Invalid password".to_string()))?,
            auth_method,
            ..Default::default()
        }))?;

        self.wifi.connect()?;
        self.wifi.wait_netif_up()?;
        info!("WiFi netif up");

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    fn visible_networks(&mut self) -> Option<Vec<String>> {
        match self.wifi.scan() {
            Ok(access_points) => Some(
                access_points
                    .into_iter()
                    .map(|access_point| access_point.ssid.to_string())
                    .collect(),
            ),
            Err(e) => {
                info!("WiFi scan failed: {}", e);
                None
            }
        }
    }
}
