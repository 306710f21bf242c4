//! Device configuration, read once at startup from `config.json`.

use alloc::format;
use alloc::string::String;
use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::line_protocol::TagSet;
use crate::network::{AssociationTimings, DEFAULT_CONNECT_WAIT, DEFAULT_RETRY_BACKOFF, DEFAULT_SETTLE_TIME};
use crate::onewire::DEFAULT_CONVERSION_TIME;
use crate::station::{DEVICE_TAG, SENSOR_TAG};

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub ssid: String,
    pub password: String,
}

impl core::fmt::Debug for NetworkConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NetworkConfig")
            .field("ssid", &self.ssid)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluxConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl InfluxConfig {
    /// Credentials travel in the query string, as InfluxDB 1.x expects.
    pub fn write_url(&self) -> String {
        format!(
            "http://{}:{}/write?db={}&u={}&p={}",
            self.host, self.port, self.database, self.username, self.password
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EspConfig {
    #[serde(rename = "1wire_pin")]
    pub one_wire_pin: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingsConfig {
    pub settle_secs: u64,
    pub connect_wait_secs: u64,
    pub retry_backoff_secs: u64,
    pub conversion_ms: u64,
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            settle_secs: DEFAULT_SETTLE_TIME.as_secs(),
            connect_wait_secs: DEFAULT_CONNECT_WAIT.as_secs(),
            retry_backoff_secs: DEFAULT_RETRY_BACKOFF.as_secs(),
            conversion_ms: DEFAULT_CONVERSION_TIME.as_millis() as u64,
        }
    }
}

impl TimingsConfig {
    pub fn association(&self) -> AssociationTimings {
        AssociationTimings {
            settle: Duration::from_secs(self.settle_secs),
            connect_wait: Duration::from_secs(self.connect_wait_secs),
            retry_backoff: Duration::from_secs(self.retry_backoff_secs),
        }
    }

    pub fn conversion(&self) -> Duration {
        Duration::from_millis(self.conversion_ms)
    }

    /// Every wait must fit the millisecond range of `DelayNs::delay_ms`.
    fn validate(&self) -> Result<()> {
        let waits = [
            ("settle_secs", self.settle_secs.saturating_mul(1000)),
            ("connect_wait_secs", self.connect_wait_secs.saturating_mul(1000)),
            ("retry_backoff_secs", self.retry_backoff_secs.saturating_mul(1000)),
            ("conversion_ms", self.conversion_ms),
        ];

        for (name, millis) in waits {
            if millis > u64::from(u32::MAX) {
                return Err(Error::InvalidConfig(format!("timings.{name} is too long")));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub network: NetworkConfig,
    pub influxdb: InfluxConfig,
    pub esp: EspConfig,
    pub tags: TagSet,
    #[serde(default)]
    pub timings: TimingsConfig,
}

impl LoggerConfig {
    /// Parses and validates a configuration document. Nothing is defaulted
    /// except the optional `timings` section.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let config: LoggerConfig = serde_json::from_slice(bytes)
            .map_err(|e| Error::InvalidConfig(format!("{e}")))?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.network.ssid.is_empty() {
            return Err(invalid("network.ssid is empty"));
        }
        if self.influxdb.host.is_empty() {
            return Err(invalid("influxdb.host is empty"));
        }
        if self.influxdb.port == 0 {
            return Err(invalid("influxdb.port must not be 0"));
        }
        if self.influxdb.database.is_empty() {
            return Err(invalid("influxdb.database is empty"));
        }

        for (index, (key, value)) in self.tags.iter().enumerate() {
            if key.is_empty() {
                return Err(invalid("tags contain an empty key"));
            }
            if value.is_empty() {
                return Err(Error::InvalidConfig(format!("tag {key} has an empty value")));
            }
            if key == SENSOR_TAG || key == DEVICE_TAG {
                return Err(Error::InvalidConfig(format!("tag key {key} is reserved")));
            }
            if self.tags.keys().take(index).any(|previous| previous == key) {
                return Err(Error::InvalidConfig(format!("tag key {key} is duplicated")));
            }
        }

        self.timings.validate()
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidConfig(String::from(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "network": { "ssid": "home", "password": "secret" },
        "influxdb": {
            "host": "192.168.1.10",
            "port": 8086,
            "database": "sensors",
            "username": "logger",
            "password": "hunter2"
        },
        "esp": { "1wire_pin": 4 },
        "tags": { "location": "my room", "floor": "1" }
    }"#;

    fn with(pointer: &str, value: serde_json::Value) -> Vec<u8> {
        let mut document: serde_json::Value = serde_json::from_str(CONFIG).unwrap();
        *document.pointer_mut(pointer).unwrap() = value;
        serde_json::to_vec(&document).unwrap()
    }

    fn without(section: &str, key: &str) -> Vec<u8> {
        let mut document: serde_json::Value = serde_json::from_str(CONFIG).unwrap();
        document[section].as_object_mut().unwrap().remove(key);
        serde_json::to_vec(&document).unwrap()
    }

    #[test]
    fn test_parse_config() {
        let config = LoggerConfig::from_json(CONFIG.as_bytes()).unwrap();

        assert_eq!(config.network.ssid, "home");
        assert_eq!(config.influxdb.port, 8086);
        assert_eq!(config.esp.one_wire_pin, 4);
        assert_eq!(
            config.tags.iter().collect::<Vec<_>>(),
            vec![("location", "my room"), ("floor", "1")]
        );
        assert_eq!(config.timings, TimingsConfig::default());
        assert_eq!(config.timings.association(), AssociationTimings::default());
        assert_eq!(config.timings.conversion(), DEFAULT_CONVERSION_TIME);
    }

    #[test]
    fn test_write_url() {
        let config = LoggerConfig::from_json(CONFIG.as_bytes()).unwrap();
        assert_eq!(
            config.influxdb.write_url(),
            "http://192.168.1.10:8086/write?db=sensors&u=logger&p=hunter2"
        );
    }

    #[test]
    fn test_timings_override() {
        let mut document: serde_json::Value = serde_json::from_str(CONFIG).unwrap();
        document["timings"] = serde_json::json!({ "retry_backoff_secs": 60, "conversion_ms": 800 });

        let config = LoggerConfig::from_json(&serde_json::to_vec(&document).unwrap()).unwrap();
        let timings = config.timings.association();

        assert_eq!(timings.settle, DEFAULT_SETTLE_TIME);
        assert_eq!(timings.retry_backoff, Duration::from_secs(60));
        assert_eq!(config.timings.conversion(), Duration::from_millis(800));
    }

    #[test]
    fn test_missing_keys_fail() {
        const MISSING: &[(&str, &str)] = &[
            ("network", "ssid"),
            ("network", "password"),
            ("influxdb", "host"),
            ("influxdb", "port"),
            ("influxdb", "database"),
            ("influxdb", "username"),
            ("influxdb", "password"),
            ("esp", "1wire_pin"),
        ];

        for &(section, key) in MISSING {
            let result = LoggerConfig::from_json(&without(section, key));
            assert!(
                matches!(result, Err(Error::InvalidConfig(_))),
                "{section}.{key}"
            );
        }

        let mut document: serde_json::Value = serde_json::from_str(CONFIG).unwrap();
        document.as_object_mut().unwrap().remove("tags");
        assert!(matches!(
            LoggerConfig::from_json(&serde_json::to_vec(&document).unwrap()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_values_fail() {
        let cases = [
            with("/network/ssid", serde_json::json!("")),
            with("/influxdb/host", serde_json::json!("")),
            with("/influxdb/port", serde_json::json!(0)),
            with("/influxdb/port", serde_json::json!(70000)),
            with("/influxdb/port", serde_json::json!("8086")),
            with("/influxdb/database", serde_json::json!("")),
            with("/tags", serde_json::json!({ "": "x" })),
            with("/tags", serde_json::json!({ "location": 3 })),
            with("/tags", serde_json::json!({ "location": "" })),
        ];

        for case in cases {
            assert!(
                matches!(LoggerConfig::from_json(&case), Err(Error::InvalidConfig(_))),
                "{}",
                String::from_utf8_lossy(&case)
            );
        }
    }

    #[test]
    fn test_empty_tag_value_fails() {
        let bytes = with("/tags", serde_json::json!({ "floor": "1", "location": "" }));
        assert_eq!(
            LoggerConfig::from_json(&bytes),
            Err(Error::InvalidConfig(String::from("tag location has an empty value")))
        );
    }

    #[test]
    fn test_oversized_timings_fail() {
        let cases = [
            ("conversion_ms", serde_json::json!(4_294_967_296u64)),
            ("retry_backoff_secs", serde_json::json!(4_294_968)),
            ("settle_secs", serde_json::json!(u64::MAX)),
            ("connect_wait_secs", serde_json::json!(4_294_968)),
        ];

        for (name, value) in cases {
            let mut document: serde_json::Value = serde_json::from_str(CONFIG).unwrap();
            document["timings"] = serde_json::json!({ name: value });

            assert_eq!(
                LoggerConfig::from_json(&serde_json::to_vec(&document).unwrap()),
                Err(Error::InvalidConfig(format!("timings.{name} is too long"))),
                "{name}"
            );
        }
    }

    #[test]
    fn test_longest_timings_accepted() {
        let mut document: serde_json::Value = serde_json::from_str(CONFIG).unwrap();
        document["timings"] = serde_json::json!({
            "conversion_ms": u32::MAX,
            "retry_backoff_secs": u32::MAX / 1000,
        });

        let config = LoggerConfig::from_json(&serde_json::to_vec(&document).unwrap()).unwrap();
        assert_eq!(config.timings.conversion_ms, u64::from(u32::MAX));
    }

    #[test]
    fn test_reserved_tag_keys_fail() {
        for key in [SENSOR_TAG, DEVICE_TAG] {
            let bytes = with("/tags", serde_json::json!({ "location": "garage", key: "x" }));
            assert_eq!(
                LoggerConfig::from_json(&bytes),
                Err(Error::InvalidConfig(format!("tag key {key} is reserved")))
            );
        }
    }

    #[test]
    fn test_duplicate_tag_keys_fail() {
        let bytes = br#"{
            "network": { "ssid": "home", "password": "secret" },
            "influxdb": { "host": "h", "port": 8086, "database": "d", "username": "u", "password": "p" },
            "esp": { "1wire_pin": 4 },
            "tags": { "location": "garage", "location": "attic" }
        }"#;

        assert_eq!(
            LoggerConfig::from_json(bytes),
            Err(Error::InvalidConfig(String::from("tag key location is duplicated")))
        );
    }

    #[test]
    fn test_password_not_in_debug() {
        let config = LoggerConfig::from_json(CONFIG.as_bytes()).unwrap();
        let debug = format!("{:?}", config.network);

        assert!(debug.contains("home"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_empty_tags_allowed() {
        let bytes = with("/tags", serde_json::json!({}));
        let config = LoggerConfig::from_json(&bytes).unwrap();
        assert!(config.tags.is_empty());
    }
}
