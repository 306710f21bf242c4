use alloc::vec::Vec;
use core::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::error::{Error, Result};

use super::{Address, OneWire, TemperatureBus, crc8};

pub const FAMILY_DS18S20: u8 = 0x10;
pub const FAMILY_DS1822: u8 = 0x22;
pub const FAMILY_DS18B20: u8 = 0x28;

pub const CONVERT_T: u8 = 0x44;
pub const READ_SCRATCHPAD: u8 = 0xBE;

/// 750 ms is the datasheet maximum at 12-bit resolution; the extra margin
/// covers parasite-powered sensors.
pub const DEFAULT_CONVERSION_TIME: Duration = Duration::from_millis(1000);

const SCRATCHPAD_LEN: usize = 9;

pub fn is_temperature_family(family: u8) -> bool {
    matches!(family, FAMILY_DS18S20 | FAMILY_DS1822 | FAMILY_DS18B20)
}

/// Where the bus is in its convert-then-read cycle.
///
/// `ReadReady` holds while every sensor from the same conversion is read,
/// since the driver cannot know which read is the last one. The next
/// `scan` returns the bus to `Idle`, and a new `start_conversion` is
/// accepted straight from `ReadReady`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionState {
    Idle,
    Converting,
    ReadReady,
}

/// DS18x20 temperature sensors on one bus.
pub struct Ds18x20<W, D>
where
    W: OneWire,
    D: DelayNs,
{
    bus: W,
    delay: D,
    state: ConversionState,
    conversion_time: Duration,
}

impl<W, D> Ds18x20<W, D>
where
    W: OneWire,
    D: DelayNs,
{
    pub fn new(bus: W, delay: D) -> Self {
        Self {
            bus,
            delay,
            state: ConversionState::Idle,
            conversion_time: DEFAULT_CONVERSION_TIME,
        }
    }

    pub fn with_conversion_time(mut self, conversion_time: Duration) -> Self {
        self.conversion_time = conversion_time;
        self
    }

    pub fn state(&self) -> ConversionState {
        self.state
    }

    pub fn conversion_time(&self) -> Duration {
        self.conversion_time
    }

    pub fn bus(&self) -> &W {
        &self.bus
    }

    pub fn release(self) -> (W, D) {
        (self.bus, self.delay)
    }

    fn read_scratchpad(&mut self, address: &Address) -> Result<[u8; SCRATCHPAD_LEN]> {
        self.bus.select(address, &mut self.delay)?;
        self.bus.write_byte(READ_SCRATCHPAD, &mut self.delay)?;

        let mut scratchpad = [0u8; SCRATCHPAD_LEN];
        self.bus.read_bytes(&mut scratchpad, &mut self.delay)?;

        if scratchpad.iter().all(|&byte| byte == 0xFF) {
            return Err(Error::DeviceNotResponding);
        }
        if crc8(&scratchpad) != 0 {
            return Err(Error::ScratchpadCrcMismatch);
        }

        Ok(scratchpad)
    }
}

impl<W, D> TemperatureBus for Ds18x20<W, D>
where
    W: OneWire,
    D: DelayNs,
{
    fn scan(&mut self) -> Result<Vec<Address>> {
        self.state = ConversionState::Idle;

        let mut sensors = Vec::new();
        for address in self.bus.search(&mut self.delay)? {
            if !address.is_crc_valid() {
                log::warn!("Ignoring {address}: address CRC mismatch");
                continue;
            }
            if !is_temperature_family(address.family_code()) {
                log::debug!(
                    "Ignoring {address}: family 0x{:02x} is not a temperature sensor",
                    address.family_code()
                );
                continue;
            }
            sensors.push(address);
        }

        Ok(sensors)
    }

    fn start_conversion(&mut self) -> Result<()> {
        if self.state == ConversionState::Converting {
            return Err(Error::ConversionInProgress);
        }

        self.bus.skip_rom(&mut self.delay)?;
        self.bus.write_byte(CONVERT_T, &mut self.delay)?;
        self.state = ConversionState::Converting;

        Ok(())
    }

    fn wait_for_conversion(&mut self) {
        self.delay
            .delay_ms(u32::try_from(self.conversion_time.as_millis()).unwrap_or(u32::MAX));
        if self.state == ConversionState::Converting {
            self.state = ConversionState::ReadReady;
        }
    }

    fn read_temperature(&mut self, address: &Address) -> Result<f32> {
        let scratchpad = self.read_scratchpad(address)?;
        decode_temperature(address.family_code(), &scratchpad)
    }
}

/// Converts a CRC-checked scratchpad to degrees Celsius.
pub fn decode_temperature(family: u8, scratchpad: &[u8; 9]) -> Result<f32> {
    let raw = i16::from_le_bytes([scratchpad[0], scratchpad[1]]);

    match family {
        FAMILY_DS18S20 => {
            // 0.5 °C LSB, refined with COUNT_REMAIN / COUNT_PER_C
            let count_remain = f32::from(scratchpad[6]);
            let count_per_c = f32::from(scratchpad[7]);
            if count_per_c == 0.0 {
                return Ok(f32::from(raw) / 2.0);
            }
            Ok(f32::from(raw >> 1) - 0.25 + (count_per_c - count_remain) / count_per_c)
        }
        FAMILY_DS1822 | FAMILY_DS18B20 => {
            // Low bits are undefined below 12-bit resolution
            let mask: i16 = match (scratchpad[4] >> 5) & 0x03 {
                0 => !0x07,
                1 => !0x03,
                2 => !0x01,
                _ => !0x00,
            };
            Ok(f32::from(raw & mask) / 16.0)
        }
        other => Err(Error::UnsupportedFamily(other)),
    }
}
