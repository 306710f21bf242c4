mod ds18x20;
mod pin;

pub use ds18x20::*;
pub use pin::OpenDrainPin;

use alloc::vec::Vec;
use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::error::{Error, Result};

pub const SEARCH_ROM: u8 = 0xF0;
pub const MATCH_ROM: u8 = 0x55;
pub const SKIP_ROM: u8 = 0xCC;

/// 64-bit ROM code of a 1-Wire device, in bus order.
///
/// Byte 0 is the family code, bytes 1..7 the serial number (least
/// significant byte first) and byte 7 the CRC-8 of the first seven bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(pub [u8; 8]);

impl Address {
    pub fn family_code(&self) -> u8 {
        self.0[0]
    }

    pub fn serial(&self) -> [u8; 6] {
        let mut serial = [0; 6];
        serial.copy_from_slice(&self.0[1..7]);
        serial
    }

    pub fn crc(&self) -> u8 {
        self.0[7]
    }

    pub fn is_crc_valid(&self) -> bool {
        crc8(&self.0[..7]) == self.crc()
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl From<[u8; 8]> for Address {
    fn from(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Dallas/Maxim CRC-8 (x^8 + x^5 + x^4 + 1, reflected).
///
/// Running it over data followed by its own CRC yields zero.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut byte = byte;
        for _ in 0..8 {
            let mix = (crc ^ byte) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            byte >>= 1;
        }
    }
    crc
}

/// Bus master for a 1-Wire line.
///
/// Implementors only provide the three time slots; byte transfer, ROM
/// commands and device enumeration are built on top of them.
pub trait OneWire {
    /// Issues a reset pulse and returns whether any device answered with a
    /// presence pulse.
    fn reset(&mut self, delay: &mut impl DelayNs) -> Result<bool>;

    fn write_bit(&mut self, bit: bool, delay: &mut impl DelayNs) -> Result<()>;

    fn read_bit(&mut self, delay: &mut impl DelayNs) -> Result<bool>;

    fn write_byte(&mut self, byte: u8, delay: &mut impl DelayNs) -> Result<()> {
        for i in 0..8 {
            self.write_bit((byte >> i) & 0x01 == 0x01, delay)?;
        }
        Ok(())
    }

    fn read_byte(&mut self, delay: &mut impl DelayNs) -> Result<u8> {
        let mut byte = 0u8;
        for i in 0..8 {
            if self.read_bit(delay)? {
                byte |= 1 << i;
            }
        }
        Ok(byte)
    }

    fn write_bytes(&mut self, bytes: &[u8], delay: &mut impl DelayNs) -> Result<()> {
        for &byte in bytes {
            self.write_byte(byte, delay)?;
        }
        Ok(())
    }

    fn read_bytes(&mut self, buffer: &mut [u8], delay: &mut impl DelayNs) -> Result<()> {
        for byte in buffer.iter_mut() {
            *byte = self.read_byte(delay)?;
        }
        Ok(())
    }

    /// Resets the bus and addresses a single device.
    fn select(&mut self, address: &Address, delay: &mut impl DelayNs) -> Result<()> {
        if !self.reset(delay)? {
            return Err(Error::NoPresence);
        }
        self.write_byte(MATCH_ROM, delay)?;
        self.write_bytes(address.as_bytes(), delay)
    }

    /// Resets the bus and addresses every device at once.
    fn skip_rom(&mut self, delay: &mut impl DelayNs) -> Result<()> {
        if !self.reset(delay)? {
            return Err(Error::NoPresence);
        }
        self.write_byte(SKIP_ROM, delay)
    }

    /// Runs one SEARCH ROM pass, continuing from `state`.
    ///
    /// Returns `None` once every device has been enumerated or when nothing
    /// answers the reset pulse.
    fn search_next(
        &mut self,
        state: &mut SearchState,
        delay: &mut impl DelayNs,
    ) -> Result<Option<Address>> {
        if state.last_device {
            return Ok(None);
        }

        if !self.reset(delay)? {
            *state = SearchState::default();
            return Ok(None);
        }
        self.write_byte(SEARCH_ROM, delay)?;

        let mut last_zero = 0u8;
        for bit_number in 1..=64u8 {
            let id_bit = self.read_bit(delay)?;
            let cmp_bit = self.read_bit(delay)?;

            let index = usize::from((bit_number - 1) / 8);
            let mask = 1u8 << ((bit_number - 1) % 8);

            let direction = match (id_bit, cmp_bit) {
                // Every device dropped out mid-search
                (true, true) => {
                    log::warn!("1-Wire search lost all devices at bit {bit_number}");
                    state.last_device = true;
                    return Ok(None);
                }
                (false, false) => {
                    let direction = if bit_number < state.last_discrepancy {
                        state.rom[index] & mask != 0
                    } else {
                        bit_number == state.last_discrepancy
                    };
                    if !direction {
                        last_zero = bit_number;
                    }
                    direction
                }
                (id_bit, _) => id_bit,
            };

            if direction {
                state.rom[index] |= mask;
            } else {
                state.rom[index] &= !mask;
            }
            self.write_bit(direction, delay)?;
        }

        state.last_discrepancy = last_zero;
        if last_zero == 0 {
            state.last_device = true;
        }

        Ok(Some(Address(state.rom)))
    }

    /// Enumerates every device on the bus in search order.
    ///
    /// Addresses are returned as read; CRC validation is left to the caller.
    fn search(&mut self, delay: &mut impl DelayNs) -> Result<Vec<Address>> {
        let mut state = SearchState::default();
        let mut devices = Vec::new();
        while let Some(address) = self.search_next(&mut state, delay)? {
            devices.push(address);
        }
        Ok(devices)
    }
}

/// Progress of a SEARCH ROM enumeration between passes.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    rom: [u8; 8],
    last_discrepancy: u8,
    last_device: bool,
}

/// Temperature sensors sharing one bus, as seen by the station.
pub trait TemperatureBus {
    /// Lists the temperature sensors currently on the bus. An empty bus
    /// yields an empty list.
    fn scan(&mut self) -> Result<Vec<Address>>;

    /// Broadcasts a conversion command to every sensor without waiting.
    fn start_conversion(&mut self) -> Result<()>;

    /// Blocks for the conversion time.
    fn wait_for_conversion(&mut self);

    fn read_temperature(&mut self, address: &Address) -> Result<f32>;
}
