//! External identifiers for sensors and for the logger itself.
//!
//! Identifiers come from reading the raw bytes as a little-endian integer
//! and printing it in hex. For a ROM code that puts the CRC byte first and
//! the family code last, so a sensor identifier is the last two digits
//! (family) and the twelve digits before them (serial, most significant
//! first), e.g. `28-00000728e7b0`. Deployed dashboards key on this exact
//! form.

use alloc::format;
use alloc::string::String;
use core::fmt;
use core::str::FromStr;

use crate::error::{Error, Result};
use crate::onewire::{Address, crc8};

/// `<family>-<serial>` name of a sensor, derived from its bus address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SensorIdentifier(String);

impl SensorIdentifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SensorIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Address> for SensorIdentifier {
    fn from(address: &Address) -> Self {
        encode_identifier(address)
    }
}

impl FromStr for SensorIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        decode_identifier(s).map(|address| encode_identifier(&address))
    }
}

/// Works on any address, whether or not its CRC byte is valid.
pub fn encode_identifier(address: &Address) -> SensorIdentifier {
    let hex = format!("{:016x}", u64::from_le_bytes(address.0));
    // hex[..2] is the CRC byte
    SensorIdentifier(format!("{}-{}", &hex[14..], &hex[2..14]))
}

/// Rebuilds the bus address behind an identifier. The CRC byte is not part
/// of the identifier and is recomputed.
pub fn decode_identifier(identifier: &str) -> Result<Address> {
    let (family, serial) = identifier
        .split_once('-')
        .ok_or(Error::InvalidIdentifier)?;
    if family.len() != 2 || serial.len() != 12 {
        return Err(Error::InvalidIdentifier);
    }
    if !family.bytes().chain(serial.bytes()).all(is_lower_hex_digit) {
        return Err(Error::InvalidIdentifier);
    }

    let family = u8::from_str_radix(family, 16).map_err(|_| Error::InvalidIdentifier)?;
    let serial = u64::from_str_radix(serial, 16).map_err(|_| Error::InvalidIdentifier)?;

    let mut rom = [0u8; 8];
    rom[0] = family;
    rom[1..7].copy_from_slice(&serial.to_le_bytes()[..6]);
    rom[7] = crc8(&rom[..7]);

    Ok(Address(rom))
}

fn is_lower_hex_digit(byte: u8) -> bool {
    matches!(byte, b'0'..=b'9' | b'a'..=b'f')
}

/// `0x`-prefixed hex of a little-endian hardware unique id (6 byte MAC or 8
/// byte chip id), without leading zeros.
pub fn device_identifier(unique_id: &[u8]) -> Result<String> {
    if unique_id.is_empty() || unique_id.len() > 8 {
        return Err(Error::InvalidUniqueId(unique_id.len()));
    }

    let mut bytes = [0u8; 8];
    bytes[..unique_id.len()].copy_from_slice(unique_id);

    Ok(format!("{:#x}", u64::from_le_bytes(bytes)))
}
