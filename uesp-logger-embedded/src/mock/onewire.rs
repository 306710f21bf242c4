use alloc::vec;
use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;

use crate::error::{Error, Result};
use crate::onewire::{
    Address, CONVERT_T, FAMILY_DS18B20, MATCH_ROM, OneWire, READ_SCRATCHPAD, SEARCH_ROM,
    SKIP_ROM, crc8,
};

/// Power-on value of the DS18B20 temperature register (+85 °C).
const POWER_ON_RAW: i16 = 0x0550;

#[derive(Debug, Clone, PartialEq)]
pub struct SimDevice {
    pub address: Address,
    /// Temperature register after a conversion, `None` for devices without one
    pub raw_temperature: Option<i16>,
    pub converted: bool,
    pub corrupt_scratchpad: bool,
}

impl SimDevice {
    pub fn with_family(family: u8, serial: [u8; 6]) -> Self {
        let mut rom = [0u8; 8];
        rom[0] = family;
        rom[1..7].copy_from_slice(&serial);
        rom[7] = crc8(&rom[..7]);

        Self {
            address: Address(rom),
            raw_temperature: None,
            converted: false,
            corrupt_scratchpad: false,
        }
    }

    pub fn ds18b20(serial: [u8; 6], celsius: f32) -> Self {
        let mut device = Self::with_family(FAMILY_DS18B20, serial);
        device.raw_temperature = Some((celsius * 16.0) as i16);
        device
    }

    pub fn with_corrupted_address(mut self) -> Self {
        self.address.0[7] ^= 0xFF;
        self
    }

    pub fn with_corrupted_scratchpad(mut self) -> Self {
        self.corrupt_scratchpad = true;
        self
    }

    fn rom_bit(&self, index: u8) -> bool {
        self.address.0[usize::from(index / 8)] & (1 << (index % 8)) != 0
    }

    fn scratchpad(&self) -> [u8; 9] {
        let raw = match self.raw_temperature {
            Some(raw) if self.converted => raw,
            _ => POWER_ON_RAW,
        };
        let [lsb, msb] = raw.to_le_bytes();

        let mut scratchpad = [lsb, msb, 0x4B, 0x46, 0x7F, 0xFF, 0x0C, 0x10, 0x00];
        scratchpad[8] = crc8(&scratchpad[..8]);
        if self.corrupt_scratchpad {
            scratchpad[8] ^= 0x5A;
        }
        scratchpad
    }

    fn scratchpad_bit(&self, index: usize) -> bool {
        self.scratchpad()[index / 8] & (1 << (index % 8)) != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    RomCommand,
    /// Per ROM bit: id bit read, complement read, direction written
    Search { bit: u8, step: u8 },
    MatchRom { bit: u8 },
    FunctionCommand,
    Scratchpad { bit: usize },
}

/// Bit-level model of a 1-Wire bus with open-drain (wired-AND) semantics.
#[derive(Debug, Clone)]
pub struct SimulatedBus {
    devices: Vec<SimDevice>,
    selected: Vec<bool>,
    phase: Phase,
    shift: u8,
    shift_len: u8,
    resets: u32,
    conversions: u32,
    held_low_after: Option<u32>,
}

impl SimulatedBus {
    pub fn new(devices: Vec<SimDevice>) -> Self {
        let selected = vec![false; devices.len()];
        Self {
            devices,
            selected,
            phase: Phase::Idle,
            shift: 0,
            shift_len: 0,
            resets: 0,
            conversions: 0,
            held_low_after: None,
        }
    }

    /// Every reset after the first `resets` finds the data line stuck low.
    pub fn holding_line_low_after(mut self, resets: u32) -> Self {
        self.held_low_after = Some(resets);
        self
    }

    pub fn devices(&self) -> &[SimDevice] {
        &self.devices
    }

    pub fn resets(&self) -> u32 {
        self.resets
    }

    /// Number of CONVERT T commands received.
    pub fn conversions(&self) -> u32 {
        self.conversions
    }

    fn selected_devices(&self) -> impl Iterator<Item = &SimDevice> {
        self.devices
            .iter()
            .zip(self.selected.iter())
            .filter_map(|(device, &selected)| selected.then_some(device))
    }

    fn deselect_mismatching(&mut self, bit: u8, value: bool) {
        for (device, selected) in self.devices.iter().zip(self.selected.iter_mut()) {
            if device.rom_bit(bit) != value {
                *selected = false;
            }
        }
    }

    fn command(&mut self, byte: u8) {
        self.phase = match (self.phase, byte) {
            (Phase::RomCommand, SEARCH_ROM) => Phase::Search { bit: 0, step: 0 },
            (Phase::RomCommand, MATCH_ROM) => Phase::MatchRom { bit: 0 },
            (Phase::RomCommand, SKIP_ROM) => Phase::FunctionCommand,
            (Phase::FunctionCommand, CONVERT_T) => {
                self.conversions += 1;
                for (device, &selected) in self.devices.iter_mut().zip(self.selected.iter()) {
                    if selected && device.raw_temperature.is_some() {
                        device.converted = true;
                    }
                }
                Phase::Idle
            }
            (Phase::FunctionCommand, READ_SCRATCHPAD) => Phase::Scratchpad { bit: 0 },
            _ => Phase::Idle,
        };
    }
}

impl OneWire for SimulatedBus {
    fn reset(&mut self, _delay: &mut impl DelayNs) -> Result<bool> {
        self.resets += 1;
        if self.held_low_after.is_some_and(|limit| self.resets > limit) {
            self.phase = Phase::Idle;
            return Err(Error::BusHeldLow);
        }
        self.phase = Phase::RomCommand;
        self.shift = 0;
        self.shift_len = 0;
        self.selected.iter_mut().for_each(|selected| *selected = true);

        Ok(!self.devices.is_empty())
    }

    fn write_bit(&mut self, bit: bool, _delay: &mut impl DelayNs) -> Result<()> {
        match self.phase {
            Phase::Search { bit: index, step: 2 } => {
                self.deselect_mismatching(index, bit);
                self.phase = if index == 63 {
                    Phase::Idle
                } else {
                    Phase::Search {
                        bit: index + 1,
                        step: 0,
                    }
                };
            }
            Phase::MatchRom { bit: index } => {
                self.deselect_mismatching(index, bit);
                self.phase = if index == 63 {
                    Phase::FunctionCommand
                } else {
                    Phase::MatchRom { bit: index + 1 }
                };
            }
            Phase::RomCommand | Phase::FunctionCommand => {
                if bit {
                    self.shift |= 1 << self.shift_len;
                }
                self.shift_len += 1;
                if self.shift_len == 8 {
                    let byte = self.shift;
                    self.shift = 0;
                    self.shift_len = 0;
                    self.command(byte);
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn read_bit(&mut self, _delay: &mut impl DelayNs) -> Result<bool> {
        // A released line reads high; any device driving 0 wins
        let bit = match self.phase {
            Phase::Search { bit: index, step: 0 } => {
                self.phase = Phase::Search {
                    bit: index,
                    step: 1,
                };
                self.selected_devices().all(|device| device.rom_bit(index))
            }
            Phase::Search { bit: index, step: 1 } => {
                self.phase = Phase::Search {
                    bit: index,
                    step: 2,
                };
                self.selected_devices().all(|device| !device.rom_bit(index))
            }
            Phase::Scratchpad { bit: index } if index < 72 => {
                self.phase = Phase::Scratchpad { bit: index + 1 };
                self.selected_devices()
                    .filter(|device| device.raw_temperature.is_some())
                    .all(|device| device.scratchpad_bit(index))
            }
            _ => true,
        };

        Ok(bit)
    }
}
