use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::{Error, Result};

use super::OneWire;

// Standard speed slot timings in microseconds
const RESET_LOW_US: u32 = 480;
const PRESENCE_SAMPLE_US: u32 = 70;
const RESET_RECOVERY_US: u32 = 410;
const WRITE_ONE_LOW_US: u32 = 6;
const WRITE_ONE_RELEASE_US: u32 = 64;
const WRITE_ZERO_LOW_US: u32 = 60;
const WRITE_ZERO_RELEASE_US: u32 = 10;
const READ_LOW_US: u32 = 6;
const READ_SAMPLE_US: u32 = 9;
const READ_RECOVERY_US: u32 = 55;

/// Bit-banged 1-Wire master on a single open-drain GPIO.
///
/// The pin must be configured as open-drain with a pull-up (internal or
/// the usual 4.7k external resistor): driving it high releases the line.
pub struct OpenDrainPin<P>
where
    P: InputPin + OutputPin,
{
    pin: P,
}

impl<P> OpenDrainPin<P>
where
    P: InputPin + OutputPin,
{
    pub fn new(mut pin: P) -> Result<Self> {
        pin.set_high().map_err(|_| Error::PinError)?;
        Ok(Self { pin })
    }

    pub fn release(self) -> P {
        self.pin
    }

    fn set_low(&mut self) -> Result<()> {
        self.pin.set_low().map_err(|_| Error::PinError)
    }

    fn set_high(&mut self) -> Result<()> {
        self.pin.set_high().map_err(|_| Error::PinError)
    }

    fn is_high(&mut self) -> Result<bool> {
        self.pin.is_high().map_err(|_| Error::PinError)
    }
}

impl<P> OneWire for OpenDrainPin<P>
where
    P: InputPin + OutputPin,
{
    fn reset(&mut self, delay: &mut impl DelayNs) -> Result<bool> {
        self.set_high()?;
        if !self.is_high()? {
            return Err(Error::BusHeldLow);
        }

        self.set_low()?;
        delay.delay_us(RESET_LOW_US);
        self.set_high()?;
        delay.delay_us(PRESENCE_SAMPLE_US);
        let presence = !self.is_high()?;
        delay.delay_us(RESET_RECOVERY_US);

        Ok(presence)
    }

    fn write_bit(&mut self, bit: bool, delay: &mut impl DelayNs) -> Result<()> {
        let (low, release) = if bit {
            (WRITE_ONE_LOW_US, WRITE_ONE_RELEASE_US)
        } else {
            (WRITE_ZERO_LOW_US, WRITE_ZERO_RELEASE_US)
        };

        self.set_low()?;
        delay.delay_us(low);
        self.set_high()?;
        delay.delay_us(release);

        Ok(())
    }

    fn read_bit(&mut self, delay: &mut impl DelayNs) -> Result<bool> {
        self.set_low()?;
        delay.delay_us(READ_LOW_US);
        self.set_high()?;
        delay.delay_us(READ_SAMPLE_US);
        let bit = self.is_high()?;
        delay.delay_us(READ_RECOVERY_US);

        Ok(bit)
    }
}
