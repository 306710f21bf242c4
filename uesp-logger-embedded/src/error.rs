use alloc::string::String;
use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No device answered the reset pulse
    NoPresence,
    /// The data line stayed low before a reset
    BusHeldLow,
    PinError,
    AddressCrcMismatch,
    ScratchpadCrcMismatch,
    /// The addressed device released the line for the whole scratchpad
    DeviceNotResponding,
    UnsupportedFamily(u8),
    ConversionInProgress,
    InvalidUniqueId(usize),
    InvalidIdentifier,
    TransportError,
    InvalidConfig(String),
    InvalidLine(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoPresence => write!(f, "No presence pulse on the 1-Wire bus"),
            Error::BusHeldLow => write!(f, "1-Wire data line is held low"),
            Error::PinError => write!(f, "1-Wire pin error"),
            Error::AddressCrcMismatch => write!(f, "Address CRC mismatch"),
            Error::ScratchpadCrcMismatch => write!(f, "Scratchpad CRC mismatch"),
            Error::DeviceNotResponding => write!(f, "Device not responding"),
            Error::UnsupportedFamily(family) => {
                write!(f, "Unsupported device family 0x{family:02x}")
            }
            Error::ConversionInProgress => write!(f, "Temperature conversion already in progress"),
            Error::InvalidUniqueId(len) => write!(f, "Invalid unique id length {len}"),
            Error::InvalidIdentifier => write!(f, "Invalid sensor identifier"),
            Error::TransportError => write!(f, "HTTP transport error"),
            Error::InvalidConfig(message) => write!(f, "Invalid configuration: {message}"),
            Error::InvalidLine(reason) => write!(f, "Invalid metric line: {reason}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;
