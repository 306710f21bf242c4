mod association;

pub use association::*;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Station-mode wireless interface.
pub trait WirelessInterface {
    type Error: fmt::Debug;

    /// Whether the radio is powered up
    fn is_active(&self) -> bool;

    /// Power up the radio in station mode
    fn activate(&mut self) -> Result<(), Self::Error>;

    /// Request association with an access point. Returning `Ok` does not
    /// mean the interface is associated yet.
    fn connect(&mut self, ssid: &str, password: &str) -> Result<(), Self::Error>;

    /// Check if currently associated with an access point
    fn is_connected(&self) -> bool;

    /// SSIDs currently in range, when the interface can scan
    fn visible_networks(&mut self) -> Option<Vec<String>> {
        None
    }
}
