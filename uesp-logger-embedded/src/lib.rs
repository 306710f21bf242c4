#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod config;
pub mod error;
pub mod identifier;
pub mod line_protocol;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod network;
pub mod onewire;
pub mod station;
pub mod telemetry;

pub use config::*;
pub use error::*;
pub use identifier::*;
pub use line_protocol::*;
pub use network::*;
pub use onewire::*;
pub use station::*;
pub use telemetry::*;
