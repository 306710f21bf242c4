//! Host-side stand-ins for the hardware seams, shared by unit and
//! integration tests.

mod delay;
mod http;
mod network;
mod onewire;

pub use delay::*;
pub use http::*;
pub use network::*;
pub use onewire::*;
