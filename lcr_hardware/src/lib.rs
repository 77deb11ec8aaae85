//! Device implementations behind `lcr_traits`: simulators for the chamber and
//! the meter, and (with the `hardware` feature) a serial link to a real meter.

pub mod error;
#[cfg(feature = "hardware")]
pub mod serial;
pub mod sim;

pub use error::HwError;
#[cfg(feature = "hardware")]
pub use serial::SerialLink;
pub use sim::{MeterParams, PlantParams, SimulatedChamber, SimulatedLcr};
