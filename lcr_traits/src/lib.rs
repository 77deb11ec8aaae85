//! Device seams shared by the acquisition stack.
//!
//! Both links are polled without blocking: a `ByteLink` hands over whatever
//! bytes have arrived since the last call and a `Chamber` returns the
//! temperature samples it has produced in the meantime.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Boxed error type used at every trait boundary.
pub type DeviceError = Box<dyn std::error::Error + Send + Sync>;

/// Raw byte stream coming from the LCR meter.
pub trait ByteLink {
    /// Append every byte received since the previous call to `buf` and return
    /// how many were appended. Must not block; returns `Ok(0)` when idle.
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize, DeviceError>;
}

/// Thermal chamber driver (external collaborator).
pub trait Chamber {
    /// Temperatures (°C) measured since the previous call, oldest first.
    fn read(&mut self) -> Result<Vec<f64>, DeviceError>;
    /// Heater power command in `[0, 1]`.
    fn write(&mut self, power: f64) -> Result<(), DeviceError>;
    /// Sticky link fault reported by the driver.
    fn error(&self) -> bool;
}

impl<T: ByteLink + ?Sized> ByteLink for Box<T> {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize, DeviceError> {
        (**self).read_available(buf)
    }
}

impl<T: Chamber + ?Sized> Chamber for Box<T> {
    fn read(&mut self) -> Result<Vec<f64>, DeviceError> {
        (**self).read()
    }
    fn write(&mut self, power: f64) -> Result<(), DeviceError> {
        (**self).write(power)
    }
    fn error(&self) -> bool {
        (**self).error()
    }
}
