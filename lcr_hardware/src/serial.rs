//! Serial-port byte link to a physical meter (8N1, non-blocking polls).

use std::io::Read;
use std::time::Duration;

use lcr_traits::{ByteLink, DeviceError};

use crate::error::HwError;

pub struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
    name: String,
    scratch: Vec<u8>,
}

impl SerialLink {
    pub fn open(name: &str, baud: u32) -> Result<Self, HwError> {
        let port = serialport::new(name, baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(Duration::from_millis(20))
            .open()
            .map_err(|e| HwError::Serial(format!("open {name}: {e}")))?;
        tracing::info!(port = name, baud, "LCR serial link opened");
        Ok(Self {
            port,
            name: name.to_string(),
            scratch: vec![0; 512],
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ByteLink for SerialLink {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize, DeviceError> {
        let waiting = self
            .port
            .bytes_to_read()
            .map_err(|e| HwError::Serial(e.to_string()))? as usize;
        if waiting == 0 {
            return Ok(0);
        }
        if self.scratch.len() < waiting {
            self.scratch.resize(waiting, 0);
        }
        let n = match self.port.read(&mut self.scratch[..waiting]) {
            Ok(0) => return Err(Box::new(HwError::Disconnected)),
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => return Ok(0),
            Err(e) => return Err(Box::new(HwError::Io(e))),
        };
        buf.extend_from_slice(&self.scratch[..n]);
        Ok(n)
    }
}
