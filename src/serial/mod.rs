//! Serial link to the NABU.
//!
//! The line configuration is fixed by the NABU hardware: 115200 bps, 8 data
//! bits, no parity, 2 stop bits, no handshaking. Reads are non-blocking
//! (at most one byte per call); writes push the whole block out.

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::error::Result;

/// Line speed required by the NABU.
pub const BAUD_RATE: u32 = 115_200;

/// Poll granularity for the main loop's byte reads.
const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// An open adapter-side serial port.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    /// Open `device` at the adapter's fixed line configuration.
    pub fn open(device: &str) -> Result<Self> {
        let port = serialport::new(device, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::Two)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()?;
        Ok(Self { port })
    }

    /// Read at most one byte; `None` when the line is idle.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a whole block to the line.
    pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.port.write_all(bytes)?;
        Ok(())
    }

    /// Name of the underlying device, for diagnostics.
    pub fn device(&self) -> Option<String> {
        self.port.name()
    }
}
