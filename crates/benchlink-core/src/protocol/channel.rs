//! Channel abstraction over a device link
//!
//! The transport drives this trait instead of `serialport` directly so the
//! exchange loop can be exercised against scripted channels in tests and so
//! non-serial links can be attached without touching the engine.

use serialport::SerialPort;
use std::io::{self, Read, Write};

/// One open byte channel to an instrument
pub trait DeviceChannel: Read + Write + Send {
    /// Number of bytes available to read without blocking
    fn bytes_to_read(&mut self) -> io::Result<u32>;

    /// Discard anything sitting in the input buffer
    fn clear_input_buffer(&mut self) -> io::Result<()>;
}

/// Serial port wrapper implementing [`DeviceChannel`]
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    /// Wrap an open serial port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl DeviceChannel for SerialChannel {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        self.port
            .bytes_to_read()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}
