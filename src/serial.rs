// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use std::io::{Read, Write};
use std::time::Duration;
use serialport::{DataBits, FlowControl, Parity, SerialPort as SerialPortTrait, StopBits};

// ============================================================================
// SerialPort Trait
// ============================================================================

/// Byte stream the uploader talks to the console over
pub trait SerialPort: Send {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize>;

    /// Release the connection. Calling it more than once is a no-op.
    fn close(&mut self) -> std::io::Result<()>;
}

// ============================================================================
// Real Serial Port Implementation
// ============================================================================

/// Serial port backed by the serialport crate, fixed at 8N1 without flow control
pub struct RealSerialPort {
    name: String,
    port: Option<Box<dyn SerialPortTrait>>,
}

impl RealSerialPort {
    pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> Result<Self, serialport::Error> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()?;

        Ok(RealSerialPort { name: port_name.to_string(), port: Some(port) })
    }

    fn port(&mut self) -> std::io::Result<&mut Box<dyn SerialPortTrait>> {
        self.port.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotConnected, "serial port is closed")
        })
    }
}

impl SerialPort for RealSerialPort {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        let port = self.port()?;
        port.write_all(buf)?;
        port.flush()?;
        Ok(())
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize> {
        let port = self.port()?;
        port.set_timeout(timeout)?;
        port.read(buf)
    }

    fn close(&mut self) -> std::io::Result<()> {
        if let Some(port) = self.port.take() {
            tracing::debug!(port = %self.name, "closing serial port");
            drop(port);
        }
        Ok(())
    }
}

impl Drop for RealSerialPort {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Names of the serial ports the OS currently reports
pub fn available_port_names() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            tracing::debug!(error = %e, "could not enumerate serial ports");
            Vec::new()
        }
    }
}

// ============================================================================
// Mock Serial Port for Testing
// ============================================================================

#[cfg(test)]
pub struct MockSerialPort {
    // Data to return on reads (None = timeout)
    read_buffer: Vec<Option<u8>>,
    read_pos: usize,
    // Track what was written, and how it was split into write calls
    write_log: Vec<u8>,
    write_sizes: Vec<usize>,
    // Expected writes for verification
    expected_writes: Vec<u8>,
    // Fail every write after this many successful ones
    fail_writes_after: Option<usize>,
    // Response slots answered with an error or an empty read instead
    read_error_at: Option<(usize, std::io::ErrorKind)>,
    empty_read_at: Option<usize>,
    close_count: usize,
    fail_close: bool,
}

#[cfg(test)]
impl MockSerialPort {
    pub fn new(responses: Vec<Option<u8>>, expected_writes: Vec<u8>) -> Self {
        MockSerialPort {
            read_buffer: responses,
            read_pos: 0,
            write_log: Vec::new(),
            write_sizes: Vec::new(),
            expected_writes,
            fail_writes_after: None,
            read_error_at: None,
            empty_read_at: None,
            close_count: 0,
            fail_close: false,
        }
    }

    pub fn fail_writes_after(mut self, successful_writes: usize) -> Self {
        self.fail_writes_after = Some(successful_writes);
        self
    }

    pub fn fail_read_at(mut self, slot: usize, kind: std::io::ErrorKind) -> Self {
        self.read_error_at = Some((slot, kind));
        self
    }

    pub fn empty_read_at(mut self, slot: usize) -> Self {
        self.empty_read_at = Some(slot);
        self
    }

    pub fn fail_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn write_sizes(&self) -> &[usize] {
        &self.write_sizes
    }

    pub fn close_count(&self) -> usize {
        self.close_count
    }
}

#[cfg(test)]
impl SerialPort for MockSerialPort {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        if let Some(limit) = self.fail_writes_after {
            if self.write_sizes.len() >= limit {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "Mock write failure"
                ));
            }
        }
        self.write_log.extend_from_slice(buf);
        self.write_sizes.push(buf.len());
        Ok(())
    }

    fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> std::io::Result<usize> {
        // Out of responses = timeout
        if self.read_pos >= self.read_buffer.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Mock timeout"
            ));
        }

        if let Some((slot, kind)) = self.read_error_at {
            if slot == self.read_pos {
                self.read_pos += 1;
                return Err(std::io::Error::new(kind, "Mock read failure"));
            }
        }

        if self.empty_read_at == Some(self.read_pos) {
            self.read_pos += 1;
            return Ok(0);
        }

        // If current response is None = timeout
        if self.read_buffer[self.read_pos].is_none() {
            self.read_pos += 1;
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Mock timeout"
            ));
        }

        let mut bytes_read = 0;
        while bytes_read < buf.len() && self.read_pos < self.read_buffer.len() {
            match self.read_buffer[self.read_pos] {
                Some(byte) => {
                    buf[bytes_read] = byte;
                    bytes_read += 1;
                    self.read_pos += 1;
                }
                None => break,  // Stop at timeout marker
            }
        }

        Ok(bytes_read)
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.close_count += 1;
        if self.fail_close {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "Mock close failure"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
impl Drop for MockSerialPort {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }

        assert_eq!(
            self.read_pos,
            self.read_buffer.len(),
            "MockSerialPort dropped with {} unconsumed responses (read {} of {} bytes)",
            self.read_buffer.len() - self.read_pos,
            self.read_pos,
            self.read_buffer.len()
        );

        assert_eq!(
            self.write_log.len(),
            self.expected_writes.len(),
            "MockSerialPort write log length mismatch: expected {} bytes, got {}",
            self.expected_writes.len(),
            self.write_log.len()
        );

        if let Some(pos) = self.write_log.iter().zip(&self.expected_writes).position(|(a, b)| a != b) {
            panic!(
                "MockSerialPort write log mismatch at byte {}: expected 0x{:02X}, got 0x{:02X}",
                pos, self.expected_writes[pos], self.write_log[pos]
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_replays_responses_and_timeouts() {
        let mut port = MockSerialPort::new(vec![Some(0x06), None, Some(0x15)], vec![1, 2, 3]);
        let mut buf = [0u8; 1];

        assert_eq!(port.read_timeout(&mut buf, Duration::from_secs(1)).unwrap(), 1);
        assert_eq!(buf[0], 0x06);

        let err = port.read_timeout(&mut buf, Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);

        assert_eq!(port.read_timeout(&mut buf, Duration::from_secs(1)).unwrap(), 1);
        assert_eq!(buf[0], 0x15);

        port.write_all(&[1]).unwrap();
        port.write_all(&[2, 3]).unwrap();
        assert_eq!(port.write_sizes(), &[1, 2]);
    }

    #[test]
    fn test_mock_injected_read_results() {
        let mut port = MockSerialPort::new(vec![None, None, Some(0x06)], vec![])
            .empty_read_at(0)
            .fail_read_at(1, std::io::ErrorKind::BrokenPipe)
            .fail_close();
        let mut buf = [0u8; 1];

        assert_eq!(port.read_timeout(&mut buf, Duration::from_secs(1)).unwrap(), 0);
        let err = port.read_timeout(&mut buf, Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
        assert_eq!(port.read_timeout(&mut buf, Duration::from_secs(1)).unwrap(), 1);

        assert!(port.close().is_err());
        assert_eq!(port.close_count(), 1);
    }

    #[test]
    fn test_mock_write_failure() {
        let mut port = MockSerialPort::new(vec![], vec![9]).fail_writes_after(1);
        port.write_all(&[9]).unwrap();
        let err = port.write_all(&[10]).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }
}
