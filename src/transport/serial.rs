//! Serial transport over the `serialport` crate.

use super::Transport;
use crate::error::AppResult;
use crate::settings::SerialSettings;
use log::debug;
use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};

/// Blocking serial link to the card.
///
/// The card's framing is fixed — 8 data bits, no parity, 1 stop bit,
/// XON/XOFF flow control — so only the port path, baud rate and read
/// timeout come from [`SerialSettings`]. Commands go out CR-terminated;
/// responses arrive LF-terminated with a trailing CR that gets stripped.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open and configure the port, discarding anything stale in the
    /// driver buffers.
    pub fn open(settings: &SerialSettings) -> AppResult<Self> {
        let port = serialport::new(&settings.port, settings.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::Software)
            .timeout(settings.read_timeout())
            .open()?;
        port.clear(serialport::ClearBuffer::All)?;
        debug!(
            "Serial port '{}' opened at {} baud",
            settings.port, settings.baud_rate
        );
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn send_line(&mut self, line: &str) -> AppResult<()> {
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\r")?;
        self.port.flush()?;
        debug!("Sent serial command: {line}");
        Ok(())
    }

    fn read_line(&mut self) -> AppResult<String> {
        let mut raw = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) => {
                    return Err(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "serial port returned EOF",
                    )
                    .into());
                }
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    raw.push(byte[0]);
                }
                // Timeout ends the line; the caller treats a short or empty
                // line as an unparseable frame and polls again.
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) => return Err(e.into()),
            }
        }
        while raw.last() == Some(&b'\r') {
            raw.pop();
        }
        let line = String::from_utf8_lossy(&raw).into_owned();
        debug!("Received serial response: {line}");
        Ok(line)
    }
}
