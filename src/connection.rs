// ABOUTME: Buffered line-oriented connection to the modem over any async byte stream
// ABOUTME: Splits modem output into lines and writes CR LF terminated AT commands

use crate::at::Command;
use crate::reader::LineSource;
use bytes::{Buf, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::debug;

/// Serial line settings for a modem attached to a local device
///
/// Modems answer at 8N1 without flow control; only the device path and baud
/// rate vary between boards.
///
/// # Example
///
/// ```rust
/// use sms_bridge::connection::SerialConfig;
///
/// let config = SerialConfig::new("/dev/ttyUSB2").with_baud_rate(9600);
/// assert_eq!(config.baud_rate, 9600);
/// ```
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Device path (default: /dev/ttyAMA0)
    pub device: String,

    /// Line speed (default: 115200)
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyAMA0".to_string(),
            baud_rate: 115_200,
        }
    }
}

impl SerialConfig {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Open the device as a non-blocking stream registered with the runtime
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&self) -> io::Result<SerialStream> {
        debug!("opening {} at {} baud", self.device, self.baud_rate);
        let port = tokio_serial::new(&self.device, self.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .open_native_async()?;
        Ok(port)
    }
}

/// Line framing over a serial device, a TCP serial server or any other
/// bidirectional byte stream.
///
/// The modem answers in lines terminated by `\n` (usually `\r\n`). A line is
/// returned once its terminator has been buffered; whatever follows stays in
/// the buffer for the next call. Lines are decoded lossily since modems give
/// no encoding guarantee beyond ASCII.
#[derive(Debug)]
pub struct ModemConnection<S> {
    // Commands are tiny, but buffering keeps each one to a single write.
    stream: BufWriter<S>,

    // The buffer for reading lines.
    buffer: BytesMut,
}

impl<S: AsyncRead + AsyncWrite + Unpin> ModemConnection<S> {
    /// Create a new `ModemConnection`, backed by `stream`.
    pub fn new(stream: S) -> ModemConnection<S> {
        ModemConnection {
            stream: BufWriter::new(stream),
            // A PDU line is at most ~350 hex digits; 4KB holds a full listing
            // burst from most modems without reallocating.
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Read a single line from the underlying stream, without its terminator.
    ///
    /// Returns `None` once the stream is closed and the buffer is drained. A
    /// trailing fragment without terminator is returned as a final line.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(line) = self.parse_line() {
                return Ok(Some(line));
            }

            // `0` indicates "end of stream".
            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let rest = self.buffer.split();
                return Ok(Some(decode_line(&rest)));
            }
        }
    }

    /// Tries to split one terminated line off the front of the buffer.
    fn parse_line(&mut self) -> Option<String> {
        let end = self.buffer.iter().position(|&b| b == b'\n')?;
        let line = self.buffer.split_to(end);
        // Discard the '\n' itself
        self.buffer.advance(1);

        let line = decode_line(&line);
        debug!("<- {}", line);
        Some(line)
    }

    /// Write one command and flush it to the modem.
    pub async fn write_command(&mut self, command: Command) -> io::Result<()> {
        debug!("-> {}", command);
        self.stream.write_all(command.as_bytes()).await?;
        self.stream.flush().await
    }

    pub fn get_ref(&self) -> &S {
        self.stream.get_ref()
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

impl<S: AsyncRead + AsyncWrite + Unpin> LineSource for ModemConnection<S> {
    async fn read_line(&mut self) -> io::Result<Option<String>> {
        ModemConnection::read_line(self).await
    }
}
