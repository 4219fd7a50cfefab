//! Serial thermal-printer protocol driver.
//!
//! Owns the serial connection for the lifetime of the process: opened once
//! at startup, reused across print jobs, closed exactly once at shutdown.
//! The printer speaks a small ESC-style command subset; text goes out in
//! the device's native GBK code page. Printing is best-effort: a write
//! failure is logged at this boundary and never propagates to the
//! pipeline, because a partially garbled receipt beats losing the whole
//! customer-facing output.

use encoding_rs::{EncoderResult, GBK};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// ESC @, device reset.
pub const CMD_RESET: [u8; 2] = [0x1B, 0x40];
/// ESC x, cancel the current job.
pub const CMD_CANCEL: [u8; 2] = [0x1B, 0x78];
/// GS V A 16, full paper cut.
pub const CMD_CUT: [u8; 4] = [0x1D, 0x56, 0x41, 0x10];

/// Settle time after reset/cancel so the device can act on the command.
const SETTLE: Duration = Duration::from_millis(100);
/// Blank feed before the cut so the blade lands below the printed text.
const FEED_BEFORE_CUT: &[u8] = b"\n\n\n\n";

#[derive(Debug, thiserror::Error)]
pub enum PrinterError {
    #[error("printer port unavailable: {0}")]
    DeviceUnavailable(#[from] serialport::Error),
    #[error("printer write failed: {0}")]
    WriteFailed(#[from] io::Error),
    #[error("printer is closed")]
    Closed,
}

/// Raw transport under the driver. Production is a serial port; tests
/// attach a recording port.
pub trait PrinterPort: Send {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
    fn clear_buffers(&mut self) -> io::Result<()>;
}

impl PrinterPort for Box<dyn SerialPort> {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        io::Write::write_all(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(self)
    }

    fn clear_buffers(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::All)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

/// Serial line settings for the printer connection.
#[derive(Debug, Clone)]
pub struct PrinterConfig {
    pub port: String,
    pub baud_rate: u32,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            port: "/dev/serial0".to_string(),
            baud_rate: 9600,
        }
    }
}

/// The thermal printer. `port` is `None` once closed; no write is ever
/// attempted against a closed port, and a failed write does not disturb
/// the open/closed state.
pub struct Printer {
    port: Option<Box<dyn PrinterPort>>,
    config: PrinterConfig,
}

impl std::fmt::Debug for Printer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Printer")
            .field("port", &self.config.port)
            .field("baud_rate", &self.config.baud_rate)
            .field("open", &self.port.is_some())
            .finish()
    }
}

impl Printer {
    /// Claim the serial port at 8N1, no flow control, 1 s timeout.
    /// Failure here is fatal at startup: no device, no appliance.
    pub fn open(config: PrinterConfig) -> Result<Self, PrinterError> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_secs(1))
            .open()?;
        info!(port = %config.port, baud = config.baud_rate, "printer port open");
        Ok(Self {
            port: Some(Box::new(port)),
            config,
        })
    }

    /// Attach an already-open transport. Used by tests and bench setups.
    pub fn attach(port: Box<dyn PrinterPort>, config: PrinterConfig) -> Self {
        Self {
            port: Some(port),
            config,
        }
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Put the device into a known state: clear both buffers, send reset,
    /// then cancel whatever job might still be in flight. Used at startup
    /// and around every job so a prior failure cannot poison the next one.
    pub fn reset(&mut self) {
        if let Err(e) = self.try_reset() {
            warn!(error = %e, "printer reset failed");
        }
    }

    fn try_reset(&mut self) -> Result<(), PrinterError> {
        let port = self.port.as_mut().ok_or(PrinterError::Closed)?;
        port.clear_buffers()?;
        port.write_all(&CMD_RESET)?;
        thread::sleep(SETTLE);
        port.write_all(&CMD_CANCEL)?;
        thread::sleep(SETTLE);
        debug!("printer reset");
        Ok(())
    }

    /// Encode `text` into the printer code page and write it, flushing the
    /// segment out to the device. Returns the number of payload bytes
    /// handed to the port, or 0 when the write failed or the port is
    /// closed. Unrepresentable characters are substituted, not fatal.
    pub fn write_text(&mut self, text: &str) -> usize {
        let (bytes, lossy) = encode_gbk(text);
        if lossy {
            warn!("text had characters outside the printer code page; substituted");
        }
        match self.try_write(&bytes).and_then(|_| self.try_flush()) {
            Ok(()) => bytes.len(),
            Err(e) => {
                warn!(error = %e, "printer write failed; continuing");
                0
            }
        }
    }

    /// Feed a few blank lines, then send the cut command.
    pub fn cut_paper(&mut self) {
        if let Err(e) = self
            .try_write(FEED_BEFORE_CUT)
            .and_then(|_| self.try_write(&CMD_CUT))
            .and_then(|_| self.try_flush())
        {
            warn!(error = %e, "paper cut failed");
        }
    }

    fn try_write(&mut self, bytes: &[u8]) -> Result<(), PrinterError> {
        let port = self.port.as_mut().ok_or(PrinterError::Closed)?;
        port.write_all(bytes)?;
        Ok(())
    }

    fn try_flush(&mut self) -> Result<(), PrinterError> {
        let port = self.port.as_mut().ok_or(PrinterError::Closed)?;
        port.flush()?;
        Ok(())
    }

    /// Flush outstanding bytes and release the port. Safe to call more
    /// than once; later calls are no-ops.
    pub fn close(&mut self) {
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.flush() {
                warn!(error = %e, "printer flush on close failed");
            }
            info!("printer port closed");
        }
    }
}

impl Drop for Printer {
    fn drop(&mut self) {
        self.close();
    }
}

/// One logical print unit, built segment by segment and transmitted once.
/// A job cuts the paper once at the end of the whole unit, never per
/// segment.
#[derive(Debug, Clone, Default)]
pub struct PrintJob {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Cut,
}

impl PrintJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.segments.push(Segment::Text(text.into()));
        self
    }

    pub fn cut(mut self) -> Self {
        self.segments.push(Segment::Cut);
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Encode to GBK, substituting `?` for anything the code page cannot
/// represent. Returns the bytes and whether substitution happened.
pub fn encode_gbk(text: &str) -> (Vec<u8>, bool) {
    let mut encoder = GBK.new_encoder();
    let mut out = Vec::with_capacity(text.len() * 2);
    let mut buf = [0u8; 256];
    let mut rest = text;
    let mut lossy = false;
    loop {
        let last = rest.is_empty();
        let (result, read, written) =
            encoder.encode_from_utf8_without_replacement(rest, &mut buf, last);
        out.extend_from_slice(&buf[..written]);
        rest = &rest[read..];
        match result {
            EncoderResult::InputEmpty if last => break,
            EncoderResult::InputEmpty => {}
            EncoderResult::OutputFull => {}
            EncoderResult::Unmappable(_) => {
                out.push(b'?');
                lossy = true;
            }
        }
    }
    (out, lossy)
}
