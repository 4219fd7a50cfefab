use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use versecam_io::printer::{encode_gbk, CMD_CANCEL, CMD_CUT, CMD_RESET};
use versecam_io::{Camera, CaptureError, PrintJob, Printer, PrinterConfig, PrinterError, PrinterPort, Segment};

/// Transport double that records everything the driver sends.
#[derive(Clone, Default)]
struct RecordingPort {
    state: Arc<Mutex<PortState>>,
    fail_writes: Arc<AtomicBool>,
}

#[derive(Default)]
struct PortState {
    writes: Vec<Vec<u8>>,
    flushes: usize,
    clears: usize,
}

impl RecordingPort {
    fn new() -> Self {
        Self::default()
    }

    fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().writes.clone()
    }

    fn flat(&self) -> Vec<u8> {
        self.writes().concat()
    }

    fn flushes(&self) -> usize {
        self.state.lock().unwrap().flushes
    }

    fn clears(&self) -> usize {
        self.state.lock().unwrap().clears
    }

    fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl PrinterPort for RecordingPort {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "wire gone"));
        }
        self.state.lock().unwrap().writes.push(buf.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.state.lock().unwrap().flushes += 1;
        Ok(())
    }

    fn clear_buffers(&mut self) -> io::Result<()> {
        self.state.lock().unwrap().clears += 1;
        Ok(())
    }
}

fn attached() -> (RecordingPort, Printer) {
    let port = RecordingPort::new();
    let printer = Printer::attach(Box::new(port.clone()), PrinterConfig::default());
    (port, printer)
}

fn count_cuts(bytes: &[u8]) -> usize {
    bytes.windows(CMD_CUT.len()).filter(|w| *w == CMD_CUT).count()
}

// ============================================================================
// Command Encoding Tests
// ============================================================================

#[test]
fn test_wire_protocol_bytes() {
    assert_eq!(CMD_RESET, [0x1B, 0x40]);
    assert_eq!(CMD_CANCEL, [0x1B, 0x78]);
    assert_eq!(CMD_CUT, [0x1D, 0x56, 0x41, 0x10]);
}

#[test]
fn test_encode_gbk_ascii_passthrough() {
    let (bytes, lossy) = encode_gbk("Hello, world!");
    assert_eq!(bytes, b"Hello, world!");
    assert!(!lossy);
}

#[test]
fn test_encode_gbk_cjk_double_byte() {
    let (bytes, lossy) = encode_gbk("你好");
    assert_eq!(bytes, vec![0xC4, 0xE3, 0xBA, 0xC3]);
    assert!(!lossy);
}

#[test]
fn test_encode_gbk_substitutes_unmappable() {
    let (bytes, lossy) = encode_gbk("雨🙂停");
    assert!(lossy);
    assert!(bytes.contains(&b'?'));
    // The representable glyphs still made it through.
    let (rain, _) = encode_gbk("雨");
    assert!(bytes.starts_with(&rain));
}

#[test]
fn test_encode_gbk_empty() {
    let (bytes, lossy) = encode_gbk("");
    assert!(bytes.is_empty());
    assert!(!lossy);
}

// ============================================================================
// Printer Driver Tests
// ============================================================================

#[test]
fn test_reset_clears_then_resets_then_cancels() {
    let (port, mut printer) = attached();
    printer.reset();
    assert_eq!(port.clears(), 1);
    assert_eq!(port.writes(), vec![CMD_RESET.to_vec(), CMD_CANCEL.to_vec()]);
}

#[test]
fn test_write_text_reports_payload_bytes() {
    let (port, mut printer) = attached();
    let written = printer.write_text("poem");
    assert_eq!(written, 4);
    assert_eq!(port.flat(), b"poem");
    assert_eq!(port.flushes(), 1);
}

#[test]
fn test_cut_feeds_before_cutting() {
    let (port, mut printer) = attached();
    printer.cut_paper();
    let flat = port.flat();
    assert!(flat.starts_with(b"\n\n\n\n"));
    assert!(flat.ends_with(&CMD_CUT));
    assert_eq!(count_cuts(&flat), 1);
}

#[test]
fn test_close_is_idempotent() {
    let (port, mut printer) = attached();
    printer.close();
    assert!(!printer.is_open());
    assert_eq!(port.flushes(), 1);

    // Second close must not flush or release anything again.
    printer.close();
    assert!(!printer.is_open());
    assert_eq!(port.flushes(), 1);
}

#[test]
fn test_no_write_while_closed() {
    let (port, mut printer) = attached();
    printer.close();
    assert_eq!(printer.write_text("lost"), 0);
    printer.cut_paper();
    printer.reset();
    assert!(port.writes().is_empty());
}

#[test]
fn test_write_failure_does_not_corrupt_state() {
    let (port, mut printer) = attached();
    port.set_fail_writes(true);
    assert_eq!(printer.write_text("garbled"), 0);
    assert!(printer.is_open());

    // The next segment goes through once the wire recovers.
    port.set_fail_writes(false);
    assert_eq!(printer.write_text("recovered"), 9);
    assert_eq!(port.flat(), b"recovered");
}

#[test]
fn test_drop_closes_the_port() {
    let (port, printer) = attached();
    drop(printer);
    assert_eq!(port.flushes(), 1);
}

#[test]
fn test_open_nonexistent_port_is_device_unavailable() {
    let result = Printer::open(PrinterConfig {
        port: "/dev/versecam-nonexistent-port".to_string(),
        baud_rate: 9600,
    });
    match result {
        Err(PrinterError::DeviceUnavailable(_)) => {}
        other => panic!("expected DeviceUnavailable, got {:?}", other.map(|_| ())),
    }
}

// ============================================================================
// PrintJob Tests
// ============================================================================

#[test]
fn test_print_job_preserves_segment_order() {
    let job = PrintJob::new().text("header").text("body").cut();
    assert_eq!(
        job.segments(),
        &[
            Segment::Text("header".to_string()),
            Segment::Text("body".to_string()),
            Segment::Cut,
        ]
    );
}

#[test]
fn test_print_job_single_cut_at_end() {
    let job = PrintJob::new().text("header").text("poem").text("footer").cut();
    let cuts = job
        .segments()
        .iter()
        .filter(|s| **s == Segment::Cut)
        .count();
    assert_eq!(cuts, 1);
    assert_eq!(job.segments().last(), Some(&Segment::Cut));
}

#[test]
fn test_print_job_empty() {
    assert!(PrintJob::new().is_empty());
    assert!(!PrintJob::new().text("x").is_empty());
}

// ============================================================================
// Camera Tests
// ============================================================================

#[tokio::test]
async fn test_capture_succeeds_with_zero_exit() {
    let camera = Camera::new("true");
    let path = std::env::temp_dir().join("versecam-test-capture.jpg");
    assert!(camera.capture_to(&path).await.is_ok());
}

#[tokio::test]
async fn test_capture_fails_on_nonzero_exit() {
    let camera = Camera::new("false");
    let path = std::env::temp_dir().join("versecam-test-capture.jpg");
    match camera.capture_to(&path).await {
        Err(CaptureError::Failed(status)) => assert!(!status.success()),
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_capture_fails_on_missing_command() {
    let camera = Camera::new("/nonexistent/versecam-capture-tool");
    let path = std::env::temp_dir().join("versecam-test-capture.jpg");
    assert!(matches!(
        camera.capture_to(&path).await,
        Err(CaptureError::Spawn(_))
    ));
}
