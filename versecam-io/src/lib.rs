//! # Versecam IO
//!
//! The Hardware Interface Layer: the serial thermal printer, the trigger
//! button line, and the camera capture collaborator. Every resource here
//! is explicitly owned: opened by the lifecycle controller, passed by
//! handle, and closed exactly once on the way out. No ambient singletons.

pub mod button;
pub mod camera;
pub mod printer;

pub use button::{DigitalInput, GpioButton, Level};
pub use camera::{Camera, CaptureError};
pub use printer::{PrintJob, Printer, PrinterConfig, PrinterError, PrinterPort, Segment};
