//! # Versecam Core
//!
//! The orchestration layer of the appliance: the button press classifier,
//! the pipeline state machine that turns one press into one printed
//! receipt, the fixed-column text layout, the uploads store, and the
//! shutdown discipline that leaves the hardware closed on every exit
//! path.

pub mod button;
pub mod layout;
pub mod lifecycle;
pub mod pipeline;
pub mod uploads;

// Re-export the main types so users can just use `versecam_core::Pipeline`.
pub use button::{Press, PressTracker};
pub use lifecycle::ShutdownGuard;
pub use pipeline::{JobReport, Pipeline};
pub use uploads::UploadStore;
