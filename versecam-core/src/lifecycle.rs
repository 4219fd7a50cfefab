//! Shutdown discipline.
//!
//! Two paths can ask the appliance to die (a long button press, an OS
//! termination signal) and they can race. Both funnel through one
//! `ShutdownGuard` so the teardown runs exactly once, and the teardown
//! itself never blocks termination: every failure in it is logged and
//! dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use versecam_io::Printer;

/// One-shot guard: the first caller of `begin` wins, everyone else
/// stands down.
#[derive(Debug, Default)]
pub struct ShutdownGuard {
    fired: AtomicBool,
}

impl ShutdownGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` exactly once, for the path that gets to run the teardown.
    pub fn begin(&self) -> bool {
        !self.fired.swap(true, Ordering::SeqCst)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

/// Tear the printer down: reset to a known state, then close. Locking
/// per call means a mid-flight print job is abandoned after its current
/// write, not awaited to completion.
pub async fn shutdown_devices(printer: &Arc<Mutex<Printer>>) {
    info!("shutting down");
    let mut printer = printer.lock().await;
    printer.reset();
    printer.close();
}
