//! Still-image capture collaborator.
//!
//! The camera stack is a black box behind a capture command; we shell out
//! and wait for it, the same way the deployment scripts exercise the
//! sensor. A timeout guards against a wedged camera stack holding the
//! whole control loop hostage.

use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture command failed to start: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("capture command exited with {0}")]
    Failed(std::process::ExitStatus),
    #[error("capture timed out after {0:?}")]
    TimedOut(Duration),
}

/// Shell-out wrapper around the system capture tool (`rpicam-still` on
/// the target device).
#[derive(Debug, Clone)]
pub struct Camera {
    command: String,
    timeout: Duration,
}

impl Camera {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: Duration::from_secs(20),
        }
    }

    /// Capture one frame into `path`.
    pub async fn capture_to(&self, path: &Path) -> Result<(), CaptureError> {
        let mut cmd = Command::new(&self.command);
        cmd.arg("-o").arg(path).arg("-n");
        info!(command = %self.command, path = %path.display(), "capturing image");
        let status = tokio::time::timeout(self.timeout, cmd.status())
            .await
            .map_err(|_| CaptureError::TimedOut(self.timeout))??;
        if !status.success() {
            return Err(CaptureError::Failed(status));
        }
        Ok(())
    }
}
