//! The trigger button line.

use anyhow::Context;
use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use tracing::warn;

/// Raw level of the input line as the classifier sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Line held low: the button is down.
    Active,
    /// Line released.
    Inactive,
}

/// Anything that can report a button level. The daemon polls this on a
/// fixed interval; tests drive the classifier with scripted levels.
pub trait DigitalInput: Send {
    fn read_level(&mut self) -> Level;
}

/// GPIO character-device button line, wired active-low against the
/// internal pull-up.
pub struct GpioButton {
    handle: LineHandle,
}

impl std::fmt::Debug for GpioButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpioButton").finish()
    }
}

impl GpioButton {
    /// Claim `line` on the chip at `chip_path`. The handle holds the line
    /// reservation until dropped.
    pub fn open(chip_path: &str, line: u32) -> anyhow::Result<Self> {
        let mut chip =
            Chip::new(chip_path).with_context(|| format!("opening GPIO chip {chip_path}"))?;
        let handle = chip
            .get_line(line)
            .and_then(|l| l.request(LineRequestFlags::INPUT, 0, "versecam-button"))
            .with_context(|| format!("requesting GPIO line {line}"))?;
        Ok(Self { handle })
    }
}

impl DigitalInput for GpioButton {
    fn read_level(&mut self) -> Level {
        match self.handle.get_value() {
            // Pulled up; a press shorts the line to ground.
            Ok(0) => Level::Active,
            Ok(_) => Level::Inactive,
            Err(e) => {
                warn!(error = %e, "button read failed; treating as released");
                Level::Inactive
            }
        }
    }
}
