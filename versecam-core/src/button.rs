//! Button press classification.
//!
//! The raw line level is sampled on a fixed interval; this state machine
//! turns the samples into discrete short and long presses. A hold that
//! crosses the threshold classifies immediately; there is no reason to
//! wait for the release to know it is a shutdown request.

use std::time::{Duration, Instant};
use versecam_io::{DigitalInput, Level};

/// Hold duration at which a press becomes a shutdown request.
pub const LONG_PRESS: Duration = Duration::from_secs(2);

/// Sample interval for the poll loop; also the classification latency
/// floor.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A classified button interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Press {
    /// Released before the threshold: trigger one pipeline job.
    Short,
    /// Held past the threshold: begin shutdown.
    Long,
}

/// Press classifier state. Feed it `(level, instant)` samples; it emits a
/// `Press` when one completes. `pressed_at` doubles as the idle/held
/// state: `None` is idle, `Some` carries the press start time.
#[derive(Debug, Default)]
pub struct PressTracker {
    pressed_at: Option<Instant>,
}

impl PressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, level: Level, now: Instant) -> Option<Press> {
        match (level, self.pressed_at) {
            (Level::Active, None) => {
                self.pressed_at = Some(now);
                None
            }
            (Level::Active, Some(since)) => {
                if now.duration_since(since) >= LONG_PRESS {
                    self.pressed_at = None;
                    Some(Press::Long)
                } else {
                    None
                }
            }
            (Level::Inactive, Some(since)) => {
                self.pressed_at = None;
                if now.duration_since(since) < LONG_PRESS {
                    Some(Press::Short)
                } else {
                    // The hold already classified as long; the release is
                    // just the line going quiet again.
                    None
                }
            }
            (Level::Inactive, None) => None,
        }
    }
}

/// Poll `input` until a press completes. This blocks the main loop by
/// design: no pipeline job runs while we are waiting, and no press is
/// read while a job runs.
pub async fn wait_for_press<D: DigitalInput + ?Sized>(input: &mut D) -> Press {
    let mut tracker = PressTracker::new();
    loop {
        if let Some(press) = tracker.sample(input.read_level(), Instant::now()) {
            return press;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
