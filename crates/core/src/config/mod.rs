use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 25 frames per second.
pub const DEFAULT_FRAME_INTERVAL_US: u64 = 40_000;

/// Top-level configuration for a playback session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Time between successive frame emissions, in microseconds.
    pub frame_interval_us: u64,
    /// Install SIGINT/SIGTERM/SIGHUP listeners when playback is armed.
    #[serde(default = "default_handle_signals")]
    pub handle_signals: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            frame_interval_us: DEFAULT_FRAME_INTERVAL_US,
            handle_signals: default_handle_signals(),
        }
    }
}

impl PlayerConfig {
    /// Builds a config whose frame interval is given in milliseconds, the unit
    /// used on the command line.
    pub fn with_frame_millis(millis: u64) -> Self {
        Self {
            frame_interval_us: millis.saturating_mul(1000),
            ..Self::default()
        }
    }

    /// Frame interval as a [`Duration`]. Never zero, since a periodic timer
    /// cannot run with an empty period.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_micros(self.frame_interval_us.max(1))
    }
}

fn default_handle_signals() -> bool {
    true
}
