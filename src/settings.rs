use crate::annotation::model::ToolSelection;
use crate::hotkey::HotkeyBindings;
use crate::magnifier::transform::ZOOM_STEP;
use crate::mode::state::{CursorHighlightState, SpotlightState};
use crate::pointer::governor::{clamp_multiplier, DEFAULT_MULTIPLIER};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const MIN_TRACKER_INTERVAL_MS: u64 = 1;
const MAX_TRACKER_INTERVAL_MS: u64 = 16;
const MAX_SETTLE_DELAY_MS: u64 = 100;
const MAX_TIMER_MINUTES: u64 = 99;

fn default_tracker_interval_ms() -> u64 {
    8
}

fn default_zoom_step() -> f32 {
    ZOOM_STEP
}

fn default_governor_multiplier() -> f32 {
    DEFAULT_MULTIPLIER
}

fn default_capture_settle_delay_ms() -> u64 {
    50
}

fn default_timer_minutes() -> u64 {
    5
}

/// User configuration, stored as pretty JSON next to the executable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenterSettings {
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_tracker_interval_ms")]
    pub tracker_interval_ms: u64,
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f32,
    #[serde(default = "default_governor_multiplier")]
    pub governor_multiplier: f32,
    #[serde(default)]
    pub spotlight: SpotlightState,
    /// Slow the physical pointer while the spotlight is shown.
    #[serde(default)]
    pub slow_cursor_in_spotlight: bool,
    #[serde(default)]
    pub highlight: CursorHighlightState,
    #[serde(default)]
    pub annotation: ToolSelection,
    #[serde(default = "default_capture_settle_delay_ms")]
    pub capture_settle_delay_ms: u64,
    #[serde(default = "default_timer_minutes")]
    pub timer_minutes: u64,
    #[serde(default)]
    pub hotkeys: HotkeyBindings,
}

impl Default for PresenterSettings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_file: None,
            tracker_interval_ms: default_tracker_interval_ms(),
            zoom_step: default_zoom_step(),
            governor_multiplier: default_governor_multiplier(),
            spotlight: SpotlightState::default(),
            slow_cursor_in_spotlight: false,
            highlight: CursorHighlightState::default(),
            annotation: ToolSelection::default(),
            capture_settle_delay_ms: default_capture_settle_delay_ms(),
            timer_minutes: default_timer_minutes(),
            hotkeys: HotkeyBindings::default(),
        }
    }
}

impl PresenterSettings {
    /// Clamps every numeric value into its supported range.
    pub fn sanitize(&mut self) {
        self.tracker_interval_ms = self
            .tracker_interval_ms
            .clamp(MIN_TRACKER_INTERVAL_MS, MAX_TRACKER_INTERVAL_MS);
        self.zoom_step = if self.zoom_step.is_finite() {
            self.zoom_step.clamp(1.01, 2.0)
        } else {
            default_zoom_step()
        };
        self.governor_multiplier = clamp_multiplier(self.governor_multiplier);
        self.spotlight = self.spotlight.sanitized();
        self.highlight = self.highlight.sanitized();
        self.annotation = self.annotation.sanitized();
        self.capture_settle_delay_ms = self.capture_settle_delay_ms.min(MAX_SETTLE_DELAY_MS);
        self.timer_minutes = self.timer_minutes.clamp(1, MAX_TIMER_MINUTES);
    }

    pub fn tracker_interval(&self) -> Duration {
        Duration::from_millis(self.tracker_interval_ms)
    }

    pub fn capture_settle_delay(&self) -> Duration {
        Duration::from_millis(self.capture_settle_delay_ms)
    }

    pub fn timer_duration(&self) -> Duration {
        Duration::from_secs(self.timer_minutes * 60)
    }
}
