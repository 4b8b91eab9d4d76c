//! Presenter countdown.

use crate::annotation::model::palette;
use crate::compositor::font::{draw_text, measure_text};
use crate::compositor::raster::{Paint, RectF, Rgba, RgbaBuffer, Shape};
use crate::geometry::{Point, ScreenRect};
use crate::input::Key;
use std::time::{Duration, Instant};
use tracing::info;

pub const DEFAULT_COUNTDOWN: Duration = Duration::from_secs(5 * 60);
pub const ADJUST_STEP: Duration = Duration::from_secs(60);
pub const MAX_COUNTDOWN: Duration = Duration::from_secs(99 * 60 + 59);
pub const WARNING_THRESHOLD: Duration = Duration::from_secs(60);
const TICK: Duration = Duration::from_secs(1);

pub const TIMER_SURFACE_SIZE: (i32, i32) = (220, 90);
const TIMER_SURFACE_MARGIN: i32 = 24;
const TIMER_TEXT_HEIGHT: f32 = 40.0;

/// Preset for a digit key: 1, 3 and 5 minutes, 0 for ten.
pub fn preset_for_digit(digit: u32) -> Option<Duration> {
    match digit {
        1 | 3 | 5 => Some(Duration::from_secs(u64::from(digit) * 60)),
        0 => Some(Duration::from_secs(10 * 60)),
        _ => None,
    }
}

pub fn format_countdown(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Where the countdown window sits on a display: top-right corner.
pub fn timer_surface_bounds(display: ScreenRect) -> ScreenRect {
    let (w, h) = TIMER_SURFACE_SIZE;
    ScreenRect::new(
        display.x + display.width - w - TIMER_SURFACE_MARGIN,
        display.y + TIMER_SURFACE_MARGIN,
        w,
        h,
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub remaining: Duration,
    pub running: bool,
    pub finished: bool,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Countdown {
    duration: Duration,
    remaining: Duration,
    /// Instant the next whole second is counted from while running.
    anchor: Option<Instant>,
    finished: bool,
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTDOWN)
    }
}

impl Countdown {
    pub fn new(duration: Duration) -> Self {
        let duration = duration.min(MAX_COUNTDOWN);
        Self {
            duration,
            remaining: duration,
            anchor: None,
            finished: false,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_warning(&self) -> bool {
        self.remaining < WARNING_THRESHOLD
    }

    pub fn text(&self) -> String {
        format_countdown(self.remaining)
    }

    pub fn text_color(&self) -> Rgba {
        if self.is_warning() {
            palette::RED
        } else {
            palette::WHITE
        }
    }

    pub fn set_duration(&mut self, duration: Duration) {
        *self = Self::new(duration);
    }

    pub fn adjust(&mut self, increase: bool) {
        let remaining = if increase {
            self.remaining.saturating_add(ADJUST_STEP).min(MAX_COUNTDOWN)
        } else {
            self.remaining.saturating_sub(ADJUST_STEP)
        };
        self.remaining = remaining;
        self.finished = false;
        if !self.is_running() {
            self.duration = remaining;
        }
    }

    pub fn start(&mut self, now: Instant) {
        if self.is_running() {
            return;
        }
        if self.remaining.is_zero() {
            self.remaining = self.duration;
        }
        self.finished = false;
        self.anchor = Some(now);
        info!(remaining = %self.text(), "countdown started");
    }

    pub fn pause(&mut self) {
        if self.anchor.take().is_some() {
            info!(remaining = %self.text(), "countdown paused");
        }
    }

    pub fn toggle(&mut self, now: Instant) {
        if self.is_running() {
            self.pause();
        } else {
            self.start(now);
        }
    }

    pub fn reset(&mut self) {
        self.anchor = None;
        self.remaining = self.duration;
        self.finished = false;
    }

    /// Counts down whole seconds elapsed since the last tick. Returns `true` when the
    /// display changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(anchor) = self.anchor else {
            return false;
        };
        let mut anchor = anchor;
        let mut changed = false;
        while now.saturating_duration_since(anchor) >= TICK && !self.remaining.is_zero() {
            self.remaining -= TICK.min(self.remaining);
            anchor += TICK;
            changed = true;
        }
        self.anchor = Some(anchor);
        if self.remaining.is_zero() {
            self.anchor = None;
            self.finished = true;
            info!("countdown finished");
            return true;
        }
        changed
    }

    /// Timer window keys: digit presets, Up/Down ±1 min, Space or Enter start/pause,
    /// R reset. Returns `true` when handled.
    pub fn handle_key(&mut self, key: Key, now: Instant) -> bool {
        if let Some(duration) = key.digit().and_then(preset_for_digit) {
            self.set_duration(duration);
            return true;
        }
        match key {
            Key::Up => self.adjust(true),
            Key::Down => self.adjust(false),
            Key::Space | Key::Enter => self.toggle(now),
            Key::Char('R') => self.reset(),
            _ => return false,
        }
        true
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            remaining: self.remaining,
            running: self.is_running(),
            finished: self.finished,
            text: self.text(),
        }
    }
}

/// Paints the countdown face: a dark rounded panel with the centred `mm:ss` text.
pub fn draw_countdown(target: &mut RgbaBuffer, countdown: &Countdown) {
    target.clear(Rgba::TRANSPARENT);
    let w = target.width as f32;
    let h = target.height as f32;
    let border = if countdown.is_finished() {
        palette::RED
    } else {
        Rgba::WHITE.with_opacity(0.3)
    };
    let panel = RectF::new(0.0, 0.0, w, h);
    target.fill_shape(
        &Shape::RoundedRect {
            rect: panel,
            radius: 12.0,
        },
        &Paint::Solid(Rgba::BLACK.with_opacity(0.75)),
    );
    target.fill_shape(
        &Shape::RoundedRectOutline {
            rect: panel,
            radius: 12.0,
            width: 2.0,
        },
        &Paint::Solid(border),
    );
    let text = countdown.text();
    let (tw, th) = measure_text(&text, TIMER_TEXT_HEIGHT);
    draw_text(
        target,
        Point::new((w - tw) / 2.0, (h - th) / 2.0),
        &text,
        TIMER_TEXT_HEIGHT,
        countdown.text_color(),
    );
}
