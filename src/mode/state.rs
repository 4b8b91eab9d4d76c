use crate::annotation::model::palette;
use crate::compositor::raster::Rgba;
use crate::geometry::Point;
use serde::{Deserialize, Serialize};

pub const SPOTLIGHT_RADIUS_MIN: f32 = 50.0;
pub const SPOTLIGHT_RADIUS_MAX: f32 = 500.0;
pub const SPOTLIGHT_RADIUS_STEP: f32 = 20.0;
pub const SPOTLIGHT_ZOOM_MIN: f32 = 1.0;
pub const SPOTLIGHT_ZOOM_MAX: f32 = 5.0;
pub const SPOTLIGHT_ZOOM_STEP: f32 = 0.25;

pub const HIGHLIGHT_RADIUS_MIN: f32 = 10.0;
pub const HIGHLIGHT_RADIUS_MAX: f32 = 100.0;
pub const HIGHLIGHT_RADIUS_STEP: f32 = 5.0;
pub const HIGHLIGHT_OPACITY_MIN: f32 = 0.1;
pub const HIGHLIGHT_OPACITY_MAX: f32 = 1.0;

/// Cursor highlight palette, cycled in this order.
pub const HIGHLIGHT_COLORS: [(Rgba, &str); 9] = [
    (palette::YELLOW, "yellow"),
    (palette::RED, "red"),
    (palette::GREEN, "green"),
    (palette::BLUE, "blue"),
    (palette::ORANGE, "orange"),
    (palette::PINK, "pink"),
    (palette::PURPLE, "purple"),
    (palette::CYAN, "cyan"),
    (palette::WHITE, "white"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    None,
    Zoom,
    Drawing,
    Spotlight,
    Timer,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::None => "none",
            Mode::Zoom => "zoom",
            Mode::Drawing => "drawing",
            Mode::Spotlight => "spotlight",
            Mode::Timer => "timer",
        }
    }
}

fn sanitize(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotlightState {
    #[serde(skip)]
    pub center: Point,
    pub radius: f32,
    pub zoom_enabled: bool,
    pub zoom_level: f32,
}

impl Default for SpotlightState {
    fn default() -> Self {
        Self {
            center: Point::ZERO,
            radius: 150.0,
            zoom_enabled: true,
            zoom_level: 1.5,
        }
    }
}

impl SpotlightState {
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = sanitize(radius, SPOTLIGHT_RADIUS_MIN, SPOTLIGHT_RADIUS_MAX, self.radius);
    }

    pub fn set_zoom_level(&mut self, level: f32) {
        self.zoom_level = sanitize(level, SPOTLIGHT_ZOOM_MIN, SPOTLIGHT_ZOOM_MAX, self.zoom_level);
    }

    /// Scroll up grows the radius, scroll down shrinks it.
    pub fn scroll_radius(&mut self, delta: f32) {
        if delta != 0.0 {
            self.set_radius(self.radius + SPOTLIGHT_RADIUS_STEP * delta.signum());
        }
    }

    pub fn scroll_zoom(&mut self, delta: f32) {
        if delta != 0.0 {
            self.set_zoom_level(self.zoom_level + SPOTLIGHT_ZOOM_STEP * delta.signum());
        }
    }

    /// Radius of the screen region captured for the live zoom disk.
    pub fn capture_radius(&self) -> f32 {
        self.radius / self.zoom_level.max(SPOTLIGHT_ZOOM_MIN)
    }

    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.radius = sanitize(self.radius, SPOTLIGHT_RADIUS_MIN, SPOTLIGHT_RADIUS_MAX, defaults.radius);
        self.zoom_level = sanitize(
            self.zoom_level,
            SPOTLIGHT_ZOOM_MIN,
            SPOTLIGHT_ZOOM_MAX,
            defaults.zoom_level,
        );
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightStyle {
    Ring,
    #[default]
    Halo,
    Filled,
    Squircle,
}

impl HighlightStyle {
    pub const ALL: [HighlightStyle; 4] = [
        HighlightStyle::Ring,
        HighlightStyle::Halo,
        HighlightStyle::Filled,
        HighlightStyle::Squircle,
    ];

    pub fn next(self) -> HighlightStyle {
        let index = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorHighlightState {
    pub radius: f32,
    pub color: Rgba,
    pub opacity: f32,
    pub style: HighlightStyle,
}

impl Default for CursorHighlightState {
    fn default() -> Self {
        Self {
            radius: 30.0,
            color: palette::YELLOW,
            opacity: 0.5,
            style: HighlightStyle::Halo,
        }
    }
}

impl CursorHighlightState {
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = sanitize(radius, HIGHLIGHT_RADIUS_MIN, HIGHLIGHT_RADIUS_MAX, self.radius);
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = sanitize(opacity, HIGHLIGHT_OPACITY_MIN, HIGHLIGHT_OPACITY_MAX, self.opacity);
    }

    pub fn scroll_radius(&mut self, delta: f32) {
        if delta != 0.0 {
            self.set_radius(self.radius + HIGHLIGHT_RADIUS_STEP * delta.signum());
        }
    }

    pub fn cycle_style(&mut self) -> HighlightStyle {
        self.style = self.style.next();
        self.style
    }

    /// Moves to the palette entry after the current color; unknown colors restart at the top.
    pub fn cycle_color(&mut self) -> &'static str {
        let next = HIGHLIGHT_COLORS
            .iter()
            .position(|(color, _)| *color == self.color)
            .map(|i| (i + 1) % HIGHLIGHT_COLORS.len())
            .unwrap_or(0);
        let (color, name) = HIGHLIGHT_COLORS[next];
        self.color = color;
        name
    }

    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.radius = sanitize(self.radius, HIGHLIGHT_RADIUS_MIN, HIGHLIGHT_RADIUS_MAX, defaults.radius);
        self.opacity = sanitize(
            self.opacity,
            HIGHLIGHT_OPACITY_MIN,
            HIGHLIGHT_OPACITY_MAX,
            defaults.opacity,
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spotlight_setters_clamp() {
        let mut s = SpotlightState::default();
        s.set_radius(10.0);
        assert_eq!(s.radius, SPOTLIGHT_RADIUS_MIN);
        s.set_radius(f32::NAN);
        assert_eq!(s.radius, SPOTLIGHT_RADIUS_MIN);
        s.set_zoom_level(9.0);
        assert_eq!(s.zoom_level, SPOTLIGHT_ZOOM_MAX);
        assert_eq!(s.capture_radius(), SPOTLIGHT_RADIUS_MIN / SPOTLIGHT_ZOOM_MAX);
    }

    #[test]
    fn spotlight_scroll_steps() {
        let mut s = SpotlightState::default();
        s.scroll_radius(3.0);
        assert_eq!(s.radius, 170.0);
        s.scroll_zoom(-1.0);
        assert_eq!(s.zoom_level, 1.25);
    }

    #[test]
    fn highlight_style_cycles_through_all() {
        let mut h = CursorHighlightState::default();
        let seen: Vec<_> = (0..4).map(|_| h.cycle_style()).collect();
        assert_eq!(
            seen,
            vec![
                HighlightStyle::Filled,
                HighlightStyle::Squircle,
                HighlightStyle::Ring,
                HighlightStyle::Halo
            ]
        );
    }

    #[test]
    fn highlight_color_wraps_around_palette() {
        let mut h = CursorHighlightState::default();
        assert_eq!(h.cycle_color(), "red");
        for _ in 0..8 {
            h.cycle_color();
        }
        assert_eq!(h.color, palette::YELLOW);
    }

    #[test]
    fn highlight_sanitize_clamps_opacity_and_radius() {
        let h = CursorHighlightState {
            radius: 500.0,
            opacity: 0.0,
            ..CursorHighlightState::default()
        }
        .sanitized();
        assert_eq!(h.radius, HIGHLIGHT_RADIUS_MAX);
        assert_eq!(h.opacity, HIGHLIGHT_OPACITY_MIN);
    }
}
