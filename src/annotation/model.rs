use crate::compositor::raster::{RectF, Rgba};
use crate::geometry::Point;
use serde::{Deserialize, Serialize};

pub const ARROW_HEAD_LENGTH: f32 = 35.0;
pub const ARROW_HEAD_ANGLE: f32 = std::f32::consts::PI / 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Pen,
    Highlighter,
    Line,
    Arrow,
    Rectangle,
    Circle,
    Text,
}

impl Tool {
    /// Freehand tools keep every sampled point; shape tools only need the first and last.
    pub fn is_freehand(self) -> bool {
        matches!(self, Tool::Pen | Tool::Highlighter)
    }
}

pub mod palette {
    use crate::compositor::raster::Rgba;

    pub const RED: Rgba = Rgba::rgb(255, 0, 0);
    pub const GREEN: Rgba = Rgba::rgb(50, 205, 50);
    pub const BLUE: Rgba = Rgba::rgb(30, 144, 255);
    pub const YELLOW: Rgba = Rgba::rgb(255, 255, 0);
    pub const ORANGE: Rgba = Rgba::rgb(255, 165, 0);
    pub const PINK: Rgba = Rgba::rgb(255, 105, 180);
    pub const PURPLE: Rgba = Rgba::rgb(128, 0, 128);
    pub const CYAN: Rgba = Rgba::rgb(0, 255, 255);
    pub const WHITE: Rgba = Rgba::WHITE;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationElement {
    pub tool: Tool,
    pub points: Vec<Point>,
    pub color: Rgba,
    pub stroke_width: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl AnnotationElement {
    pub fn new(tool: Tool, color: Rgba, stroke_width: f32, start: Point) -> Self {
        Self {
            tool,
            points: vec![start],
            color,
            stroke_width,
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Adds a point while the gesture is in progress. Shape tools replace their end point.
    pub fn extend_to(&mut self, point: Point) {
        if self.tool.is_freehand() || self.points.len() < 2 {
            self.points.push(point);
        } else if let Some(last) = self.points.last_mut() {
            *last = point;
        }
    }

    pub fn first_point(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn last_point(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// Normalised rectangle spanned by the first and last point.
    pub fn bounding_rect(&self) -> Option<RectF> {
        Some(RectF::from_corners(self.first_point()?, self.last_point()?))
    }

    /// Center and radius: the circle is centred on the first point and passes through the last.
    pub fn circle(&self) -> Option<(Point, f32)> {
        let center = self.first_point()?;
        Some((center, center.distance(self.last_point()?)))
    }

    /// Triangle of the arrow head at the last point, or `None` for a zero length arrow.
    pub fn arrow_head(&self) -> Option<[Point; 3]> {
        let from = self.first_point()?;
        let to = self.last_point()?;
        let d = to - from;
        if d.length() <= f32::EPSILON {
            return None;
        }
        let angle = d.y.atan2(d.x);
        let wing = |offset: f32| {
            let a = angle + std::f32::consts::PI + offset;
            Point::new(
                to.x + ARROW_HEAD_LENGTH * a.cos(),
                to.y + ARROW_HEAD_LENGTH * a.sin(),
            )
        };
        Some([to, wing(-ARROW_HEAD_ANGLE), wing(ARROW_HEAD_ANGLE)])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundBoard {
    #[default]
    Transparent,
    Whiteboard,
    Blackboard,
}

impl BackgroundBoard {
    pub fn fill(self) -> Option<Rgba> {
        match self {
            BackgroundBoard::Transparent => None,
            BackgroundBoard::Whiteboard => Some(Rgba::WHITE),
            BackgroundBoard::Blackboard => Some(Rgba::rgb(26, 26, 26)),
        }
    }

    /// Selecting the active board again returns to transparent.
    pub fn toggled(self, board: BackgroundBoard) -> BackgroundBoard {
        if self == board {
            BackgroundBoard::Transparent
        } else {
            board
        }
    }
}

/// Tool, color and width currently selected for new annotations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolSelection {
    pub tool: Tool,
    pub color: Rgba,
    pub stroke_width: f32,
}

impl Default for ToolSelection {
    fn default() -> Self {
        Self {
            tool: Tool::Pen,
            color: palette::RED,
            stroke_width: 3.0,
        }
    }
}

impl ToolSelection {
    pub fn sanitized(mut self) -> Self {
        if !self.stroke_width.is_finite() {
            self.stroke_width = 3.0;
        }
        self.stroke_width = self.stroke_width.clamp(1.0, 50.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_is_normalised_from_first_and_last_point() {
        let mut element =
            AnnotationElement::new(Tool::Rectangle, palette::RED, 3.0, Point::new(110.0, 60.0));
        element.extend_to(Point::new(50.0, 50.0));
        element.extend_to(Point::new(10.0, 10.0));
        assert_eq!(element.points.len(), 2);
        let rect = element.bounding_rect().expect("rect");
        assert_eq!(rect.origin, Point::new(10.0, 10.0));
        assert_eq!((rect.size.x, rect.size.y), (100.0, 50.0));
    }

    #[test]
    fn pen_keeps_every_point() {
        let mut element = AnnotationElement::new(Tool::Pen, palette::BLUE, 3.0, Point::ZERO);
        for i in 1..5 {
            element.extend_to(Point::new(i as f32, 0.0));
        }
        assert_eq!(element.points.len(), 5);
    }

    #[test]
    fn arrow_head_points_back_along_the_shaft() {
        let mut element = AnnotationElement::new(Tool::Arrow, palette::RED, 3.0, Point::ZERO);
        element.extend_to(Point::new(100.0, 0.0));
        let [tip, left, right] = element.arrow_head().expect("head");
        assert_eq!(tip, Point::new(100.0, 0.0));
        assert!(left.x < 100.0 && right.x < 100.0);
        assert!((left.y + right.y).abs() < 1e-3);
        assert!((tip.distance(left) - ARROW_HEAD_LENGTH).abs() < 1e-3);
    }

    #[test]
    fn zero_length_arrow_has_no_head() {
        let element = AnnotationElement::new(Tool::Arrow, palette::RED, 3.0, Point::ZERO);
        assert!(element.arrow_head().is_none());
    }

    #[test]
    fn board_toggle_returns_to_transparent() {
        let board = BackgroundBoard::Transparent.toggled(BackgroundBoard::Whiteboard);
        assert_eq!(board, BackgroundBoard::Whiteboard);
        assert_eq!(board.toggled(BackgroundBoard::Whiteboard), BackgroundBoard::Transparent);
        assert_eq!(board.toggled(BackgroundBoard::Blackboard), BackgroundBoard::Blackboard);
    }
}
