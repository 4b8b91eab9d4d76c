//! Points, rectangles and the one place where coordinate spaces are converted.
//!
//! Three spaces exist in the engine:
//! * **screen**: global desktop pixels, y grows downwards, origin at the primary display;
//! * **view**: pixels local to an overlay surface (`screen - surface origin`);
//! * **image**: pixels of a [`CapturedFrame`](crate::capture::CapturedFrame), which can
//!   differ from view pixels by the display scale factor.
//!
//! Backends that report y-up coordinates go through [`CoordinateSpace::with_y_up`]; nothing
//! else in the crate flips axes.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

pub type Point = Vec2;

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).length()
    }

    pub fn round_i32(self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;
    fn div(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Integer rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl ScreenRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn contains(&self, point: (i32, i32)) -> bool {
        point.0 >= self.x
            && point.0 < self.x + self.width
            && point.1 >= self.y
            && point.1 < self.y + self.height
    }

    pub fn intersect(&self, other: ScreenRect) -> Option<ScreenRect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = (self.x + self.width).min(other.x + other.width);
        let y1 = (self.y + self.height).min(other.y + other.height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(ScreenRect::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Square of side `2 * half_extent` centered on `center`.
    pub fn around(center: Point, half_extent: f32) -> ScreenRect {
        let half = half_extent.max(1.0);
        let x0 = (center.x - half).floor() as i32;
        let y0 = (center.y - half).floor() as i32;
        let side = (half * 2.0).ceil() as i32;
        ScreenRect::new(x0, y0, side, side)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x as f32, self.y as f32)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    pub fn center(&self) -> Point {
        self.origin() + self.size() / 2.0
    }
}

pub fn select_rect_for_point(rects: &[ScreenRect], point: (i32, i32)) -> Option<ScreenRect> {
    rects.iter().copied().find(|rect| rect.contains(point))
}

pub fn global_to_local(point: (i32, i32), origin: (i32, i32)) -> (i32, i32) {
    (point.0 - origin.0, point.1 - origin.1)
}

pub fn flip_y(point: Point, height: f32) -> Point {
    Point::new(point.x, height - point.y)
}

/// Maps between screen space and the view space of one surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateSpace {
    bounds: ScreenRect,
    y_up: bool,
}

impl CoordinateSpace {
    pub fn new(bounds: ScreenRect) -> Self {
        Self {
            bounds,
            y_up: false,
        }
    }

    pub fn with_y_up(bounds: ScreenRect) -> Self {
        Self { bounds, y_up: true }
    }

    pub fn bounds(&self) -> ScreenRect {
        self.bounds
    }

    pub fn view_size(&self) -> Vec2 {
        self.bounds.size()
    }

    pub fn screen_to_view(&self, point: Point) -> Point {
        let local = point - self.bounds.origin();
        if self.y_up {
            flip_y(local, self.bounds.height as f32)
        } else {
            local
        }
    }

    pub fn view_to_screen(&self, point: Point) -> Point {
        let local = if self.y_up {
            flip_y(point, self.bounds.height as f32)
        } else {
            point
        };
        local + self.bounds.origin()
    }

    /// Converts a view point to the pixel grid of an image that covers the whole view.
    pub fn view_to_image(&self, point: Point, image_size: (u32, u32)) -> Point {
        let view = self.view_size();
        if view.x <= 0.0 || view.y <= 0.0 {
            return point;
        }
        Point::new(
            point.x * image_size.0 as f32 / view.x,
            point.y * image_size.1 as f32 / view.y,
        )
    }
}
