use crate::geometry::{Point, Vec2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Same color with its alpha multiplied by `factor`.
    pub fn with_opacity(self, factor: f32) -> Self {
        let a = (self.a as f32 * factor.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    pub fn lerp(self, other: Rgba, t: f32) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| -> u8 { (a as f32 + (b as f32 - a as f32) * t).round() as u8 };
        Rgba {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }
}

/// Straight-alpha RGBA8 pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaBuffer {
    pub fn new(width: u32, height: u32, fill: Rgba) -> Self {
        let mut pixels = vec![0u8; (width as usize) * (height as usize) * 4];
        for chunk in pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[fill.r, fill.g, fill.b, fill.a]);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != (width as usize) * (height as usize) * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn clear(&mut self, fill: Rgba) {
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[fill.r, fill.g, fill.b, fill.a]);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        let idx = ((y as usize) * (self.width as usize) + x as usize) * 4;
        Rgba {
            r: self.pixels[idx],
            g: self.pixels[idx + 1],
            b: self.pixels[idx + 2],
            a: self.pixels[idx + 3],
        }
    }

    pub fn get(&self, x: i32, y: i32) -> Option<Rgba> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(self.pixel(x as u32, y as u32))
    }

    pub fn put(&mut self, x: u32, y: u32, color: Rgba) {
        let idx = ((y as usize) * (self.width as usize) + x as usize) * 4;
        self.pixels[idx..idx + 4].copy_from_slice(&[color.r, color.g, color.b, color.a]);
    }

    /// Nearest-neighbour sample at a fractional pixel position.
    pub fn sample_nearest(&self, x: f32, y: f32) -> Option<Rgba> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        self.get(x.floor() as i32, y.floor() as i32)
    }

    /// Src-over blends `color` into the pixel at `(x, y)` with the given coverage.
    pub fn blend(&mut self, x: i32, y: i32, color: Rgba, coverage: f32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        if coverage <= 0.0 || color.a == 0 {
            return;
        }
        let top = if coverage >= 1.0 {
            color
        } else {
            color.with_opacity(coverage)
        };
        let idx = ((y as usize) * (self.width as usize) + x as usize) * 4;
        let px = &mut self.pixels[idx..idx + 4];
        let out = blend_pixel(Rgba::rgba(px[0], px[1], px[2], px[3]), top);
        px.copy_from_slice(&[out.r, out.g, out.b, out.a]);
    }

    pub fn blend_buffer(&mut self, top: &RgbaBuffer) {
        if self.size() != top.size() {
            return;
        }
        for (dst, src) in self
            .pixels
            .chunks_exact_mut(4)
            .zip(top.pixels.chunks_exact(4))
        {
            let out = blend_pixel(
                Rgba::rgba(dst[0], dst[1], dst[2], dst[3]),
                Rgba::rgba(src[0], src[1], src[2], src[3]),
            );
            dst.copy_from_slice(&[out.r, out.g, out.b, out.a]);
        }
    }

    /// Fills every pixel touched by `shape` with `paint`, anti-aliased on a one pixel band.
    pub fn fill_shape(&mut self, shape: &Shape, paint: &Paint) {
        let Some((x0, y0, x1, y1)) = self.clip_bounds(shape.bounds()) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                let p = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                let coverage = coverage_from_distance(shape.signed_distance(p));
                if coverage > 0.0 {
                    self.blend(x, y, paint.color_at(p), coverage);
                }
            }
        }
    }

    /// Fills the even-odd union of `shapes`: pixels covered by an odd number of shapes.
    pub fn fill_even_odd(&mut self, shapes: &[Shape], paint: &Paint) {
        let Some(bounds) = shapes
            .iter()
            .map(Shape::bounds)
            .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)))
        else {
            return;
        };
        let Some((x0, y0, x1, y1)) = self.clip_bounds(bounds) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                let p = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                let coverage = shapes.iter().fold(0.0_f32, |acc, shape| {
                    let c = coverage_from_distance(shape.signed_distance(p));
                    acc + c - 2.0 * acc * c
                });
                if coverage > 0.0 {
                    self.blend(x, y, paint.color_at(p), coverage);
                }
            }
        }
    }

    /// Strokes a connected run of segments so that overlapping joints are blended once.
    pub fn stroke_polyline(&mut self, points: &[Point], width: f32, color: Rgba) {
        let half = (width / 2.0).max(0.5);
        match points {
            [] => {}
            [single] => self.fill_shape(
                &Shape::Circle {
                    center: *single,
                    radius: half,
                },
                &Paint::Solid(color),
            ),
            _ => {
                let mut min = points[0];
                let mut max = points[0];
                for p in points {
                    min = Point::new(min.x.min(p.x), min.y.min(p.y));
                    max = Point::new(max.x.max(p.x), max.y.max(p.y));
                }
                let bounds = (min.x - half - 1.0, min.y - half - 1.0, max.x + half + 1.0, max.y + half + 1.0);
                let Some((x0, y0, x1, y1)) = self.clip_bounds(bounds) else {
                    return;
                };
                for y in y0..y1 {
                    for x in x0..x1 {
                        let p = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                        let distance = points
                            .windows(2)
                            .map(|seg| point_segment_distance(p, seg[0], seg[1]))
                            .fold(f32::MAX, f32::min);
                        let coverage = coverage_from_distance(distance - half);
                        if coverage > 0.0 {
                            self.blend(x, y, color, coverage);
                        }
                    }
                }
            }
        }
    }

    /// Writes this buffer as premultiplied BGRA, the layout `UpdateLayeredWindow` expects.
    pub fn write_premultiplied_bgra(&self, out: &mut [u8]) {
        for (src, dst) in self.pixels.chunks_exact(4).zip(out.chunks_exact_mut(4)) {
            let a = src[3] as u16;
            dst[0] = ((src[2] as u16 * a + 127) / 255) as u8;
            dst[1] = ((src[1] as u16 * a + 127) / 255) as u8;
            dst[2] = ((src[0] as u16 * a + 127) / 255) as u8;
            dst[3] = src[3];
        }
    }

    fn clip_bounds(&self, bounds: (f32, f32, f32, f32)) -> Option<(i32, i32, i32, i32)> {
        let x0 = (bounds.0.floor() as i32).max(0);
        let y0 = (bounds.1.floor() as i32).max(0);
        let x1 = (bounds.2.ceil() as i32).min(self.width as i32);
        let y1 = (bounds.3.ceil() as i32).min(self.height as i32);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0, y0, x1, y1))
    }
}

pub fn blend_pixel(bottom: Rgba, top: Rgba) -> Rgba {
    let sa = top.a as f32 / 255.0;
    let da = bottom.a as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    if out_a <= f32::EPSILON {
        return Rgba::TRANSPARENT;
    }

    let blend = |s: u8, d: u8| -> u8 {
        (((s as f32 * sa) + (d as f32 * da * (1.0 - sa))) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8
    };

    Rgba {
        r: blend(top.r, bottom.r),
        g: blend(top.g, bottom.g),
        b: blend(top.b, bottom.b),
        a: (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    }
}

fn coverage_from_distance(signed_distance: f32) -> f32 {
    (0.5 - signed_distance).clamp(0.0, 1.0)
}

pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f32 {
    let ab = b - a;
    let len_sq = ab.x * ab.x + ab.y * ab.y;
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * ab.x + (p.y - a.y) * ab.y) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Axis-aligned rectangle in fractional pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectF {
    pub origin: Point,
    pub size: Vec2,
}

impl RectF {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    pub fn from_corners(a: Point, b: Point) -> Self {
        let min = Point::new(a.x.min(b.x), a.y.min(b.y));
        let max = Point::new(a.x.max(b.x), a.y.max(b.y));
        Self {
            origin: min,
            size: max - min,
        }
    }

    pub fn centered(center: Point, size: Vec2) -> Self {
        Self {
            origin: center - size / 2.0,
            size,
        }
    }

    pub fn center(&self) -> Point {
        self.origin + self.size / 2.0
    }

    pub fn max(&self) -> Point {
        self.origin + self.size
    }
}

/// Shapes described by a signed distance (negative inside).
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rect(RectF),
    Circle { center: Point, radius: f32 },
    Ring { center: Point, radius: f32, width: f32 },
    RoundedRect { rect: RectF, radius: f32 },
    RoundedRectOutline { rect: RectF, radius: f32, width: f32 },
    Capsule { start: Point, end: Point, width: f32 },
    Triangle([Point; 3]),
}

impl Shape {
    pub fn signed_distance(&self, p: Point) -> f32 {
        match self {
            Shape::Rect(rect) => rounded_rect_distance(p, rect, 0.0),
            Shape::Circle { center, radius } => p.distance(*center) - radius,
            Shape::Ring {
                center,
                radius,
                width,
            } => (p.distance(*center) - radius).abs() - width / 2.0,
            Shape::RoundedRect { rect, radius } => rounded_rect_distance(p, rect, *radius),
            Shape::RoundedRectOutline {
                rect,
                radius,
                width,
            } => rounded_rect_distance(p, rect, *radius).abs() - width / 2.0,
            Shape::Capsule { start, end, width } => {
                point_segment_distance(p, *start, *end) - width / 2.0
            }
            Shape::Triangle(points) => triangle_distance(p, points),
        }
    }

    fn bounds(&self) -> (f32, f32, f32, f32) {
        let pad = 1.0;
        match self {
            Shape::Rect(rect) | Shape::RoundedRect { rect, .. } => (
                rect.origin.x - pad,
                rect.origin.y - pad,
                rect.max().x + pad,
                rect.max().y + pad,
            ),
            Shape::RoundedRectOutline { rect, width, .. } => {
                let grow = width / 2.0 + pad;
                (
                    rect.origin.x - grow,
                    rect.origin.y - grow,
                    rect.max().x + grow,
                    rect.max().y + grow,
                )
            }
            Shape::Circle { center, radius } => (
                center.x - radius - pad,
                center.y - radius - pad,
                center.x + radius + pad,
                center.y + radius + pad,
            ),
            Shape::Ring {
                center,
                radius,
                width,
            } => {
                let r = radius + width / 2.0 + pad;
                (center.x - r, center.y - r, center.x + r, center.y + r)
            }
            Shape::Capsule { start, end, width } => {
                let grow = width / 2.0 + pad;
                (
                    start.x.min(end.x) - grow,
                    start.y.min(end.y) - grow,
                    start.x.max(end.x) + grow,
                    start.y.max(end.y) + grow,
                )
            }
            Shape::Triangle(points) => {
                let xs = points.iter().map(|p| p.x);
                let ys = points.iter().map(|p| p.y);
                (
                    xs.clone().fold(f32::MAX, f32::min) - pad,
                    ys.clone().fold(f32::MAX, f32::min) - pad,
                    xs.fold(f32::MIN, f32::max) + pad,
                    ys.fold(f32::MIN, f32::max) + pad,
                )
            }
        }
    }
}

fn rounded_rect_distance(p: Point, rect: &RectF, radius: f32) -> f32 {
    let half = rect.size / 2.0;
    let radius = radius.clamp(0.0, half.x.min(half.y).max(0.0));
    let local = p - rect.center();
    let qx = local.x.abs() - half.x + radius;
    let qy = local.y.abs() - half.y + radius;
    let outside = Vec2::new(qx.max(0.0), qy.max(0.0)).length();
    let inside = qx.max(qy).min(0.0);
    outside + inside - radius
}

fn triangle_distance(p: Point, tri: &[Point; 3]) -> f32 {
    let edge = tri
        .iter()
        .zip(tri.iter().cycle().skip(1))
        .map(|(a, b)| point_segment_distance(p, *a, *b))
        .fold(f32::MAX, f32::min);
    let cross = |a: Point, b: Point| (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    let d0 = cross(tri[0], tri[1]);
    let d1 = cross(tri[1], tri[2]);
    let d2 = cross(tri[2], tri[0]);
    let has_neg = d0 < 0.0 || d1 < 0.0 || d2 < 0.0;
    let has_pos = d0 > 0.0 || d1 > 0.0 || d2 > 0.0;
    if has_neg && has_pos {
        edge
    } else {
        -edge
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(Rgba),
    /// Top-to-bottom gradient across `[top_y, bottom_y]`.
    Vertical {
        top_y: f32,
        bottom_y: f32,
        top: Rgba,
        bottom: Rgba,
    },
    /// Piecewise linear radial gradient; `stops` hold `(distance, color)` sorted by distance.
    Radial { center: Point, stops: Vec<(f32, Rgba)> },
}

impl Paint {
    pub fn color_at(&self, p: Point) -> Rgba {
        match self {
            Paint::Solid(color) => *color,
            Paint::Vertical {
                top_y,
                bottom_y,
                top,
                bottom,
            } => {
                let span = (bottom_y - top_y).max(f32::EPSILON);
                top.lerp(*bottom, (p.y - top_y) / span)
            }
            Paint::Radial { center, stops } => radial_color(stops, p.distance(*center)),
        }
    }
}

fn radial_color(stops: &[(f32, Rgba)], distance: f32) -> Rgba {
    let Some(first) = stops.first() else {
        return Rgba::TRANSPARENT;
    };
    if distance <= first.0 {
        return first.1;
    }
    for pair in stops.windows(2) {
        let (d0, c0) = pair[0];
        let (d1, c1) = pair[1];
        if distance <= d1 {
            let span = (d1 - d0).max(f32::EPSILON);
            return c0.lerp(c1, (distance - d0) / span);
        }
    }
    stops.last().map(|s| s.1).unwrap_or(Rgba::TRANSPARENT)
}
