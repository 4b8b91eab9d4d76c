use crate::geometry::{Point, Vec2};

pub const MIN_SCALE: f32 = 1.0;
pub const MAX_SCALE: f32 = 10.0;
/// Scale factor of one discrete zoom step (key press or scroll notch).
pub const ZOOM_STEP: f32 = 1.15;

/// Scale and pan of the captured image inside a view of fixed size.
///
/// The image is drawn scaled about the view centre and then shifted by `offset`; the
/// offset is clamped so the image always covers the whole view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    scale: f32,
    offset: Vec2,
    view_size: Vec2,
}

impl ViewTransform {
    pub fn new(view_size: Vec2) -> Self {
        Self {
            scale: MIN_SCALE,
            offset: Vec2::ZERO,
            view_size,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn view_size(&self) -> Vec2 {
        self.view_size
    }

    pub fn is_zoomed(&self) -> bool {
        self.scale > MIN_SCALE
    }

    fn center(&self) -> Point {
        self.view_size / 2.0
    }

    /// Largest allowed `|offset|` per axis at the current scale.
    pub fn max_offset(&self) -> Vec2 {
        self.view_size * ((self.scale - 1.0) / 2.0)
    }

    pub fn clamp_offset(&self, offset: Vec2) -> Vec2 {
        let max = self.max_offset();
        let clamp_axis = |value: f32, limit: f32| {
            if value.is_finite() {
                value.clamp(-limit, limit)
            } else {
                0.0
            }
        };
        Vec2::new(clamp_axis(offset.x, max.x), clamp_axis(offset.y, max.y))
    }

    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset = self.clamp_offset(offset);
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.set_offset(self.offset + delta);
    }

    /// Sets the scale while keeping the image point under `at` fixed on screen.
    pub fn set_scale_at(&mut self, scale: f32, at: Point) {
        if !scale.is_finite() {
            return;
        }
        let new_scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        let ratio = new_scale / self.scale;
        let anchor = at - self.center() - self.offset;
        let offset = self.offset - anchor * (ratio - 1.0);
        self.scale = new_scale;
        self.offset = self.clamp_offset(offset);
    }

    pub fn zoom_in(&mut self, at: Point, factor: f32) {
        if factor > 0.0 {
            self.set_scale_at(self.scale * factor, at);
        }
    }

    pub fn zoom_out(&mut self, at: Point, factor: f32) {
        if factor > 0.0 {
            self.set_scale_at(self.scale / factor, at);
        }
    }

    /// Trackpad magnification; positive values zoom in.
    pub fn pinch(&mut self, at: Point, magnification: f32) {
        let factor = 1.0 + magnification;
        if factor > 0.0 {
            self.set_scale_at(self.scale * factor, at);
        }
    }

    pub fn reset(&mut self) {
        self.scale = MIN_SCALE;
        self.offset = Vec2::ZERO;
    }

    /// View position of the image's top-left corner.
    pub fn image_origin(&self) -> Point {
        (self.view_size - self.view_size * self.scale) / 2.0 + self.offset
    }

    /// Unscaled image position shown at view point `p`.
    pub fn view_to_image(&self, p: Point) -> Point {
        (p - self.image_origin()) / self.scale
    }

    pub fn image_to_view(&self, q: Point) -> Point {
        self.image_origin() + q * self.scale
    }

    /// Offset that puts the image point currently under `p` in the middle of the view.
    pub fn centering_offset(&self, p: Point) -> Vec2 {
        let image_point = self.view_to_image(p);
        self.clamp_offset((self.center() - image_point) * self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transform() -> ViewTransform {
        ViewTransform::new(Vec2::new(1920.0, 1080.0))
    }

    #[test]
    fn zoom_keeps_point_under_cursor() {
        let mut t = transform();
        let at = Point::new(300.0, 200.0);
        let before = t.view_to_image(at);
        t.zoom_in(at, 2.0);
        let after = t.view_to_image(at);
        assert!((before - after).length() < 1e-3);
        assert_eq!(t.scale(), 2.0);
    }

    #[test]
    fn scale_is_clamped() {
        let mut t = transform();
        t.zoom_in(Point::ZERO, 100.0);
        assert_eq!(t.scale(), MAX_SCALE);
        t.zoom_out(Point::ZERO, 1000.0);
        assert_eq!(t.scale(), MIN_SCALE);
        assert_eq!(t.offset(), Vec2::ZERO);
    }

    #[test]
    fn pan_is_clamped_to_image_bounds() {
        let mut t = transform();
        t.set_scale_at(3.0, Point::new(960.0, 540.0));
        t.pan(Vec2::new(1e6, -1e6));
        assert_eq!(t.offset(), Vec2::new(1920.0, -1080.0));
        t.pan(Vec2::new(f32::NAN, 0.0));
        assert_eq!(t.offset().x, 0.0);
    }

    #[test]
    fn pan_at_scale_one_has_no_effect() {
        let mut t = transform();
        t.pan(Vec2::new(50.0, 50.0));
        assert_eq!(t.offset(), Vec2::ZERO);
    }

    #[test]
    fn pinch_multiplies_by_one_plus_magnification() {
        let mut t = transform();
        t.pinch(Point::new(960.0, 540.0), 0.5);
        assert_eq!(t.scale(), 1.5);
        t.pinch(Point::new(960.0, 540.0), -1.5);
        assert_eq!(t.scale(), 1.5);
    }

    #[test]
    fn centering_offset_centres_image_point() {
        let mut t = transform();
        t.set_scale_at(4.0, Point::new(960.0, 540.0));
        let p = Point::new(1000.0, 600.0);
        let image_point = t.view_to_image(p);
        t.set_offset(t.centering_offset(p));
        let shown = t.image_to_view(image_point);
        assert!((shown - Point::new(960.0, 540.0)).length() < 1e-2);
    }
}
