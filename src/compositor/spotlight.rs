use crate::compositor::font::{draw_text, measure_text};
use crate::compositor::raster::{Paint, RectF, RgbaBuffer, Rgba, Shape};
use crate::geometry::Point;
use crate::mode::state::SpotlightState;

pub const MASK_ALPHA: f32 = 0.75;
pub const MASK_ALPHA_LIVE_ZOOM: f32 = 0.70;
pub const BORDER_ALPHA: f32 = 0.8;
pub const BORDER_WIDTH: f32 = 3.0;
const LABEL_TEXT_HEIGHT: f32 = 10.0;
const LABEL_GAP: f32 = 12.0;
const LABEL_PADDING: (f32, f32) = (6.0, 4.0);
const LABEL_ALPHA: f32 = 0.7;

/// Magnified content for the spotlight disk. `focus` is the spotlight centre in image
/// pixels; the capture may be clipped at a display edge, so it need not be the middle of
/// the image.
#[derive(Debug, Clone, Copy)]
pub struct LiveZoom<'a> {
    pub image: &'a RgbaBuffer,
    pub focus: Point,
    pub zoom: f32,
}

/// Darkens everything except a circle around `center`. With `live` the circle shows the
/// magnified region, a white border and the zoom label.
pub fn draw_spotlight(
    target: &mut RgbaBuffer,
    state: &SpotlightState,
    center: Point,
    live: Option<LiveZoom<'_>>,
) {
    let radius = state.radius;
    let full = RectF::new(0.0, 0.0, target.width as f32, target.height as f32);
    let hole = Shape::Circle { center, radius };
    let mask_alpha = if live.is_some() {
        MASK_ALPHA_LIVE_ZOOM
    } else {
        MASK_ALPHA
    };
    target.fill_even_odd(
        &[Shape::Rect(full), hole],
        &Paint::Solid(Rgba::BLACK.with_opacity(mask_alpha)),
    );

    let Some(live) = live else {
        return;
    };

    draw_magnified_disk(target, &live, center, radius);
    target.fill_shape(
        &Shape::Ring {
            center,
            radius,
            width: BORDER_WIDTH,
        },
        &Paint::Solid(Rgba::WHITE.with_opacity(BORDER_ALPHA)),
    );
    draw_zoom_label(target, center, radius, live.zoom);
}

/// Parts of the disk the capture does not cover are filled black.
fn draw_magnified_disk(target: &mut RgbaBuffer, live: &LiveZoom<'_>, center: Point, radius: f32) {
    if radius <= 0.0 || !(live.zoom > 0.0) {
        return;
    }
    let x0 = ((center.x - radius).floor() as i32).max(0);
    let y0 = ((center.y - radius).floor() as i32).max(0);
    let x1 = ((center.x + radius).ceil() as i32).min(target.width as i32);
    let y1 = ((center.y + radius).ceil() as i32).min(target.height as i32);
    for y in y0..y1 {
        for x in x0..x1 {
            let p = Point::new(x as f32 + 0.5, y as f32 + 0.5);
            let coverage = (0.5 - (p.distance(center) - radius)).clamp(0.0, 1.0);
            if coverage <= 0.0 {
                continue;
            }
            let source = live.focus + (p - center) / live.zoom;
            let color = live
                .image
                .sample_nearest(source.x, source.y)
                .unwrap_or(Rgba::BLACK);
            target.blend(x, y, Rgba { a: 255, ..color }, coverage);
        }
    }
}

pub fn zoom_label(zoom: f32) -> String {
    format!("{zoom:.1}x")
}

fn draw_zoom_label(target: &mut RgbaBuffer, center: Point, radius: f32, zoom: f32) {
    let text = zoom_label(zoom);
    let (w, h) = measure_text(&text, LABEL_TEXT_HEIGHT);
    let text_origin = Point::new(center.x - w / 2.0, center.y + radius + LABEL_GAP);
    let background = RectF::new(
        text_origin.x - LABEL_PADDING.0,
        text_origin.y - LABEL_PADDING.1,
        w + LABEL_PADDING.0 * 2.0,
        h + LABEL_PADDING.1 * 2.0,
    );
    target.fill_shape(
        &Shape::RoundedRect {
            rect: background,
            radius: 4.0,
        },
        &Paint::Solid(Rgba::BLACK.with_opacity(LABEL_ALPHA)),
    );
    draw_text(target, text_origin, &text, LABEL_TEXT_HEIGHT, Rgba::WHITE);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(radius: f32) -> SpotlightState {
        SpotlightState {
            radius,
            ..SpotlightState::default()
        }
    }

    #[test]
    fn mask_leaves_hole_of_radius() {
        let mut buf = RgbaBuffer::new(400, 400, Rgba::TRANSPARENT);
        draw_spotlight(&mut buf, &state(100.0), Point::new(200.0, 200.0), None);
        assert_eq!(buf.pixel(200, 200).a, 0);
        assert_eq!(buf.pixel(200, 105).a, 0);
        assert_eq!(buf.pixel(200, 95).a, 191);
        assert_eq!(buf.pixel(0, 0).a, 191);
    }

    #[test]
    fn live_zoom_fills_disk_and_draws_border() {
        let mut buf = RgbaBuffer::new(300, 300, Rgba::TRANSPARENT);
        let region = RgbaBuffer::new(50, 50, Rgba::rgb(0, 200, 0));
        draw_spotlight(
            &mut buf,
            &state(60.0),
            Point::new(150.0, 150.0),
            Some(LiveZoom {
                image: &region,
                focus: Point::new(25.0, 25.0),
                zoom: 2.0,
            }),
        );
        assert_eq!(buf.pixel(150, 150), Rgba::rgb(0, 200, 0));
        let border = buf.pixel(150, 90);
        assert!(border.r > 150 && border.a > 200);
        let mask = buf.pixel(5, 5).a;
        assert!((178..=179).contains(&mask));
    }

    #[test]
    fn clipped_capture_is_sampled_from_its_focus() {
        let mut buf = RgbaBuffer::new(300, 300, Rgba::TRANSPARENT);
        // Left half of a 40 px capture square; the spotlight sits on its left edge.
        let mut region = RgbaBuffer::new(20, 40, Rgba::rgb(0, 0, 200));
        for y in 0..40 {
            region.put(0, y, Rgba::rgb(200, 0, 0));
        }
        draw_spotlight(
            &mut buf,
            &state(40.0),
            Point::new(100.0, 100.0),
            Some(LiveZoom {
                image: &region,
                focus: Point::new(0.5, 20.0),
                zoom: 2.0,
            }),
        );
        assert_eq!(buf.pixel(100, 100), Rgba::rgb(200, 0, 0));
        assert_eq!(buf.pixel(120, 100), Rgba::rgb(0, 0, 200));
        assert_eq!(buf.pixel(90, 100), Rgba::BLACK);
    }

    #[test]
    fn label_formats_one_decimal() {
        assert_eq!(zoom_label(1.5), "1.5x");
        assert_eq!(zoom_label(3.0), "3.0x");
    }
}
