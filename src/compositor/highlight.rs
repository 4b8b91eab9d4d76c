use crate::compositor::raster::{Paint, RectF, RgbaBuffer, Shape};
use crate::geometry::{Point, Vec2};
use crate::mode::state::{CursorHighlightState, HighlightStyle};

const RING_WIDTH: f32 = 3.0;
const THIN_RING_WIDTH: f32 = 2.5;

/// Draws the cursor highlight glyph centred on `center`.
///
/// The style's own alpha values are given for the default opacity of 0.5 and scale
/// linearly with `state.opacity`.
pub fn draw_highlight(target: &mut RgbaBuffer, state: &CursorHighlightState, center: Point) {
    let r = state.radius;
    let gain = state.opacity * 2.0;
    let tint = |alpha: f32| state.color.with_opacity((alpha * gain).min(1.0));

    match state.style {
        HighlightStyle::Ring => {
            target.fill_shape(
                &Shape::Ring {
                    center,
                    radius: r,
                    width: RING_WIDTH,
                },
                &Paint::Solid(tint(0.5)),
            );
        }
        HighlightStyle::Halo => {
            target.fill_shape(
                &Shape::Circle {
                    center,
                    radius: r * 1.2,
                },
                &Paint::Radial {
                    center,
                    stops: vec![
                        (r * 0.3, tint(0.0)),
                        (r * 0.6, tint(0.1)),
                        (r * 0.9, tint(0.3)),
                        (r * 1.2, tint(0.0)),
                    ],
                },
            );
            target.fill_shape(
                &Shape::Ring {
                    center,
                    radius: r,
                    width: THIN_RING_WIDTH,
                },
                &Paint::Vertical {
                    top_y: center.y - r,
                    bottom_y: center.y + r,
                    top: tint(0.9),
                    bottom: tint(0.6),
                },
            );
            target.fill_shape(
                &Shape::Circle {
                    center,
                    radius: r * 0.8,
                },
                &Paint::Radial {
                    center,
                    stops: vec![
                        (0.0, tint(0.15)),
                        (r * 0.4, tint(0.05)),
                        (r * 0.8, tint(0.0)),
                    ],
                },
            );
        }
        HighlightStyle::Filled => {
            target.fill_shape(&Shape::Circle { center, radius: r }, &Paint::Solid(tint(0.4)));
        }
        HighlightStyle::Squircle => {
            let rect = RectF::centered(center, Vec2::new(r * 1.8, r * 1.8));
            target.fill_shape(
                &Shape::RoundedRect {
                    rect,
                    radius: r * 0.4,
                },
                &Paint::Vertical {
                    top_y: rect.origin.y,
                    bottom_y: rect.max().y,
                    top: tint(0.25),
                    bottom: tint(0.1),
                },
            );
            target.fill_shape(
                &Shape::RoundedRectOutline {
                    rect,
                    radius: r * 0.4,
                    width: THIN_RING_WIDTH,
                },
                &Paint::Solid(tint(0.5)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::model::palette;
    use crate::compositor::raster::Rgba;

    fn highlight(style: HighlightStyle) -> CursorHighlightState {
        CursorHighlightState {
            radius: 30.0,
            color: palette::RED,
            opacity: 0.5,
            style,
        }
    }

    #[test]
    fn ring_is_hollow() {
        let mut buf = RgbaBuffer::new(100, 100, Rgba::TRANSPARENT);
        draw_highlight(&mut buf, &highlight(HighlightStyle::Ring), Point::new(50.0, 50.0));
        assert_eq!(buf.pixel(50, 50).a, 0);
        assert!(buf.pixel(50, 20).a > 100);
    }

    #[test]
    fn filled_disk_is_translucent() {
        let mut buf = RgbaBuffer::new(100, 100, Rgba::TRANSPARENT);
        draw_highlight(&mut buf, &highlight(HighlightStyle::Filled), Point::new(50.0, 50.0));
        let center = buf.pixel(50, 50);
        assert_eq!((center.r, center.a), (255, 102));
    }

    #[test]
    fn opacity_scales_glyph_alpha() {
        let mut dim = RgbaBuffer::new(100, 100, Rgba::TRANSPARENT);
        let mut bright = dim.clone();
        let mut state = highlight(HighlightStyle::Filled);
        state.opacity = 0.25;
        draw_highlight(&mut dim, &state, Point::new(50.0, 50.0));
        state.opacity = 1.0;
        draw_highlight(&mut bright, &state, Point::new(50.0, 50.0));
        assert!(dim.pixel(50, 50).a < bright.pixel(50, 50).a);
    }

    #[test]
    fn halo_glows_beyond_the_ring() {
        let mut buf = RgbaBuffer::new(100, 100, Rgba::TRANSPARENT);
        draw_highlight(&mut buf, &highlight(HighlightStyle::Halo), Point::new(50.0, 50.0));
        assert!(buf.pixel(50, 50 - 33).a > 0);
        assert_eq!(buf.pixel(0, 0).a, 0);
    }

    #[test]
    fn squircle_has_outline_and_soft_fill() {
        let mut buf = RgbaBuffer::new(100, 100, Rgba::TRANSPARENT);
        draw_highlight(&mut buf, &highlight(HighlightStyle::Squircle), Point::new(50.0, 50.0));
        let fill = buf.pixel(50, 50).a;
        let edge = buf.pixel(50, 23).a;
        assert!(fill > 0 && edge > fill);
    }
}
