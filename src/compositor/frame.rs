use crate::annotation::model::AnnotationElement;
use crate::compositor::annotation::{draw_annotation, draw_annotations};
use crate::compositor::highlight::draw_highlight;
use crate::compositor::raster::{Rgba, RgbaBuffer};
use crate::compositor::spotlight::{draw_spotlight, LiveZoom};
use crate::geometry::Point;
use crate::magnifier::transform::ViewTransform;
use crate::magnifier::view::render_magnified;
use crate::mode::state::{CursorHighlightState, SpotlightState};

/// What sits under every overlay layer.
#[derive(Debug, Clone, Copy)]
pub enum FrameBase<'a> {
    /// Fully transparent: the live desktop shows through.
    Clear,
    /// Opaque drawing board.
    Board(Rgba),
    /// The captured frame under a view transform (zoom window).
    Magnified {
        image: &'a RgbaBuffer,
        transform: &'a ViewTransform,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct SpotlightLayer<'a> {
    pub state: &'a SpotlightState,
    pub center: Point,
    pub live: Option<LiveZoom<'a>>,
}

#[derive(Debug, Clone, Copy)]
pub struct HighlightLayer<'a> {
    pub state: &'a CursorHighlightState,
    pub center: Point,
}

/// Everything one overlay frame shows, in view coordinates.
#[derive(Debug, Clone, Copy)]
pub struct FrameLayers<'a> {
    pub base: FrameBase<'a>,
    pub spotlight: Option<SpotlightLayer<'a>>,
    pub annotations: &'a [AnnotationElement],
    pub in_progress: Option<&'a AnnotationElement>,
    pub highlight: Option<HighlightLayer<'a>>,
}

impl<'a> FrameLayers<'a> {
    pub fn new(base: FrameBase<'a>) -> Self {
        Self {
            base,
            spotlight: None,
            annotations: &[],
            in_progress: None,
            highlight: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.base, FrameBase::Clear)
            && self.spotlight.is_none()
            && self.annotations.is_empty()
            && self.in_progress.is_none()
            && self.highlight.is_none()
    }
}

/// Paints `layers` into `target` back to front: base, spotlight, committed annotations,
/// the annotation being drawn, cursor highlight.
pub fn compose_frame(target: &mut RgbaBuffer, layers: &FrameLayers<'_>) {
    match layers.base {
        FrameBase::Clear => target.clear(Rgba::TRANSPARENT),
        FrameBase::Board(color) => target.clear(color),
        FrameBase::Magnified { image, transform } => render_magnified(target, image, transform),
    }

    if let Some(spotlight) = layers.spotlight {
        draw_spotlight(target, spotlight.state, spotlight.center, spotlight.live);
    }

    draw_annotations(target, layers.annotations);
    if let Some(element) = layers.in_progress {
        draw_annotation(target, element);
    }

    if let Some(highlight) = layers.highlight {
        draw_highlight(target, highlight.state, highlight.center);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::model::{palette, Tool};
    use crate::geometry::Vec2;
    use crate::mode::state::HighlightStyle;

    fn pen_stroke(color: Rgba, from: Point, to: Point) -> AnnotationElement {
        let mut element = AnnotationElement::new(Tool::Pen, color, 6.0, from);
        element.extend_to(to);
        element
    }

    #[test]
    fn clear_base_leaves_transparent_pixels() {
        let mut target = RgbaBuffer::new(20, 20, Rgba::WHITE);
        compose_frame(&mut target, &FrameLayers::new(FrameBase::Clear));
        assert_eq!(target.pixel(5, 5), Rgba::TRANSPARENT);
    }

    #[test]
    fn annotations_draw_above_spotlight_mask() {
        let mut target = RgbaBuffer::new(200, 200, Rgba::TRANSPARENT);
        let spotlight = SpotlightState {
            radius: 50.0,
            ..SpotlightState::default()
        };
        let strokes = [pen_stroke(palette::RED, Point::new(5.0, 190.0), Point::new(60.0, 190.0))];
        let mut layers = FrameLayers::new(FrameBase::Clear);
        layers.spotlight = Some(SpotlightLayer {
            state: &spotlight,
            center: Point::new(100.0, 100.0),
            live: None,
        });
        layers.annotations = &strokes;
        compose_frame(&mut target, &layers);

        let stroke = target.pixel(30, 190);
        assert_eq!((stroke.r, stroke.a), (255, 255));
        assert_eq!(target.pixel(100, 100).a, 0);
        assert_eq!(target.pixel(2, 2).a, 191);
    }

    #[test]
    fn highlight_is_topmost() {
        let mut target = RgbaBuffer::new(100, 100, Rgba::TRANSPARENT);
        let strokes = [pen_stroke(palette::BLUE, Point::new(10.0, 50.0), Point::new(90.0, 50.0))];
        let highlight = CursorHighlightState {
            style: HighlightStyle::Filled,
            opacity: 1.0,
            color: palette::YELLOW,
            ..CursorHighlightState::default()
        };
        let mut layers = FrameLayers::new(FrameBase::Board(Rgba::WHITE));
        layers.annotations = &strokes;
        layers.highlight = Some(HighlightLayer {
            state: &highlight,
            center: Point::new(50.0, 50.0),
        });
        compose_frame(&mut target, &layers);

        let center = target.pixel(50, 50);
        assert!(center.r > center.b, "highlight tint over the blue stroke: {center:?}");
        assert_eq!(target.pixel(95, 5), Rgba::WHITE);
    }

    #[test]
    fn in_progress_element_is_drawn_after_committed() {
        let mut target = RgbaBuffer::new(60, 20, Rgba::TRANSPARENT);
        let committed = [pen_stroke(palette::RED, Point::new(0.0, 10.0), Point::new(60.0, 10.0))];
        let live = pen_stroke(palette::GREEN, Point::new(30.0, 0.0), Point::new(30.0, 20.0));
        let mut layers = FrameLayers::new(FrameBase::Clear);
        layers.annotations = &committed;
        layers.in_progress = Some(&live);
        compose_frame(&mut target, &layers);
        assert_eq!(target.pixel(30, 10), palette::GREEN);
    }

    #[test]
    fn magnified_base_fills_outside_black() {
        let image = RgbaBuffer::new(40, 40, Rgba::WHITE);
        let transform = ViewTransform::new(Vec2::new(40.0, 40.0));
        let mut target = RgbaBuffer::new(40, 40, Rgba::TRANSPARENT);
        compose_frame(
            &mut target,
            &FrameLayers::new(FrameBase::Magnified {
                image: &image,
                transform: &transform,
            }),
        );
        assert_eq!(target.pixel(20, 20), Rgba::WHITE);
    }
}
