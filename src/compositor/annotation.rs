use crate::annotation::model::{AnnotationElement, Tool};
use crate::compositor::font::draw_text;
use crate::compositor::raster::{Paint, RgbaBuffer, Shape};

pub const HIGHLIGHTER_ALPHA: f32 = 0.5;
pub const HIGHLIGHTER_WIDTH_FACTOR: f32 = 3.0;
pub const TEXT_HEIGHT_FACTOR: f32 = 8.0;

pub fn draw_annotations<'a>(
    target: &mut RgbaBuffer,
    elements: impl IntoIterator<Item = &'a AnnotationElement>,
) {
    for element in elements {
        draw_annotation(target, element);
    }
}

pub fn draw_annotation(target: &mut RgbaBuffer, element: &AnnotationElement) {
    let width = element.stroke_width;
    let paint = Paint::Solid(element.color);
    match element.tool {
        Tool::Pen => target.stroke_polyline(&element.points, width, element.color),
        Tool::Highlighter => target.stroke_polyline(
            &element.points,
            width * HIGHLIGHTER_WIDTH_FACTOR,
            element.color.with_opacity(HIGHLIGHTER_ALPHA),
        ),
        Tool::Line | Tool::Arrow => {
            let (Some(start), Some(end)) = (element.first_point(), element.last_point()) else {
                return;
            };
            target.fill_shape(&Shape::Capsule { start, end, width }, &paint);
            if element.tool == Tool::Arrow {
                if let Some(head) = element.arrow_head() {
                    target.fill_shape(&Shape::Triangle(head), &paint);
                }
            }
        }
        Tool::Rectangle => {
            if let Some(rect) = element.bounding_rect() {
                target.fill_shape(
                    &Shape::RoundedRectOutline {
                        rect,
                        radius: 0.0,
                        width,
                    },
                    &paint,
                );
            }
        }
        Tool::Circle => {
            if let Some((center, radius)) = element.circle() {
                target.fill_shape(
                    &Shape::Ring {
                        center,
                        radius,
                        width,
                    },
                    &paint,
                );
            }
        }
        Tool::Text => {
            let (Some(origin), Some(text)) = (element.first_point(), element.text.as_deref())
            else {
                return;
            };
            draw_text(target, origin, text, width * TEXT_HEIGHT_FACTOR, element.color);
        }
    }
}
