use criterion::{black_box, criterion_group, criterion_main, Criterion};
use present_pen::annotation::{AnnotationElement, Tool};
use present_pen::capture::mock_pattern;
use present_pen::compositor::spotlight::LiveZoom;
use present_pen::compositor::{
    compose_frame, FrameBase, FrameLayers, HighlightLayer, Rgba, RgbaBuffer, SpotlightLayer,
};
use present_pen::geometry::{Point, ScreenRect, Vec2};
use present_pen::magnifier::ViewTransform;
use present_pen::mode::{CursorHighlightState, SpotlightState};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

fn build_annotations(count: usize) -> Vec<AnnotationElement> {
    let tools = [Tool::Pen, Tool::Rectangle, Tool::Arrow, Tool::Circle, Tool::Line];
    (0..count)
        .map(|i| {
            let start = Point::new((i * 37 % 1200) as f32, (i * 53 % 650) as f32);
            let mut element =
                AnnotationElement::new(tools[i % tools.len()], Rgba::rgb(220, 40, 40), 3.0, start);
            for step in 1..12 {
                element.extend_to(start + Vec2::new(step as f32 * 6.0, step as f32 * 3.0));
            }
            element
        })
        .collect()
}

fn bench_compose(c: &mut Criterion) {
    let mut target = RgbaBuffer::new(WIDTH, HEIGHT, Rgba::TRANSPARENT);
    let annotations = build_annotations(40);
    let spotlight = SpotlightState::default();
    let highlight = CursorHighlightState::default();
    let center = Point::new(640.0, 360.0);
    let live_rect = ScreenRect::around(center, spotlight.capture_radius());
    let live_image = mock_pattern(live_rect);

    c.bench_function("overlay_spotlight_highlight_720p", |b| {
        b.iter(|| {
            let mut layers = FrameLayers::new(FrameBase::Clear);
            layers.spotlight = Some(SpotlightLayer {
                state: &spotlight,
                center,
                live: Some(LiveZoom {
                    image: &live_image,
                    focus: center - live_rect.origin(),
                    zoom: spotlight.zoom_level,
                }),
            });
            layers.highlight = Some(HighlightLayer {
                state: &highlight,
                center,
            });
            compose_frame(black_box(&mut target), &layers);
        })
    });

    c.bench_function("drawing_40_annotations_720p", |b| {
        b.iter(|| {
            let mut layers = FrameLayers::new(FrameBase::Clear);
            layers.annotations = &annotations;
            compose_frame(black_box(&mut target), &layers);
        })
    });

    let image = mock_pattern(ScreenRect::new(0, 0, WIDTH as i32, HEIGHT as i32));
    let mut transform = ViewTransform::new(Vec2::new(WIDTH as f32, HEIGHT as f32));
    transform.set_scale_at(2.5, Point::new(300.0, 200.0));
    c.bench_function("magnified_2_5x_720p", |b| {
        b.iter(|| {
            let layers = FrameLayers::new(FrameBase::Magnified {
                image: &image,
                transform: &transform,
            });
            compose_frame(black_box(&mut target), &layers);
        })
    });
}

criterion_group!(benches, bench_compose);
criterion_main!(benches);
