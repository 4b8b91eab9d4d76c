use present_pen::geometry::{Point, Vec2};
use present_pen::magnifier::transform::{MAX_SCALE, ZOOM_STEP};
use present_pen::magnifier::ViewTransform;

const VIEW: Vec2 = Vec2::new(1920.0, 1080.0);

#[test]
fn pan_never_uncovers_the_view() {
    let deltas = [
        Vec2::new(5_000.0, -5_000.0),
        Vec2::new(-37.5, 12.0),
        Vec2::new(0.25, 900.0),
        Vec2::new(-10_000.0, -10_000.0),
    ];
    for scale in [1.0, 1.15, 2.0, 3.7, MAX_SCALE] {
        let mut transform = ViewTransform::new(VIEW);
        transform.set_scale_at(scale, VIEW / 2.0);
        for delta in deltas {
            transform.pan(delta);
            let limit = VIEW * ((transform.scale() - 1.0) / 2.0);
            let offset = transform.offset();
            assert!(offset.x.abs() <= limit.x + 1e-3, "x {offset:?} at scale {scale}");
            assert!(offset.y.abs() <= limit.y + 1e-3, "y {offset:?} at scale {scale}");
        }
    }
}

#[test]
fn unzoomed_view_cannot_pan() {
    let mut transform = ViewTransform::new(VIEW);
    transform.pan(Vec2::new(120.0, -40.0));
    assert_eq!(transform.offset(), Vec2::ZERO);
}

#[test]
fn zoom_in_then_out_keeps_point_under_cursor() {
    let mut transform = ViewTransform::new(VIEW);
    transform.set_scale_at(2.0, VIEW / 2.0);
    let cursor = Point::new(1300.0, 700.0);
    let before_scale = transform.scale();
    let image_point = transform.view_to_image(cursor);

    transform.zoom_in(cursor, ZOOM_STEP);
    let after_in = transform.image_to_view(image_point);
    assert!(after_in.distance(cursor) < 1e-2);

    transform.zoom_out(cursor, ZOOM_STEP);
    assert!((transform.scale() - before_scale).abs() < 1e-5);
    assert!(transform.image_to_view(image_point).distance(cursor) < 1e-2);
}

#[test]
fn scale_is_clamped() {
    let mut transform = ViewTransform::new(VIEW);
    for _ in 0..50 {
        transform.zoom_in(VIEW / 2.0, ZOOM_STEP);
    }
    assert_eq!(transform.scale(), MAX_SCALE);
    for _ in 0..50 {
        transform.zoom_out(VIEW / 2.0, ZOOM_STEP);
    }
    assert_eq!(transform.scale(), 1.0);
    assert_eq!(transform.offset(), Vec2::ZERO);
}
