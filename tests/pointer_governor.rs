use present_pen::geometry::{Point, Vec2};
use present_pen::pointer::intercept::{MockInterceptor, PointerEvent, PointerEventKind};
use present_pen::pointer::PointerSpeedGovernor;

fn motion(delta: Vec2) -> PointerEvent {
    PointerEvent::motion(PointerEventKind::Move, Point::new(500.0, 500.0), delta)
}

#[test]
fn scales_motion_then_passes_through_after_stop() {
    let (interceptor, handle) = MockInterceptor::new();
    let mut governor = PointerSpeedGovernor::new(Box::new(interceptor));
    governor.start(0.3).expect("start");

    let slowed = handle.deliver(motion(Vec2::new(10.0, 10.0)));
    assert!((slowed.delta.x - 3.0).abs() < 1e-4);
    assert!((slowed.delta.y - 3.0).abs() < 1e-4);

    governor.stop();
    governor.stop();
    let raw = handle.deliver(motion(Vec2::new(10.0, 10.0)));
    assert_eq!(raw.delta, Vec2::new(10.0, 10.0));
    assert_eq!(handle.release_count(), 1);
}

#[test]
fn clicks_are_never_scaled() {
    let (interceptor, handle) = MockInterceptor::new();
    let mut governor = PointerSpeedGovernor::new(Box::new(interceptor));
    governor.start(0.5).expect("start");
    let click = PointerEvent::motion(
        PointerEventKind::LeftDown,
        Point::new(5.0, 5.0),
        Vec2::new(8.0, 8.0),
    );
    assert_eq!(handle.deliver(click), click);
}
