use crate::error::EngineResult;
use crate::pointer::intercept::{InputInterceptor, InterceptRule};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MIN_MULTIPLIER: f32 = 0.1;
pub const MAX_MULTIPLIER: f32 = 1.0;
pub const DEFAULT_MULTIPLIER: f32 = 0.3;

pub fn clamp_multiplier(m: f32) -> f32 {
    if m.is_nan() {
        DEFAULT_MULTIPLIER
    } else {
        m.clamp(MIN_MULTIPLIER, MAX_MULTIPLIER)
    }
}

/// Multiplier shared with the interception callback, which runs on the OS input thread.
#[derive(Debug, Clone)]
struct SharedMultiplier(Arc<AtomicU32>);

impl SharedMultiplier {
    fn new(m: f32) -> Self {
        Self(Arc::new(AtomicU32::new(m.to_bits())))
    }

    fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn set(&self, m: f32) {
        self.0.store(m.to_bits(), Ordering::Relaxed);
    }
}

/// Scales physical pointer motion while active.
pub struct PointerSpeedGovernor {
    interceptor: Box<dyn InputInterceptor>,
    multiplier: SharedMultiplier,
    active: bool,
}

impl PointerSpeedGovernor {
    pub fn new(interceptor: Box<dyn InputInterceptor>) -> Self {
        Self {
            interceptor,
            multiplier: SharedMultiplier::new(DEFAULT_MULTIPLIER),
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn multiplier(&self) -> f32 {
        self.multiplier.get()
    }

    /// Changes the multiplier; an active governor picks it up on the next event.
    pub fn set_multiplier(&mut self, m: f32) {
        let m = clamp_multiplier(m);
        self.multiplier.set(m);
        debug!(multiplier = m, "pointer speed multiplier set");
    }

    pub fn start(&mut self, multiplier: f32) -> EngineResult<()> {
        if self.active {
            info!("pointer speed governor already active");
            return Ok(());
        }
        self.set_multiplier(multiplier);
        let shared = self.multiplier.clone();
        let rule = InterceptRule::new(
            |event| event.kind.is_motion(),
            move |mut event| {
                event.delta = event.delta * shared.get();
                event
            },
        );
        if let Err(err) = self.interceptor.intercept(rule) {
            warn!(?err, "pointer speed governor could not start");
            return Err(err);
        }
        self.active = true;
        info!(multiplier = self.multiplier(), "pointer speed governor started");
        Ok(())
    }

    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.interceptor.release();
        self.active = false;
        info!("pointer speed governor stopped");
    }
}

impl Drop for PointerSpeedGovernor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, Permission};
    use crate::geometry::{Point, Vec2};
    use crate::pointer::intercept::{MockInterceptor, PointerEvent, PointerEventKind};

    fn moved(dx: f32, dy: f32) -> PointerEvent {
        PointerEvent::motion(PointerEventKind::Move, Point::new(50.0, 50.0), Vec2::new(dx, dy))
    }

    #[test]
    fn scales_motion_and_leaves_clicks_alone() {
        let (interceptor, handle) = MockInterceptor::new();
        let mut governor = PointerSpeedGovernor::new(Box::new(interceptor));
        governor.start(0.5).expect("start");
        let out = handle.deliver(moved(4.0, -8.0));
        assert_eq!(out.delta, Vec2::new(2.0, -4.0));
        assert_eq!(out.position, Point::new(50.0, 50.0));

        let click = PointerEvent::motion(PointerEventKind::LeftDown, Point::ZERO, Vec2::new(3.0, 3.0));
        assert_eq!(handle.deliver(click), click);
    }

    #[test]
    fn multiplier_change_applies_while_active() {
        let (interceptor, handle) = MockInterceptor::new();
        let mut governor = PointerSpeedGovernor::new(Box::new(interceptor));
        governor.start(1.0).expect("start");
        governor.set_multiplier(0.1);
        let out = handle.deliver(moved(10.0, 20.0));
        assert!((out.delta.x - 1.0).abs() < 1e-6);
        assert!((out.delta.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn start_twice_installs_once_and_stop_is_idempotent() {
        let (interceptor, handle) = MockInterceptor::new();
        let mut governor = PointerSpeedGovernor::new(Box::new(interceptor));
        governor.start(0.3).expect("start");
        governor.start(0.9).expect("second start");
        assert!((governor.multiplier() - 0.3).abs() < 1e-6);
        governor.stop();
        governor.stop();
        assert_eq!((handle.install_count(), handle.release_count()), (1, 1));
    }

    #[test]
    fn denied_permission_has_no_effect() {
        let (interceptor, handle) = MockInterceptor::new();
        handle.deny_permission();
        let mut governor = PointerSpeedGovernor::new(Box::new(interceptor));
        let err = governor.start(0.3).expect_err("denied");
        assert!(matches!(
            err,
            EngineError::PermissionDenied(Permission::InputMonitoring)
        ));
        assert!(!governor.is_active());
        assert_eq!(handle.deliver(moved(10.0, 10.0)).delta, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn multiplier_is_clamped() {
        assert_eq!(clamp_multiplier(0.0), MIN_MULTIPLIER);
        assert_eq!(clamp_multiplier(4.0), MAX_MULTIPLIER);
        assert_eq!(clamp_multiplier(f32::NAN), DEFAULT_MULTIPLIER);
    }
}
