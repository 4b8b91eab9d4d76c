use crate::geometry::{Point, Vec2};
use crate::magnifier::transform::ViewTransform;
use std::time::Duration;

pub const FOLLOW_LERP: f32 = 0.08;
pub const FOLLOW_SNAP_DISTANCE: f32 = 0.5;
pub const FOLLOW_TICK: Duration = Duration::from_micros(16_667);

/// Eases the view offset toward the position that centres the image under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FollowAnimation {
    target: Option<Vec2>,
}

impl FollowAnimation {
    pub fn target(&self) -> Option<Vec2> {
        self.target
    }

    pub fn is_running(&self) -> bool {
        self.target.is_some()
    }

    /// Aims at the cursor. Has no effect while the view is not zoomed.
    pub fn retarget(&mut self, transform: &ViewTransform, cursor: Point) {
        if !transform.is_zoomed() {
            self.target = None;
            return;
        }
        let target = transform.centering_offset(cursor);
        if self.target.is_none() {
            let offset = transform.offset();
            if (target.x - offset.x).abs() < FOLLOW_SNAP_DISTANCE
                && (target.y - offset.y).abs() < FOLLOW_SNAP_DISTANCE
            {
                return;
            }
        }
        self.target = Some(target);
    }

    /// One 60 Hz step. Returns `true` when the offset moved.
    pub fn step(&mut self, transform: &mut ViewTransform) -> bool {
        let Some(target) = self.target else {
            return false;
        };
        if !transform.is_zoomed() {
            self.target = None;
            return false;
        }
        let offset = transform.offset();
        let remaining = target - offset;
        if remaining.x.abs() < FOLLOW_SNAP_DISTANCE && remaining.y.abs() < FOLLOW_SNAP_DISTANCE {
            transform.set_offset(target);
            self.target = None;
            return remaining != Vec2::ZERO;
        }
        transform.set_offset(offset + remaining * FOLLOW_LERP);
        true
    }

    pub fn stop(&mut self) {
        self.target = None;
    }
}
