use crate::capture::CapturedFrame;
use crate::compositor::raster::{RgbaBuffer, Rgba};
use crate::geometry::{Point, Vec2};
use crate::input::{InputEvent, Key};
use crate::magnifier::follow::FollowAnimation;
use crate::magnifier::transform::{ViewTransform, ZOOM_STEP};

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragPan {
    start: Point,
    offset_at_start: Vec2,
}

/// One magnification session: the frozen frame plus the interactive view over it.
#[derive(Debug)]
pub struct MagnifierSession {
    frame: CapturedFrame,
    transform: ViewTransform,
    follow: FollowAnimation,
    follow_cursor: bool,
    drag: Option<DragPan>,
    last_pointer: Point,
    zoom_step: f32,
}

impl MagnifierSession {
    pub fn new(frame: CapturedFrame) -> Self {
        let view_size = frame.rect.size();
        Self {
            transform: ViewTransform::new(view_size),
            last_pointer: view_size / 2.0,
            frame,
            follow: FollowAnimation::default(),
            follow_cursor: false,
            drag: None,
            zoom_step: ZOOM_STEP,
        }
    }

    /// Factor applied per scroll notch or `+`/`-` press.
    pub fn set_zoom_step(&mut self, step: f32) {
        if step.is_finite() && step > 1.0 {
            self.zoom_step = step;
        }
    }

    pub fn frame(&self) -> &CapturedFrame {
        &self.frame
    }

    pub fn transform(&self) -> &ViewTransform {
        &self.transform
    }

    pub fn view_size(&self) -> Vec2 {
        self.transform.view_size()
    }

    pub fn last_pointer(&self) -> Point {
        self.last_pointer
    }

    pub fn zoom_in(&mut self, at: Point, factor: f32) {
        self.transform.zoom_in(at, factor);
    }

    pub fn zoom_out(&mut self, at: Point, factor: f32) {
        self.transform.zoom_out(at, factor);
    }

    pub fn reset_zoom(&mut self) {
        self.transform.reset();
        self.follow.stop();
        self.drag = None;
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.transform.pan(delta);
    }

    pub fn begin_drag(&mut self, at: Point) {
        self.drag = Some(DragPan {
            start: at,
            offset_at_start: self.transform.offset(),
        });
    }

    pub fn drag_to(&mut self, at: Point) -> bool {
        let Some(drag) = self.drag else {
            return false;
        };
        self.transform
            .set_offset(drag.offset_at_start + (at - drag.start));
        true
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn follow_cursor_enabled(&self) -> bool {
        self.follow_cursor
    }

    pub fn set_follow_cursor(&mut self, enabled: bool) {
        self.follow_cursor = enabled;
        if !enabled {
            self.follow.stop();
        }
    }

    /// Aims the follow animation at `view_point` (no-op unless follow-cursor is on).
    pub fn follow_cursor(&mut self, view_point: Point) {
        self.last_pointer = view_point;
        if self.follow_cursor && self.drag.is_none() {
            self.follow.retarget(&self.transform, view_point);
        }
    }

    /// Advances the follow animation by one 60 Hz step. Returns `true` if the view moved.
    pub fn step_follow(&mut self) -> bool {
        self.follow.step(&mut self.transform)
    }

    pub fn is_following(&self) -> bool {
        self.follow.is_running()
    }

    /// Zoom and pan input while the zoom window is not drawing. Returns `true` on change.
    pub fn handle_input(&mut self, event: &InputEvent) -> bool {
        if let Some(position) = event.position() {
            self.last_pointer = position;
        }
        let before = self.transform;
        match event {
            InputEvent::PointerDown { position, .. } => {
                self.begin_drag(*position);
                return false;
            }
            InputEvent::PointerMove { position, .. } => {
                if !self.drag_to(*position) {
                    self.follow_cursor(*position);
                }
            }
            InputEvent::PointerUp { position, .. } => {
                self.drag_to(*position);
                self.end_drag();
            }
            InputEvent::Scroll {
                position, delta, ..
            } => {
                if *delta > 0.0 {
                    self.zoom_in(*position, self.zoom_step);
                } else if *delta < 0.0 {
                    self.zoom_out(*position, self.zoom_step);
                }
            }
            InputEvent::Pinch {
                position,
                magnification,
            } => self.transform.pinch(*position, *magnification),
            InputEvent::Key { key, modifiers } if !modifiers.ctrl => match key {
                Key::Plus => self.zoom_in(self.last_pointer, self.zoom_step),
                Key::Minus => self.zoom_out(self.last_pointer, self.zoom_step),
                Key::Char('0') => self.reset_zoom(),
                _ => {}
            },
            InputEvent::Key { .. } | InputEvent::Text(_) => {}
        }
        self.transform != before
    }

    /// Draws the frame scaled and panned into `target`, black where the image does not reach.
    pub fn render(&self, target: &mut RgbaBuffer) {
        render_magnified(target, self.frame.image(), &self.transform);
    }

    /// Maps a view point to the matching screen point of the captured frame.
    pub fn view_to_screen(&self, view_point: Point) -> Point {
        self.frame.rect.origin() + self.transform.view_to_image(view_point)
    }
}

/// Nearest-neighbour rendering of `image` under `transform`. `target` is the view; the
/// image may have more pixels than the view when the display is scaled.
pub fn render_magnified(target: &mut RgbaBuffer, image: &RgbaBuffer, transform: &ViewTransform) {
    target.clear(Rgba::BLACK);
    let view = transform.view_size();
    if view.x <= 0.0 || view.y <= 0.0 || image.width == 0 || image.height == 0 {
        return;
    }
    let px_per_view = Vec2::new(
        image.width as f32 / view.x,
        image.height as f32 / view.y,
    );
    let to_target = Vec2::new(
        view.x / target.width.max(1) as f32,
        view.y / target.height.max(1) as f32,
    );

    let source_index = |dest: u32, dest_to_view: f32, axis_origin: f32, ratio: f32, limit: u32| {
        let view_coord = (dest as f32 + 0.5) * dest_to_view;
        let image_coord = (view_coord - axis_origin) / transform.scale() * ratio;
        if image_coord < 0.0 {
            return None;
        }
        let index = image_coord.floor() as u32;
        (index < limit).then_some(index)
    };

    let origin = transform.image_origin();
    let columns: Vec<Option<u32>> = (0..target.width)
        .map(|x| source_index(x, to_target.x, origin.x, px_per_view.x, image.width))
        .collect();

    let row_bytes = target.width as usize * 4;
    for y in 0..target.height {
        let Some(sy) = source_index(y, to_target.y, origin.y, px_per_view.y, image.height) else {
            continue;
        };
        let src_row = sy as usize * image.width as usize * 4;
        let dst_row = y as usize * row_bytes;
        for (x, sx) in columns.iter().enumerate() {
            let Some(sx) = sx else {
                continue;
            };
            let src = src_row + *sx as usize * 4;
            let dst = dst_row + x * 4;
            target.pixels[dst..dst + 3].copy_from_slice(&image.pixels[src..src + 3]);
            target.pixels[dst + 3] = 255;
        }
    }
}
