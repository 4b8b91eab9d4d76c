use crate::annotation::gesture::DrawingSession;
use crate::annotation::model::ToolSelection;
use crate::capture::{CaptureProvider, CapturedFrame};
use crate::compositor::frame::{compose_frame, FrameBase, FrameLayers, HighlightLayer, SpotlightLayer};
use crate::compositor::raster::{Rgba, RgbaBuffer};
use crate::compositor::spotlight::LiveZoom;
use crate::error::EngineError;
use crate::geometry::{CoordinateSpace, Point, ScreenRect};
use crate::hotkey::{GlobalInput, HotkeyCommand};
use crate::input::{InputEvent, Key, Modifiers};
use crate::magnifier::follow::FOLLOW_TICK;
use crate::magnifier::transform::{ViewTransform, ZOOM_STEP};
use crate::magnifier::view::MagnifierSession;
use crate::mode::messages::{EngineSnapshot, EngineUpdate, UserNotice};
use crate::mode::state::{CursorHighlightState, HighlightStyle, Mode, SpotlightState};
use crate::overlay::surface::{OverlaySet, SurfaceFactory, SurfaceRole};
use crate::overlay::window::LayeredWindowFactory;
use crate::pointer::governor::{PointerSpeedGovernor, DEFAULT_MULTIPLIER};
use crate::pointer::intercept::{system_interceptor, InputInterceptor};
use crate::pointer::tracker::{CursorSource, PointerTracker, SystemCursorSource};
use crate::settings::PresenterSettings;
use crate::timer::{draw_countdown, timer_surface_bounds, Countdown, DEFAULT_COUNTDOWN};
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Live-zoom recapture period in Spotlight mode.
pub const LIVE_ZOOM_INTERVAL: Duration = Duration::from_micros(33_333);
const MAX_FOLLOW_STEPS_PER_TICK: u32 = 8;

const FEATURE_ZOOM: &str = "Zoom";
const FEATURE_LIVE_ZOOM: &str = "Spotlight zoom";
const FEATURE_SLOW_CURSOR: &str = "Slow cursor";
const FEATURE_OVERLAY: &str = "Overlay";
const FEATURE_TIMER: &str = "Timer";

/// OS-facing services the controller drives. Tests swap in the mock backends.
pub struct EngineServices {
    pub capture: CaptureProvider,
    pub cursor: Arc<dyn CursorSource>,
    pub interceptor: Box<dyn InputInterceptor>,
    pub surfaces: Box<dyn SurfaceFactory>,
}

impl EngineServices {
    pub fn system(settings: &PresenterSettings) -> Self {
        Self {
            capture: CaptureProvider::system().with_settle_delay(settings.capture_settle_delay()),
            cursor: Arc::new(SystemCursorSource),
            interceptor: system_interceptor(),
            surfaces: Box::new(LayeredWindowFactory),
        }
    }
}

/// Values the controller starts from, taken from the user's settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub tracker_interval: Duration,
    pub zoom_step: f32,
    pub governor_multiplier: f32,
    pub spotlight: SpotlightState,
    pub slow_cursor_in_spotlight: bool,
    pub highlight: CursorHighlightState,
    pub tool_selection: ToolSelection,
    pub timer_duration: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tracker_interval: Duration::from_millis(8),
            zoom_step: ZOOM_STEP,
            governor_multiplier: DEFAULT_MULTIPLIER,
            spotlight: SpotlightState::default(),
            slow_cursor_in_spotlight: false,
            highlight: CursorHighlightState::default(),
            tool_selection: ToolSelection::default(),
            timer_duration: DEFAULT_COUNTDOWN,
        }
    }
}

impl From<&PresenterSettings> for EngineConfig {
    fn from(settings: &PresenterSettings) -> Self {
        let mut settings = settings.clone();
        settings.sanitize();
        Self {
            tracker_interval: settings.tracker_interval(),
            zoom_step: settings.zoom_step,
            governor_multiplier: settings.governor_multiplier,
            spotlight: settings.spotlight,
            slow_cursor_in_spotlight: settings.slow_cursor_in_spotlight,
            highlight: settings.highlight,
            tool_selection: settings.annotation,
            timer_duration: settings.timer_duration(),
        }
    }
}

struct ZoomSession {
    magnifier: MagnifierSession,
    drawing: Option<DrawingSession>,
    spotlight: bool,
    highlight: bool,
    last_follow_step: Option<Instant>,
}

impl ZoomSession {
    fn space(&self) -> CoordinateSpace {
        CoordinateSpace::new(self.magnifier.frame().rect)
    }
}

struct WantedServices {
    overlay: bool,
    tracker: bool,
    governor: bool,
}

#[derive(Default)]
struct SpotlightSession {
    live: Option<CapturedFrame>,
    last_capture: Option<Instant>,
    live_disabled: bool,
}

/// Owns the active mode and everything it started. All methods run on one thread; the
/// tracker and the governor callback are the only work done elsewhere.
pub struct ModeController {
    config: EngineConfig,
    capture: CaptureProvider,
    cursor: Arc<dyn CursorSource>,
    tracker: PointerTracker,
    governor: PointerSpeedGovernor,
    governor_failed: bool,
    surfaces: Box<dyn SurfaceFactory>,
    windows: OverlaySet,
    buffers: HashMap<SurfaceRole, RgbaBuffer>,
    mode: Mode,
    cursor_highlight: bool,
    spotlight: SpotlightState,
    highlight: CursorHighlightState,
    zoom: Option<ZoomSession>,
    drawing: Option<DrawingSession>,
    spotlight_session: Option<SpotlightSession>,
    timer: Option<Countdown>,
    last_cursor: Option<Point>,
    subscribers: Vec<Sender<EngineUpdate>>,
    notified: HashSet<&'static str>,
    dirty: bool,
}

impl ModeController {
    pub fn new(services: EngineServices, config: EngineConfig) -> Self {
        let EngineServices {
            capture,
            cursor,
            interceptor,
            surfaces,
        } = services;
        let mut governor = PointerSpeedGovernor::new(interceptor);
        governor.set_multiplier(config.governor_multiplier);
        Self {
            capture,
            tracker: PointerTracker::new(Arc::clone(&cursor)),
            cursor,
            governor,
            governor_failed: false,
            surfaces,
            windows: OverlaySet::default(),
            buffers: HashMap::new(),
            mode: Mode::None,
            cursor_highlight: false,
            spotlight: config.spotlight.sanitized(),
            highlight: config.highlight.sanitized(),
            zoom: None,
            drawing: None,
            spotlight_session: None,
            timer: None,
            last_cursor: None,
            subscribers: Vec::new(),
            notified: HashSet::new(),
            dirty: false,
            config,
        }
    }

    pub fn current_mode(&self) -> Mode {
        self.mode
    }

    pub fn cursor_highlight_enabled(&self) -> bool {
        self.cursor_highlight
    }

    pub fn spotlight_state(&self) -> &SpotlightState {
        &self.spotlight
    }

    pub fn highlight_state(&self) -> &CursorHighlightState {
        &self.highlight
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker.is_running()
    }

    pub fn governor_active(&self) -> bool {
        self.governor.is_active()
    }

    /// The frozen frame behind the zoom window, if one is held.
    pub fn captured_frame(&self) -> Option<&CapturedFrame> {
        self.zoom.as_ref().map(|zoom| zoom.magnifier.frame())
    }

    pub fn zoom_transform(&self) -> Option<ViewTransform> {
        self.zoom.as_ref().map(|zoom| *zoom.magnifier.transform())
    }

    pub fn is_zoom_drawing(&self) -> bool {
        self.zoom.as_ref().is_some_and(|zoom| zoom.drawing.is_some())
    }

    /// The active drawing session: Drawing mode or drawing inside the zoom window.
    pub fn drawing(&self) -> Option<&DrawingSession> {
        self.drawing
            .as_ref()
            .or_else(|| self.zoom.as_ref().and_then(|zoom| zoom.drawing.as_ref()))
    }

    pub fn countdown(&self) -> Option<&Countdown> {
        self.timer.as_ref()
    }

    pub fn live_zoom_frame(&self) -> Option<&CapturedFrame> {
        self.spotlight_session
            .as_ref()
            .and_then(|session| session.live.as_ref())
    }

    /// Registers a listener. The current state is sent right away.
    pub fn subscribe(&mut self) -> Receiver<EngineUpdate> {
        let (tx, rx) = channel();
        let _ = tx.send(EngineUpdate::State(self.snapshot()));
        self.subscribers.push(tx);
        rx
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let zoom = self.zoom.as_ref();
        EngineSnapshot {
            mode: self.mode,
            cursor_highlight: self.cursor_highlight,
            spotlight: self.spotlight,
            highlight: self.highlight,
            zoom_scale: zoom.map(|z| z.magnifier.transform().scale()),
            zoom_drawing: zoom.is_some_and(|z| z.drawing.is_some()),
            zoom_spotlight: zoom.is_some_and(|z| z.spotlight),
            zoom_highlight: zoom.is_some_and(|z| z.highlight),
            governor_active: self.governor.is_active(),
            annotation_count: self.drawing().map(|d| d.elements().len()).unwrap_or(0),
            timer: self.timer.as_ref().map(Countdown::snapshot),
        }
    }

    fn publish(&mut self) {
        let update = EngineUpdate::State(self.snapshot());
        self.subscribers.retain(|tx| tx.send(update.clone()).is_ok());
    }

    fn notify_once(&mut self, feature: &'static str, err: &EngineError) {
        if !self.notified.insert(feature) {
            debug!(feature, ?err, "notice already shown this session");
            return;
        }
        let notice = match err.permission() {
            Some(permission) => UserNotice::permission_denied(permission, feature),
            None => UserNotice::failure(feature, err),
        };
        info!(feature, title = %notice.title, "user notice");
        let update = EngineUpdate::Notice(notice);
        self.subscribers.retain(|tx| tx.send(update.clone()).is_ok());
    }

    /// Enters `mode`, or goes to None when `mode` is already active. The previous mode is
    /// torn down before the new one starts.
    pub fn toggle(&mut self, mode: Mode) -> Mode {
        let previous = self.mode;
        self.leave_mode();
        let next = if mode == previous { Mode::None } else { mode };
        self.release_unneeded(next);
        if next != Mode::None {
            let entered = match next {
                Mode::Zoom => self.enter_zoom(),
                Mode::Drawing => self.enter_drawing(),
                Mode::Spotlight => self.enter_spotlight(),
                Mode::Timer => self.enter_timer(),
                Mode::None => true,
            };
            if !entered {
                self.leave_mode();
            }
        }
        self.reconcile();
        info!(from = previous.label(), to = self.mode.label(), "mode changed");
        self.dirty = true;
        self.render();
        self.publish();
        self.mode
    }

    pub fn toggle_cursor_highlight(&mut self) -> bool {
        if let Some(zoom) = self.zoom.as_mut() {
            zoom.highlight = !zoom.highlight;
            debug!(enabled = zoom.highlight, "in-zoom highlight toggled");
        } else {
            self.cursor_highlight = !self.cursor_highlight;
            debug!(enabled = self.cursor_highlight, "cursor highlight toggled");
            self.reconcile();
        }
        self.dirty = true;
        self.render();
        self.publish();
        self.zoom
            .as_ref()
            .map(|zoom| zoom.highlight)
            .unwrap_or(self.cursor_highlight)
    }

    /// Leaves in-zoom drawing first when it is active, otherwise goes to None and clears
    /// the cursor highlight. Pending text entry swallows the escape.
    pub fn escape(&mut self) {
        if let Some(session) = self.drawing.as_mut().filter(|s| s.wants_escape()) {
            session.handle_key(Key::Escape, Modifiers::NONE);
            self.dirty = true;
            self.render();
            return;
        }
        if let Some(zoom) = self.zoom.as_mut() {
            if let Some(mut session) = zoom.drawing.take() {
                if session.wants_escape() {
                    session.handle_key(Key::Escape, Modifiers::NONE);
                    zoom.drawing = Some(session);
                } else {
                    debug!("left in-zoom drawing");
                }
                self.dirty = true;
                self.render();
                self.publish();
                return;
            }
        }
        self.leave_mode();
        self.cursor_highlight = false;
        self.reconcile();
        info!("escape: all modes off");
        self.dirty = true;
        self.render();
        self.publish();
    }

    pub fn clear_annotations(&mut self) {
        let mut cleared = false;
        if let Some(session) = self.drawing.as_mut() {
            session.clear();
            cleared = true;
        }
        if let Some(session) = self.zoom.as_mut().and_then(|z| z.drawing.as_mut()) {
            session.clear();
            cleared = true;
        }
        if cleared {
            debug!("annotations cleared");
            self.dirty = true;
            self.render();
            self.publish();
        }
    }

    pub fn cycle_highlight_style(&mut self) -> HighlightStyle {
        let style = self.highlight.cycle_style();
        debug!(?style, "highlight style");
        self.dirty = true;
        self.render();
        self.publish();
        style
    }

    pub fn cycle_highlight_color(&mut self) -> &'static str {
        let name = self.highlight.cycle_color();
        debug!(color = name, "highlight color");
        self.dirty = true;
        self.render();
        self.publish();
        name
    }

    pub fn toggle_spotlight_zoom(&mut self) -> bool {
        self.spotlight.zoom_enabled = !self.spotlight.zoom_enabled;
        if let Some(session) = self.spotlight_session.as_mut() {
            if !self.spotlight.zoom_enabled {
                session.live = None;
                session.last_capture = None;
            }
        }
        debug!(enabled = self.spotlight.zoom_enabled, "spotlight live zoom");
        self.dirty = true;
        self.render();
        self.publish();
        self.spotlight.zoom_enabled
    }

    /// Routes a hotkey. While Zoom is active the drawing, highlight and spotlight keys act
    /// inside the zoom window instead of switching modes.
    pub fn dispatch_hotkey(&mut self, command: HotkeyCommand) {
        debug!(?command, mode = self.mode.label(), "hotkey");
        let in_zoom = self.mode == Mode::Zoom;
        match command {
            HotkeyCommand::ToggleDrawing if in_zoom => self.toggle_zoom_drawing(),
            HotkeyCommand::ToggleDrawing => {
                self.toggle(Mode::Drawing);
            }
            HotkeyCommand::ToggleZoom => {
                self.toggle(Mode::Zoom);
            }
            HotkeyCommand::ToggleHighlight => {
                self.toggle_cursor_highlight();
            }
            HotkeyCommand::ToggleSpotlight if in_zoom => self.toggle_zoom_spotlight(),
            HotkeyCommand::ToggleSpotlight => {
                self.toggle(Mode::Spotlight);
            }
            HotkeyCommand::ToggleTimer => {
                self.toggle(Mode::Timer);
            }
            HotkeyCommand::ClearAnnotations => self.clear_annotations(),
            HotkeyCommand::Escape => self.escape(),
            HotkeyCommand::CycleHighlightStyle => {
                self.cycle_highlight_style();
            }
            HotkeyCommand::CycleHighlightColor => {
                self.cycle_highlight_color();
            }
            HotkeyCommand::ToggleSpotlightZoom => {
                self.toggle_spotlight_zoom();
            }
        }
    }

    pub fn handle_global(&mut self, input: GlobalInput) {
        match input {
            GlobalInput::Command(command) => self.dispatch_hotkey(command),
            GlobalInput::Scroll { delta, modifiers } => self.scroll(delta, modifiers),
        }
    }

    fn toggle_zoom_drawing(&mut self) {
        let selection = self.config.tool_selection;
        let Some(zoom) = self.zoom.as_mut() else {
            return;
        };
        zoom.drawing = match zoom.drawing.take() {
            Some(_) => None,
            None => {
                zoom.magnifier.end_drag();
                Some(DrawingSession::new(selection))
            }
        };
        debug!(enabled = zoom.drawing.is_some(), "in-zoom drawing toggled");
        self.dirty = true;
        self.render();
        self.publish();
    }

    fn toggle_zoom_spotlight(&mut self) {
        let Some(zoom) = self.zoom.as_mut() else {
            return;
        };
        zoom.spotlight = !zoom.spotlight;
        zoom.magnifier.set_follow_cursor(zoom.spotlight);
        debug!(enabled = zoom.spotlight, "in-zoom spotlight toggled");
        self.reconcile();
        self.dirty = true;
        self.render();
        self.publish();
    }

    /// A wheel turn seen anywhere on screen. The zoom window handles its own wheel input.
    pub fn scroll(&mut self, delta: f32, modifiers: Modifiers) {
        if delta == 0.0 || self.mode == Mode::Zoom {
            return;
        }
        if self.apply_scroll(delta, modifiers) {
            self.dirty = true;
            self.render();
            self.publish();
        }
    }

    fn apply_scroll(&mut self, delta: f32, modifiers: Modifiers) -> bool {
        if modifiers.ctrl && self.cursor_highlight {
            self.highlight.scroll_radius(delta);
            return true;
        }
        if self.mode != Mode::Spotlight {
            return false;
        }
        if modifiers.shift {
            if !self.spotlight.zoom_enabled {
                return false;
            }
            self.spotlight.scroll_zoom(delta);
        } else {
            self.spotlight.scroll_radius(delta);
        }
        true
    }

    /// Routes an event as if it came from the surface of the active mode.
    pub fn handle_input(&mut self, event: &InputEvent) -> bool {
        let role = match self.mode {
            Mode::Zoom => SurfaceRole::Magnifier,
            Mode::Timer => SurfaceRole::Timer,
            Mode::None | Mode::Drawing | Mode::Spotlight => SurfaceRole::Overlay,
        };
        let changed = self.route_input(role, event, Instant::now());
        if changed {
            self.dirty = true;
            self.render();
        }
        changed
    }

    fn route_input(&mut self, role: SurfaceRole, event: &InputEvent, now: Instant) -> bool {
        // Escape is a global hotkey; handling it here as well would apply it twice.
        if matches!(event, InputEvent::Key { key: Key::Escape, .. }) {
            return false;
        }
        match (role, self.mode) {
            (SurfaceRole::Magnifier, Mode::Zoom) => self.route_zoom_input(event),
            (SurfaceRole::Overlay, Mode::Drawing) => match event {
                InputEvent::Scroll {
                    delta, modifiers, ..
                } => self.apply_scroll(*delta, *modifiers),
                _ => self
                    .drawing
                    .as_mut()
                    .is_some_and(|session| session.handle_input(event)),
            },
            (SurfaceRole::Overlay, _) => match event {
                InputEvent::Scroll {
                    delta, modifiers, ..
                } => self.apply_scroll(*delta, *modifiers),
                InputEvent::Key {
                    key: Key::Space,
                    modifiers,
                } if self.mode == Mode::Spotlight && *modifiers == Modifiers::NONE => {
                    self.toggle_spotlight_zoom();
                    true
                }
                _ => false,
            },
            (SurfaceRole::Timer, Mode::Timer) => match event {
                InputEvent::Key { key, modifiers } if !modifiers.ctrl && !modifiers.alt => self
                    .timer
                    .as_mut()
                    .is_some_and(|countdown| countdown.handle_key(*key, now)),
                _ => false,
            },
            _ => false,
        }
    }

    fn route_zoom_input(&mut self, event: &InputEvent) -> bool {
        let Some(zoom) = self.zoom.as_mut() else {
            return false;
        };
        match event {
            InputEvent::Scroll {
                delta, modifiers, ..
            } if modifiers.ctrl && zoom.highlight => {
                self.highlight.scroll_radius(*delta);
                true
            }
            // Annotations are kept in view coordinates, so the view is frozen while drawing.
            InputEvent::Scroll { .. } | InputEvent::Pinch { .. } if zoom.drawing.is_some() => {
                false
            }
            InputEvent::Scroll { .. } | InputEvent::Pinch { .. } => {
                zoom.magnifier.handle_input(event)
            }
            _ => match zoom.drawing.as_mut() {
                Some(session) => session.handle_input(event),
                None => zoom.magnifier.handle_input(event),
            },
        }
    }

    /// Periodic work: surface input, follow animation, live zoom, countdown and redraw.
    /// Returns `true` when a frame was presented.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut events = Vec::new();
        for role in self.windows.roles() {
            if let Some(surface) = self.windows.get_mut(role) {
                events.extend(surface.drain_input().into_iter().map(|event| (role, event)));
            }
        }
        for (role, event) in &events {
            if self.route_input(*role, event, now) {
                self.dirty = true;
            }
        }
        if !events.is_empty() {
            self.publish();
        }

        let cursor = self.sample_cursor();
        if cursor != self.last_cursor {
            self.last_cursor = cursor;
            if self.shows_cursor_effects() {
                self.dirty = true;
            }
        }

        self.step_follow(now, cursor);
        self.refresh_live_zoom(now, cursor);

        if let Some(countdown) = self.timer.as_mut() {
            if countdown.tick(now) {
                self.dirty = true;
                self.publish();
            }
        }

        self.render()
    }

    fn sample_cursor(&self) -> Option<Point> {
        if !self.tracker.is_running() {
            return None;
        }
        self.tracker
            .current_position()
            .or_else(|| self.cursor.cursor_position())
    }

    fn shows_cursor_effects(&self) -> bool {
        self.cursor_highlight
            || self.mode == Mode::Spotlight
            || self
                .zoom
                .as_ref()
                .is_some_and(|zoom| zoom.spotlight || zoom.highlight)
    }

    fn step_follow(&mut self, now: Instant, cursor: Option<Point>) {
        let Some(zoom) = self.zoom.as_mut() else {
            return;
        };
        if zoom.magnifier.follow_cursor_enabled() {
            if let Some(cursor) = cursor {
                let view = zoom.space().screen_to_view(cursor);
                if view != zoom.magnifier.last_pointer() {
                    zoom.magnifier.follow_cursor(view);
                }
            }
        }
        let last = zoom.last_follow_step.get_or_insert(now);
        let mut steps = 0;
        while now.saturating_duration_since(*last) >= FOLLOW_TICK {
            *last += FOLLOW_TICK;
            steps += 1;
            if zoom.magnifier.step_follow() {
                self.dirty = true;
            }
            if steps == MAX_FOLLOW_STEPS_PER_TICK {
                *last = now;
                break;
            }
        }
    }

    fn refresh_live_zoom(&mut self, now: Instant, cursor: Option<Point>) {
        if self.mode != Mode::Spotlight || !self.spotlight.zoom_enabled {
            return;
        }
        let Some(cursor) = cursor else {
            return;
        };
        let Some(session) = self.spotlight_session.as_mut() else {
            return;
        };
        if session.live_disabled {
            return;
        }
        if session
            .last_capture
            .is_some_and(|last| now.saturating_duration_since(last) < LIVE_ZOOM_INTERVAL)
        {
            return;
        }
        session.last_capture = Some(now);
        let rect = ScreenRect::around(cursor, self.spotlight.capture_radius());
        match self.capture.capture_region(rect) {
            Ok(frame) => {
                session.live = Some(frame);
                self.dirty = true;
            }
            Err(err @ EngineError::PermissionDenied(_)) => {
                warn!(?err, "live zoom disabled for this session");
                session.live_disabled = true;
                session.live = None;
                self.dirty = true;
                self.notify_once(FEATURE_LIVE_ZOOM, &err);
            }
            Err(err) => debug!(?err, "live zoom capture skipped, keeping previous frame"),
        }
    }

    /// Stops every mode and service. Used on app exit.
    pub fn shutdown(&mut self) {
        self.leave_mode();
        self.cursor_highlight = false;
        self.reconcile();
        self.windows.close_all();
        self.buffers.clear();
        self.tracker.stop();
        self.governor.stop();
        info!("presenter engine shut down");
        self.publish();
    }

    fn enter_zoom(&mut self) -> bool {
        let cursor = self.cursor.cursor_position().unwrap_or(Point::ZERO);
        let Some(display) = self.capture.display_for_point(cursor) else {
            let err = EngineError::CaptureFailed("no display found".into());
            error!(?err, "zoom unavailable");
            self.notify_once(FEATURE_ZOOM, &err);
            return false;
        };
        let frame = match self.capture.capture_screen(display, &mut self.windows) {
            Ok(frame) => frame,
            Err(err) => {
                error!(?err, "zoom capture failed");
                self.notify_once(FEATURE_ZOOM, &err);
                return false;
            }
        };
        if let Err(err) = self.open_surface(SurfaceRole::Magnifier, frame.rect, false) {
            self.notify_once(FEATURE_ZOOM, &err);
            return false;
        }
        let mut magnifier = MagnifierSession::new(frame);
        magnifier.set_zoom_step(self.config.zoom_step);
        self.zoom = Some(ZoomSession {
            magnifier,
            drawing: None,
            spotlight: false,
            highlight: self.cursor_highlight,
            last_follow_step: None,
        });
        self.mode = Mode::Zoom;
        true
    }

    fn enter_drawing(&mut self) -> bool {
        self.drawing = Some(DrawingSession::new(self.config.tool_selection));
        self.mode = Mode::Drawing;
        true
    }

    fn enter_spotlight(&mut self) -> bool {
        self.spotlight_session = Some(SpotlightSession::default());
        self.mode = Mode::Spotlight;
        true
    }

    fn enter_timer(&mut self) -> bool {
        let cursor = self.cursor.cursor_position().unwrap_or(Point::ZERO);
        let display = self
            .capture
            .display_for_point(cursor)
            .unwrap_or(ScreenRect::new(0, 0, 1920, 1080));
        if let Err(err) = self.open_surface(SurfaceRole::Timer, timer_surface_bounds(display), false)
        {
            self.notify_once(FEATURE_TIMER, &err);
            return false;
        }
        self.timer = Some(Countdown::new(self.config.timer_duration));
        self.mode = Mode::Timer;
        true
    }

    /// Drops the active mode's session and window. Shared services are settled by
    /// `reconcile`.
    fn leave_mode(&mut self) {
        match self.mode {
            Mode::None => {}
            Mode::Zoom => {
                if let Some(zoom) = self.zoom.take() {
                    debug!(rect = ?zoom.magnifier.frame().rect, "zoom frame released");
                }
                self.windows.close(SurfaceRole::Magnifier);
            }
            Mode::Drawing => {
                if let Some(mut session) = self.drawing.take() {
                    session.reset();
                }
            }
            Mode::Spotlight => {
                self.spotlight_session = None;
            }
            Mode::Timer => {
                self.timer = None;
                self.windows.close(SurfaceRole::Timer);
            }
        }
        self.buffers.retain(|role, _| *role == SurfaceRole::Overlay);
        self.mode = Mode::None;
    }

    fn services_for(&self, mode: Mode) -> WantedServices {
        let zoom_spotlight = self.zoom.as_ref().is_some_and(|zoom| zoom.spotlight);
        WantedServices {
            overlay: matches!(mode, Mode::Drawing | Mode::Spotlight)
                || (self.cursor_highlight && mode != Mode::Zoom),
            tracker: matches!(mode, Mode::Zoom | Mode::Drawing | Mode::Spotlight)
                || self.cursor_highlight,
            governor: (mode == Mode::Spotlight && self.config.slow_cursor_in_spotlight)
                || zoom_spotlight,
        }
    }

    /// Stops whatever `next` will not use, before `next` allocates anything of its own.
    fn release_unneeded(&mut self, next: Mode) {
        let wanted = self.services_for(next);
        if !wanted.overlay && self.windows.close(SurfaceRole::Overlay) {
            self.buffers.remove(&SurfaceRole::Overlay);
        }
        if !wanted.tracker && self.tracker.is_running() {
            self.tracker.stop();
            self.last_cursor = None;
        }
        if !wanted.governor && self.governor.is_active() {
            self.governor.stop();
        }
    }

    /// Starts or stops the tracker, the governor and the shared overlay so they match the
    /// current mode and highlight.
    fn reconcile(&mut self) {
        let wanted = self.services_for(self.mode);
        if wanted.overlay {
            let click_through = self.mode != Mode::Drawing;
            if let Err(err) = self.ensure_overlay(click_through) {
                self.notify_once(FEATURE_OVERLAY, &err);
                if matches!(self.mode, Mode::Drawing | Mode::Spotlight) {
                    self.leave_mode();
                }
                self.cursor_highlight = false;
            }
        } else if self.windows.close(SurfaceRole::Overlay) {
            self.buffers.remove(&SurfaceRole::Overlay);
        }

        // An overlay failure above may have left the mode.
        let wanted = self.services_for(self.mode);
        if wanted.tracker && !self.tracker.is_running() {
            self.tracker.start(self.config.tracker_interval);
        } else if !wanted.tracker && self.tracker.is_running() {
            self.tracker.stop();
            self.last_cursor = None;
        }

        if wanted.governor && !self.governor.is_active() && !self.governor_failed {
            if let Err(err) = self.governor.start(self.config.governor_multiplier) {
                self.governor_failed = true;
                self.notify_once(FEATURE_SLOW_CURSOR, &err);
            }
        } else if !wanted.governor && self.governor.is_active() {
            self.governor.stop();
        }
    }

    fn ensure_overlay(&mut self, click_through: bool) -> Result<(), EngineError> {
        if let Some(surface) = self.windows.get_mut(SurfaceRole::Overlay) {
            surface.set_click_through(click_through);
            return Ok(());
        }
        let cursor = self.cursor.cursor_position().unwrap_or(Point::ZERO);
        let display = self
            .capture
            .display_for_point(cursor)
            .ok_or_else(|| EngineError::Surface("no display for the overlay".into()))?;
        self.open_surface(SurfaceRole::Overlay, display, click_through)
    }

    fn open_surface(
        &mut self,
        role: SurfaceRole,
        bounds: ScreenRect,
        click_through: bool,
    ) -> Result<(), EngineError> {
        let mut surface = self.surfaces.create(role, bounds).map_err(|err| {
            error!(?err, ?role, "could not open surface");
            err
        })?;
        surface.set_click_through(click_through);
        surface.show();
        self.windows.insert(surface);
        Ok(())
    }

    fn render(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;
        let cursor = self.last_cursor.or_else(|| self.sample_cursor());
        let mut presented = false;
        for role in self.windows.roles() {
            let Some(bounds) = self.windows.get_mut(role).map(|surface| surface.bounds()) else {
                continue;
            };
            let mut target = self.take_buffer(role, bounds);
            match role {
                SurfaceRole::Overlay => self.compose_overlay(&mut target, bounds, cursor),
                SurfaceRole::Magnifier => self.compose_magnifier(&mut target, cursor),
                SurfaceRole::Timer => {
                    if let Some(countdown) = self.timer.as_ref() {
                        draw_countdown(&mut target, countdown);
                    }
                }
            }
            if let Some(surface) = self.windows.get_mut(role) {
                match surface.present(&target) {
                    Ok(()) => presented = true,
                    Err(err) => warn!(?err, ?role, "present failed"),
                }
            }
            self.buffers.insert(role, target);
        }
        presented
    }

    fn take_buffer(&mut self, role: SurfaceRole, bounds: ScreenRect) -> RgbaBuffer {
        let size = (bounds.width.max(0) as u32, bounds.height.max(0) as u32);
        match self.buffers.remove(&role) {
            Some(buffer) if buffer.size() == size => buffer,
            _ => RgbaBuffer::new(size.0, size.1, Rgba::TRANSPARENT),
        }
    }

    fn compose_overlay(&mut self, target: &mut RgbaBuffer, bounds: ScreenRect, cursor: Option<Point>) {
        let space = CoordinateSpace::new(bounds);
        let local = cursor.map(|p| space.screen_to_view(p));
        if self.mode == Mode::Spotlight {
            self.spotlight.center = local.unwrap_or_else(|| space.view_size() / 2.0);
        }

        let base = match self.drawing.as_ref().and_then(|s| s.board().fill()) {
            Some(fill) => FrameBase::Board(fill),
            None => FrameBase::Clear,
        };
        let mut layers = FrameLayers::new(base);
        if self.mode == Mode::Spotlight {
            let live = self
                .spotlight_session
                .as_ref()
                .and_then(|session| session.live.as_ref())
                .filter(|_| self.spotlight.zoom_enabled)
                .map(|frame| LiveZoom {
                    image: frame.image(),
                    focus: bounds.origin() + self.spotlight.center - frame.rect.origin(),
                    zoom: self.spotlight.zoom_level,
                });
            layers.spotlight = Some(SpotlightLayer {
                state: &self.spotlight,
                center: self.spotlight.center,
                live,
            });
        }
        if let Some(session) = self.drawing.as_ref() {
            layers.annotations = session.elements();
            layers.in_progress = session.in_progress();
        }
        if self.cursor_highlight {
            if let Some(center) = local {
                layers.highlight = Some(HighlightLayer {
                    state: &self.highlight,
                    center,
                });
            }
        }
        compose_frame(target, &layers);
    }

    fn compose_magnifier(&self, target: &mut RgbaBuffer, cursor: Option<Point>) {
        let Some(zoom) = self.zoom.as_ref() else {
            return;
        };
        let local = cursor.map(|p| zoom.space().screen_to_view(p));
        let mut layers = FrameLayers::new(FrameBase::Magnified {
            image: zoom.magnifier.frame().image(),
            transform: zoom.magnifier.transform(),
        });
        if zoom.spotlight {
            layers.spotlight = Some(SpotlightLayer {
                state: &self.spotlight,
                center: local.unwrap_or_else(|| zoom.magnifier.last_pointer()),
                live: None,
            });
        }
        if let Some(session) = zoom.drawing.as_ref() {
            layers.annotations = session.elements();
            layers.in_progress = session.in_progress();
        }
        if zoom.highlight {
            if let Some(center) = local {
                layers.highlight = Some(HighlightLayer {
                    state: &self.highlight,
                    center,
                });
            }
        }
        compose_frame(target, &layers);
    }
}

impl Drop for ModeController {
    fn drop(&mut self) {
        self.leave_mode();
        self.windows.close_all();
        self.tracker.stop();
        self.governor.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{MockCaptureBackend, MockCaptureHandle};
    use crate::error::Permission;
    use crate::mode::messages::Remediation;
    use crate::overlay::surface::{MockSurfaceFactory, MockSurfaceHandle};
    use crate::pointer::intercept::{MockInterceptor, MockInterceptorHandle};
    use crate::pointer::tracker::MockCursorSource;
    use std::sync::Mutex;

    const DISPLAY: ScreenRect = ScreenRect::new(0, 0, 400, 300);

    struct Harness {
        controller: ModeController,
        capture: MockCaptureHandle,
        cursor: Arc<MockCursorSource>,
        interceptor: MockInterceptorHandle,
        surfaces: MockSurfaceHandle,
    }

    fn harness(config: EngineConfig) -> Harness {
        let (backend, capture) = MockCaptureBackend::new(vec![DISPLAY]);
        let cursor = MockCursorSource::new(Some(Point::new(200.0, 150.0)));
        let (interceptor, interceptor_handle) = MockInterceptor::new();
        let (factory, surfaces) = MockSurfaceFactory::new();
        let services = EngineServices {
            capture: CaptureProvider::new(Box::new(backend)).with_settle_delay(Duration::ZERO),
            cursor: cursor.clone(),
            interceptor: Box::new(interceptor),
            surfaces: Box::new(factory),
        };
        Harness {
            controller: ModeController::new(services, config),
            capture,
            cursor,
            interceptor: interceptor_handle,
            surfaces,
        }
    }

    fn notices(rx: &Receiver<EngineUpdate>) -> Vec<UserNotice> {
        rx.try_iter()
            .filter_map(|update| match update {
                EngineUpdate::Notice(notice) => Some(notice),
                EngineUpdate::State(_) => None,
            })
            .collect()
    }

    #[test]
    fn reselecting_a_mode_turns_it_off() {
        let mut h = harness(EngineConfig::default());
        assert_eq!(h.controller.toggle(Mode::Drawing), Mode::Drawing);
        assert!(h.controller.is_tracking());
        assert_eq!(h.controller.toggle(Mode::Drawing), Mode::None);
        assert!(!h.controller.is_tracking());
        assert_eq!(h.surfaces.total_open(), 0);
    }

    #[test]
    fn switching_modes_releases_the_previous_one_first() {
        let mut h = harness(EngineConfig::default());
        h.controller.toggle(Mode::Zoom);
        assert!(h.controller.captured_frame().is_some());
        h.controller.toggle(Mode::Timer);
        assert_eq!(h.controller.current_mode(), Mode::Timer);
        assert!(h.controller.captured_frame().is_none());
        assert_eq!(h.surfaces.open_count(SurfaceRole::Magnifier), 0);
        assert_eq!(h.surfaces.open_count(SurfaceRole::Timer), 1);
        assert!(!h.controller.is_tracking());
    }

    #[test]
    fn zoom_closes_the_highlight_overlay_before_capturing() {
        let mut h = harness(EngineConfig::default());
        h.controller.toggle_cursor_highlight();
        assert!(h.surfaces.is_visible(SurfaceRole::Overlay));
        let open_during_capture = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&open_during_capture);
        let surfaces = h.surfaces.clone();
        h.capture.on_capture(move || {
            if let Ok(mut seen) = seen.lock() {
                seen.push(surfaces.open_count(SurfaceRole::Overlay));
            }
        });
        h.controller.toggle(Mode::Zoom);
        assert_eq!(h.capture.captures(), vec![DISPLAY]);
        assert_eq!(*open_during_capture.lock().expect("lock"), vec![0]);
        // The zoom window takes over the highlight.
        assert_eq!(h.surfaces.open_count(SurfaceRole::Overlay), 0);
        assert!(h.controller.snapshot().zoom_highlight);
    }

    #[test]
    fn slow_cursor_is_released_before_zoom_captures() {
        let mut h = harness(EngineConfig {
            slow_cursor_in_spotlight: true,
            ..EngineConfig::default()
        });
        h.controller.toggle(Mode::Spotlight);
        assert!(h.interceptor.is_installed());
        let hooked_during_capture = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&hooked_during_capture);
        let interceptor = h.interceptor.clone();
        let surfaces = h.surfaces.clone();
        h.capture.on_capture(move || {
            if let Ok(mut seen) = seen.lock() {
                seen.push((
                    interceptor.is_installed(),
                    surfaces.open_count(SurfaceRole::Overlay),
                ));
            }
        });
        assert_eq!(h.controller.toggle(Mode::Zoom), Mode::Zoom);
        assert_eq!(*hooked_during_capture.lock().expect("lock"), vec![(false, 0)]);
        assert!(!h.controller.governor_active());
    }

    #[test]
    fn zoom_permission_denied_notifies_once_and_stays_off() {
        let mut h = harness(EngineConfig::default());
        let rx = h.controller.subscribe();
        h.capture.fail_with_permission_denied();
        assert_eq!(h.controller.toggle(Mode::Zoom), Mode::None);
        assert_eq!(h.controller.toggle(Mode::Zoom), Mode::None);
        let notices = notices(&rx);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "Screen capture permission needed");
        assert!(!h.controller.is_tracking());
        assert_eq!(h.surfaces.total_open(), 0);
    }

    #[test]
    fn escape_leaves_zoom_drawing_before_zoom() {
        let mut h = harness(EngineConfig::default());
        h.controller.toggle(Mode::Zoom);
        h.controller.dispatch_hotkey(HotkeyCommand::ToggleDrawing);
        assert!(h.controller.is_zoom_drawing());
        h.controller.escape();
        assert_eq!(h.controller.current_mode(), Mode::Zoom);
        assert!(!h.controller.is_zoom_drawing());
        h.controller.escape();
        assert_eq!(h.controller.current_mode(), Mode::None);
    }

    #[test]
    fn escape_clears_cursor_highlight() {
        let mut h = harness(EngineConfig::default());
        h.controller.toggle_cursor_highlight();
        h.controller.toggle(Mode::Spotlight);
        h.controller.escape();
        assert_eq!(h.controller.current_mode(), Mode::None);
        assert!(!h.controller.cursor_highlight_enabled());
        assert!(!h.controller.is_tracking());
        assert_eq!(h.surfaces.total_open(), 0);
    }

    #[test]
    fn spotlight_governor_is_optional() {
        let mut h = harness(EngineConfig::default());
        h.controller.toggle(Mode::Spotlight);
        assert!(!h.controller.governor_active());

        let mut h = harness(EngineConfig {
            slow_cursor_in_spotlight: true,
            ..EngineConfig::default()
        });
        h.controller.toggle(Mode::Spotlight);
        assert!(h.controller.governor_active());
        assert!(h.interceptor.is_installed());
        h.controller.toggle(Mode::Spotlight);
        assert!(!h.interceptor.is_installed());
    }

    #[test]
    fn governor_denial_is_not_retried() {
        let mut h = harness(EngineConfig {
            slow_cursor_in_spotlight: true,
            ..EngineConfig::default()
        });
        let rx = h.controller.subscribe();
        h.interceptor.deny_permission();
        h.controller.toggle(Mode::Spotlight);
        assert_eq!(h.controller.current_mode(), Mode::Spotlight);
        assert!(!h.controller.governor_active());
        h.controller.toggle(Mode::Spotlight);
        h.controller.toggle(Mode::Spotlight);
        assert_eq!(h.interceptor.install_count(), 0);
        let notices = notices(&rx);
        assert_eq!(notices.len(), 1);
        assert_eq!(
            notices[0].remediation,
            Some(Remediation::OpenPrivacySettings(Permission::InputMonitoring))
        );
    }

    #[test]
    fn spotlight_scroll_changes_radius_and_zoom_level() {
        let mut h = harness(EngineConfig::default());
        h.controller.toggle(Mode::Spotlight);
        h.controller.scroll(1.0, Modifiers::NONE);
        assert_eq!(h.controller.spotlight_state().radius, 170.0);
        h.controller.scroll(1.0, Modifiers::shift());
        assert_eq!(h.controller.spotlight_state().zoom_level, 1.75);
        h.controller.toggle_cursor_highlight();
        h.controller.scroll(-1.0, Modifiers::ctrl());
        assert_eq!(h.controller.highlight_state().radius, 25.0);
        assert_eq!(h.controller.spotlight_state().radius, 170.0);
    }

    #[test]
    fn space_on_spotlight_surface_toggles_live_zoom() {
        let mut h = harness(EngineConfig::default());
        h.controller.toggle(Mode::Spotlight);
        assert!(h.controller.spotlight_state().zoom_enabled);
        h.controller.handle_input(&InputEvent::Key {
            key: Key::Space,
            modifiers: Modifiers::NONE,
        });
        assert!(!h.controller.spotlight_state().zoom_enabled);
    }

    #[test]
    fn live_zoom_recaptures_at_most_thirty_times_a_second() {
        let mut h = harness(EngineConfig::default());
        h.controller.toggle(Mode::Spotlight);
        let start = Instant::now();
        h.controller.tick(start);
        h.controller.tick(start + Duration::from_millis(10));
        assert_eq!(h.capture.capture_count(), 1);
        h.controller.tick(start + Duration::from_millis(40));
        assert_eq!(h.capture.capture_count(), 2);
        assert!(h.controller.live_zoom_frame().is_some());
        let rect = h.capture.captures()[1];
        assert_eq!(rect.width, 200);
    }

    #[test]
    fn live_zoom_permission_denial_stops_recapturing() {
        let mut h = harness(EngineConfig::default());
        let rx = h.controller.subscribe();
        h.controller.toggle(Mode::Spotlight);
        h.capture.fail_with_permission_denied();
        let start = Instant::now();
        h.controller.tick(start);
        h.controller.tick(start + Duration::from_millis(40));
        h.controller.tick(start + Duration::from_millis(80));
        assert_eq!(h.capture.capture_count(), 1);
        assert!(h.controller.live_zoom_frame().is_none());
        assert_eq!(h.controller.current_mode(), Mode::Spotlight);
        let notices = notices(&rx);
        assert_eq!(notices.len(), 1);
        assert!(notices[0].message.starts_with("Spotlight zoom"));
    }

    #[test]
    fn failed_live_zoom_capture_keeps_the_previous_frame() {
        let mut h = harness(EngineConfig::default());
        let rx = h.controller.subscribe();
        h.controller.toggle(Mode::Spotlight);
        let start = Instant::now();
        h.controller.tick(start);
        let first = Arc::clone(&h.controller.live_zoom_frame().expect("live frame").image);

        h.capture.fail_with_capture_error();
        h.controller.tick(start + Duration::from_millis(40));
        assert_eq!(h.capture.capture_count(), 2);
        let kept = h.controller.live_zoom_frame().expect("kept frame");
        assert!(Arc::ptr_eq(&first, &kept.image));

        h.capture.succeed();
        h.controller.tick(start + Duration::from_millis(80));
        assert_eq!(h.capture.capture_count(), 3);
        let fresh = h.controller.live_zoom_frame().expect("fresh frame");
        assert!(!Arc::ptr_eq(&first, &fresh.image));
        assert!(notices(&rx).is_empty());
    }

    #[test]
    fn live_zoom_near_the_display_edge_magnifies_around_the_cursor() {
        let mut h = harness(EngineConfig::default());
        h.cursor.set(Point::new(20.0, 150.0));
        h.controller.toggle(Mode::Spotlight);
        h.controller.tick(Instant::now());
        assert_eq!(h.capture.captures(), vec![ScreenRect::new(0, 50, 120, 200)]);

        let frame = h.surfaces.last_frame(SurfaceRole::Overlay).expect("frame");
        let center = frame.pixel(20, 150);
        assert_eq!((center.r, center.g), (20, 150));
        // 14.5 px left of the cursor at 1.5x shows the screen ~9.7 px left of it.
        assert_eq!(frame.pixel(5, 150).r, 10);
    }

    #[test]
    fn zoom_drawing_freezes_scroll_and_pinch() {
        let mut h = harness(EngineConfig::default());
        h.controller.toggle(Mode::Zoom);
        h.controller.dispatch_hotkey(HotkeyCommand::ToggleDrawing);
        let position = Point::new(200.0, 150.0);
        assert!(!h.controller.handle_input(&InputEvent::Scroll {
            position,
            delta: 1.0,
            modifiers: Modifiers::NONE,
        }));
        assert!(!h.controller.handle_input(&InputEvent::Pinch {
            position,
            magnification: 0.5,
        }));
        let scale = h.controller.zoom_transform().expect("zoom").scale();
        assert_eq!(scale, 1.0);

        h.controller.dispatch_hotkey(HotkeyCommand::ToggleDrawing);
        assert!(h.controller.handle_input(&InputEvent::Scroll {
            position,
            delta: 1.0,
            modifiers: Modifiers::NONE,
        }));
        let scale = h.controller.zoom_transform().expect("zoom").scale();
        assert!((scale - ZOOM_STEP).abs() < 1e-5);
    }

    #[test]
    fn timer_keys_from_its_surface() {
        let mut h = harness(EngineConfig::default());
        h.controller.toggle(Mode::Timer);
        h.surfaces.push_input(
            SurfaceRole::Timer,
            InputEvent::Key {
                key: Key::Char('3'),
                modifiers: Modifiers::NONE,
            },
        );
        h.surfaces.push_input(
            SurfaceRole::Timer,
            InputEvent::Key {
                key: Key::Char('1'),
                modifiers: Modifiers::ctrl(),
            },
        );
        let now = Instant::now();
        h.controller.tick(now);
        let countdown = h.controller.countdown().expect("timer");
        assert_eq!(countdown.text(), "03:00");
        assert!(h.surfaces.last_frame(SurfaceRole::Timer).is_some());
    }

    #[test]
    fn leaving_drawing_drops_annotations() {
        let mut h = harness(EngineConfig::default());
        h.controller.toggle(Mode::Drawing);
        assert_eq!(h.surfaces.is_click_through(SurfaceRole::Overlay), Some(false));
        let draw = [
            InputEvent::PointerDown {
                position: Point::new(10.0, 10.0),
                modifiers: Modifiers::NONE,
            },
            InputEvent::PointerMove {
                position: Point::new(50.0, 40.0),
                modifiers: Modifiers::NONE,
            },
            InputEvent::PointerUp {
                position: Point::new(60.0, 40.0),
                modifiers: Modifiers::NONE,
            },
        ];
        for event in &draw {
            h.controller.handle_input(event);
        }
        assert_eq!(h.controller.snapshot().annotation_count, 1);
        h.controller.toggle(Mode::Drawing);
        h.controller.toggle(Mode::Drawing);
        assert_eq!(h.controller.snapshot().annotation_count, 0);
    }

    #[test]
    fn highlight_overlay_is_click_through() {
        let mut h = harness(EngineConfig::default());
        h.controller.toggle_cursor_highlight();
        assert_eq!(h.surfaces.is_click_through(SurfaceRole::Overlay), Some(true));
        h.controller.toggle(Mode::Drawing);
        assert_eq!(h.surfaces.created_count(SurfaceRole::Overlay), 1);
        assert_eq!(h.surfaces.is_click_through(SurfaceRole::Overlay), Some(false));
        h.controller.toggle(Mode::Drawing);
        assert_eq!(h.surfaces.is_click_through(SurfaceRole::Overlay), Some(true));
    }

    #[test]
    fn spotlight_hole_follows_the_tracked_cursor() {
        let mut config = EngineConfig::default();
        config.spotlight.zoom_enabled = false;
        let mut h = harness(config);
        h.controller.toggle(Mode::Spotlight);
        h.cursor.set(Point::new(100.0, 100.0));
        let target = Point::new(100.0, 100.0);
        for _ in 0..200 {
            h.controller.tick(Instant::now());
            if h.controller.spotlight_state().center == target {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(h.controller.spotlight_state().center, target);
        let frame = h.surfaces.last_frame(SurfaceRole::Overlay).expect("frame");
        assert_eq!(frame.pixel(100, 100).a, 0);
        assert!(frame.pixel(350, 260).a > 150);
        assert_eq!(h.capture.capture_count(), 0);
    }

    #[test]
    fn overlay_failure_disables_the_mode() {
        let mut h = harness(EngineConfig::default());
        let rx = h.controller.subscribe();
        h.surfaces.fail_role(SurfaceRole::Overlay, "no compositor");
        assert_eq!(h.controller.toggle(Mode::Spotlight), Mode::None);
        assert!(!h.controller.is_tracking());
        assert_eq!(notices(&rx).len(), 1);
    }

    #[test]
    fn cycling_highlight_publishes_state() {
        let mut h = harness(EngineConfig::default());
        let rx = h.controller.subscribe();
        assert_eq!(h.controller.cycle_highlight_style(), HighlightStyle::Filled);
        assert_eq!(h.controller.cycle_highlight_color(), "red");
        let last = rx
            .try_iter()
            .filter_map(|update| match update {
                EngineUpdate::State(state) => Some(state),
                EngineUpdate::Notice(_) => None,
            })
            .last()
            .expect("state");
        assert_eq!(last.highlight.style, HighlightStyle::Filled);
    }

    #[test]
    fn shutdown_stops_everything() {
        let mut h = harness(EngineConfig::default());
        h.controller.toggle(Mode::Zoom);
        h.controller.dispatch_hotkey(HotkeyCommand::ToggleSpotlight);
        assert!(h.controller.governor_active());
        h.controller.shutdown();
        assert_eq!(h.controller.current_mode(), Mode::None);
        assert!(!h.controller.is_tracking());
        assert!(!h.interceptor.is_installed());
        assert_eq!(h.surfaces.total_open(), 0);
    }
}
