use crate::capture::OverlayVisibility;
use crate::compositor::raster::RgbaBuffer;
use crate::error::EngineResult;
use crate::geometry::ScreenRect;
use crate::input::InputEvent;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceRole {
    /// Full-display transparent layer for spotlight, highlight and drawing.
    Overlay,
    /// Opaque full-display window showing the magnified frame.
    Magnifier,
    Timer,
}

/// A top-level borderless window the engine paints into.
///
/// Input is reported in surface-local pixels. A click-through surface reports none.
pub trait OverlaySurface: Send {
    fn role(&self) -> SurfaceRole;
    fn bounds(&self) -> ScreenRect;
    fn show(&mut self);
    fn hide(&mut self);
    fn is_visible(&self) -> bool;
    fn set_click_through(&mut self, enabled: bool);
    fn present(&mut self, frame: &RgbaBuffer) -> EngineResult<()>;
    fn drain_input(&mut self) -> Vec<InputEvent>;
    fn close(&mut self);
}

pub trait SurfaceFactory: Send {
    fn create(&self, role: SurfaceRole, bounds: ScreenRect)
        -> EngineResult<Box<dyn OverlaySurface>>;
}

/// The engine's open surfaces, at most one per role.
#[derive(Default)]
pub struct OverlaySet {
    surfaces: Vec<Box<dyn OverlaySurface>>,
    hidden: Vec<SurfaceRole>,
}

impl OverlaySet {
    pub fn insert(&mut self, surface: Box<dyn OverlaySurface>) {
        self.close(surface.role());
        self.surfaces.push(surface);
    }

    pub fn is_open(&self, role: SurfaceRole) -> bool {
        self.surfaces.iter().any(|s| s.role() == role)
    }

    pub fn get_mut(&mut self, role: SurfaceRole) -> Option<&mut Box<dyn OverlaySurface>> {
        self.surfaces.iter_mut().find(|s| s.role() == role)
    }

    pub fn roles(&self) -> Vec<SurfaceRole> {
        self.surfaces.iter().map(|s| s.role()).collect()
    }

    pub fn close(&mut self, role: SurfaceRole) -> bool {
        let Some(index) = self.surfaces.iter().position(|s| s.role() == role) else {
            return false;
        };
        let mut surface = self.surfaces.remove(index);
        surface.close();
        self.hidden.retain(|r| *r != role);
        debug!(?role, "surface closed");
        true
    }

    pub fn close_all(&mut self) {
        for role in self.roles() {
            self.close(role);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

impl OverlayVisibility for OverlaySet {
    fn hide_overlays(&mut self) -> usize {
        for surface in self.surfaces.iter_mut() {
            if surface.is_visible() {
                surface.hide();
                self.hidden.push(surface.role());
            }
        }
        self.hidden.len()
    }

    fn restore_overlays(&mut self) {
        let hidden = std::mem::take(&mut self.hidden);
        for surface in self.surfaces.iter_mut() {
            if hidden.contains(&surface.role()) {
                surface.show();
            }
        }
    }
}

impl Drop for OverlaySet {
    fn drop(&mut self) {
        self.close_all();
    }
}

struct MockSurfaceState {
    role: SurfaceRole,
    bounds: ScreenRect,
    visible: AtomicBool,
    click_through: AtomicBool,
    closed: AtomicBool,
    hide_count: AtomicUsize,
    present_count: AtomicUsize,
    last_frame: Mutex<Option<RgbaBuffer>>,
    input: Mutex<VecDeque<InputEvent>>,
}

#[derive(Default)]
struct MockFactoryState {
    surfaces: Mutex<Vec<Arc<MockSurfaceState>>>,
    fail_roles: Mutex<HashMap<SurfaceRole, String>>,
}

/// Records every surface it creates so tests can inspect and drive them.
#[derive(Clone, Default)]
pub struct MockSurfaceFactory {
    state: Arc<MockFactoryState>,
}

impl MockSurfaceFactory {
    pub fn new() -> (Self, MockSurfaceHandle) {
        let factory = Self::default();
        let handle = MockSurfaceHandle {
            state: Arc::clone(&factory.state),
        };
        (factory, handle)
    }
}

impl SurfaceFactory for MockSurfaceFactory {
    fn create(
        &self,
        role: SurfaceRole,
        bounds: ScreenRect,
    ) -> EngineResult<Box<dyn OverlaySurface>> {
        if let Ok(fail) = self.state.fail_roles.lock() {
            if let Some(message) = fail.get(&role) {
                return Err(crate::error::EngineError::Surface(message.clone()));
            }
        }
        let surface = Arc::new(MockSurfaceState {
            role,
            bounds,
            visible: AtomicBool::new(false),
            click_through: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            hide_count: AtomicUsize::new(0),
            present_count: AtomicUsize::new(0),
            last_frame: Mutex::new(None),
            input: Mutex::new(VecDeque::new()),
        });
        if let Ok(mut surfaces) = self.state.surfaces.lock() {
            surfaces.push(Arc::clone(&surface));
        }
        Ok(Box::new(MockSurface { state: surface }))
    }
}

struct MockSurface {
    state: Arc<MockSurfaceState>,
}

impl OverlaySurface for MockSurface {
    fn role(&self) -> SurfaceRole {
        self.state.role
    }

    fn bounds(&self) -> ScreenRect {
        self.state.bounds
    }

    fn show(&mut self) {
        self.state.visible.store(true, Ordering::SeqCst);
    }

    fn hide(&mut self) {
        self.state.visible.store(false, Ordering::SeqCst);
        self.state.hide_count.fetch_add(1, Ordering::SeqCst);
    }

    fn is_visible(&self) -> bool {
        self.state.visible.load(Ordering::SeqCst)
    }

    fn set_click_through(&mut self, enabled: bool) {
        self.state.click_through.store(enabled, Ordering::SeqCst);
    }

    fn present(&mut self, frame: &RgbaBuffer) -> EngineResult<()> {
        self.state.present_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.state.last_frame.lock() {
            *last = Some(frame.clone());
        }
        Ok(())
    }

    fn drain_input(&mut self) -> Vec<InputEvent> {
        let events: Vec<InputEvent> = match self.state.input.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        if self.state.click_through.load(Ordering::SeqCst) {
            return Vec::new();
        }
        events
    }

    fn close(&mut self) {
        self.state.visible.store(false, Ordering::SeqCst);
        self.state.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct MockSurfaceHandle {
    state: Arc<MockFactoryState>,
}

impl MockSurfaceHandle {
    fn latest(&self, role: SurfaceRole) -> Option<Arc<MockSurfaceState>> {
        let surfaces = self.state.surfaces.lock().ok()?;
        surfaces.iter().rev().find(|s| s.role == role).cloned()
    }

    fn count(&self, role: SurfaceRole, open_only: bool) -> usize {
        self.state
            .surfaces
            .lock()
            .map(|surfaces| {
                surfaces
                    .iter()
                    .filter(|s| s.role == role)
                    .filter(|s| !open_only || !s.closed.load(Ordering::SeqCst))
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn created_count(&self, role: SurfaceRole) -> usize {
        self.count(role, false)
    }

    pub fn open_count(&self, role: SurfaceRole) -> usize {
        self.count(role, true)
    }

    pub fn total_open(&self) -> usize {
        [SurfaceRole::Overlay, SurfaceRole::Magnifier, SurfaceRole::Timer]
            .into_iter()
            .map(|role| self.open_count(role))
            .sum()
    }

    pub fn bounds(&self, role: SurfaceRole) -> Option<ScreenRect> {
        self.latest(role).map(|s| s.bounds)
    }

    /// Queues input on the newest surface of `role`.
    pub fn push_input(&self, role: SurfaceRole, event: InputEvent) {
        if let Some(surface) = self.latest(role) {
            if let Ok(mut queue) = surface.input.lock() {
                queue.push_back(event);
            }
        }
    }

    pub fn last_frame(&self, role: SurfaceRole) -> Option<RgbaBuffer> {
        self.latest(role)
            .and_then(|s| s.last_frame.lock().ok().and_then(|frame| frame.clone()))
    }

    pub fn present_count(&self, role: SurfaceRole) -> usize {
        self.latest(role)
            .map(|s| s.present_count.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn hide_count(&self, role: SurfaceRole) -> usize {
        self.latest(role)
            .map(|s| s.hide_count.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn is_click_through(&self, role: SurfaceRole) -> Option<bool> {
        self.latest(role)
            .map(|s| s.click_through.load(Ordering::SeqCst))
    }

    pub fn is_visible(&self, role: SurfaceRole) -> bool {
        self.latest(role)
            .map(|s| s.visible.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    pub fn fail_role(&self, role: SurfaceRole, message: &str) {
        if let Ok(mut fail) = self.state.fail_roles.lock() {
            fail.insert(role, message.to_string());
        }
    }
}
