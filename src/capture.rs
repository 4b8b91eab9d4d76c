use crate::compositor::raster::RgbaBuffer;
use crate::error::{EngineError, EngineResult};
use crate::geometry::{select_rect_for_point, Point, ScreenRect};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// How long the engine's windows may stay hidden for one capture.
pub const HIDDEN_WINDOW_BUDGET: Duration = Duration::from_millis(100);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Immutable still of a screen rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    pub image: Arc<RgbaBuffer>,
    pub rect: ScreenRect,
    pub scale_factor: f32,
}

impl CapturedFrame {
    pub fn new(image: RgbaBuffer, rect: ScreenRect, scale_factor: f32) -> Self {
        Self {
            image: Arc::new(image),
            rect,
            scale_factor,
        }
    }

    pub fn image(&self) -> &RgbaBuffer {
        &self.image
    }
}

pub trait CaptureBackend: Send {
    fn display_bounds(&self) -> Vec<ScreenRect>;
    fn capture(&mut self, rect: ScreenRect) -> EngineResult<CapturedFrame>;
}

/// Engine windows that must not appear in a full-screen capture.
pub trait OverlayVisibility {
    /// Hides every visible engine window and returns how many were hidden.
    fn hide_overlays(&mut self) -> usize;
    fn restore_overlays(&mut self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoOverlays;

impl OverlayVisibility for NoOverlays {
    fn hide_overlays(&mut self) -> usize {
        0
    }

    fn restore_overlays(&mut self) {}
}

pub struct CaptureProvider {
    backend: Box<dyn CaptureBackend>,
    settle_delay: Duration,
}

impl CaptureProvider {
    pub fn new(backend: Box<dyn CaptureBackend>) -> Self {
        Self {
            backend,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Platform capture backend: GDI on Windows, unsupported elsewhere.
    pub fn system() -> Self {
        Self::new(Box::new(SystemCaptureBackend))
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn display_bounds(&self) -> Vec<ScreenRect> {
        self.backend.display_bounds()
    }

    /// Display containing `point`, falling back to the first display.
    pub fn display_for_point(&self, point: Point) -> Option<ScreenRect> {
        let displays = self.backend.display_bounds();
        let (x, y) = point.round_i32();
        select_rect_for_point(&displays, (x, y)).or_else(|| displays.first().copied())
    }

    fn clamp_to_displays(&self, rect: ScreenRect) -> EngineResult<ScreenRect> {
        let displays = self.backend.display_bounds();
        if displays.is_empty() {
            return if rect.is_empty() {
                Err(EngineError::CaptureFailed("capture rectangle is empty".into()))
            } else {
                Ok(rect)
            };
        }
        let center = rect.center().round_i32();
        let display = select_rect_for_point(&displays, center).unwrap_or(displays[0]);
        rect.intersect(display).ok_or_else(|| {
            EngineError::CaptureFailed(format!("capture rectangle {rect:?} is off screen"))
        })
    }

    /// Captures `rect` with the engine's windows hidden. The windows are restored before
    /// returning, whether or not the capture succeeded.
    pub fn capture_screen(
        &mut self,
        rect: ScreenRect,
        overlays: &mut dyn OverlayVisibility,
    ) -> EngineResult<CapturedFrame> {
        let rect = self.clamp_to_displays(rect)?;
        let hidden = overlays.hide_overlays();
        let started = Instant::now();
        if hidden > 0 && !self.settle_delay.is_zero() {
            std::thread::sleep(self.settle_delay);
        }

        let result = self.backend.capture(rect);
        overlays.restore_overlays();

        let elapsed = started.elapsed();
        if hidden > 0 && elapsed > HIDDEN_WINDOW_BUDGET {
            warn!(?elapsed, hidden, "overlay windows stayed hidden longer than budget");
        }
        match &result {
            Ok(frame) => debug!(rect = ?frame.rect, ?elapsed, "captured screen"),
            Err(err) => error!(?err, ?rect, "screen capture failed"),
        }
        result
    }

    /// Captures a sub-rectangle without touching window visibility. Engine windows are
    /// excluded at the OS level by the surfaces themselves.
    pub fn capture_region(&mut self, rect: ScreenRect) -> EngineResult<CapturedFrame> {
        let rect = self.clamp_to_displays(rect)?;
        let result = self.backend.capture(rect);
        if let Err(err) = &result {
            debug!(?err, ?rect, "region capture failed");
        }
        result
    }
}

#[derive(Debug, Default)]
pub struct SystemCaptureBackend;

impl CaptureBackend for SystemCaptureBackend {
    fn display_bounds(&self) -> Vec<ScreenRect> {
        enumerate_displays()
    }

    fn capture(&mut self, rect: ScreenRect) -> EngineResult<CapturedFrame> {
        platform::capture_rect(rect)
    }
}

pub fn enumerate_displays() -> Vec<ScreenRect> {
    platform::enumerate_displays()
}

#[cfg(windows)]
mod platform {
    use super::CapturedFrame;
    use crate::compositor::raster::RgbaBuffer;
    use crate::error::{EngineError, EngineResult, Permission};
    use crate::geometry::ScreenRect;
    use std::mem;
    use windows::Win32::Foundation::{GetLastError, BOOL, ERROR_ACCESS_DENIED, HWND, LPARAM, RECT};
    use windows::Win32::Graphics::Gdi::{
        BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject,
        EnumDisplayMonitors, GetDC, GetDIBits, GetMonitorInfoW, ReleaseDC, SelectObject,
        BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HDC, HGDIOBJ,
        HMONITOR, MONITORINFOEXW, SRCCOPY,
    };
    use windows::Win32::UI::HiDpi::GetDpiForSystem;

    fn failed(step: &str) -> EngineError {
        if unsafe { GetLastError() } == ERROR_ACCESS_DENIED {
            EngineError::PermissionDenied(Permission::ScreenCapture)
        } else {
            EngineError::CaptureFailed(format!("{step} failed"))
        }
    }

    pub fn capture_rect(rect: ScreenRect) -> EngineResult<CapturedFrame> {
        if rect.is_empty() {
            return Err(EngineError::CaptureFailed("capture bounds are empty".into()));
        }

        unsafe {
            let screen_dc = GetDC(HWND::default());
            if screen_dc.0.is_null() {
                return Err(failed("GetDC"));
            }
            let mem_dc = CreateCompatibleDC(screen_dc);
            if mem_dc.0.is_null() {
                let _ = ReleaseDC(HWND::default(), screen_dc);
                return Err(failed("CreateCompatibleDC"));
            }

            let bmp = CreateCompatibleBitmap(screen_dc, rect.width, rect.height);
            if bmp.0.is_null() {
                let _ = DeleteDC(mem_dc);
                let _ = ReleaseDC(HWND::default(), screen_dc);
                return Err(failed("CreateCompatibleBitmap"));
            }

            let old_obj = SelectObject(mem_dc, HGDIOBJ(bmp.0));
            let blit = BitBlt(
                mem_dc,
                0,
                0,
                rect.width,
                rect.height,
                screen_dc,
                rect.x,
                rect.y,
                SRCCOPY,
            );

            if blit.is_err() {
                let err = failed("BitBlt");
                let _ = SelectObject(mem_dc, old_obj);
                let _ = DeleteObject(bmp);
                let _ = DeleteDC(mem_dc);
                let _ = ReleaseDC(HWND::default(), screen_dc);
                return Err(err);
            }

            let mut bmi = BITMAPINFO::default();
            bmi.bmiHeader = BITMAPINFOHEADER {
                biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: rect.width,
                biHeight: -rect.height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            };

            let mut bgra = vec![0u8; (rect.width as usize) * (rect.height as usize) * 4];
            let rows = GetDIBits(
                mem_dc,
                bmp,
                0,
                rect.height as u32,
                Some(bgra.as_mut_ptr() as *mut _),
                &mut bmi,
                DIB_RGB_COLORS,
            );

            let _ = SelectObject(mem_dc, old_obj);
            let _ = DeleteObject(bmp);
            let _ = DeleteDC(mem_dc);
            let _ = ReleaseDC(HWND::default(), screen_dc);

            if rows == 0 {
                return Err(failed("GetDIBits"));
            }

            for px in bgra.chunks_exact_mut(4) {
                px.swap(0, 2);
                px[3] = 255;
            }

            let image = RgbaBuffer::from_pixels(rect.width as u32, rect.height as u32, bgra)
                .ok_or_else(|| EngineError::CaptureFailed("captured pixel size mismatch".into()))?;
            let scale_factor = GetDpiForSystem() as f32 / 96.0;
            Ok(CapturedFrame::new(image, rect, scale_factor))
        }
    }

    pub fn enumerate_displays() -> Vec<ScreenRect> {
        extern "system" fn monitor_enum_proc(
            monitor: HMONITOR,
            _hdc: HDC,
            _rc_clip: *mut RECT,
            data: LPARAM,
        ) -> BOOL {
            let displays = unsafe { &mut *(data.0 as *mut Vec<ScreenRect>) };
            let mut info = MONITORINFOEXW::default();
            info.monitorInfo.cbSize = mem::size_of::<MONITORINFOEXW>() as u32;
            if unsafe { GetMonitorInfoW(monitor, &mut info.monitorInfo as *mut _ as *mut _) }
                .as_bool()
            {
                let rc = info.monitorInfo.rcMonitor;
                displays.push(ScreenRect::new(
                    rc.left,
                    rc.top,
                    rc.right - rc.left,
                    rc.bottom - rc.top,
                ));
            }
            BOOL(1)
        }

        let mut displays = Vec::new();
        unsafe {
            let _ = EnumDisplayMonitors(
                HDC::default(),
                None,
                Some(monitor_enum_proc),
                LPARAM(&mut displays as *mut Vec<ScreenRect> as isize),
            );
        }
        displays
    }
}

#[cfg(not(windows))]
mod platform {
    use super::CapturedFrame;
    use crate::error::{EngineError, EngineResult};
    use crate::geometry::ScreenRect;

    pub fn capture_rect(_rect: ScreenRect) -> EngineResult<CapturedFrame> {
        Err(EngineError::Unsupported("screen capture"))
    }

    pub fn enumerate_displays() -> Vec<ScreenRect> {
        Vec::new()
    }
}

#[derive(Default)]
struct MockCaptureState {
    displays: Vec<ScreenRect>,
    captures: Vec<ScreenRect>,
    fail_with: Option<fn() -> EngineError>,
    on_capture: Option<Box<dyn Fn() + Send>>,
}

/// Capture backend that returns a synthetic gradient and records every request.
#[derive(Clone)]
pub struct MockCaptureBackend {
    state: Arc<Mutex<MockCaptureState>>,
}

impl MockCaptureBackend {
    pub fn new(displays: Vec<ScreenRect>) -> (Self, MockCaptureHandle) {
        let state = Arc::new(Mutex::new(MockCaptureState {
            displays,
            ..MockCaptureState::default()
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockCaptureHandle { state },
        )
    }
}

impl CaptureBackend for MockCaptureBackend {
    fn display_bounds(&self) -> Vec<ScreenRect> {
        self.state
            .lock()
            .map(|state| state.displays.clone())
            .unwrap_or_default()
    }

    fn capture(&mut self, rect: ScreenRect) -> EngineResult<CapturedFrame> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| EngineError::CaptureFailed("mock state poisoned".into()))?;
        state.captures.push(rect);
        if let Some(hook) = &state.on_capture {
            hook();
        }
        if let Some(fail) = state.fail_with {
            return Err(fail());
        }
        Ok(CapturedFrame::new(mock_pattern(rect), rect, 1.0))
    }
}

/// Pixel `(x, y)` of a mock capture encodes its screen position: `r = x % 256`,
/// `g = y % 256`, `b = 128`.
pub fn mock_pattern(rect: ScreenRect) -> RgbaBuffer {
    let width = rect.width.max(0) as u32;
    let height = rect.height.max(0) as u32;
    let mut pixels = Vec::with_capacity((width as usize) * (height as usize) * 4);
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            pixels.extend_from_slice(&[
                (rect.x + x).rem_euclid(256) as u8,
                (rect.y + y).rem_euclid(256) as u8,
                128,
                255,
            ]);
        }
    }
    RgbaBuffer {
        width,
        height,
        pixels,
    }
}

pub struct MockCaptureHandle {
    state: Arc<Mutex<MockCaptureState>>,
}

impl MockCaptureHandle {
    pub fn capture_count(&self) -> usize {
        self.state.lock().map(|s| s.captures.len()).unwrap_or(0)
    }

    pub fn captures(&self) -> Vec<ScreenRect> {
        self.state
            .lock()
            .map(|s| s.captures.clone())
            .unwrap_or_default()
    }

    pub fn fail_with_permission_denied(&self) {
        self.set_failure(Some(|| {
            EngineError::PermissionDenied(crate::error::Permission::ScreenCapture)
        }));
    }

    pub fn fail_with_capture_error(&self) {
        self.set_failure(Some(|| EngineError::CaptureFailed("mock failure".into())));
    }

    pub fn succeed(&self) {
        self.set_failure(None);
    }

    fn set_failure(&self, fail: Option<fn() -> EngineError>) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_with = fail;
        }
    }

    /// Runs `hook` inside every capture call, e.g. to observe window visibility.
    pub fn on_capture(&self, hook: impl Fn() + Send + 'static) {
        if let Ok(mut state) = self.state.lock() {
            state.on_capture = Some(Box::new(hook));
        }
    }
}
