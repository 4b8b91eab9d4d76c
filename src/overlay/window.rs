//! Borderless top-most layered windows.
//!
//! Every surface is a `WS_EX_LAYERED` popup painted with per-pixel alpha through
//! `UpdateLayeredWindow` and excluded from screen capture. Click-through is
//! `WS_EX_TRANSPARENT`; an interactive surface drops it and takes focus so drawing keys
//! reach it.

use crate::error::{EngineError, EngineResult};
use crate::geometry::ScreenRect;
use crate::input::{Key, Modifiers};
use crate::overlay::surface::{OverlaySurface, SurfaceFactory, SurfaceRole};

/// Maps a Windows virtual-key code to an engine key.
pub fn key_from_virtual_key(vk: u32) -> Option<Key> {
    let key = match vk {
        0x08 => Key::Backspace,
        0x09 => Key::Tab,
        0x0D => Key::Enter,
        0x1B => Key::Escape,
        0x20 => Key::Space,
        0x25 => Key::Left,
        0x26 => Key::Up,
        0x27 => Key::Right,
        0x28 => Key::Down,
        0x6B | 0xBB => Key::Plus,
        0x6D | 0xBD => Key::Minus,
        0x30..=0x39 | 0x41..=0x5A => Key::Char(char::from_u32(vk)?),
        0x60..=0x69 => Key::Char(char::from_u32(vk - 0x60 + 0x30)?),
        _ => return None,
    };
    Some(key)
}

/// Decodes `MK_*` button-state flags carried by mouse messages.
pub fn modifiers_from_mouse_flags(flags: usize, alt: bool) -> Modifiers {
    Modifiers {
        ctrl: flags & 0x0008 != 0,
        shift: flags & 0x0004 != 0,
        alt,
    }
}

/// Creates layered windows for overlay surfaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct LayeredWindowFactory;

impl SurfaceFactory for LayeredWindowFactory {
    #[cfg(windows)]
    fn create(
        &self,
        role: SurfaceRole,
        bounds: ScreenRect,
    ) -> EngineResult<Box<dyn OverlaySurface>> {
        Ok(Box::new(platform::LayeredWindow::create(role, bounds)?))
    }

    #[cfg(not(windows))]
    fn create(
        &self,
        _role: SurfaceRole,
        _bounds: ScreenRect,
    ) -> EngineResult<Box<dyn OverlaySurface>> {
        Err(EngineError::Unsupported("overlay windows"))
    }
}

#[cfg(windows)]
mod platform {
    use super::{key_from_virtual_key, modifiers_from_mouse_flags};
    use crate::compositor::raster::RgbaBuffer;
    use crate::error::{EngineError, EngineResult};
    use crate::geometry::{Point, ScreenRect};
    use crate::input::{InputEvent, Modifiers};
    use crate::overlay::surface::{OverlaySurface, SurfaceRole};
    use once_cell::sync::Lazy;
    use std::collections::HashMap;
    use std::mem;
    use std::ptr;
    use std::sync::mpsc::{channel, Receiver, Sender};
    use std::sync::{Mutex, Once};
    use tracing::{debug, warn};
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, POINT, SIZE, WPARAM};
    use windows::Win32::Graphics::Gdi::{
        CreateCompatibleDC, CreateDIBSection, DeleteDC, DeleteObject, SelectObject, AC_SRC_ALPHA,
        AC_SRC_OVER, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, BLENDFUNCTION, DIB_RGB_COLORS,
        HBITMAP, HDC, HGDIOBJ,
    };
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::Input::KeyboardAndMouse::{GetKeyState, SetFocus, VK_CONTROL, VK_MENU, VK_SHIFT};
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetWindowLongPtrW,
        PeekMessageW, RegisterClassW, SetForegroundWindow, SetWindowDisplayAffinity,
        SetWindowLongPtrW, SetWindowPos, ShowWindow, TranslateMessage, UpdateLayeredWindow,
        GWL_EXSTYLE, HWND_TOPMOST, MSG, PM_REMOVE, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE,
        SW_HIDE, SW_SHOWNOACTIVATE, ULW_ALPHA, WDA_EXCLUDEFROMCAPTURE, WINDOW_EX_STYLE,
        WINDOW_STYLE, WM_CHAR, WM_ERASEBKGND, WM_KEYDOWN, WM_LBUTTONDOWN, WM_LBUTTONUP,
        WM_MOUSEMOVE, WM_MOUSEWHEEL, WNDCLASSW, WS_EX_LAYERED, WS_EX_NOACTIVATE,
        WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP,
    };

    struct WindowRoute {
        origin: (i32, i32),
        tx: Sender<InputEvent>,
    }

    static INPUT_ROUTES: Lazy<Mutex<HashMap<isize, WindowRoute>>> =
        Lazy::new(|| Mutex::new(HashMap::new()));

    fn widestring(value: &str) -> Vec<u16> {
        use std::os::windows::ffi::OsStrExt;
        std::ffi::OsStr::new(value)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect()
    }

    fn base_ex_style() -> WINDOW_EX_STYLE {
        WS_EX_LAYERED | WS_EX_TOPMOST | WS_EX_TOOLWINDOW
    }

    fn key_down(vk: u16) -> bool {
        unsafe { GetKeyState(vk as i32) < 0 }
    }

    fn keyboard_modifiers() -> Modifiers {
        Modifiers {
            ctrl: key_down(VK_CONTROL.0),
            shift: key_down(VK_SHIFT.0),
            alt: key_down(VK_MENU.0),
        }
    }

    fn route_event(hwnd: HWND, build: impl FnOnce((i32, i32)) -> Option<InputEvent>) {
        if let Ok(routes) = INPUT_ROUTES.lock() {
            if let Some(route) = routes.get(&(hwnd.0 as isize)) {
                if let Some(event) = build(route.origin) {
                    let _ = route.tx.send(event);
                }
            }
        }
    }

    unsafe extern "system" fn surface_wndproc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        let local = || {
            Point::new(
                (lparam.0 & 0xffff) as i16 as f32,
                ((lparam.0 >> 16) & 0xffff) as i16 as f32,
            )
        };
        match msg {
            WM_ERASEBKGND => LRESULT(1),
            WM_LBUTTONDOWN | WM_MOUSEMOVE | WM_LBUTTONUP => {
                let modifiers = modifiers_from_mouse_flags(wparam.0, key_down(VK_MENU.0));
                let position = local();
                route_event(hwnd, |_| {
                    Some(match msg {
                        WM_LBUTTONDOWN => InputEvent::PointerDown { position, modifiers },
                        WM_LBUTTONUP => InputEvent::PointerUp { position, modifiers },
                        _ => InputEvent::PointerMove { position, modifiers },
                    })
                });
                LRESULT(0)
            }
            WM_MOUSEWHEEL => {
                let delta = ((wparam.0 >> 16) & 0xffff) as i16 as f32 / 120.0;
                let modifiers = modifiers_from_mouse_flags(wparam.0 & 0xffff, key_down(VK_MENU.0));
                let screen = local();
                route_event(hwnd, |origin| {
                    Some(InputEvent::Scroll {
                        position: Point::new(screen.x - origin.0 as f32, screen.y - origin.1 as f32),
                        delta,
                        modifiers,
                    })
                });
                LRESULT(0)
            }
            WM_KEYDOWN => {
                let modifiers = keyboard_modifiers();
                route_event(hwnd, |_| {
                    key_from_virtual_key(wparam.0 as u32).map(|key| InputEvent::Key { key, modifiers })
                });
                LRESULT(0)
            }
            WM_CHAR => {
                route_event(hwnd, |_| {
                    char::from_u32(wparam.0 as u32)
                        .filter(|c| !c.is_control())
                        .map(InputEvent::Text)
                });
                LRESULT(0)
            }
            _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
        }
    }

    fn pump_messages() {
        unsafe {
            let mut msg = MSG::default();
            while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).into() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }

    pub struct LayeredWindow {
        role: SurfaceRole,
        bounds: ScreenRect,
        hwnd: HWND,
        mem_dc: HDC,
        dib: HBITMAP,
        old_bitmap: HGDIOBJ,
        bits: *mut u8,
        size_bytes: usize,
        visible: bool,
        click_through: bool,
        input_rx: Receiver<InputEvent>,
    }

    unsafe impl Send for LayeredWindow {}

    impl LayeredWindow {
        pub fn create(role: SurfaceRole, bounds: ScreenRect) -> EngineResult<Self> {
            if bounds.is_empty() {
                return Err(EngineError::Surface(format!("empty bounds for {role:?}")));
            }
            static REGISTER_CLASS: Once = Once::new();
            let class_name = widestring("PresentPenSurface");
            let hinstance = unsafe { GetModuleHandleW(PCWSTR::null()) }?;

            REGISTER_CLASS.call_once(|| unsafe {
                let wc = WNDCLASSW {
                    hInstance: hinstance.into(),
                    lpszClassName: PCWSTR(class_name.as_ptr()),
                    lpfnWndProc: Some(surface_wndproc),
                    ..Default::default()
                };
                let _ = RegisterClassW(&wc);
            });

            let hwnd = unsafe {
                CreateWindowExW(
                    base_ex_style() | WS_EX_TRANSPARENT | WS_EX_NOACTIVATE,
                    PCWSTR(class_name.as_ptr()),
                    PCWSTR::null(),
                    WINDOW_STYLE(WS_POPUP.0),
                    bounds.x,
                    bounds.y,
                    bounds.width,
                    bounds.height,
                    None,
                    None,
                    hinstance,
                    None,
                )?
            };
            if let Err(err) = unsafe { SetWindowDisplayAffinity(hwnd, WDA_EXCLUDEFROMCAPTURE) } {
                warn!(?err, ?role, "surface could not be excluded from capture");
            }

            let mem_dc = unsafe { CreateCompatibleDC(HDC::default()) };
            if mem_dc.0.is_null() {
                unsafe {
                    let _ = DestroyWindow(hwnd);
                }
                return Err(EngineError::Surface("CreateCompatibleDC failed".into()));
            }

            let mut bmi = BITMAPINFO::default();
            bmi.bmiHeader = BITMAPINFOHEADER {
                biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: bounds.width,
                biHeight: -bounds.height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            };
            let mut bits: *mut core::ffi::c_void = ptr::null_mut();
            let dib = match unsafe {
                CreateDIBSection(
                    mem_dc,
                    &bmi,
                    DIB_RGB_COLORS,
                    &mut bits,
                    windows::Win32::Foundation::HANDLE::default(),
                    0,
                )
            } {
                Ok(dib) if !bits.is_null() => dib,
                _ => {
                    unsafe {
                        let _ = DeleteDC(mem_dc);
                        let _ = DestroyWindow(hwnd);
                    }
                    return Err(EngineError::Surface("CreateDIBSection failed".into()));
                }
            };
            let old_bitmap = unsafe { SelectObject(mem_dc, dib) };

            let (tx, input_rx) = channel::<InputEvent>();
            if let Ok(mut routes) = INPUT_ROUTES.lock() {
                routes.insert(
                    hwnd.0 as isize,
                    WindowRoute {
                        origin: (bounds.x, bounds.y),
                        tx,
                    },
                );
            }
            debug!(?role, ?bounds, "layered window created");

            Ok(Self {
                role,
                bounds,
                hwnd,
                mem_dc,
                dib,
                old_bitmap,
                bits: bits as *mut u8,
                size_bytes: bounds.width as usize * bounds.height as usize * 4,
                visible: false,
                click_through: true,
                input_rx,
            })
        }
    }

    impl OverlaySurface for LayeredWindow {
        fn role(&self) -> SurfaceRole {
            self.role
        }

        fn bounds(&self) -> ScreenRect {
            self.bounds
        }

        fn show(&mut self) {
            if self.hwnd.0.is_null() {
                return;
            }
            unsafe {
                let _ = ShowWindow(self.hwnd, SW_SHOWNOACTIVATE);
                let _ = SetWindowPos(
                    self.hwnd,
                    HWND_TOPMOST,
                    0,
                    0,
                    0,
                    0,
                    SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
                );
                if !self.click_through {
                    let _ = SetForegroundWindow(self.hwnd);
                    let _ = SetFocus(self.hwnd);
                }
            }
            self.visible = true;
        }

        fn hide(&mut self) {
            if !self.hwnd.0.is_null() {
                unsafe {
                    let _ = ShowWindow(self.hwnd, SW_HIDE);
                }
            }
            self.visible = false;
        }

        fn is_visible(&self) -> bool {
            self.visible
        }

        fn set_click_through(&mut self, enabled: bool) {
            if self.hwnd.0.is_null() || self.click_through == enabled {
                return;
            }
            let mut style = base_ex_style();
            if enabled {
                style |= WS_EX_TRANSPARENT | WS_EX_NOACTIVATE;
            }
            unsafe {
                let _ = SetWindowLongPtrW(self.hwnd, GWL_EXSTYLE, style.0 as isize);
                debug!(
                    role = ?self.role,
                    ex_style = GetWindowLongPtrW(self.hwnd, GWL_EXSTYLE),
                    "surface click-through changed"
                );
            }
            self.click_through = enabled;
            if !enabled && self.visible {
                unsafe {
                    let _ = SetForegroundWindow(self.hwnd);
                    let _ = SetFocus(self.hwnd);
                }
            }
        }

        fn present(&mut self, frame: &RgbaBuffer) -> EngineResult<()> {
            if self.bits.is_null() {
                return Err(EngineError::Surface("surface is closed".into()));
            }
            if frame.width as i32 != self.bounds.width || frame.height as i32 != self.bounds.height {
                return Err(EngineError::Surface(format!(
                    "frame {}x{} does not match surface {}x{}",
                    frame.width, frame.height, self.bounds.width, self.bounds.height
                )));
            }
            let pixels = unsafe { std::slice::from_raw_parts_mut(self.bits, self.size_bytes) };
            frame.write_premultiplied_bgra(pixels);

            let destination = POINT {
                x: self.bounds.x,
                y: self.bounds.y,
            };
            let size = SIZE {
                cx: self.bounds.width,
                cy: self.bounds.height,
            };
            let source = POINT { x: 0, y: 0 };
            let blend = BLENDFUNCTION {
                BlendOp: AC_SRC_OVER as u8,
                BlendFlags: 0,
                SourceConstantAlpha: 255,
                AlphaFormat: AC_SRC_ALPHA as u8,
            };
            unsafe {
                UpdateLayeredWindow(
                    self.hwnd,
                    HDC::default(),
                    Some(&destination),
                    Some(&size),
                    self.mem_dc,
                    Some(&source),
                    COLORREF(0),
                    Some(&blend),
                    ULW_ALPHA,
                )?;
            }
            Ok(())
        }

        fn drain_input(&mut self) -> Vec<InputEvent> {
            pump_messages();
            let events: Vec<InputEvent> = self.input_rx.try_iter().collect();
            if self.click_through {
                Vec::new()
            } else {
                events
            }
        }

        fn close(&mut self) {
            unsafe {
                if !self.mem_dc.0.is_null() {
                    let _ = SelectObject(self.mem_dc, self.old_bitmap);
                }
                if !self.dib.0.is_null() {
                    let _ = DeleteObject(self.dib);
                    self.dib = HBITMAP::default();
                }
                if !self.mem_dc.0.is_null() {
                    let _ = DeleteDC(self.mem_dc);
                    self.mem_dc = HDC::default();
                }
                if !self.hwnd.0.is_null() {
                    if let Ok(mut routes) = INPUT_ROUTES.lock() {
                        routes.remove(&(self.hwnd.0 as isize));
                    }
                    let _ = DestroyWindow(self.hwnd);
                    self.hwnd = HWND::default();
                }
            }
            self.bits = ptr::null_mut();
            self.size_bytes = 0;
            self.visible = false;
        }
    }

    impl Drop for LayeredWindow {
        fn drop(&mut self) {
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_keys_map_to_engine_keys() {
        assert_eq!(key_from_virtual_key(0x1B), Some(Key::Escape));
        assert_eq!(key_from_virtual_key(0x52), Some(Key::Char('R')));
        assert_eq!(key_from_virtual_key(0x63), Some(Key::Char('3')));
        assert_eq!(key_from_virtual_key(0xBB), Some(Key::Plus));
        assert_eq!(key_from_virtual_key(0x70), None);
    }

    #[test]
    fn mouse_flags_decode_ctrl_and_shift() {
        let mods = modifiers_from_mouse_flags(0x0008 | 0x0004 | 0x0001, false);
        assert_eq!(mods, Modifiers::ctrl_shift());
        assert_eq!(modifiers_from_mouse_flags(0x0001, true).alt, true);
    }

    #[cfg(not(windows))]
    #[test]
    fn layered_windows_are_unsupported_off_windows() {
        let result = LayeredWindowFactory.create(SurfaceRole::Overlay, ScreenRect::new(0, 0, 10, 10));
        assert!(matches!(result, Err(EngineError::Unsupported(_))));
    }
}
