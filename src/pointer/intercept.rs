//! System-wide pointer interception.
//!
//! Interception is a single capability: while a rule is installed every pointer event
//! matching the rule's predicate is replaced by the rule's transform of it. The Windows
//! backend cannot rewrite a low-level event in place, so it swallows physical moves and
//! re-positions the cursor by the transformed delta instead.

use crate::error::{EngineError, EngineResult, Permission};
use crate::geometry::{Point, Vec2};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    Move,
    LeftDrag,
    RightDrag,
    LeftDown,
    LeftUp,
    RightDown,
    RightUp,
    Wheel,
}

impl PointerEventKind {
    pub fn is_motion(self) -> bool {
        matches!(
            self,
            PointerEventKind::Move | PointerEventKind::LeftDrag | PointerEventKind::RightDrag
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub position: Point,
    pub delta: Vec2,
    pub flags: u32,
    pub timestamp: u32,
}

impl PointerEvent {
    pub fn motion(kind: PointerEventKind, position: Point, delta: Vec2) -> Self {
        Self {
            kind,
            position,
            delta,
            flags: 0,
            timestamp: 0,
        }
    }
}

pub type EventPredicate = Arc<dyn Fn(&PointerEvent) -> bool + Send + Sync>;
pub type EventTransform = Arc<dyn Fn(PointerEvent) -> PointerEvent + Send + Sync>;

#[derive(Clone)]
pub struct InterceptRule {
    predicate: EventPredicate,
    transform: EventTransform,
}

impl InterceptRule {
    pub fn new(
        predicate: impl Fn(&PointerEvent) -> bool + Send + Sync + 'static,
        transform: impl Fn(PointerEvent) -> PointerEvent + Send + Sync + 'static,
    ) -> Self {
        Self {
            predicate: Arc::new(predicate),
            transform: Arc::new(transform),
        }
    }

    pub fn matches(&self, event: &PointerEvent) -> bool {
        (self.predicate)(event)
    }

    pub fn apply(&self, event: PointerEvent) -> PointerEvent {
        if self.matches(&event) {
            (self.transform)(event)
        } else {
            event
        }
    }
}

impl std::fmt::Debug for InterceptRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptRule").finish_non_exhaustive()
    }
}

pub trait InputInterceptor: Send {
    /// Installs `rule`, replacing any previous one. Fails with `PermissionDenied` when the
    /// OS refuses global input access; nothing is installed in that case.
    fn intercept(&mut self, rule: InterceptRule) -> EngineResult<()>;
    /// Removes the rule; events pass untouched afterwards. Idempotent.
    fn release(&mut self);
    fn is_intercepting(&self) -> bool;
}

#[cfg(windows)]
pub use platform::LowLevelMouseInterceptor;

/// The platform interceptor, or one that always reports unsupported.
pub fn system_interceptor() -> Box<dyn InputInterceptor> {
    #[cfg(windows)]
    {
        Box::new(platform::LowLevelMouseInterceptor::default())
    }
    #[cfg(not(windows))]
    {
        Box::new(UnsupportedInterceptor)
    }
}

#[derive(Debug, Default)]
pub struct UnsupportedInterceptor;

impl InputInterceptor for UnsupportedInterceptor {
    fn intercept(&mut self, _rule: InterceptRule) -> EngineResult<()> {
        Err(EngineError::Unsupported("pointer interception"))
    }

    fn release(&mut self) {}

    fn is_intercepting(&self) -> bool {
        false
    }
}

#[cfg(windows)]
mod platform {
    use super::{InputInterceptor, InterceptRule, PointerEvent, PointerEventKind};
    use crate::error::{EngineError, EngineResult, Permission};
    use crate::geometry::{Point, Vec2};
    use once_cell::sync::OnceCell;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tracing::{debug, warn};
    use windows::Win32::Foundation::{ERROR_ACCESS_DENIED, LPARAM, LRESULT, POINT, WPARAM};
    use windows::Win32::UI::WindowsAndMessaging::{
        CallNextHookEx, GetCursorPos, SetCursorPos, HC_ACTION, HHOOK, MSLLHOOKSTRUCT,
        WM_MOUSEMOVE,
    };

    struct WarpState {
        anchor: Point,
        remainder: Vec2,
    }

    struct HookDispatch {
        enabled: AtomicBool,
        rule: Mutex<Option<InterceptRule>>,
        warp: Mutex<WarpState>,
    }

    static HOOK_DISPATCH: OnceCell<HookDispatch> = OnceCell::new();

    fn hook_dispatch() -> &'static HookDispatch {
        HOOK_DISPATCH.get_or_init(|| HookDispatch {
            enabled: AtomicBool::new(false),
            rule: Mutex::new(None),
            warp: Mutex::new(WarpState {
                anchor: Point::ZERO,
                remainder: Vec2::ZERO,
            }),
        })
    }

    fn cursor_position() -> Option<Point> {
        let mut point = POINT { x: 0, y: 0 };
        if unsafe { GetCursorPos(&mut point) }.is_ok() {
            Some(Point::new(point.x as f32, point.y as f32))
        } else {
            None
        }
    }

    fn motion_kind() -> PointerEventKind {
        use windows::Win32::UI::Input::KeyboardAndMouse::{GetAsyncKeyState, VK_LBUTTON, VK_RBUTTON};
        let down = |vk: i32| unsafe { (GetAsyncKeyState(vk) as u16 & 0x8000) != 0 };
        if down(VK_LBUTTON.0 as i32) {
            PointerEventKind::LeftDrag
        } else if down(VK_RBUTTON.0 as i32) {
            PointerEventKind::RightDrag
        } else {
            PointerEventKind::Move
        }
    }

    struct HookThread {
        thread_id: u32,
        join: std::thread::JoinHandle<()>,
    }

    #[derive(Default)]
    pub struct LowLevelMouseInterceptor {
        hook_thread: Option<HookThread>,
    }

    unsafe impl Send for LowLevelMouseInterceptor {}

    impl LowLevelMouseInterceptor {
        fn install_hook(&mut self) -> EngineResult<()> {
            use windows::Win32::System::LibraryLoader::GetModuleHandleW;
            use windows::Win32::System::Threading::GetCurrentThreadId;
            use windows::Win32::UI::WindowsAndMessaging::{
                DispatchMessageW, GetMessageW, PeekMessageW, SetWindowsHookExW,
                TranslateMessage, UnhookWindowsHookEx, MSG, PM_NOREMOVE, WH_MOUSE_LL,
            };

            let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<EngineResult<u32>>(1);

            let join = std::thread::spawn(move || {
                let mut msg = MSG::default();
                unsafe {
                    let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
                }
                let thread_id = unsafe { GetCurrentThreadId() };

                let hmodule = match unsafe { GetModuleHandleW(None) } {
                    Ok(h) => h,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.into()));
                        return;
                    }
                };

                let mouse_hook = match unsafe {
                    SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), hmodule, 0)
                } {
                    Ok(h) if !h.0.is_null() => h,
                    Ok(_) => {
                        let _ = ready_tx.send(Err(windows::core::Error::from_win32().into()));
                        return;
                    }
                    Err(e) => {
                        let err = if e.code() == ERROR_ACCESS_DENIED.to_hresult() {
                            EngineError::PermissionDenied(Permission::InputMonitoring)
                        } else {
                            e.into()
                        };
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                let _ = ready_tx.send(Ok(thread_id));

                loop {
                    let r = unsafe { GetMessageW(&mut msg, None, 0, 0) };
                    if r.0 == 0 || r.0 == -1 {
                        break;
                    }
                    unsafe {
                        let _ = TranslateMessage(&msg);
                        DispatchMessageW(&msg);
                    }
                }

                unsafe {
                    let _ = UnhookWindowsHookEx(mouse_hook);
                }
            });

            let thread_id = ready_rx
                .recv_timeout(Duration::from_secs(2))
                .map_err(|_| EngineError::Unsupported("pointer hook thread start"))??;
            self.hook_thread = Some(HookThread { thread_id, join });
            Ok(())
        }
    }

    impl InputInterceptor for LowLevelMouseInterceptor {
        fn intercept(&mut self, rule: InterceptRule) -> EngineResult<()> {
            let dispatch = hook_dispatch();
            if let Ok(mut warp) = dispatch.warp.lock() {
                warp.anchor = cursor_position().unwrap_or(Point::ZERO);
                warp.remainder = Vec2::ZERO;
            }
            if let Ok(mut guard) = dispatch.rule.lock() {
                *guard = Some(rule);
            }
            if self.hook_thread.is_none() {
                if let Err(err) = self.install_hook() {
                    if let Ok(mut guard) = dispatch.rule.lock() {
                        *guard = None;
                    }
                    warn!(?err, "failed to install pointer hook");
                    return Err(err);
                }
            }
            dispatch.enabled.store(true, Ordering::Release);
            debug!("pointer interception installed");
            Ok(())
        }

        fn release(&mut self) {
            let dispatch = hook_dispatch();
            dispatch.enabled.store(false, Ordering::Release);
            if let Ok(mut guard) = dispatch.rule.lock() {
                *guard = None;
            }

            if let Some(th) = self.hook_thread.take() {
                use windows::Win32::UI::WindowsAndMessaging::{PostThreadMessageW, WM_QUIT};
                unsafe {
                    let _ = PostThreadMessageW(th.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
                }
                let _ = th.join.join();
                debug!("pointer interception released");
            }
        }

        fn is_intercepting(&self) -> bool {
            self.hook_thread.is_some()
        }
    }

    impl Drop for LowLevelMouseInterceptor {
        fn drop(&mut self) {
            self.release();
        }
    }

    unsafe extern "system" fn mouse_hook_proc(
        n_code: i32,
        w_param: WPARAM,
        l_param: LPARAM,
    ) -> LRESULT {
        if n_code == HC_ACTION as i32 && w_param.0 as u32 == WM_MOUSEMOVE {
            let dispatch = hook_dispatch();
            if dispatch.enabled.load(Ordering::Acquire) {
                let info = &*(l_param.0 as *const MSLLHOOKSTRUCT);
                // Flags: 0x1 = LLMHF_INJECTED, 0x2 = LLMHF_LOWER_IL_INJECTED
                let injected = (info.flags & 0x1) != 0 || (info.flags & 0x2) != 0;
                if !injected {
                    if let (Ok(rule), Ok(mut warp)) = (dispatch.rule.try_lock(), dispatch.warp.try_lock()) {
                        if let Some(rule) = rule.as_ref() {
                            let position = Point::new(info.pt.x as f32, info.pt.y as f32);
                            let event = PointerEvent {
                                kind: motion_kind(),
                                position,
                                delta: position - warp.anchor,
                                flags: info.flags,
                                timestamp: info.time,
                            };
                            if rule.matches(&event) {
                                let moved = rule.apply(event);
                                let target = warp.anchor + moved.delta + warp.remainder;
                                let (x, y) = target.round_i32();
                                warp.remainder = target - Point::new(x as f32, y as f32);
                                warp.anchor = Point::new(x as f32, y as f32);
                                let _ = SetCursorPos(x, y);
                                return LRESULT(1);
                            }
                            warp.anchor = position;
                        }
                    }
                }
            }
        }

        CallNextHookEx(HHOOK(std::ptr::null_mut()), n_code, w_param, l_param)
    }
}

#[derive(Default)]
struct MockInterceptState {
    rule: Mutex<Option<InterceptRule>>,
    denied: AtomicBool,
    install_count: AtomicUsize,
    release_count: AtomicUsize,
}

/// In-memory interceptor. Events are pushed through [`MockInterceptorHandle::deliver`].
#[derive(Clone)]
pub struct MockInterceptor {
    state: Arc<MockInterceptState>,
}

impl MockInterceptor {
    pub fn new() -> (Self, MockInterceptorHandle) {
        let state = Arc::new(MockInterceptState::default());
        (
            Self {
                state: Arc::clone(&state),
            },
            MockInterceptorHandle { state },
        )
    }
}

impl InputInterceptor for MockInterceptor {
    fn intercept(&mut self, rule: InterceptRule) -> EngineResult<()> {
        if self.state.denied.load(Ordering::SeqCst) {
            return Err(EngineError::PermissionDenied(Permission::InputMonitoring));
        }
        let mut guard = self
            .state
            .rule
            .lock()
            .map_err(|_| EngineError::Unsupported("poisoned mock interceptor"))?;
        if guard.is_none() {
            self.state.install_count.fetch_add(1, Ordering::SeqCst);
        }
        *guard = Some(rule);
        Ok(())
    }

    fn release(&mut self) {
        if let Ok(mut guard) = self.state.rule.lock() {
            if guard.take().is_some() {
                self.state.release_count.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn is_intercepting(&self) -> bool {
        self.state
            .rule
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }
}

#[derive(Clone)]
pub struct MockInterceptorHandle {
    state: Arc<MockInterceptState>,
}

impl MockInterceptorHandle {
    /// Runs `event` through the installed rule, as the OS would deliver it.
    pub fn deliver(&self, event: PointerEvent) -> PointerEvent {
        match self.state.rule.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(rule) => rule.apply(event),
                None => event,
            },
            Err(_) => event,
        }
    }

    pub fn deny_permission(&self) {
        self.state.denied.store(true, Ordering::SeqCst);
    }

    pub fn grant_permission(&self) {
        self.state.denied.store(false, Ordering::SeqCst);
    }

    pub fn is_installed(&self) -> bool {
        self.state
            .rule
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    pub fn install_count(&self) -> usize {
        self.state.install_count.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.state.release_count.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubling_rule() -> InterceptRule {
        InterceptRule::new(
            |event| event.kind.is_motion(),
            |mut event| {
                event.delta = event.delta * 2.0;
                event
            },
        )
    }

    #[test]
    fn rule_only_transforms_matching_events() {
        let rule = doubling_rule();
        let moved = rule.apply(PointerEvent::motion(
            PointerEventKind::Move,
            Point::ZERO,
            Vec2::new(1.0, 2.0),
        ));
        assert_eq!(moved.delta, Vec2::new(2.0, 4.0));
        let click = PointerEvent::motion(PointerEventKind::LeftDown, Point::ZERO, Vec2::new(1.0, 2.0));
        assert_eq!(rule.apply(click), click);
    }

    #[test]
    fn mock_counts_install_and_release_once() {
        let (mut interceptor, handle) = MockInterceptor::new();
        interceptor.intercept(doubling_rule()).expect("install");
        interceptor.intercept(doubling_rule()).expect("replace");
        interceptor.release();
        interceptor.release();
        assert_eq!((handle.install_count(), handle.release_count()), (1, 1));
        assert!(!interceptor.is_intercepting());
    }

    #[test]
    fn mock_denied_permission_installs_nothing() {
        let (mut interceptor, handle) = MockInterceptor::new();
        handle.deny_permission();
        let err = interceptor.intercept(doubling_rule()).expect_err("denied");
        assert_eq!(err.permission(), Some(Permission::InputMonitoring));
        assert!(!handle.is_installed());
    }
}
