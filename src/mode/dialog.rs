use crate::mode::messages::UserNotice;
use tracing::warn;

/// Body shown in the notice dialog. Notices with a remediation end in a yes/no question.
pub fn dialog_text(notice: &UserNotice) -> String {
    match notice.remediation {
        Some(remediation) => format!("{}\n\n{}?", notice.message, remediation.label()),
        None => notice.message.clone(),
    }
}

/// Shows `notice` in a modal dialog. Returns `true` when the user chose to run the
/// remediation.
pub fn confirm(notice: &UserNotice) -> bool {
    platform::confirm(notice)
}

/// Offers the notice on its own thread so the dialog never blocks the engine loop.
pub fn offer_in_background(notice: UserNotice) {
    std::thread::spawn(move || {
        if let Err(err) = notice.offer(confirm) {
            warn!(?err, title = %notice.title, "remediation failed");
        }
    });
}

#[cfg(windows)]
mod platform {
    use super::dialog_text;
    use crate::mode::messages::UserNotice;
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{
        MessageBoxW, IDYES, MB_ICONINFORMATION, MB_ICONWARNING, MB_OK, MB_SETFOREGROUND,
        MB_TOPMOST, MB_YESNO,
    };

    fn wide(text: &str) -> Vec<u16> {
        text.encode_utf16().chain(std::iter::once(0)).collect()
    }

    pub fn confirm(notice: &UserNotice) -> bool {
        let body = wide(&dialog_text(notice));
        let title = wide(&notice.title);
        let style = if notice.remediation.is_some() {
            MB_YESNO | MB_ICONWARNING
        } else {
            MB_OK | MB_ICONINFORMATION
        };
        let answer = unsafe {
            MessageBoxW(
                HWND::default(),
                PCWSTR(body.as_ptr()),
                PCWSTR(title.as_ptr()),
                style | MB_TOPMOST | MB_SETFOREGROUND,
            )
        };
        notice.remediation.is_some() && answer == IDYES
    }
}

#[cfg(not(windows))]
mod platform {
    use crate::mode::messages::UserNotice;
    use tracing::warn;

    pub fn confirm(notice: &UserNotice) -> bool {
        warn!(title = %notice.title, message = %notice.message, "notice");
        false
    }
}
