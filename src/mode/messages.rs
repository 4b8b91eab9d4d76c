use crate::error::Permission;
use crate::mode::state::{CursorHighlightState, Mode, SpotlightState};
use crate::timer::TimerSnapshot;
use anyhow::{Context, Result};
use tracing::info;

/// Immutable view of the engine published after every state change.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub mode: Mode,
    pub cursor_highlight: bool,
    pub spotlight: SpotlightState,
    pub highlight: CursorHighlightState,
    /// Zoom factor while the zoom window is open.
    pub zoom_scale: Option<f32>,
    pub zoom_drawing: bool,
    pub zoom_spotlight: bool,
    pub zoom_highlight: bool,
    pub governor_active: bool,
    pub annotation_count: usize,
    pub timer: Option<TimerSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remediation {
    OpenPrivacySettings(Permission),
}

impl Remediation {
    pub fn label(&self) -> &'static str {
        match self {
            Remediation::OpenPrivacySettings(_) => "Open privacy settings",
        }
    }

    pub fn target(&self) -> &'static str {
        match self {
            Remediation::OpenPrivacySettings(Permission::ScreenCapture) => {
                "ms-settings:privacy-graphicscaptureprogrammatic"
            }
            Remediation::OpenPrivacySettings(Permission::InputMonitoring) => "ms-settings:privacy",
        }
    }

    /// Opens the OS settings page for the missing permission.
    pub fn run(&self) -> Result<()> {
        let target = self.target();
        info!(target, "opening privacy settings");
        open::that(target).with_context(|| format!("failed to open {target}"))
    }
}

/// A message for the user, shown at most once per feature per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserNotice {
    pub title: String,
    pub message: String,
    pub remediation: Option<Remediation>,
}

impl UserNotice {
    pub fn permission_denied(permission: Permission, feature: &str) -> Self {
        Self {
            title: format!("{} permission needed", capitalize(permission.label())),
            message: format!(
                "{feature} is unavailable because {} permission is not granted.",
                permission.label()
            ),
            remediation: Some(Remediation::OpenPrivacySettings(permission)),
        }
    }

    pub fn failure(feature: &str, detail: impl std::fmt::Display) -> Self {
        Self {
            title: format!("{feature} failed"),
            message: detail.to_string(),
            remediation: None,
        }
    }

    /// Shows the notice through `confirm` and runs its remediation only when the user
    /// accepts. Returns whether the remediation ran.
    pub fn offer(&self, confirm: impl FnOnce(&UserNotice) -> bool) -> Result<bool> {
        self.offer_with(confirm, Remediation::run)
    }

    fn offer_with(
        &self,
        confirm: impl FnOnce(&UserNotice) -> bool,
        run: impl FnOnce(&Remediation) -> Result<()>,
    ) -> Result<bool> {
        let accepted = confirm(self);
        match self.remediation.as_ref() {
            Some(remediation) if accepted => {
                run(remediation)?;
                Ok(true)
            }
            Some(remediation) => {
                info!(action = remediation.label(), "remediation declined");
                Ok(false)
            }
            None => Ok(false),
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineUpdate {
    State(EngineSnapshot),
    Notice(UserNotice),
}
