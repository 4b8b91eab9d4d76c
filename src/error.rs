use thiserror::Error;

/// Which OS permission a failed operation needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ScreenCapture,
    InputMonitoring,
}

impl Permission {
    pub fn label(self) -> &'static str {
        match self {
            Permission::ScreenCapture => "screen capture",
            Permission::InputMonitoring => "input monitoring",
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{} permission is not granted", .0.label())]
    PermissionDenied(Permission),

    #[error("screen capture failed: {0}")]
    CaptureFailed(String),

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("overlay surface error: {0}")]
    Surface(String),

    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    Platform(#[from] windows::core::Error),
}

impl EngineError {
    pub fn permission(&self) -> Option<Permission> {
        match self {
            EngineError::PermissionDenied(permission) => Some(*permission),
            _ => None,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
