use thiserror::Error;

/// Failures that prevent the render loop from ever starting.
///
/// Both are reported with exit status -1; any other setup failure (bad scene
/// file, unreadable model) uses the generic error path.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to create {stage}: {message}")]
    Window { stage: &'static str, message: String },
    #[error("failed to initialize graphics {stage}: {message}")]
    Graphics { stage: &'static str, message: String },
}

impl StartupError {
    pub fn window(stage: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Window {
            stage,
            message: err.to_string(),
        }
    }

    pub fn graphics(stage: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Graphics {
            stage,
            message: err.to_string(),
        }
    }

    /// Process exit status reserved for context and loader failures.
    pub const EXIT_STATUS: i32 = -1;
}
