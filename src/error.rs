//! Error types for the rendering pipeline

use std::fmt;
use thiserror::Error;

/// Result type alias for rendering operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Creating the shared render surface
    Surface,
    /// Loading the per-call host document
    PageLoad,
    /// Injecting the terminal stylesheet and script
    AssetInjection,
    /// Waiting for web fonts
    FontReadiness,
    /// Instantiating the terminal component and writing text into it
    Terminal,
    /// Locating the terminal node and capturing its image
    Capture,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Surface => "surface creation",
            Stage::PageLoad => "page load",
            Stage::AssetInjection => "asset injection",
            Stage::FontReadiness => "font readiness",
            Stage::Terminal => "terminal write",
            Stage::Capture => "capture",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while rendering
#[derive(Error, Debug)]
pub enum Error {
    /// The shared render surface could not be created
    #[error("Render surface creation failed: {0}")]
    SurfaceError(String),

    /// The host document failed to load or settle
    #[error("Failed to load host page: {0}")]
    PageLoadError(String),

    /// Terminal stylesheet or script could not be loaded into the page
    #[error("Asset injection failed: {0}")]
    AssetError(String),

    /// Fonts did not report ready before the deadline
    #[error("Fonts not ready after {0}ms")]
    FontTimeout(u64),

    /// Font loading failed before the terminal was created
    #[error("Font loading failed: {0}")]
    FontError(String),

    /// The terminal component could not be created or written to
    #[error("Terminal setup failed: {0}")]
    TerminalError(String),

    /// The terminal node could not be found or captured
    #[error("Capture failed: {0}")]
    CaptureError(String),

    /// The caller's deadline elapsed before a stage could start
    #[error("Deadline of {ms}ms exceeded during {stage}")]
    Timeout { stage: Stage, ms: u64 },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// The pipeline stage this error belongs to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::SurfaceError(_) => Some(Stage::Surface),
            Error::PageLoadError(_) => Some(Stage::PageLoad),
            Error::AssetError(_) => Some(Stage::AssetInjection),
            Error::FontTimeout(_) | Error::FontError(_) => Some(Stage::FontReadiness),
            Error::TerminalError(_) => Some(Stage::Terminal),
            Error::CaptureError(_) => Some(Stage::Capture),
            Error::Timeout { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether the failure came from a deadline rather than a hard error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::FontTimeout(_) | Error::Timeout { .. })
    }
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}
