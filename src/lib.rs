//! ansi-shot
//!
//! Renders text containing ANSI color and style escape sequences into a still
//! image that looks the way the text would inside a real terminal.
//!
//! The heavy lifting is done by a terminal emulation component (xterm.js)
//! running inside an off-screen browser page. This crate sizes the terminal
//! grid to the text, manages the shared browser, builds the host page, feeds
//! the raw text to the emulator and captures only the terminal element.
//!
//! # Features
//!
//! - **CDP Backend** (default): drives headless Chrome through the DevTools
//!   protocol
//! - **Pluggable surface**: the pipeline runs against the [`surface`] traits, so
//!   it can be tested against a fake browser
//! - **Async facade**: [`AsyncRenderer`] for tokio callers
//!
//! # Example
//!
//! ```no_run
//! use ansi_shot::{RenderOptions, RenderRequest, RendererConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let renderer = ansi_shot::new_renderer(RendererConfig::default());
//! let request = RenderRequest::new("\x1b[31mred\x1b[0m and plain").with_options(RenderOptions {
//!     pad_amount_px: Some(10),
//!     ..Default::default()
//! });
//! let png = renderer.capture(&request)?;
//! std::fs::write("out.png", png)?;
//! renderer.release();
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod error;
pub use error::{Error, Result, Stage};

pub mod capture;
pub mod fixtures;
pub mod grid;
pub mod host_page;
pub mod options;
pub mod surface;

#[cfg(feature = "cdp")]
pub mod cdp;

// Async-friendly facade over the blocking pipeline
pub mod async_api;

pub use async_api::AsyncRenderer;
pub use capture::Renderer;
pub use grid::GridDimensions;
pub use options::{ImageFormat, RenderOptions, RenderRequest, Theme};
pub use surface::SurfaceManager;

/// Browser flags for non-interactive, GPU-less, sandbox-less execution.
///
/// Disabling the sandbox is a concession to the constrained containers this
/// usually runs in.
pub const SURFACE_FLAGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-background-networking",
    "--disable-sync",
    "--disable-translate",
    "--disable-gpu",
    "--disable-background-timer-throttling",
];

/// Where a terminal asset comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Read from disk on every render
    Path(PathBuf),
    /// Already in memory
    Inline(String),
}

impl AssetSource {
    pub fn load(&self) -> Result<String> {
        match self {
            AssetSource::Path(path) => std::fs::read_to_string(path)
                .map_err(|e| Error::AssetError(format!("Failed to read {}: {}", path.display(), e))),
            AssetSource::Inline(source) => Ok(source.clone()),
        }
    }
}

/// The terminal emulation component's stylesheet and script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalAssets {
    pub stylesheet: AssetSource,
    pub script: AssetSource,
}

impl TerminalAssets {
    /// Assets laid out as in the `@xterm/xterm` package rooted at `dir`.
    pub fn from_package_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            stylesheet: AssetSource::Path(dir.join("css").join("xterm.css")),
            script: AssetSource::Path(dir.join("lib").join("xterm.js")),
        }
    }
}

impl Default for TerminalAssets {
    fn default() -> Self {
        Self::from_package_dir("node_modules/@xterm/xterm")
    }
}

/// Configuration for a [`Renderer`]
///
/// Defaults are suitable for a local run with xterm.js installed under
/// `node_modules`:
///
/// ```
/// let cfg = ansi_shot::RendererConfig::default();
/// assert_eq!(cfg.timeout_ms, 30000);
/// assert!(cfg.web_fonts);
/// ```
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Terminal emulation stylesheet and script
    pub assets: TerminalAssets,
    /// Browser executable; `None` lets the backend locate one
    pub browser_path: Option<PathBuf>,
    /// Window size of the shared surface. Terminals larger than this are clipped.
    pub window: (u32, u32),
    /// Per-render deadline in milliseconds (0 disables it)
    pub timeout_ms: u64,
    /// Import the requested font family as a web font
    pub web_fonts: bool,
    /// Stylesheet endpoint the web font is imported from
    pub font_css_url: String,
    /// How long the surface may sit without traffic before the backend drops it
    pub idle_timeout: Duration,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            assets: TerminalAssets::default(),
            browser_path: None,
            window: (1920, 1080),
            timeout_ms: 30000,
            web_fonts: true,
            font_css_url: "https://fonts.googleapis.com/css2".to_string(),
            idle_timeout: Duration::from_secs(60 * 60 * 24 * 365),
        }
    }
}

impl RendererConfig {
    /// Deadline for one render, if any.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// Create a renderer backed by headless Chrome.
///
/// The browser is not launched until the first capture.
#[cfg(feature = "cdp")]
pub fn new_renderer(config: RendererConfig) -> Renderer<cdp::ChromeProvider> {
    let provider = cdp::ChromeProvider::new(&config);
    Renderer::new(provider, config)
}
