//! Chrome DevTools Protocol surface implementation
//!
//! Launches one headless Chrome for the shared surface and gives every render
//! its own tab.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine as Base64Engine;
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::debug;

use crate::host_page::{self, ScriptOutcome};
use crate::options::ImageFormat;
use crate::surface::{HostPage, RenderSurface, SurfaceProvider};
use crate::{Error, RendererConfig, Result, SURFACE_FLAGS};

/// Launches headless Chrome with [`SURFACE_FLAGS`]
#[derive(Debug, Clone)]
pub struct ChromeProvider {
    browser_path: Option<PathBuf>,
    window: (u32, u32),
    idle_timeout: Duration,
}

impl ChromeProvider {
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            browser_path: config.browser_path.clone(),
            window: config.window,
            idle_timeout: config.idle_timeout,
        }
    }
}

impl SurfaceProvider for ChromeProvider {
    type Surface = ChromeSurface;

    fn create(&self) -> Result<ChromeSurface> {
        let args: Vec<&OsStr> = SURFACE_FLAGS.iter().map(|flag| OsStr::new(*flag)).collect();

        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .enable_gpu(false)
            .window_size(Some(self.window))
            .idle_browser_timeout(self.idle_timeout)
            .path(self.browser_path.clone())
            .args(args)
            .build()
            .map_err(|e| Error::SurfaceError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::SurfaceError(format!("Failed to launch browser: {}", e)))?;
        debug!("Browser launched");

        Ok(ChromeSurface {
            browser: Mutex::new(Some(browser)),
        })
    }
}

/// The running browser. Dropping the browser terminates the child process.
pub struct ChromeSurface {
    browser: Mutex<Option<Browser>>,
}

impl RenderSurface for ChromeSurface {
    type Page = ChromePage;

    fn open_page(&self) -> Result<ChromePage> {
        let browser = self
            .browser
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| Error::PageLoadError("browser already closed".into()))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::PageLoadError(format!("Failed to create tab: {}", e)))?;
        Ok(ChromePage { tab })
    }

    fn close(&self) -> Result<()> {
        let browser = self.browser.lock().unwrap_or_else(|e| e.into_inner()).take();
        drop(browser);
        Ok(())
    }
}

/// One tab, owned by one render call
pub struct ChromePage {
    tab: Arc<Tab>,
}

impl ChromePage {
    fn run_status(&self, script: &str) -> Result<ScriptOutcome> {
        let remote = self
            .tab
            .evaluate(script, true)
            .map_err(|e| Error::CdpError(format!("Evaluation failed: {}", e)))?;
        Ok(ScriptOutcome::from_value(remote.value.unwrap_or(serde_json::Value::Null)))
    }
}

fn screenshot_format(format: ImageFormat) -> Page::CaptureScreenshotFormatOption {
    match format {
        ImageFormat::Png => Page::CaptureScreenshotFormatOption::Png,
        ImageFormat::Jpeg => Page::CaptureScreenshotFormatOption::Jpeg,
        ImageFormat::Webp => Page::CaptureScreenshotFormatOption::Webp,
    }
}

impl HostPage for ChromePage {
    fn load_document(&mut self, html: &str, timeout: Option<Duration>) -> Result<()> {
        if let Some(timeout) = timeout {
            self.tab.set_default_timeout(timeout);
        }

        // The document has no external dependencies except the optional font
        // stylesheet, so a data URL is enough.
        let b64 = Base64Engine::encode(&base64::engine::general_purpose::STANDARD, html);
        let url = format!("data:text/html;charset=utf-8;base64,{}", b64);

        self.tab
            .navigate_to(&url)
            .map_err(|e| Error::PageLoadError(format!("Navigation failed: {}", e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::PageLoadError(format!("Wait for navigation failed: {}", e)))?;
        Ok(())
    }

    fn inject_stylesheet(&mut self, css: &str) -> Result<()> {
        match self.run_status(&host_page::stylesheet_injection(css))? {
            ScriptOutcome::Ok(_) => Ok(()),
            ScriptOutcome::Failed(msg) => Err(Error::AssetError(format!("stylesheet: {}", msg))),
            ScriptOutcome::TimedOut => Err(Error::AssetError("stylesheet injection timed out".into())),
        }
    }

    fn inject_script(&mut self, js: &str) -> Result<()> {
        match self.run_status(&host_page::script_injection(js))? {
            ScriptOutcome::Ok(_) => Ok(()),
            ScriptOutcome::Failed(msg) => Err(Error::AssetError(format!("script: {}", msg))),
            ScriptOutcome::TimedOut => Err(Error::AssetError("script injection timed out".into())),
        }
    }

    fn evaluate(&mut self, expression: &str) -> Result<serde_json::Value> {
        let remote = self
            .tab
            .evaluate(expression, true)
            .map_err(|e| Error::CdpError(format!("Evaluation failed: {}", e)))?;
        Ok(remote.value.unwrap_or(serde_json::Value::Null))
    }

    fn capture_element(
        &mut self,
        selector: &str,
        format: ImageFormat,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>> {
        if let Some(timeout) = timeout {
            self.tab.set_default_timeout(timeout);
        }

        let element = self
            .tab
            .wait_for_element(selector)
            .map_err(|e| Error::CaptureError(format!("Element {} not found: {}", selector, e)))?;

        element
            .capture_screenshot(screenshot_format(format))
            .map_err(|e| Error::CaptureError(format!("Screenshot failed: {}", e)))
    }

    fn close(self) -> Result<()> {
        self.tab
            .close(false)
            .map_err(|e| Error::CdpError(format!("Failed to close tab: {}", e)))?;
        Ok(())
    }
}
