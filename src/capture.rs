//! Screenshot capturer: text in, image bytes out

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::host_page::{self, ScriptOutcome, TERMINAL_SELECTOR};
use crate::options::{RenderRequest, ResolvedOptions};
use crate::surface::{HostPage, RenderSurface, SurfaceManager, SurfaceProvider};
use crate::{grid, Error, RendererConfig, Result, Stage};

/// Time budget for one render, checked before every stage
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    pub fn start(budget: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn unbounded() -> Self {
        Self::start(None)
    }

    pub fn budget_ms(&self) -> u64 {
        self.budget.map(|b| b.as_millis() as u64).unwrap_or(0)
    }

    /// Time left for `stage`, or a timeout error if none is left.
    /// `None` means no deadline.
    pub fn remaining(&self, stage: Stage) -> Result<Option<Duration>> {
        match self.budget {
            None => Ok(None),
            Some(budget) => {
                let left = budget.saturating_sub(self.started.elapsed());
                if left.is_zero() {
                    Err(Error::Timeout {
                        stage,
                        ms: self.budget_ms(),
                    })
                } else {
                    Ok(Some(left))
                }
            }
        }
    }

    fn remaining_ms(&self, stage: Stage) -> Result<Option<u64>> {
        Ok(self.remaining(stage)?.map(|d| (d.as_millis() as u64).max(1)))
    }
}

/// Attribute a backend error to `stage` unless it already names one.
fn at_stage(stage: Stage, err: Error) -> Error {
    if err.stage().is_some() {
        return err;
    }
    let msg = err.to_string();
    match stage {
        Stage::Surface => Error::SurfaceError(msg),
        Stage::PageLoad => Error::PageLoadError(msg),
        Stage::AssetInjection => Error::AssetError(msg),
        Stage::FontReadiness => Error::FontError(msg),
        Stage::Terminal => Error::TerminalError(msg),
        Stage::Capture => Error::CaptureError(msg),
    }
}

/// Renders [`RenderRequest`]s on a shared surface
///
/// `capture` takes `&self` and may be called from many threads at once; each
/// call gets its own page on the one shared surface.
pub struct Renderer<P: SurfaceProvider> {
    surfaces: Arc<SurfaceManager<P>>,
    config: RendererConfig,
}

impl<P: SurfaceProvider> Renderer<P> {
    pub fn new(provider: P, config: RendererConfig) -> Self {
        Self::with_manager(Arc::new(SurfaceManager::new(provider)), config)
    }

    /// Build a renderer on an existing manager, sharing its surface.
    pub fn with_manager(surfaces: Arc<SurfaceManager<P>>, config: RendererConfig) -> Self {
        Self { surfaces, config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn surfaces(&self) -> &Arc<SurfaceManager<P>> {
        &self.surfaces
    }

    /// Render `request` to image bytes in the requested format.
    ///
    /// The page opened for this call is closed on every path; the shared
    /// surface is left open.
    pub fn capture(&self, request: &RenderRequest) -> Result<Vec<u8>> {
        let deadline = Deadline::start(request.timeout.or_else(|| self.config.timeout()));
        let grid = grid::size(&request.text);
        let resolved = request.options.resolve(grid);
        debug!("Grid sized to {}x{}", grid.columns, grid.rows);

        deadline.remaining(Stage::Surface)?;
        let surface = self.surfaces.acquire()?;
        deadline.remaining(Stage::Surface)?;

        deadline.remaining(Stage::PageLoad)?;
        let mut page = surface.open_page().map_err(|e| at_stage(Stage::PageLoad, e))?;
        debug!("Host page opened");

        let result = self.render_on(&mut page, &request.text, &resolved, &deadline);

        match page.close() {
            Ok(()) => debug!("Host page closed"),
            Err(e) => warn!("Failed to close host page: {}", e),
        }
        result
    }

    /// Standalone HTML for `request` with the configured assets inlined.
    pub fn render_html(&self, request: &RenderRequest) -> Result<String> {
        host_page::standalone_html(&request.text, &request.options, &self.config.assets, &self.config)
    }

    /// Tear down the shared surface. Returns `true` if one was open.
    pub fn release(&self) -> bool {
        self.surfaces.release()
    }

    fn font_css(&self, resolved: &ResolvedOptions) -> Option<String> {
        if !self.config.web_fonts {
            return None;
        }
        host_page::font_import_url(&self.config.font_css_url, resolved.font_family())
    }

    fn render_on(
        &self,
        page: &mut <P::Surface as RenderSurface>::Page,
        text: &str,
        resolved: &ResolvedOptions,
        deadline: &Deadline,
    ) -> Result<Vec<u8>> {
        let html = host_page::document(resolved, self.font_css(resolved).as_deref());
        let timeout = deadline.remaining(Stage::PageLoad)?;
        page.load_document(&html, timeout)
            .map_err(|e| at_stage(Stage::PageLoad, e))?;
        debug!("Page content set");

        deadline.remaining(Stage::AssetInjection)?;
        let css = self.config.assets.stylesheet.load()?;
        page.inject_stylesheet(&css)
            .map_err(|e| at_stage(Stage::AssetInjection, e))?;
        debug!("Terminal stylesheet added");

        deadline.remaining(Stage::AssetInjection)?;
        let js = self.config.assets.script.load()?;
        page.inject_script(&js)
            .map_err(|e| at_stage(Stage::AssetInjection, e))?;
        match Self::run(page, &host_page::terminal_probe(), Stage::AssetInjection)? {
            ScriptOutcome::Ok(_) => debug!("Terminal script added"),
            ScriptOutcome::Failed(msg) => return Err(Error::AssetError(msg)),
            ScriptOutcome::TimedOut => {
                return Err(Error::Timeout {
                    stage: Stage::AssetInjection,
                    ms: deadline.budget_ms(),
                })
            }
        }

        // Glyph metrics are only right once fonts are in
        let ms = deadline.remaining_ms(Stage::FontReadiness)?;
        match Self::run(page, &host_page::fonts_ready(resolved, ms), Stage::FontReadiness)? {
            ScriptOutcome::Ok(_) => debug!("Fonts loaded"),
            ScriptOutcome::TimedOut => return Err(Error::FontTimeout(deadline.budget_ms())),
            ScriptOutcome::Failed(msg) => return Err(Error::FontError(msg)),
        }

        let ms = deadline.remaining_ms(Stage::Terminal)?;
        let script = host_page::terminal_setup(resolved, text, ms)?;
        match Self::run(page, &script, Stage::Terminal)? {
            ScriptOutcome::Ok(_) => debug!("Terminal finished writing"),
            ScriptOutcome::TimedOut => {
                return Err(Error::Timeout {
                    stage: Stage::Terminal,
                    ms: deadline.budget_ms(),
                })
            }
            ScriptOutcome::Failed(msg) => return Err(Error::TerminalError(msg)),
        }

        let timeout = deadline.remaining(Stage::Capture)?;
        let bytes = page
            .capture_element(TERMINAL_SELECTOR, resolved.format, timeout)
            .map_err(|e| at_stage(Stage::Capture, e))?;
        if bytes.is_empty() {
            return Err(Error::CaptureError("capture returned no image data".into()));
        }
        debug!("Screenshot taken: {} bytes", bytes.len());
        Ok(bytes)
    }

    fn run(
        page: &mut <P::Surface as RenderSurface>::Page,
        script: &str,
        stage: Stage,
    ) -> Result<ScriptOutcome> {
        page.evaluate(script)
            .map(ScriptOutcome::from_value)
            .map_err(|e| at_stage(stage, e))
    }
}
