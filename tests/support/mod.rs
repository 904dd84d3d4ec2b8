//! Fake rendering surface used by the integration tests
//!
//! Counts surface creations and open pages, records every page operation
//! and answers page scripts the way the real terminal page would.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ansi_shot::surface::{HostPage, RenderSurface, SurfaceProvider};
use ansi_shot::{AssetSource, Error, ImageFormat, RendererConfig, Result, TerminalAssets};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Load(String),
    Stylesheet(String),
    Script(String),
    Probe,
    Fonts,
    Terminal(String),
    Eval(String),
    Capture(String, ImageFormat),
    Close,
}

#[derive(Debug, Clone, Default)]
pub struct Behavior {
    pub fail_create: bool,
    pub create_delay: Duration,
    pub fail_load: bool,
    pub script_without_terminal: bool,
    pub fonts_never_ready: bool,
    pub fonts_crash: bool,
    pub fonts_reject: bool,
    pub terminal_throws: bool,
    pub fail_capture: bool,
    pub fail_close: bool,
}

#[derive(Default)]
pub struct FakeState {
    pub creations: AtomicUsize,
    pub pages_opened: AtomicUsize,
    pub pages_open: AtomicUsize,
    pub surface_closed: AtomicBool,
    pub behavior: Mutex<Behavior>,
    pub events: Mutex<Vec<Event>>,
}

impl FakeState {
    pub fn behave(&self, f: impl FnOnce(&mut Behavior)) {
        f(&mut self.behavior.lock().unwrap());
    }

    fn behavior(&self) -> Behavior {
        self.behavior.lock().unwrap().clone()
    }

    fn record(&self, e: Event) {
        self.events.lock().unwrap().push(e);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn creations(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }

    pub fn pages_open(&self) -> usize {
        self.pages_open.load(Ordering::SeqCst)
    }

    pub fn pages_opened(&self) -> usize {
        self.pages_opened.load(Ordering::SeqCst)
    }

    pub fn surface_closed(&self) -> bool {
        self.surface_closed.load(Ordering::SeqCst)
    }

    /// The terminal setup script of the last render, if it got that far.
    pub fn last_terminal_script(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|e| match e {
            Event::Terminal(s) => Some(s),
            _ => None,
        })
    }

    pub fn last_document(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|e| match e {
            Event::Load(s) => Some(s),
            _ => None,
        })
    }
}

#[derive(Clone, Default)]
pub struct FakeProvider {
    pub state: Arc<FakeState>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SurfaceProvider for FakeProvider {
    type Surface = FakeSurface;

    fn create(&self) -> Result<FakeSurface> {
        self.state.creations.fetch_add(1, Ordering::SeqCst);
        let b = self.state.behavior();
        if !b.create_delay.is_zero() {
            std::thread::sleep(b.create_delay);
        }
        if b.fail_create {
            return Err(Error::SurfaceError("browser executable not found".into()));
        }
        Ok(FakeSurface { state: self.state.clone() })
    }
}

pub struct FakeSurface {
    state: Arc<FakeState>,
}

impl RenderSurface for FakeSurface {
    type Page = FakePage;

    fn open_page(&self) -> Result<FakePage> {
        self.state.pages_opened.fetch_add(1, Ordering::SeqCst);
        self.state.pages_open.fetch_add(1, Ordering::SeqCst);
        Ok(FakePage {
            state: self.state.clone(),
            terminal_defined: false,
            terminal_written: false,
        })
    }

    fn close(&self) -> Result<()> {
        self.state.surface_closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakePage {
    state: Arc<FakeState>,
    terminal_defined: bool,
    terminal_written: bool,
}

fn status(v: Value) -> Result<Value> {
    Ok(Value::String(v.to_string()))
}

impl HostPage for FakePage {
    fn load_document(&mut self, html: &str, _timeout: Option<Duration>) -> Result<()> {
        self.state.record(Event::Load(html.to_string()));
        if self.state.behavior().fail_load {
            return Err(Error::PageLoadError("net::ERR_ABORTED".into()));
        }
        Ok(())
    }

    fn inject_stylesheet(&mut self, css: &str) -> Result<()> {
        self.state.record(Event::Stylesheet(css.to_string()));
        Ok(())
    }

    fn inject_script(&mut self, js: &str) -> Result<()> {
        self.state.record(Event::Script(js.to_string()));
        self.terminal_defined = !self.state.behavior().script_without_terminal;
        Ok(())
    }

    fn evaluate(&mut self, expression: &str) -> Result<Value> {
        let b = self.state.behavior();
        if expression.contains("typeof Terminal") {
            self.state.record(Event::Probe);
            return if self.terminal_defined {
                status(json!({"status": "ok"}))
            } else {
                status(json!({"status": "error", "message": "terminal script did not define Terminal"}))
            };
        }
        if expression.contains("document.fonts.ready") {
            self.state.record(Event::Fonts);
            if b.fonts_crash {
                return Err(Error::Other("Evaluation failed: target crashed".into()));
            }
            return if b.fonts_reject {
                status(json!({"status": "error", "message": "NetworkError: font face failed"}))
            } else if b.fonts_never_ready {
                status(json!({"status": "timeout"}))
            } else {
                status(json!({"status": "ok"}))
            };
        }
        if expression.contains("new Terminal(") {
            self.state.record(Event::Terminal(expression.to_string()));
            if b.terminal_throws {
                return status(json!({"status": "error", "message": "Error: cols must be positive"}));
            }
            self.terminal_written = true;
            return status(json!({"status": "ok"}));
        }
        self.state.record(Event::Eval(expression.to_string()));
        Ok(Value::Null)
    }

    fn capture_element(
        &mut self,
        selector: &str,
        format: ImageFormat,
        _timeout: Option<Duration>,
    ) -> Result<Vec<u8>> {
        self.state.record(Event::Capture(selector.to_string(), format));
        if self.state.behavior().fail_capture || !self.terminal_written {
            return Err(Error::CaptureError(format!("no node for {}", selector)));
        }
        let mut bytes = match format {
            ImageFormat::Png => b"\x89PNG\r\n\x1a\n".to_vec(),
            ImageFormat::Jpeg => vec![0xFF, 0xD8, 0xFF, 0xE0],
            ImageFormat::Webp => b"RIFF\x24\x00\x00\x00WEBPVP8 ".to_vec(),
        };
        bytes.extend_from_slice(&[0u8; 32]);
        Ok(bytes)
    }

    fn close(self) -> Result<()> {
        self.state.record(Event::Close);
        self.state.pages_open.fetch_sub(1, Ordering::SeqCst);
        if self.state.behavior().fail_close {
            return Err(Error::Other("target already gone".into()));
        }
        Ok(())
    }
}

/// Config with inline assets and no web fonts, so nothing touches disk or network.
pub fn test_config() -> RendererConfig {
    RendererConfig {
        assets: TerminalAssets {
            stylesheet: AssetSource::Inline(".xterm { position: relative; }".into()),
            script: AssetSource::Inline("window.Terminal = class {};".into()),
        },
        web_fonts: false,
        ..Default::default()
    }
}
