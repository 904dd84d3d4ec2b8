//! Rendering surface capability and the shared surface manager
//!
//! The pipeline never talks to a browser directly. It goes through three
//! traits:
//!
//! - [`SurfaceProvider`] creates the long-lived [`RenderSurface`]
//! - [`RenderSurface`] opens short-lived [`HostPage`]s
//! - [`HostPage`] loads a document, injects assets, evaluates scripts and
//!   captures a node
//!
//! [`SurfaceManager`] owns the single surface of a process: it is created on
//! first use, every concurrent first caller waits on the same creation, and
//! it is torn down once on release.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{info, warn};

use crate::options::ImageFormat;
use crate::{Error, Result};

/// Creates the shared render surface
pub trait SurfaceProvider: Send + Sync {
    type Surface: RenderSurface;

    /// Launch a new surface. Called at most once per successful acquisition.
    fn create(&self) -> Result<Self::Surface>;
}

/// A long-lived off-screen context that hosts isolated pages
pub trait RenderSurface: Send + Sync + 'static {
    type Page: HostPage;

    /// Open a fresh isolated page.
    fn open_page(&self) -> Result<Self::Page>;

    /// Shut the surface down. The manager calls this at most once.
    fn close(&self) -> Result<()>;
}

/// A short-lived isolated document owned by one render call
pub trait HostPage {
    /// Load `html` as the page document and wait for it to settle.
    fn load_document(&mut self, html: &str, timeout: Option<Duration>) -> Result<()>;

    /// Add a stylesheet to the document.
    fn inject_stylesheet(&mut self, css: &str) -> Result<()>;

    /// Run a script in the document as if loaded by a `<script>` tag.
    fn inject_script(&mut self, js: &str) -> Result<()>;

    /// Evaluate an expression in the page, awaiting it if it is a promise.
    ///
    /// Scripts from [`crate::host_page`] resolve to JSON text; implementations
    /// may return that text as a string or already decoded.
    fn evaluate(&mut self, expression: &str) -> Result<serde_json::Value>;

    /// Capture the bounding box of the first node matching `selector`.
    fn capture_element(
        &mut self,
        selector: &str,
        format: ImageFormat,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>>;

    /// Close the page. The surface stays open.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

enum SurfaceState<S> {
    Idle,
    Ready(Arc<S>),
    Failed(String),
    Released,
}

impl<S> SurfaceState<S> {
    fn phase(&self) -> u8 {
        match self {
            SurfaceState::Idle => PHASE_IDLE,
            SurfaceState::Ready(_) => PHASE_READY,
            SurfaceState::Failed(_) => PHASE_FAILED,
            SurfaceState::Released => PHASE_RELEASED,
        }
    }
}

const PHASE_IDLE: u8 = 0;
const PHASE_READY: u8 = 1;
const PHASE_FAILED: u8 = 2;
const PHASE_RELEASED: u8 = 3;

/// Owns the process-wide render surface
///
/// Share one manager (usually behind an `Arc`) between every call site.
pub struct SurfaceManager<P: SurfaceProvider> {
    provider: P,
    state: Mutex<SurfaceState<P::Surface>>,
    // Mirrors `state` so status checks never wait on a launch in flight
    phase: AtomicU8,
    attempts: AtomicUsize,
}

impl<P: SurfaceProvider> SurfaceManager<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            state: Mutex::new(SurfaceState::Idle),
            phase: AtomicU8::new(PHASE_IDLE),
            attempts: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceState<P::Surface>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set(&self, state: &mut SurfaceState<P::Surface>, next: SurfaceState<P::Surface>) -> SurfaceState<P::Surface> {
        self.phase.store(next.phase(), Ordering::SeqCst);
        std::mem::replace(state, next)
    }

    /// Return the shared surface, creating it on first use.
    ///
    /// The state lock is held for the whole creation, so concurrent first
    /// callers block on the one launch in flight and then see its outcome.
    /// A failed creation is remembered and returned to every later caller
    /// until [`SurfaceManager::reset`] is called.
    ///
    /// Creation itself is bounded only by the provider's own launch timeout.
    /// Callers holding a deadline should check it again once this returns.
    pub fn acquire(&self) -> Result<Arc<P::Surface>> {
        let mut state = self.lock();
        match &*state {
            SurfaceState::Ready(surface) => return Ok(surface.clone()),
            SurfaceState::Failed(reason) => return Err(Error::SurfaceError(reason.clone())),
            SurfaceState::Released => {
                return Err(Error::SurfaceError("render surface has been released".into()))
            }
            SurfaceState::Idle => {}
        }

        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.provider.create() {
            Ok(surface) => {
                info!("Render surface created");
                let surface = Arc::new(surface);
                self.set(&mut state, SurfaceState::Ready(surface.clone()));
                Ok(surface)
            }
            Err(e) => {
                let reason = match e {
                    Error::SurfaceError(reason) => reason,
                    other => other.to_string(),
                };
                warn!("Render surface creation failed: {}", reason);
                self.set(&mut state, SurfaceState::Failed(reason.clone()));
                Err(Error::SurfaceError(reason))
            }
        }
    }

    /// Forget a failed creation so the next `acquire` tries again.
    ///
    /// Returns `false` if there was no failure to clear.
    pub fn reset(&self) -> bool {
        let mut state = self.lock();
        if matches!(*state, SurfaceState::Failed(_)) {
            self.set(&mut state, SurfaceState::Idle);
            true
        } else {
            false
        }
    }

    /// Tear the surface down. Later calls are no-ops.
    ///
    /// Returns `true` if a live surface was closed by this call.
    pub fn release(&self) -> bool {
        let previous = self.set(&mut self.lock(), SurfaceState::Released);
        match previous {
            SurfaceState::Ready(surface) => {
                if let Err(e) = surface.close() {
                    warn!("Failed to close render surface: {}", e);
                }
                info!("Render surface released");
                true
            }
            _ => false,
        }
    }

    /// Whether a surface is up. Does not block on a creation in flight,
    /// which reads as not ready.
    pub fn is_ready(&self) -> bool {
        self.phase.load(Ordering::SeqCst) == PHASE_READY
    }

    /// Whether the surface has been released. Does not block.
    pub fn is_released(&self) -> bool {
        self.phase.load(Ordering::SeqCst) == PHASE_RELEASED
    }

    /// Number of creation attempts made so far.
    pub fn creation_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl<P: SurfaceProvider> Drop for SurfaceManager<P> {
    fn drop(&mut self) {
        self.release();
    }
}
