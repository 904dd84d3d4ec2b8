use std::sync::Arc;

use futures::future::join_all;

use crate::capture::Renderer;
use crate::options::RenderRequest;
use crate::surface::SurfaceProvider;
use crate::{Error, Result};

/// An async-friendly renderer backed by tokio's blocking pool.
///
/// The browser protocol client is synchronous, so every capture runs on a
/// blocking thread while callers await it. Clones share one renderer and
/// therefore one surface.
pub struct AsyncRenderer<P: SurfaceProvider + 'static> {
    inner: Arc<Renderer<P>>,
}

impl<P: SurfaceProvider + 'static> Clone for AsyncRenderer<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: SurfaceProvider + 'static> AsyncRenderer<P> {
    pub fn new(renderer: Renderer<P>) -> Self {
        Self {
            inner: Arc::new(renderer),
        }
    }

    /// The blocking renderer underneath.
    pub fn renderer(&self) -> &Renderer<P> {
        &self.inner
    }

    /// Render one request.
    pub async fn capture(&self, request: RenderRequest) -> Result<Vec<u8>> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.capture(&request))
            .await
            .map_err(|e| Error::Other(format!("Capture task failed: {}", e)))?
    }

    /// Render several requests concurrently. Results come back in input order.
    pub async fn capture_many(&self, requests: Vec<RenderRequest>) -> Vec<Result<Vec<u8>>> {
        join_all(requests.into_iter().map(|request| self.capture(request))).await
    }

    /// Standalone HTML for `request`.
    pub async fn render_html(&self, request: RenderRequest) -> Result<String> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.render_html(&request))
            .await
            .map_err(|e| Error::Other(format!("HTML task failed: {}", e)))?
    }

    /// Shut the shared surface down.
    pub async fn release(&self) -> Result<bool> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.release())
            .await
            .map_err(|e| Error::Other(format!("Release task failed: {}", e)))
    }
}
