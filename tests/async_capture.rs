//! Async facade tests

mod support;

use std::time::Duration;

use ansi_shot::{AsyncRenderer, ImageFormat, RenderOptions, RenderRequest, Renderer};
use support::{test_config, FakeProvider};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn capture_many_creates_one_surface() {
    let provider = FakeProvider::new();
    provider.state.behave(|b| b.create_delay = Duration::from_millis(50));
    let renderer = AsyncRenderer::new(Renderer::new(provider.clone(), test_config()));

    let requests = ImageFormat::ALL
        .iter()
        .map(|f| {
            RenderRequest::new("AB\nCD").with_options(RenderOptions {
                output_format: Some(*f),
                ..Default::default()
            })
        })
        .collect();
    let results = renderer.capture_many(requests).await;

    assert_eq!(results.len(), 3);
    for (result, format) in results.into_iter().zip(ImageFormat::ALL) {
        let bytes = result.expect("capture");
        assert!(format.matches_magic(&bytes));
    }
    assert_eq!(provider.state.creations(), 1);
    assert_eq!(provider.state.pages_open(), 0);
}

#[tokio::test]
async fn errors_propagate_through_facade() {
    let provider = FakeProvider::new();
    provider.state.behave(|b| b.fail_capture = true);
    let renderer = AsyncRenderer::new(Renderer::new(provider.clone(), test_config()));

    let err = renderer.capture(RenderRequest::new("x")).await.unwrap_err();
    assert_eq!(err.stage(), Some(ansi_shot::Stage::Capture));
    assert_eq!(provider.state.pages_open(), 0);
}

#[tokio::test]
async fn release_through_facade() {
    let provider = FakeProvider::new();
    let renderer = AsyncRenderer::new(Renderer::new(provider.clone(), test_config()));
    renderer.capture(RenderRequest::new("x")).await.unwrap();

    let clone = renderer.clone();
    assert!(clone.release().await.unwrap());
    assert!(!renderer.release().await.unwrap());
    assert!(provider.state.surface_closed());
}

#[tokio::test]
async fn html_through_facade() {
    let renderer = AsyncRenderer::new(Renderer::new(FakeProvider::new(), test_config()));
    let html = renderer.render_html(RenderRequest::new("hi")).await.unwrap();
    assert!(html.contains("<div id=\"terminal\"></div>"));
}
