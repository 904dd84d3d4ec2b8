//! End-to-end tests against a real headless Chrome and xterm.js
//!
//! Set `XTERM_DIR` to the `@xterm/xterm` package directory if it is not under
//! `node_modules`. Set `UPDATE_GOLDENS` to record image digests.

#![cfg(feature = "cdp")]

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Once};

use ansi_shot::{fixtures, ImageFormat, RenderOptions, RenderRequest, RendererConfig, TerminalAssets};
use sha2::{Digest, Sha256};
use tiny_http::{Response, Server};

static INIT: Once = Once::new();
static FONT_REQUESTS: Mutex<Vec<String>> = Mutex::new(Vec::new());

/// Serve an empty web-font stylesheet and remember what was asked for.
fn start_font_server() -> String {
    INIT.call_once(|| {
        std::thread::spawn(|| {
            let server = Server::http("127.0.0.1:18090").unwrap();
            for request in server.incoming_requests() {
                FONT_REQUESTS.lock().unwrap().push(request.url().to_string());
                let response = Response::from_string("/* no faces */").with_header(
                    "Content-Type: text/css; charset=utf-8"
                        .parse::<tiny_http::Header>()
                        .unwrap(),
                );
                let _ = request.respond(response);
            }
        });
        // Give the server time to start
        std::thread::sleep(std::time::Duration::from_millis(100));
    });

    "http://127.0.0.1:18090/css2".to_string()
}

fn config() -> RendererConfig {
    let dir = std::env::var("XTERM_DIR").unwrap_or_else(|_| "node_modules/@xterm/xterm".to_string());
    RendererConfig {
        assets: TerminalAssets::from_package_dir(dir),
        web_fonts: false,
        ..Default::default()
    }
}

/// Width and height from a PNG's IHDR chunk.
fn png_size(png: &[u8]) -> (u32, u32) {
    let w = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
    let h = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
    (w, h)
}

#[test]
#[ignore] // Requires Chrome and xterm.js to be installed
fn two_rows_with_padding() {
    let renderer = ansi_shot::new_renderer(config());

    let plain = renderer.capture(&RenderRequest::new("AB\nCD")).expect("capture");
    assert_eq!(&plain[0..8], b"\x89PNG\r\n\x1a\n");

    let padded = renderer
        .capture(&RenderRequest::new("AB\nCD").with_options(RenderOptions {
            pad_amount_px: Some(10),
            ..Default::default()
        }))
        .expect("capture");

    let (w0, h0) = png_size(&plain);
    let (w1, h1) = png_size(&padded);
    assert!(h0 > 0 && h0 < 100, "two rows of 14px text, got height {}", h0);
    assert_eq!(h1, h0 + 20);
    assert_eq!(w1, w0 + 20);

    let one_row = renderer.capture(&RenderRequest::new("AB")).expect("capture");
    assert!(png_size(&one_row).1 < h0);

    renderer.release();
}

#[test]
#[ignore] // Requires Chrome and xterm.js to be installed
fn empty_text_renders_minimal_image() {
    let renderer = ansi_shot::new_renderer(config());
    let png = renderer.capture(&RenderRequest::new("")).expect("capture");
    let (w, h) = png_size(&png);
    assert!(w > 0 && h > 0);
    renderer.release();
}

#[test]
#[ignore] // Requires Chrome and xterm.js to be installed
fn formats_have_matching_magic() {
    let renderer = ansi_shot::new_renderer(config());
    for format in ImageFormat::ALL {
        let bytes = renderer
            .capture(&RenderRequest::new(fixtures::rainbow("Hi")).with_options(RenderOptions {
                output_format: Some(format),
                ..Default::default()
            }))
            .expect("capture");
        assert!(format.matches_magic(&bytes), "{:?} magic missing", format);
    }
    renderer.release();
}

#[test]
#[ignore] // Requires Chrome and xterm.js to be installed
fn concurrent_renders_share_browser() {
    let renderer = Arc::new(ansi_shot::new_renderer(config()));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let renderer = renderer.clone();
            std::thread::spawn(move || renderer.capture(&RenderRequest::new(format!("render {}", i))))
        })
        .collect();
    for h in handles {
        assert!(h.join().unwrap().is_ok());
    }
    assert_eq!(renderer.surfaces().creation_attempts(), 1);
    renderer.release();
}

#[test]
#[ignore] // Requires Chrome and xterm.js to be installed
fn web_font_stylesheet_is_requested() {
    let base = start_font_server();
    let renderer = ansi_shot::new_renderer(RendererConfig {
        web_fonts: true,
        font_css_url: base,
        ..config()
    });
    renderer
        .capture(&RenderRequest::new("x").with_options(RenderOptions {
            font_family: Some("Fira Code".into()),
            ..Default::default()
        }))
        .expect("capture");
    renderer.release();

    let seen = FONT_REQUESTS.lock().unwrap().clone();
    assert!(seen.iter().any(|u| u.starts_with("/css2?family=Fira+Code:")), "requests: {:?}", seen);
}

#[test]
#[ignore] // Requires Chrome and xterm.js to be installed
fn rainbow_sample_golden() {
    let renderer = ansi_shot::new_renderer(config());
    let request = RenderRequest::new(fixtures::rainbow_sample()).with_options(RenderOptions {
        pad_amount_px: Some(10),
        ..Default::default()
    });
    let png = renderer.capture(&request).expect("capture");
    renderer.release();

    let digest = hex::encode(Sha256::digest(&png));
    let gpath = PathBuf::from("tests/goldens/rainbow_sample.sha256");
    if std::env::var("UPDATE_GOLDENS").is_ok() {
        fs::create_dir_all(gpath.parent().unwrap()).ok();
        fs::write(&gpath, &digest).expect("write golden");
        eprintln!("Updated golden: {:?}", gpath);
        return;
    }
    if !gpath.exists() {
        println!("No golden at {:?}; run with UPDATE_GOLDENS=1 to create it. Skipping.", gpath);
        return;
    }
    let expected = fs::read_to_string(&gpath).expect("read golden");
    assert_eq!(digest, expected.trim(), "rendered image differs from golden");
}
