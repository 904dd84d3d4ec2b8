//! Terminal host page: the document shell and the scripts run inside it
//!
//! Every script built here resolves to a JSON string of the shape
//! `{"status": "ok" | "timeout" | "error", ...}` so results survive the trip
//! through the browser protocol as plain text.

use serde_json::Value;

use crate::options::{RenderOptions, ResolvedOptions};
use crate::{grid, Error, RendererConfig, Result, TerminalAssets};

/// Id of the element the terminal is mounted on
pub const TERMINAL_ELEMENT_ID: &str = "terminal";
/// Selector for the mount element
pub const TERMINAL_SELECTOR: &str = "#terminal";

/// CSS generic families; these never resolve to a web font
const GENERIC_FAMILIES: &[&str] = &[
    "monospace",
    "serif",
    "sans-serif",
    "cursive",
    "fantasy",
    "system-ui",
    "ui-monospace",
    "ui-serif",
    "ui-sans-serif",
    "ui-rounded",
    "emoji",
    "math",
];

/// Outcome reported by a page script
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptOutcome {
    Ok(Value),
    TimedOut,
    Failed(String),
}

impl ScriptOutcome {
    /// Decode a script result. Bare strings are parsed as JSON first.
    pub fn from_value(value: Value) -> Self {
        let value = match value {
            Value::String(s) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
            other => other,
        };
        match value.get("status").and_then(Value::as_str) {
            Some("ok") => ScriptOutcome::Ok(value),
            Some("timeout") => ScriptOutcome::TimedOut,
            Some("error") => ScriptOutcome::Failed(
                value
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            ),
            _ => ScriptOutcome::Failed(format!("unexpected script result: {}", value)),
        }
    }
}

/// Encode a string as a JS literal that is also safe inside `<script>`.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string())
        .to_string()
        .replace("</", "<\\/")
}

/// Drop characters that could end a CSS declaration or the style block.
fn css_value(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ';' | '{' | '}' | '<' | '>' | '"' | '\'' | '\\'))
        .collect()
}

/// First family of a CSS family list, unquoted.
fn primary_family(font_family: &str) -> Option<&str> {
    let first = font_family.split(',').next()?.trim();
    let first = first.trim_matches(|c| c == '"' || c == '\'').trim();
    (!first.is_empty()).then_some(first)
}

/// Web-font stylesheet URL for `font_family`, or `None` for generic families.
///
/// Requests every weight from 100 to 900 in upright and italic styles.
pub fn font_import_url(base: &str, font_family: &str) -> Option<String> {
    let family = primary_family(font_family)?;
    if GENERIC_FAMILIES.contains(&family.to_ascii_lowercase().as_str()) {
        return None;
    }
    let encoded: String = url::form_urlencoded::byte_serialize(family.as_bytes()).collect();
    let axes = (0..2)
        .flat_map(|ital| (1..=9).map(move |w| format!("{},{}", ital, w * 100)))
        .collect::<Vec<_>>()
        .join(";");
    Some(format!("{}?family={}:ital,wght@{}&display=swap", base, encoded, axes))
}

fn host_css(resolved: &ResolvedOptions, font_css: Option<&str>) -> String {
    let mut css = String::new();
    if let Some(url) = font_css {
        css.push_str(&format!("      @import url('{}');\n\n", css_value(url)));
    }
    css.push_str(&format!(
        "      #{} {{\n        width: min-content;\n        background-color: {};\n        padding: {}px;\n      }}\n",
        TERMINAL_ELEMENT_ID,
        css_value(resolved.background()),
        resolved.pad_amount_px
    ));
    css
}

/// The host document: one content-sized mount element, padded and painted
/// with the theme background, plus the optional web-font import.
pub fn document(resolved: &ResolvedOptions, font_css: Option<&str>) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n  <head>\n    <meta charset=\"utf-8\">\n    <style>\n{}    </style>\n  </head>\n  <body>\n    <div id=\"{}\"></div>\n  </body>\n</html>\n",
        host_css(resolved, font_css),
        TERMINAL_ELEMENT_ID
    )
}

/// Wrap an async JS body so it resolves to a status JSON string, racing it
/// against `timeout_ms` when given.
fn status_script(body: &str, timeout_ms: Option<u64>) -> String {
    let race = match timeout_ms {
        Some(ms) => format!(
            "Promise.race([work, new Promise(r => setTimeout(() => r({{ status: 'timeout' }}), {}))])",
            ms
        ),
        None => "work".to_string(),
    };
    format!(
        "(async () => {{\n  const work = (async () => {{\n{}\n  }})();\n  let out;\n  try {{\n    out = await {};\n  }} catch (e) {{\n    out = {{ status: 'error', message: String(e) }};\n  }}\n  return JSON.stringify(out);\n}})()",
        body, race
    )
}

/// Append a `<style>` element holding `css`.
pub fn stylesheet_injection(css: &str) -> String {
    status_script(
        &format!(
            "    const el = document.createElement('style');\n    el.textContent = {};\n    document.head.appendChild(el);\n    return {{ status: 'ok' }};",
            js_string(css)
        ),
        None,
    )
}

/// Append a `<script>` element holding `js`; it runs synchronously on insert.
pub fn script_injection(js: &str) -> String {
    status_script(
        &format!(
            "    const el = document.createElement('script');\n    el.textContent = {};\n    document.head.appendChild(el);\n    return {{ status: 'ok' }};",
            js_string(js)
        ),
        None,
    )
}

/// Check that the injected script exposed the terminal constructor.
pub fn terminal_probe() -> String {
    status_script(
        "    return typeof Terminal === 'function'\n      ? { status: 'ok' }\n      : { status: 'error', message: 'terminal script did not define Terminal' };",
        None,
    )
}

/// Load the requested font faces, then wait for `document.fonts.ready`.
pub fn fonts_ready(resolved: &ResolvedOptions, timeout_ms: Option<u64>) -> String {
    let t = &resolved.terminal;
    let regular = js_string(&format!("{}px {}", t.font_size, t.font_family));
    let bold = js_string(&format!("bold {}px {}", t.font_size, t.font_family));
    status_script(
        &format!(
            "    try {{\n      await document.fonts.load({});\n      await document.fonts.load({});\n    }} catch (e) {{}}\n    await document.fonts.ready;\n    return {{ status: 'ok' }};",
            regular, bold
        ),
        timeout_ms,
    )
}

/// Create the terminal with `resolved` options, mount it and write `text`.
///
/// Resolves once the component has processed the whole write.
pub fn terminal_setup(resolved: &ResolvedOptions, text: &str, timeout_ms: Option<u64>) -> Result<String> {
    let opts = serde_json::to_string(&resolved.terminal)
        .map_err(|e| Error::Other(format!("Failed to encode terminal options: {}", e)))?
        .replace("</", "<\\/");
    Ok(status_script(
        &format!(
            "    const host = document.getElementById({id});\n    if (!host) return {{ status: 'error', message: 'mount element #{raw} missing' }};\n    const term = new Terminal({opts});\n    term.open(host);\n    await new Promise(resolve => term.write({text}, resolve));\n    return {{ status: 'ok', cols: term.cols, rows: term.rows }};",
            id = js_string(TERMINAL_ELEMENT_ID),
            raw = TERMINAL_ELEMENT_ID,
            opts = opts,
            text = js_string(text)
        ),
        timeout_ms,
    ))
}

/// Escape anything that would close the inline `<script>` early.
fn inline_script(js: &str) -> String {
    js.replace("</script", "<\\/script")
}

/// Build a self-contained HTML page that renders the same terminal when
/// opened in a browser. Assets are inlined.
pub fn standalone_html(
    text: &str,
    options: &RenderOptions,
    assets: &TerminalAssets,
    config: &RendererConfig,
) -> Result<String> {
    let resolved = options.resolve(grid::size(text));
    let font_css = if config.web_fonts {
        font_import_url(&config.font_css_url, resolved.font_family())
    } else {
        None
    };
    let xterm_css = assets.stylesheet.load()?;
    let xterm_js = assets.script.load()?;
    let opts = serde_json::to_string(&resolved.terminal)
        .map_err(|e| Error::Other(format!("Failed to encode terminal options: {}", e)))?
        .replace("</", "<\\/");

    Ok(format!(
        "<!DOCTYPE html>\n<html>\n  <head>\n    <meta charset=\"utf-8\">\n    <style>\n{xterm_css}\n    </style>\n    <style>\n{host}    </style>\n  </head>\n  <body>\n    <div id=\"{id}\"></div>\n    <script>\n{xterm_js}\n    </script>\n    <script>\n      document.fonts.ready.then(() => {{\n        const term = new Terminal({opts});\n        term.open(document.getElementById({id_js}));\n        term.write({text});\n      }});\n    </script>\n  </body>\n</html>\n",
        xterm_css = xterm_css.replace("</style", "<\\/style"),
        host = host_css(&resolved, font_css.as_deref()),
        id = TERMINAL_ELEMENT_ID,
        xterm_js = inline_script(&xterm_js),
        opts = opts,
        id_js = js_string(TERMINAL_ELEMENT_ID),
        text = js_string(text),
    ))
}
