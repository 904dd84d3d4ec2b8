//! Render requests, caller options and their resolution against defaults

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::grid::GridDimensions;
use crate::{Error, Result};

pub const DEFAULT_BACKGROUND: &str = "#000000";
pub const DEFAULT_FOREGROUND: &str = "#e0e0e0";
pub const DEFAULT_FONT_FAMILY: &str = "monospace";
pub const DEFAULT_FONT_SIZE: f64 = 14.0;
pub const DEFAULT_LINE_HEIGHT: f64 = 1.0;

/// Raster format of the captured image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 3] = [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Webp];

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Webp => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Webp => "image/webp",
        }
    }

    /// Whether `bytes` start with this format's magic header.
    pub fn matches_magic(&self, bytes: &[u8]) -> bool {
        match self {
            ImageFormat::Png => bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
            ImageFormat::Jpeg => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
            ImageFormat::Webp => bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "webp" => Ok(ImageFormat::Webp),
            other => Err(Error::ConfigError(format!("Unknown image format '{}'", other))),
        }
    }
}

/// Terminal color theme. Unset keys fall back to the terminal's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Theme {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_accent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_foreground: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub black: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub red: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub green: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yellow: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magenta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cyan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub white: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bright_black: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bright_red: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bright_green: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bright_yellow: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bright_blue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bright_magenta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bright_cyan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bright_white: Option<String>,
    /// Colors for indices 16-255
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_ansi: Option<Vec<String>>,
}

impl Theme {
    /// The pipeline's base theme: black background, light grey text.
    pub fn pipeline_default() -> Self {
        Theme {
            background: Some(DEFAULT_BACKGROUND.to_string()),
            foreground: Some(DEFAULT_FOREGROUND.to_string()),
            ..Default::default()
        }
    }

    /// Overlay `self` on `base` key by key; keys set here win.
    pub fn merged_over(&self, base: &Theme) -> Theme {
        macro_rules! pick {
            ($top:ident, $base:ident; $($field:ident),* $(,)?) => {
                Theme { $($field: $top.$field.clone().or_else(|| $base.$field.clone()),)* }
            };
        }
        let top = self;
        pick!(
            top, base;
            foreground,
            background,
            cursor,
            cursor_accent,
            selection_background,
            selection_foreground,
            black,
            red,
            green,
            yellow,
            blue,
            magenta,
            cyan,
            white,
            bright_black,
            bright_red,
            bright_green,
            bright_yellow,
            bright_blue,
            bright_magenta,
            bright_cyan,
            bright_white,
            extended_ansi,
        )
    }
}

/// Caller-facing render options. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    pub theme: Theme,
    /// Padding around the terminal grid, in CSS pixels
    pub pad_amount_px: Option<u32>,
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub font_weight: Option<u16>,
    pub font_weight_bold: Option<u16>,
    pub letter_spacing: Option<f64>,
    pub line_height: Option<f64>,
    pub output_format: Option<ImageFormat>,
}

/// Options the terminal component is constructed with
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalOptions {
    pub rows: usize,
    pub cols: usize,
    /// Treat bare `\n` as CRLF so output is not staircased
    pub convert_eol: bool,
    pub theme: Theme,
    pub font_family: String,
    pub font_size: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight_bold: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<f64>,
    pub line_height: f64,
}

/// Options after every default has been applied
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOptions {
    pub pad_amount_px: u32,
    pub format: ImageFormat,
    pub terminal: TerminalOptions,
}

impl ResolvedOptions {
    pub fn background(&self) -> &str {
        self.terminal
            .theme
            .background
            .as_deref()
            .unwrap_or(DEFAULT_BACKGROUND)
    }

    pub fn font_family(&self) -> &str {
        &self.terminal.font_family
    }
}

impl RenderOptions {
    /// Apply defaults and size the terminal to `grid`.
    pub fn resolve(&self, grid: GridDimensions) -> ResolvedOptions {
        let font_family = self
            .font_family
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_FONT_FAMILY)
            .to_string();

        // The component rejects non-positive sizes and line heights below 1
        let font_size = self
            .font_size
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(DEFAULT_FONT_SIZE);
        let line_height = self
            .line_height
            .filter(|h| h.is_finite() && *h >= 1.0)
            .unwrap_or(DEFAULT_LINE_HEIGHT);

        ResolvedOptions {
            pad_amount_px: self.pad_amount_px.unwrap_or(0),
            format: self.output_format.unwrap_or_default(),
            terminal: TerminalOptions {
                rows: grid.terminal_rows(),
                cols: grid.terminal_columns(),
                convert_eol: true,
                theme: self.theme.merged_over(&Theme::pipeline_default()),
                font_family,
                font_size,
                font_weight: self.font_weight,
                font_weight_bold: self.font_weight_bold,
                letter_spacing: self.letter_spacing,
                line_height,
            },
        }
    }
}

/// One render: the raw text plus how to render it
#[derive(Debug, Clone, Default)]
pub struct RenderRequest {
    pub text: String,
    pub options: RenderOptions,
    /// Overrides the renderer's configured deadline for this call
    pub timeout: Option<Duration>,
}

impl RenderRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
