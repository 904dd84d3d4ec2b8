use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use log::info;

use ansi_shot::{fixtures, ImageFormat, RenderOptions, RenderRequest, RendererConfig, TerminalAssets, Theme};

/// Render ANSI-colored text into a terminal screenshot.
#[derive(Parser, Debug)]
#[command(name = "ansi-shot", version, about)]
struct Cli {
    /// Text file to render ("-" or omitted reads stdin)
    input: Option<PathBuf>,

    /// Output file ("-" writes to stdout)
    #[arg(short, long, default_value = "output.png")]
    output: PathBuf,

    /// Render the built-in rainbow sample instead of reading input
    #[arg(long)]
    demo: bool,

    /// Write a standalone HTML page instead of an image
    #[arg(long)]
    html: bool,

    /// Image format: png, jpeg or webp (defaults to the output extension)
    #[arg(short, long)]
    format: Option<String>,

    /// Padding around the terminal in pixels
    #[arg(long)]
    pad: Option<u32>,

    #[arg(long)]
    font_family: Option<String>,

    #[arg(long)]
    font_size: Option<f64>,

    #[arg(long)]
    font_weight: Option<u16>,

    #[arg(long)]
    font_weight_bold: Option<u16>,

    #[arg(long)]
    letter_spacing: Option<f64>,

    #[arg(long)]
    line_height: Option<f64>,

    #[arg(long)]
    background: Option<String>,

    #[arg(long)]
    foreground: Option<String>,

    /// Full theme as JSON (xterm ITheme keys); --background/--foreground win
    #[arg(long)]
    theme_json: Option<String>,

    /// Directory of the @xterm/xterm package
    #[arg(long, default_value = "node_modules/@xterm/xterm")]
    xterm_dir: PathBuf,

    /// Chrome/Chromium executable
    #[arg(long)]
    browser: Option<PathBuf>,

    /// Per-render deadline in milliseconds (0 disables it)
    #[arg(long, default_value_t = 30000)]
    timeout_ms: u64,

    /// Do not import the font family as a web font
    #[arg(long)]
    no_web_fonts: bool,
}

impl Cli {
    fn read_text(&self) -> anyhow::Result<String> {
        if self.demo {
            return Ok(fixtures::rainbow_sample());
        }
        match &self.input {
            Some(path) if path.as_os_str() != "-" => {
                std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
            }
            _ => {
                let mut text = String::new();
                io::stdin().read_to_string(&mut text).context("Failed to read stdin")?;
                Ok(text)
            }
        }
    }

    fn image_format(&self) -> anyhow::Result<Option<ImageFormat>> {
        if let Some(f) = &self.format {
            return Ok(Some(f.parse()?));
        }
        Ok(self
            .output
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok()))
    }

    fn options(&self) -> anyhow::Result<RenderOptions> {
        let mut theme: Theme = match &self.theme_json {
            Some(json) => serde_json::from_str(json).context("Invalid --theme-json")?,
            None => Theme::default(),
        };
        if self.background.is_some() {
            theme.background = self.background.clone();
        }
        if self.foreground.is_some() {
            theme.foreground = self.foreground.clone();
        }

        Ok(RenderOptions {
            theme,
            pad_amount_px: self.pad,
            font_family: self.font_family.clone(),
            font_size: self.font_size,
            font_weight: self.font_weight,
            font_weight_bold: self.font_weight_bold,
            letter_spacing: self.letter_spacing,
            line_height: self.line_height,
            output_format: self.image_format()?,
        })
    }

    fn config(&self) -> RendererConfig {
        RendererConfig {
            assets: TerminalAssets::from_package_dir(&self.xterm_dir),
            browser_path: self.browser.clone(),
            timeout_ms: self.timeout_ms,
            web_fonts: !self.no_web_fonts,
            ..Default::default()
        }
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if path.as_os_str() == "-" {
        let mut out = io::stdout().lock();
        out.write_all(bytes)?;
        out.flush()?;
    } else {
        std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let text = cli.read_text()?;
    let request = RenderRequest::new(text).with_options(cli.options()?);
    let renderer = ansi_shot::new_renderer(cli.config());

    if cli.html {
        let html = renderer.render_html(&request)?;
        return write_output(&cli.output, html.as_bytes());
    }

    let result = renderer.capture(&request);
    renderer.release();
    let bytes = match result {
        Ok(bytes) => bytes,
        Err(e) => match e.stage() {
            Some(stage) => bail!("Render failed at {}: {}", stage, e),
            None => bail!("Render failed: {}", e),
        },
    };
    write_output(&cli.output, &bytes)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        log::error!("{:?}", e);
        std::process::exit(1);
    }
}
