//! Deterministic escape-coded sample text
//!
//! Used by the CLI's `--demo` mode and by tests that need colorful input.

/// Sample covering letters, digits and punctuation over several lines.
pub const SAMPLE_TEXT: &str = "This is a horrible rainbow puke\nline showing off truecolor! Lmfao \nABCDEFGHIJKLMNOPQRSTUVWXYZ\nabcdefghijklmnopqrstuvwxyz\n0123456789\n`~!@#$%^&*()-_=+[{]}|;:'\",<.>?/\\";

fn channel(i: usize, phase: f64) -> u8 {
    ((0.3 * i as f64 + phase).sin() * 127.0 + 128.0).round() as u8
}

/// Rainbow color for the character at position `i`.
pub fn rainbow_color(i: usize) -> (u8, u8, u8) {
    (channel(i, 0.0), channel(i, 2.0), channel(i, 4.0))
}

/// Wrap `ch` in a 24-bit foreground color and a default-foreground reset.
pub fn truecolor(ch: char, (r, g, b): (u8, u8, u8)) -> String {
    format!("\x1b[38;2;{};{};{}m{}\x1b[39m", r, g, b, ch)
}

/// Color every character of `text` along a rainbow. Line breaks stay bare.
pub fn rainbow(text: &str) -> String {
    text.chars()
        .enumerate()
        .map(|(i, ch)| match ch {
            '\n' | '\r' => ch.to_string(),
            _ => truecolor(ch, rainbow_color(i)),
        })
        .collect()
}

/// The rainbow-colored [`SAMPLE_TEXT`].
pub fn rainbow_sample() -> String {
    rainbow(SAMPLE_TEXT)
}
