// inputguard/src/output.rs
//! Styled terminal output. Colours are used only when the stream is a
//! terminal.

use std::io::{self, Write};

use is_terminal::IsTerminal;
use owo_colors::{AnsiColors, OwoColorize};

/// Logical kinds of output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Header,
    Success,
    Info,
    Warn,
    Error,
    Prompt,
    Sensitive,
}

impl Tone {
    fn color(self) -> AnsiColors {
        match self {
            Tone::Header => AnsiColors::Cyan,
            Tone::Success => AnsiColors::Green,
            Tone::Info => AnsiColors::White,
            Tone::Warn => AnsiColors::Yellow,
            Tone::Error => AnsiColors::Red,
            Tone::Prompt => AnsiColors::Magenta,
            Tone::Sensitive => AnsiColors::BrightRed,
        }
    }
}

pub fn paint(text: &str, tone: Tone, enable_colors: bool) -> String {
    if enable_colors {
        text.color(tone.color()).to_string()
    } else {
        text.to_string()
    }
}

/// Writes one styled line to `writer`.
pub fn line<W: Write>(writer: &mut W, tone: Tone, text: &str, enable_colors: bool) -> io::Result<()> {
    writeln!(writer, "{}", paint(text, tone, enable_colors))
}

/// Writes one styled line to stdout.
pub fn out(tone: Tone, text: &str) {
    let color = io::stdout().is_terminal();
    let _ = line(&mut io::stdout().lock(), tone, text, color);
}

/// Writes one styled line to stderr.
pub fn err(tone: Tone, text: &str) {
    let color = io::stderr().is_terminal();
    let _ = line(&mut io::stderr().lock(), tone, text, color);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_when_colors_disabled() {
        let mut buf = Vec::new();
        line(&mut buf, Tone::Warn, "careful", false).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "careful\n");
    }

    #[test]
    fn test_colored_output_wraps_text() {
        let painted = paint("x", Tone::Error, true);
        assert!(painted.contains('x'));
        assert!(painted.starts_with("\u{1b}["));
    }
}
