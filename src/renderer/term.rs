//! Terminal rendering. Lines are produced as styled segments so the TUI can
//! draw them directly; the ANSI string form is built from the same segments.

use std::fmt::Write as _;

use super::lexer::{get_lexer, tokenize};
use super::theme::{hex_to_ansi256, theme};
use crate::error::Result;
use crate::types::FILE_TYPE_BINARY;

pub const BINARY_PLACEHOLDER: &str =
    "The file is not displayed because it has been detected as binary data.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Style {
    /// xterm 256-color index.
    pub fg: Option<u8>,
    pub bg: Option<u8>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl Style {
    fn for_class(class: Option<&str>) -> Self {
        let Some(style) = class.and_then(|c| theme().style_for(c)) else {
            return Self::default();
        };
        Self {
            fg: style.color.as_deref().and_then(hex_to_ansi256),
            bg: style.background.as_deref().and_then(hex_to_ansi256),
            bold: style.bold,
            italic: style.italic,
            underline: style.underline,
        }
    }

    fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    fn sgr(&self) -> String {
        let mut codes = Vec::new();
        if self.bold {
            codes.push("1".to_string());
        }
        if self.italic {
            codes.push("3".to_string());
        }
        if self.underline {
            codes.push("4".to_string());
        }
        if let Some(fg) = self.fg {
            codes.push(format!("38;5;{fg}"));
        }
        if let Some(bg) = self.bg {
            codes.push(format!("48;5;{bg}"));
        }
        format!("\x1b[{}m", codes.join(";"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub style: Style,
}

/// Highlighted lines without their line endings. Binary files yield the
/// placeholder sentence as their only line.
pub fn styled_lines(file_type: &str, content: &[u8]) -> Result<Vec<Vec<Segment>>> {
    if file_type == FILE_TYPE_BINARY {
        return Ok(vec![vec![Segment {
            text: BINARY_PLACEHOLDER.to_string(),
            style: Style::default(),
        }]]);
    }

    let text = String::from_utf8_lossy(content);
    let lines = tokenize(get_lexer(file_type), &text)?;

    Ok(lines
        .into_iter()
        .map(|tokens| {
            tokens
                .into_iter()
                .filter_map(|token| {
                    let text = token.text.trim_end_matches(['\n', '\r']).replace('\t', "    ");
                    (!text.is_empty()).then(|| Segment {
                        text,
                        style: Style::for_class(token.class),
                    })
                })
                .collect()
        })
        .collect())
}

/// ANSI 256-color rendering of a file, or the binary placeholder.
pub fn to_syntax_highlighted_term(file_type: &str, content: &[u8]) -> Result<String> {
    if file_type == FILE_TYPE_BINARY {
        return Ok(BINARY_PLACEHOLDER.to_string());
    }

    let lines = styled_lines(file_type, content)?;
    let mut out = String::with_capacity(content.len() * 2);
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for segment in line {
            if segment.style.is_plain() {
                out.push_str(&segment.text);
            } else {
                let _ = write!(out, "{}{}\x1b[0m", segment.style.sgr(), segment.text);
            }
        }
    }
    if content.ends_with(b"\n") {
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_placeholder() {
        assert_eq!(
            to_syntax_highlighted_term("binary", &[0, 1, 2]).unwrap(),
            BINARY_PLACEHOLDER
        );
        let lines = styled_lines("binary", &[0, 1, 2]).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0][0].text, BINARY_PLACEHOLDER);
    }

    #[test]
    fn test_plain_text_has_no_escapes() {
        let out = to_syntax_highlighted_term("text", b"hello\nworld\n").unwrap();
        assert_eq!(out, "hello\nworld\n");
    }

    #[test]
    fn test_highlighted_output_uses_256_colors() {
        let out = to_syntax_highlighted_term("rust", b"fn main() {}\n").unwrap();
        assert!(out.contains("\x1b[") && out.contains("38;5;"), "{out:?}");
        assert!(out.contains("\x1b[0m"));
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn test_styled_lines_strip_line_endings() {
        let lines = styled_lines("text", b"a\r\nb\n").unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0][0].text, "a");
        assert_eq!(lines[1][0].text, "b");
    }
}
