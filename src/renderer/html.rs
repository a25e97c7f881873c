use std::fmt::Write as _;

use super::lexer::{Token, get_lexer, tokenize};
use crate::error::Result;

pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Writes one tokenized line as a `cl` span. A trailing newline stays
/// inside the span but outside any token class.
pub(crate) fn write_code_line(out: &mut String, tokens: &[Token]) {
    out.push_str("<span class=\"cl\">");
    let mut newline = false;
    for (i, token) in tokens.iter().enumerate() {
        let mut text = token.text.as_str();
        if i == tokens.len() - 1 {
            if let Some(stripped) = text.strip_suffix('\n') {
                newline = true;
                text = stripped.strip_suffix('\r').unwrap_or(stripped);
            }
        }
        if text.is_empty() {
            continue;
        }
        match token.class {
            Some(class) => {
                let _ = write!(out, "<span class=\"{class}\">{}</span>", escape_html(text));
            }
            None => out.push_str(&escape_html(text)),
        }
    }
    if newline {
        out.push('\n');
    }
    out.push_str("</span>");
}

/// Highlighted code without line numbers, as embedded in rendered Markdown.
pub(crate) fn highlighted_block(lines: &[Vec<Token>]) -> String {
    let mut out = String::from("<pre class=\"chroma\"><code>");
    for tokens in lines {
        out.push_str("<span class=\"line\">");
        write_code_line(&mut out, tokens);
        out.push_str("</span>");
    }
    out.push_str("</code></pre>");
    out
}

/// Class-based syntax-highlighted HTML with linkable line numbers
/// (`#L<n>`), wrapped in `<div class="code">`.
pub fn to_syntax_highlighted_html(file_type: &str, content: &[u8]) -> Result<String> {
    let text = String::from_utf8_lossy(content);
    let lines = tokenize(get_lexer(file_type), &text)?;

    let mut out = String::from("<div class=\"code\"><pre class=\"chroma\"><code>");
    for (i, tokens) in lines.iter().enumerate() {
        let n = i + 1;
        let _ = write!(
            out,
            "<span class=\"line\"><span class=\"ln\" id=\"L{n}\"><a class=\"lnlinks\" href=\"#L{n}\">{n}</a></span>"
        );
        write_code_line(&mut out, tokens);
        out.push_str("</span>");
    }
    out.push_str("</code></pre></div>");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<a href=\"x\">'&'</a>"),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_line_numbers_are_linkable() {
        let html = to_syntax_highlighted_html("text", b"one\ntwo\n").unwrap();
        assert!(html.starts_with("<div class=\"code\"><pre class=\"chroma\"><code>"));
        assert!(html.ends_with("</code></pre></div>"));
        assert!(html.contains("<span class=\"ln\" id=\"L1\"><a class=\"lnlinks\" href=\"#L1\">1</a></span>"));
        assert!(html.contains("<span class=\"ln\" id=\"L2\"><a class=\"lnlinks\" href=\"#L2\">2</a></span>"));
        assert!(!html.contains("id=\"L3\""));
        assert!(html.contains("<span class=\"cl\">one\n</span>"));
    }

    #[test]
    fn test_highlight_emits_token_classes() {
        let html = to_syntax_highlighted_html("go", b"package main\n\nfunc main() {}\n").unwrap();
        assert!(html.contains("<span class=\"k"), "{html}");
        assert!(html.contains("main"));
    }

    #[test]
    fn test_content_is_escaped() {
        let html = to_syntax_highlighted_html("text", b"<script>alert(1)</script>").unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_highlighted_block() {
        let lines = tokenize(get_lexer("text"), "hi\n").unwrap();
        assert_eq!(
            highlighted_block(&lines),
            "<pre class=\"chroma\"><code><span class=\"line\"><span class=\"cl\">hi\n</span></span></code></pre>"
        );
    }
}
