//! File type detection: MIME sniffing to separate binary from text, then a
//! lexer lookup to name the text.

use syntect::parsing::SyntaxReference;

use super::lexer::{analyze, fallback, find_lexer, get_lexer, type_name};
use crate::types::FILE_TYPE_BINARY;

/// Only this much of the content is considered when sniffing.
const SNIFF_LEN: usize = 512;

/// Content shorter than this is not worth guessing at.
pub const MINIMUM_CONTENT_GUESS_LENGTH: usize = 64;

/// How many leading lines the guesser inspects for language markers.
const GUESS_LINES: usize = 10;

const OCTET_STREAM: &str = "application/octet-stream";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Tags that mark a document as HTML when they open the content.
const HTML_TAGS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

const MAGIC: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"%!PS-Adobe-", "application/postscript"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    (b"\xFF\xD8\xFF", "image/jpeg"),
    (b"BM", "image/bmp"),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"\x00\x00\x02\x00", "image/x-icon"),
    (b"OggS\x00", "application/ogg"),
    (b"ID3", "audio/mpeg"),
    (b"fLaC", "audio/flac"),
    (b"\x1A\x45\xDF\xA3", "video/webm"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1F\x8B\x08", "application/x-gzip"),
    (b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    (b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    (b"7z\xBC\xAF\x27\x1C", "application/x-7z-compressed"),
    (b"\x00\x61\x73\x6D", "application/wasm"),
    (b"\x28\xB5\x2F\xFD", "application/zstd"),
    (b"\x7FELF", "application/x-elf"),
];

fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

fn matches_html_tag(data: &[u8], tag: &[u8]) -> bool {
    if data.len() < tag.len() + 1 {
        return false;
    }
    let prefix_matches = data
        .iter()
        .zip(tag)
        .all(|(d, t)| if t.is_ascii_uppercase() { d.to_ascii_uppercase() == *t } else { d == t });
    prefix_matches && matches!(data[tag.len()], b' ' | b'>')
}

/// Best-effort content type of `content`, judged from its first 512 bytes.
/// Anything starting with `text/` is treated as text downstream.
#[must_use]
pub fn sniff_content_type(content: &[u8]) -> &'static str {
    let data = &content[..content.len().min(SNIFF_LEN)];

    if data.starts_with(b"\xFE\xFF") || data.starts_with(b"\xFF\xFE") {
        return "text/plain; charset=utf-16";
    }
    if data.starts_with(b"\xEF\xBB\xBF") {
        return TEXT_PLAIN;
    }

    let first_non_ws = data.iter().position(|b| !is_whitespace(*b)).unwrap_or(data.len());
    let trimmed = &data[first_non_ws..];
    if HTML_TAGS.iter().any(|tag| matches_html_tag(trimmed, tag)) {
        return "text/html; charset=utf-8";
    }
    if trimmed.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8";
    }

    if let Some((_, mime)) = MAGIC.iter().find(|(sig, _)| data.starts_with(sig)) {
        return mime;
    }
    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        return "video/mp4";
    }
    if data.len() >= 14 && data.starts_with(b"RIFF") && &data[8..14] == b"WEBPVP" {
        return "image/webp";
    }

    if data.iter().copied().any(is_binary_byte) {
        return OCTET_STREAM;
    }
    TEXT_PLAIN
}

/// Looks past the first line for language markers: a shebang or XML prolog
/// after leading blank lines, or a modeline such as `# vim: ft=python`.
fn guess(content: &str) -> Option<&'static SyntaxReference> {
    if content.len() < MINIMUM_CONTENT_GUESS_LENGTH {
        return None;
    }

    for line in content.lines().take(GUESS_LINES) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(syntax) = analyze(line) {
            return Some(syntax);
        }
        if let Some(filetype) = modeline_filetype(line) {
            if let Some(syntax) = find_lexer(filetype) {
                return Some(syntax);
            }
        }
    }

    looks_like_markdown(content).then(|| get_lexer("markdown"))
}

fn modeline_filetype(line: &str) -> Option<&str> {
    let (_, rest) = line.split_once("vim:").or_else(|| line.split_once("vi:"))?;
    rest.split(|c: char| c.is_whitespace() || c == ':')
        .find_map(|setting| {
            setting
                .strip_prefix("ft=")
                .or_else(|| setting.strip_prefix("filetype="))
        })
        .filter(|ft| !ft.is_empty())
}

fn looks_like_markdown(content: &str) -> bool {
    let mut heading = false;
    let mut structure = false;
    for line in content.lines().take(GUESS_LINES * 5) {
        let line = line.trim_start();
        if line.starts_with("# ") || line.starts_with("## ") {
            heading = true;
        }
        if line.starts_with("```") || line.starts_with("- [") || line.contains("](") {
            structure = true;
        }
    }
    heading && structure
}

/// Decides the stored `type` of uploaded content. Binary content is
/// `binary`; otherwise the lexer named by `hint`, else one found by
/// analyzing the content, else plain `text`.
#[must_use]
pub fn detect_file_type(content: &[u8], hint: &str, use_guesser: bool) -> String {
    if !sniff_content_type(content).starts_with("text/") {
        return FILE_TYPE_BINARY.to_string();
    }

    let text = String::from_utf8_lossy(content);
    let syntax = if !hint.is_empty() {
        get_lexer(hint)
    } else {
        analyze(&text)
            .or_else(|| if use_guesser { guess(&text) } else { None })
            .unwrap_or_else(fallback)
    };

    type_name(syntax)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_text() {
        assert!(sniff_content_type(b"hello world").starts_with("text/plain"));
        assert!(sniff_content_type(b"").starts_with("text/plain"));
        assert!(sniff_content_type(b"  <html><body>hi</body></html>").starts_with("text/html"));
        assert!(sniff_content_type(b"<?xml version=\"1.0\"?><a/>").starts_with("text/xml"));
        assert!(sniff_content_type("héllo ✨".as_bytes()).starts_with("text/plain"));
    }

    #[test]
    fn test_sniff_binary() {
        assert_eq!(sniff_content_type(b"\x89PNG\r\n\x1a\n\x00\x00"), "image/png");
        assert_eq!(sniff_content_type(b"%PDF-1.7"), "application/pdf");
        assert_eq!(sniff_content_type(&[0x00, 0x01, 0x02, 0x03]), OCTET_STREAM);
        assert_eq!(sniff_content_type(b"text then \x00 nul"), OCTET_STREAM);
    }

    #[test]
    fn test_binary_byte_past_sniff_window_is_ignored() {
        let mut content = vec![b'a'; SNIFF_LEN];
        content.push(0x00);
        assert!(sniff_content_type(&content).starts_with("text/"));
    }

    #[test]
    fn test_detect_binary() {
        assert_eq!(detect_file_type(&[0x00, 0x01, 0x02, 0x03], "", true), "binary");
        assert_eq!(detect_file_type(&[0x00, 0x01, 0x02, 0x03], "rs", true), "binary");
    }

    #[test]
    fn test_detect_with_hint() {
        assert_eq!(detect_file_type(b"fn main() {}", "rs", true), "rust");
        assert_eq!(detect_file_type(b"# hi", "md", false), "markdown");
        assert_eq!(detect_file_type(b"whatever", "not-a-lexer", true), "text");
    }

    #[test]
    fn test_detect_by_analysis() {
        assert_eq!(detect_file_type(b"#!/usr/bin/env python\nprint(1)\n", "", false), "python");
        assert_eq!(detect_file_type(b"just some words", "", true), "text");
    }

    #[test]
    fn test_guesser_reads_past_first_line() {
        let content = "\n\n#!/bin/bash\necho \"this script has a few blank lines up top\"\necho \"and then some more\"\n";
        assert_eq!(detect_file_type(content.as_bytes(), "", false), "text");
        assert_eq!(detect_file_type(content.as_bytes(), "", true), "bourne again shell (bash)");
    }

    #[test]
    fn test_guesser_markdown() {
        let content = "# Project\n\nSome words about the project, see [docs](https://example.com).\n";
        assert_eq!(detect_file_type(content.as_bytes(), "", true), "markdown");
    }

    #[test]
    fn test_modeline_filetype() {
        assert_eq!(modeline_filetype("# vim: set ft=python:"), Some("python"));
        assert_eq!(modeline_filetype("// vim: filetype=rust"), Some("rust"));
        assert_eq!(modeline_filetype("no modeline here"), None);
    }
}
