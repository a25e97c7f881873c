//! GitHub-flavored Markdown to sanitized HTML.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, TextMergeStream};

use super::html::{escape_html, highlighted_block};
use super::lexer::{find_lexer, tokenize};
use crate::error::Result;

/// Token and layout classes the highlighter emits on `<span>`. Every other
/// span class is stripped by the sanitizer.
pub const CHROMA_SPAN_CLASSES: &[&str] = &[
    "x", "err", "cl", "lnlinks", "lntd", "lntable", "hl", "ln", "line", "k", "kc", "kd", "kn",
    "kp", "kr", "kt", "n", "na", "nb", "bp", "nc", "no", "nd", "ni", "ne", "nf", "fm", "nl", "nn",
    "nx", "py", "nt", "nv", "vc", "vg", "vi", "vm", "l", "ld", "s", "sa", "sb", "sc", "dl", "sd",
    "s2", "se", "sh", "si", "sx", "sr", "s1", "ss", "m", "mb", "mf", "mh", "mi", "il", "mo", "o",
    "ow", "p", "c", "ch", "cm", "c1", "cs", "cp", "cpf", "g", "gd", "ge", "gr", "gh", "gi", "go",
    "gp", "gs", "gu", "gt", "gl", "w",
];

static SPAN_CLASSES: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| CHROMA_SPAN_CLASSES.iter().copied().collect());

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_SMART_PUNCTUATION
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_GFM
}

fn sanitize(html: &str) -> String {
    let mut builder = ammonia::Builder::default();
    builder
        .add_generic_attributes(&["align", "width"])
        .add_tags(&["input"])
        .add_tag_attributes("input", &["type", "checked", "disabled"])
        .add_tag_attributes("code", &["class"])
        .add_tag_attributes("pre", &["class"])
        .add_tag_attributes("span", &["class"]);
    for heading in ["h1", "h2", "h3", "h4", "h5", "h6"] {
        builder.add_tag_attributes(heading, &["id"]);
    }
    builder.attribute_filter(|element, attribute, value| {
        match (element, attribute) {
            ("code", "class") => value.starts_with("language-").then_some(value.into()),
            ("pre", "class") => (value == "chroma").then_some(value.into()),
            ("span", "class") => SPAN_CLASSES.contains(value).then_some(value.into()),
            ("input", "type") => (value == "checkbox").then_some(value.into()),
            _ => Some(value.into()),
        }
    });
    builder.clean(html).to_string()
}

/// Heading anchor slug: lowercase alphanumerics with dashes for spaces.
fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if (c == ' ' || c == '-' || c == '_') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() { "heading".to_string() } else { slug.to_string() }
}

/// Replaces `:shortcode:` sequences with their emoji.
fn emojify(text: &str) -> Cow<'_, str> {
    if !text.contains(':') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(':') {
        let after = &rest[start + 1..];
        let end = after.find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-')));
        match end {
            Some(end) if end > 0 && after[end..].starts_with(':') => {
                let code = &after[..end];
                match emojis::get_by_shortcode(code) {
                    Some(emoji) => {
                        out.push_str(&rest[..start]);
                        out.push_str(emoji.as_str());
                        rest = &after[end + 1..];
                    }
                    None => {
                        out.push_str(&rest[..=start]);
                        rest = after;
                    }
                }
            }
            _ => {
                out.push_str(&rest[..=start]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn render_code_block(lang: &str, body: &str) -> Result<String> {
    match find_lexer(lang) {
        Some(syntax) => {
            let lines = tokenize(syntax, body)?;
            Ok(highlighted_block(&lines))
        }
        None => Ok(format!(
            "<pre><code class=\"language-{}\">{}</code></pre>\n",
            escape_html(lang),
            escape_html(body)
        )),
    }
}

/// Assigns ids to headings that have none, deduplicating repeats with a
/// numeric suffix.
fn assign_heading_ids(events: &mut [Event<'_>]) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut i = 0;
    while i < events.len() {
        if let Event::Start(Tag::Heading { id: None, .. }) = &events[i] {
            let mut text = String::new();
            let mut j = i + 1;
            while j < events.len() {
                match &events[j] {
                    Event::End(TagEnd::Heading(_)) => break,
                    Event::Text(t) | Event::Code(t) => text.push_str(t),
                    _ => {}
                }
                j += 1;
            }

            let base = slugify(&text);
            let count = seen.entry(base.clone()).or_insert(0);
            let slug = if *count == 0 { base } else { format!("{base}-{count}") };
            *count += 1;

            if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
                *id = Some(CowStr::from(slug));
            }
            i = j;
        }
        i += 1;
    }
}

/// Renders Markdown with emoji shortcodes, heading anchors and highlighted
/// fenced code, sanitized and wrapped in `<div class="markdown">`.
pub fn to_markdown(content: &[u8]) -> Result<String> {
    let text = String::from_utf8_lossy(content);
    let parser = TextMergeStream::new(Parser::new_ext(&text, options()));

    let mut events: Vec<Event<'_>> = Vec::new();
    let mut fence: Option<(String, String)> = None;

    for event in parser {
        if let Some((_, body)) = &mut fence {
            match event {
                Event::Text(t) => body.push_str(&t),
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((lang, body)) = fence.take() {
                        let html = render_code_block(&lang, &body)?;
                        events.push(Event::Html(CowStr::from(html)));
                    }
                }
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                let lang = info
                    .split(|c: char| c.is_whitespace() || c == ',' || c == '{')
                    .next()
                    .unwrap_or_default()
                    .to_string();
                if lang.is_empty() {
                    events.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))));
                } else {
                    fence = Some((lang, String::new()));
                }
            }
            Event::Text(t) => {
                let replaced = match emojify(&t) {
                    Cow::Owned(s) => Some(s),
                    Cow::Borrowed(_) => None,
                };
                events.push(Event::Text(replaced.map_or(t, CowStr::from)));
            }
            event => events.push(event),
        }
    }

    assign_heading_ids(&mut events);

    let mut unsafe_html = String::with_capacity(text.len() * 2);
    pulldown_cmark::html::push_html(&mut unsafe_html, events.into_iter());

    Ok(format!("<div class=\"markdown\">{}</div>", sanitize(&unsafe_html)))
}
