//! Lexer registry backed by syntect's bundled grammars.

use std::sync::LazyLock;

use syntect::easy::ScopeRangeIterator;
use syntect::parsing::{ParseState, Scope, ScopeStack, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::error::{Error, Result};
use crate::types::FILE_TYPE_TEXT;

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

const PLAIN_TEXT: &str = "Plain Text";

/// Syntect scope prefixes mapped onto short token classes. The first match
/// wins, so more specific prefixes come first. An empty class defers to the
/// enclosing scope.
const SCOPE_CLASSES: &[(&str, &str)] = &[
    ("punctuation.definition.string", ""),
    ("punctuation.definition.comment", ""),
    ("comment.line", "c1"),
    ("comment.block.documentation", "cs"),
    ("comment.block", "cm"),
    ("comment", "c"),
    ("meta.preprocessor", "cp"),
    ("keyword.control.import", "kn"),
    ("keyword.control.include", "cp"),
    ("keyword.control", "k"),
    ("keyword.operator.word", "ow"),
    ("keyword.operator", "o"),
    ("keyword.declaration", "kd"),
    ("keyword", "k"),
    ("storage.type", "kt"),
    ("storage.modifier", "kd"),
    ("storage", "kr"),
    ("constant.numeric.integer", "mi"),
    ("constant.numeric.float", "mf"),
    ("constant.numeric.hex", "mh"),
    ("constant.numeric", "m"),
    ("constant.character.escape", "se"),
    ("constant.language", "kc"),
    ("constant", "no"),
    ("string.regexp", "sr"),
    ("string.quoted.single", "s1"),
    ("string.quoted.double", "s2"),
    ("string.quoted.triple", "sd"),
    ("string.unquoted", "sx"),
    ("string", "s"),
    ("entity.name.function", "nf"),
    ("entity.name.class", "nc"),
    ("entity.name.struct", "nc"),
    ("entity.name.enum", "nc"),
    ("entity.name.type", "nc"),
    ("entity.name.tag", "nt"),
    ("entity.name.namespace", "nn"),
    ("entity.name.constant", "no"),
    ("entity.name.label", "nl"),
    ("entity.name.section", "gh"),
    ("entity.name", "nx"),
    ("entity.other.attribute-name", "na"),
    ("entity.other.inherited-class", "nc"),
    ("support.function", "nb"),
    ("support.type", "kt"),
    ("support.class", "nc"),
    ("support.constant", "kc"),
    ("variable.parameter", "nv"),
    ("variable.language", "bp"),
    ("variable.function", "nf"),
    ("variable.other.constant", "no"),
    ("variable", "nv"),
    ("markup.heading", "gh"),
    ("markup.inserted", "gi"),
    ("markup.deleted", "gd"),
    ("markup.bold", "gs"),
    ("markup.italic", "ge"),
    ("markup.quote", "go"),
    ("markup.raw", "sb"),
    ("invalid", "err"),
    ("punctuation", "p"),
];

/// A run of text sharing one token class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub class: Option<&'static str>,
    pub text: String,
}

pub fn syntax_set() -> &'static SyntaxSet {
    &SYNTAXES
}

pub fn fallback() -> &'static SyntaxReference {
    SYNTAXES
        .find_syntax_by_name(PLAIN_TEXT)
        .unwrap_or_else(|| SYNTAXES.find_syntax_plain_text())
}

/// Looks a lexer up by file type, display name, alias or extension, falling
/// back to plain text.
pub fn get_lexer(name: &str) -> &'static SyntaxReference {
    find_lexer(name).unwrap_or_else(fallback)
}

/// Like [`get_lexer`] but reports a miss instead of falling back.
pub fn find_lexer(name: &str) -> Option<&'static SyntaxReference> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return None;
    }
    if name == FILE_TYPE_TEXT {
        return Some(fallback());
    }

    SYNTAXES
        .syntaxes()
        .iter()
        .find(|s| s.name.to_lowercase() == name)
        .or_else(|| SYNTAXES.find_syntax_by_token(&name))
}

/// Picks a lexer from the content alone (shebangs, modelines, XML and
/// similar first-line markers).
pub fn analyze(content: &str) -> Option<&'static SyntaxReference> {
    let first_line = content.lines().next()?;
    SYNTAXES
        .find_syntax_by_first_line(first_line)
        .filter(|s| s.name != PLAIN_TEXT)
}

/// The stored file type for a lexer: its name, lowercased, with plain text
/// normalized to `text`.
#[must_use]
pub fn type_name(syntax: &SyntaxReference) -> String {
    if syntax.name == PLAIN_TEXT {
        FILE_TYPE_TEXT.to_string()
    } else {
        syntax.name.to_lowercase()
    }
}

fn class_for_scope(scope: Scope) -> Option<&'static str> {
    let name = scope.build_string();
    SCOPE_CLASSES
        .iter()
        .find(|(prefix, _)| {
            name == *prefix
                || (name.starts_with(prefix) && name.as_bytes().get(prefix.len()) == Some(&b'.'))
        })
        .map(|(_, class)| *class)
}

fn class_for_stack(stack: &ScopeStack) -> Option<&'static str> {
    for scope in stack.as_slice().iter().rev() {
        match class_for_scope(*scope) {
            Some("") => continue,
            Some(class) => return Some(class),
            None => continue,
        }
    }
    None
}

/// Splits `content` into lines of classed tokens. Each line keeps its
/// trailing newline, if any, on the last token.
pub fn tokenize(syntax: &SyntaxReference, content: &str) -> Result<Vec<Vec<Token>>> {
    let mut state = ParseState::new(syntax);
    let mut stack = ScopeStack::new();
    let mut lines = Vec::new();

    for line in LinesWithEndings::from(content) {
        let ops = state
            .parse_line(line, &SYNTAXES)
            .map_err(|e| Error::Render(e.to_string()))?;

        let mut tokens: Vec<Token> = Vec::new();
        for (range, op) in ScopeRangeIterator::new(&ops, line) {
            stack
                .apply(op)
                .map_err(|e| Error::Render(format!("{e:?}")))?;
            if range.is_empty() {
                continue;
            }

            let class = class_for_stack(&stack);
            let text = &line[range];
            match tokens.last_mut() {
                Some(last) if last.class == class => last.text.push_str(text),
                _ => tokens.push(Token {
                    class,
                    text: text.to_string(),
                }),
            }
        }
        lines.push(tokens);
    }

    Ok(lines)
}
