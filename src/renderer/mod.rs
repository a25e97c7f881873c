//! Content pipeline: type detection and the terminal, HTML and Markdown
//! renderings of a file.

mod binary;
mod detect;
mod diff;
mod html;
pub mod lexer;
mod markdown;
mod term;
mod theme;

pub use binary::binary_html_placeholder;
pub use detect::{MINIMUM_CONTENT_GUESS_LENGTH, detect_file_type, sniff_content_type};
pub use diff::to_diff_html;
pub use html::to_syntax_highlighted_html;
pub use markdown::{CHROMA_SPAN_CLASSES, to_markdown};
pub use term::{BINARY_PLACEHOLDER, Segment, Style, styled_lines, to_syntax_highlighted_term};
pub use theme::{Theme, hex_to_ansi256, syntax_css, theme};
