use super::term::BINARY_PLACEHOLDER;

/// Shown in place of a file's content on the web when it is binary.
#[must_use]
pub fn binary_html_placeholder() -> String {
    format!(
        "<div style=\"margin:2rem;text-align:center;\">\
         <span role=\"img\" aria-label=\"warning\">⚠️</span> {BINARY_PLACEHOLDER}\
         </div>"
    )
}
