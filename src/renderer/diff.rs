use super::html::escape_html;

/// Unified diff as HTML, one `<span>` per line classed `diff-hdr`,
/// `diff-add` or `diff-del`; context lines are left unclassed.
#[must_use]
pub fn to_diff_html(diff: &[u8]) -> String {
    let text = String::from_utf8_lossy(diff);
    let mut out = String::from("<div class=\"code\"><pre class=\"diff\"><code>");
    for line in text.lines() {
        let class = if line.starts_with("+++") || line.starts_with("---") || line.starts_with("@@") {
            Some("diff-hdr")
        } else if line.starts_with('+') {
            Some("diff-add")
        } else if line.starts_with('-') {
            Some("diff-del")
        } else {
            None
        };
        match class {
            Some(class) => {
                out.push_str("<span class=\"");
                out.push_str(class);
                out.push_str("\">");
            }
            None => out.push_str("<span>"),
        }
        out.push_str(&escape_html(line));
        out.push_str("</span>\n");
    }
    out.push_str("</code></pre></div>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_classes() {
        let html = to_diff_html(b"--- a/x\n+++ b/x\n@@ -1 +1 @@\n-old\n+new\n same\n");
        assert!(html.contains("<span class=\"diff-hdr\">--- a/x</span>"));
        assert!(html.contains("<span class=\"diff-hdr\">@@ -1 +1 @@</span>"));
        assert!(html.contains("<span class=\"diff-del\">-old</span>"));
        assert!(html.contains("<span class=\"diff-add\">+new</span>"));
        assert!(html.contains("<span> same</span>"));
    }

    #[test]
    fn test_escapes_content() {
        let html = to_diff_html(b"+<script>\n");
        assert!(html.contains("+&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }
}
