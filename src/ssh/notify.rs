//! Coloured headers and key/value lines printed back to SSH clients.

use std::fmt::Write as _;

use ratatui::crossterm::style::Stylize;

pub fn success(title: &str) -> String {
    format!("{}\n", format!("✅ {title}").green().bold())
}

pub fn warning(title: &str) -> String {
    format!("{}\n", format!("⚠️ {title}").yellow().bold())
}

pub fn error(message: &str) -> String {
    format!("{}\n", format!("❌ {message}").red().bold())
}

pub fn hint(message: &str) -> String {
    format!("{}\n", format!("💡 {message}").dark_grey())
}

/// Aligned `emoji label: value` lines.
#[derive(Debug, Default)]
pub struct Details {
    rows: Vec<(String, String)>,
}

impl Details {
    pub fn row(mut self, label: &str, value: impl Into<String>) -> Self {
        self.rows.push((label.to_string(), value.into()));
        self
    }

    /// A label with no value, such as a flag that is set.
    pub fn marker(self, label: &str) -> Self {
        self.row(label, "")
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (label, value) in &self.rows {
            if value.is_empty() {
                let _ = writeln!(out, "{}", label.as_str().bold());
            } else {
                let _ = writeln!(out, "{} {value}", format!("{label}:").bold());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_carry_text() {
        assert!(success("done").contains("✅ done"));
        assert!(error("file not found").contains("❌ file not found"));
        assert!(error("x").contains("\x1b["));
        assert!(warning("careful").ends_with('\n'));
    }

    #[test]
    fn test_details() {
        let out = Details::default()
            .row("💳 ID", "abc123")
            .marker("🔐 Private")
            .render();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("💳 ID:") && lines[0].contains("abc123"));
        assert!(lines[1].contains("🔐 Private"));
    }
}
