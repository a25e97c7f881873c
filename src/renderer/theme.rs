//! The syntax palette and the CSS derived from it. Both are evaluated once
//! per process on first use.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::OnceLock;

use serde::Deserialize;

const THEME_TOML: &str = include_str!("theme.toml");

static THEME: OnceLock<Theme> = OnceLock::new();
static CSS: OnceLock<String> = OnceLock::new();

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassStyle {
    pub color: Option<String>,
    pub background: Option<String>,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Theme {
    pub name: String,
    pub background: String,
    pub foreground: String,
    pub line_number: String,
    pub highlight: String,
    #[serde(default)]
    pub classes: BTreeMap<String, ClassStyle>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            name: "fallback".to_string(),
            background: "#000000".to_string(),
            foreground: "#ffffff".to_string(),
            line_number: "#808080".to_string(),
            highlight: "#404040".to_string(),
            classes: BTreeMap::new(),
        }
    }
}

impl Theme {
    /// Style for a token class, falling back to its family (`s2` to `s`,
    /// `kd` to `k`) when the class itself is not themed.
    #[must_use]
    pub fn style_for(&self, class: &str) -> Option<&ClassStyle> {
        self.classes.get(class).or_else(|| {
            let family = class.get(..1)?;
            self.classes.get(family)
        })
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(|| {
        toml::from_str(THEME_TOML).unwrap_or_else(|e| {
            tracing::error!("unable to parse syntax theme: {e}");
            Theme::default()
        })
    })
}

/// Stylesheet for the token classes emitted by the HTML and Markdown
/// renderers.
pub fn syntax_css() -> &'static str {
    CSS.get_or_init(|| build_css(theme()))
}

fn build_css(theme: &Theme) -> String {
    let mut css = String::new();
    let _ = writeln!(
        css,
        ".chroma {{ color: {}; background-color: {}; }}",
        theme.foreground, theme.background
    );
    let _ = writeln!(
        css,
        ".chroma .line {{ display: flex; }}\n\
         .chroma .ln {{ white-space: pre; user-select: none; margin-right: 0.4em; padding: 0 0.4em; color: {}; }}\n\
         .chroma .ln a {{ color: inherit; text-decoration: none; }}\n\
         .chroma .line:target, .chroma .hl {{ background-color: {}; }}",
        theme.line_number, theme.highlight
    );

    for (class, style) in &theme.classes {
        let mut rules = Vec::new();
        if let Some(color) = &style.color {
            rules.push(format!("color: {color}"));
        }
        if let Some(background) = &style.background {
            rules.push(format!("background-color: {background}"));
        }
        if style.bold {
            rules.push("font-weight: bold".to_string());
        }
        if style.italic {
            rules.push("font-style: italic".to_string());
        }
        if style.underline {
            rules.push("text-decoration: underline".to_string());
        }
        if !rules.is_empty() {
            let _ = writeln!(css, ".chroma .{class} {{ {}; }}", rules.join("; "));
        }
    }

    css
}

/// Nearest xterm 256-color index for a `#rrggbb` color.
#[must_use]
pub fn hex_to_ansi256(hex: &str) -> Option<u8> {
    let hex = hex.trim_start_matches('#');
    if hex.len() < 6 {
        return None;
    }
    let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()?;
    let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()?;
    let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()?;

    const LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];
    let nearest_level = |v: u8| -> usize {
        LEVELS
            .iter()
            .enumerate()
            .min_by_key(|(_, level)| (i32::from(**level) - i32::from(v)).abs())
            .map_or(0, |(i, _)| i)
    };

    let (ri, gi, bi) = (nearest_level(r), nearest_level(g), nearest_level(b));
    let cube = 16 + 36 * ri + 6 * gi + bi;
    let cube_rgb = (LEVELS[ri], LEVELS[gi], LEVELS[bi]);

    let avg = (u32::from(r) + u32::from(g) + u32::from(b)) / 3;
    let gray_index = if avg > 238 { 23 } else { avg.saturating_sub(3) / 10 };
    let gray_level = (8 + gray_index * 10) as u8;
    let gray = 232 + gray_index as usize;

    let distance = |(cr, cg, cb): (u8, u8, u8)| -> i32 {
        let dr = i32::from(cr) - i32::from(r);
        let dg = i32::from(cg) - i32::from(g);
        let db = i32::from(cb) - i32::from(b);
        dr * dr + dg * dg + db * db
    };

    if distance((gray_level, gray_level, gray_level)) < distance(cube_rgb) {
        Some(gray as u8)
    } else {
        Some(cube as u8)
    }
}
