//! Color palette and its `theme.conf` file (`key = #RRGGBB` or `key = reset`).

use ratatui::style::Color;
use std::path::Path;

use crate::config::{config_file_read_path, parse_assignment};

/// Color palette for theming the TUI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Theme {
    pub text: Color,
    pub muted: Color,
    pub title: Color,
    pub border: Color,
    pub header_bg: Color,
    pub header_fg: Color,
    pub status_bg: Color,
    pub status_fg: Color,
    pub highlight_fg: Color,
    pub highlight_bg: Color,
    pub error_fg: Color,
}

impl Theme {
    /// Dark default theme.
    pub fn dark() -> Self {
        Self {
            text: Color::Gray,
            muted: Color::DarkGray,
            title: Color::Cyan,
            border: Color::Gray,
            header_bg: Color::Black,
            header_fg: Color::Cyan,
            status_bg: Color::DarkGray,
            status_fg: Color::Black,
            highlight_fg: Color::Yellow,
            highlight_bg: Color::Reset,
            error_fg: Color::Red,
        }
    }

    /// Catppuccin Mocha.
    pub fn mocha() -> Self {
        let rgb = |hex: u32| Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8);
        Self {
            text: rgb(0xcdd6f4),
            muted: rgb(0x7f849c),
            title: rgb(0xcba6f7),
            border: rgb(0x585b70),
            header_bg: rgb(0x313244),
            header_fg: rgb(0xb4befe),
            status_bg: rgb(0x45475a),
            status_fg: rgb(0xcdd6f4),
            highlight_fg: rgb(0xf9e2af),
            highlight_bg: rgb(0x45475a),
            error_fg: rgb(0xf38ba8),
        }
    }

    fn slots(&mut self) -> [(&'static str, &mut Color); 11] {
        [
            ("text", &mut self.text),
            ("muted", &mut self.muted),
            ("title", &mut self.title),
            ("border", &mut self.border),
            ("header_bg", &mut self.header_bg),
            ("header_fg", &mut self.header_fg),
            ("status_bg", &mut self.status_bg),
            ("status_fg", &mut self.status_fg),
            ("highlight_fg", &mut self.highlight_fg),
            ("highlight_bg", &mut self.highlight_bg),
            ("error_fg", &mut self.error_fg),
        ]
    }

    /// Load a theme file over `mocha`. Unknown keys and bad colors are skipped.
    pub fn from_file(path: &str) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        let mut theme = Self::mocha();
        for (key, value) in contents.lines().filter_map(parse_assignment) {
            let Some(color) = parse_color(value) else {
                tracing::debug!(path, key, value, "theme: unreadable color");
                continue;
            };
            if let Some((_, slot)) = theme.slots().into_iter().find(|(name, _)| *name == key) {
                *slot = color;
            }
        }
        Some(theme)
    }

    pub fn write_file(&self, path: &str) -> std::io::Result<()> {
        let mut copy = *self;
        let mut out = vec![
            "# rbac-admin theme configuration".to_string(),
            "# Colors: hex as #RRGGBB or RRGGBB, or 'reset'".to_string(),
            String::new(),
        ];
        out.extend(copy.slots().into_iter().map(|(name, color)| format!("{name} = {}", format_color(*color))));
        out.push(String::new());
        std::fs::write(path, out.join("\n"))
    }

    /// Load `path`; if missing, the config directory copy; else write `mocha` to `path`.
    pub fn load_or_init(path: &str) -> Self {
        let source = if Path::new(path).exists() {
            Some(path.to_string())
        } else {
            config_file_read_path("theme.conf").map(|p| p.to_string_lossy().into_owned())
        };
        if let Some(source) = source {
            return Self::from_file(&source).unwrap_or_else(Self::mocha);
        }
        let t = Self::mocha();
        if let Err(e) = t.write_file(path) {
            tracing::warn!(path, error = %e, "theme: could not write defaults");
        }
        t
    }
}

/// Parse "#RRGGBB", "RRGGBB" or "reset".
fn parse_color(s: &str) -> Option<Color> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("reset") {
        return Some(Color::Reset);
    }
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 {
        return None;
    }
    let v = u32::from_str_radix(hex, 16).ok()?;
    Some(Color::Rgb((v >> 16) as u8, (v >> 8) as u8, v as u8))
}

/// Hex for RGB colors, an approximation for named ones, `reset` otherwise.
fn format_color(c: Color) -> String {
    let (r, g, b) = match c {
        Color::Rgb(r, g, b) => (r, g, b),
        Color::Black => (0x00, 0x00, 0x00),
        Color::Red => (0xFF, 0x00, 0x00),
        Color::Green => (0x00, 0xFF, 0x00),
        Color::Yellow => (0xFF, 0xFF, 0x00),
        Color::Blue => (0x00, 0x00, 0xFF),
        Color::Magenta => (0xFF, 0x00, 0xFF),
        Color::Cyan => (0x00, 0xFF, 0xFF),
        Color::Gray => (0xB3, 0xB3, 0xB3),
        Color::DarkGray => (0x4D, 0x4D, 0x4D),
        Color::LightRed => (0xFF, 0x66, 0x66),
        Color::LightGreen => (0x66, 0xFF, 0x66),
        Color::LightYellow => (0xFF, 0xFF, 0x66),
        Color::LightBlue => (0x66, 0x66, 0xFF),
        Color::LightMagenta => (0xFF, 0x66, 0xFF),
        Color::LightCyan => (0x66, 0xFF, 0xFF),
        Color::White => (0xFF, 0xFF, 0xFF),
        Color::Reset | Color::Indexed(_) => return "reset".to_string(),
    };
    format!("#{r:02X}{g:02X}{b:02X}")
}
