//! Colored terminal output

use owo_colors::{OwoColorize, colors::css};

/// Whether stdout accepts color.
fn color_enabled() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Extension trait for colorizing status lines
pub trait Colorize {
    /// Green, for completed edits
    fn success(&self) -> String;
    /// Amber, for refused edits and caveats
    fn warning(&self) -> String;
    /// Dimmed, for table scaffolding
    fn dim(&self) -> String;
}

impl Colorize for str {
    fn success(&self) -> String {
        if color_enabled() {
            self.fg::<css::Green>().to_string()
        } else {
            self.to_string()
        }
    }

    fn warning(&self) -> String {
        if color_enabled() {
            self.fg::<css::Orange>().to_string()
        } else {
            self.to_string()
        }
    }

    fn dim(&self) -> String {
        if color_enabled() {
            self.dimmed().to_string()
        } else {
            self.to_string()
        }
    }
}

/// Colors a rendered outline for the terminal.
///
/// Block headings are bold blue, table header rows and dividers are dimmed,
/// and the time column of each annotation row is highlighted. Without color
/// support the text is returned unchanged.
pub fn paint_outline(rendered: &str) -> String {
    if !color_enabled() {
        return rendered.to_string();
    }

    rendered
        .lines()
        .map(|line| {
            if line == "-----" || line == "|---|---|" || line == "|Time|Content|" {
                line.dim()
            } else if let Some(row) = line.strip_prefix('|') {
                match row.split_once('|') {
                    Some((time, rest)) => format!("|{}|{rest}", time.fg::<css::LightBlue>()),
                    None => line.to_string(),
                }
            } else if line.is_empty() {
                String::new()
            } else {
                line.fg::<css::LightBlue>().bold().to_string()
            }
        })
        .map(|line| line + "\n")
        .collect()
}
