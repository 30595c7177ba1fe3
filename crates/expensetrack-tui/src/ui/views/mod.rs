//! Per-view content rendering.

pub mod auth;
pub mod expenses;
pub mod home;
pub mod profile;
pub mod welcome;

use ratatui::text::{Line, Span};

use super::styles::Theme;

/// Width of the value area of a form field
pub const FIELD_WIDTH: usize = 28;

/// One labelled input line: `Label: [value▌]`, showing the tail of long values.
pub fn field_line<'a>(
    theme: &Theme,
    label: &'a str,
    value: &str,
    focused: bool,
    masked: bool,
) -> Line<'a> {
    let shown: String = if masked {
        "*".repeat(value.chars().count().min(FIELD_WIDTH))
    } else {
        let skip = value.chars().count().saturating_sub(FIELD_WIDTH);
        value.chars().skip(skip).collect()
    };
    let cursor = if focused { "▌" } else { "" };
    let style = if focused {
        theme.selected()
    } else {
        theme.list_item()
    };
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{:>12}: [", label), theme.muted()),
        Span::styled(format!("{:<width$}{}", shown, cursor, width = FIELD_WIDTH), style),
        Span::styled("]", theme.muted()),
    ])
}

/// A button line, marked when focused.
pub fn button_line<'a>(theme: &Theme, label: &str, focused: bool) -> Line<'a> {
    if focused {
        Line::from(vec![
            Span::raw("                ["),
            Span::styled(format!(" ▶ {} ◀ ", label), theme.selected()),
            Span::raw("]"),
        ])
    } else {
        Line::from(vec![
            Span::raw("                ["),
            Span::styled(format!("   {}   ", label), theme.list_item()),
            Span::raw("]"),
        ])
    }
}

/// Optional message line styled as an error.
pub fn error_line<'a>(theme: &Theme, message: Option<&str>) -> Option<Line<'a>> {
    message.map(|m| Line::from(Span::styled(format!("  {}", m), theme.error())))
}
