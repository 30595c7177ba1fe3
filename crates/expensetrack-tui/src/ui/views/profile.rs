use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::{button_line, error_line, field_line};
use crate::app::{App, ProfileField};

/// Contact details editor
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let focus = app.profile_focus;

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("  Contact Details", theme.highlight())),
        Line::from(""),
        field_line(theme, "Full Name", &app.profile_name, focus == ProfileField::Name, false),
        field_line(
            theme,
            "Photo URL",
            &app.profile_photo,
            focus == ProfileField::PhotoUrl,
            false,
        ),
        Line::from(""),
    ];

    let label = if app.busy { "Updating..." } else { "Update" };
    lines.push(button_line(theme, label, focus == ProfileField::Submit));

    if let Some(line) = error_line(theme, app.form_error.as_deref()) {
        lines.push(Line::from(""));
        lines.push(line);
    }

    if let Some(email) = app.profile.as_ref().and_then(|p| p.email.as_deref()) {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("  Account: ", theme.muted()),
            Span::raw(email.to_string()),
        ]));
    }

    let block = Block::default()
        .title(" Profile ")
        .title_style(theme.title())
        .borders(Borders::ALL)
        .border_style(theme.border(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
