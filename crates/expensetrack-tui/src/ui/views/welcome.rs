use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("  Welcome to Expense Tracker!!!", theme.title())),
        Line::from(""),
    ];

    match app.profile {
        Some(ref profile) => {
            let name = profile.display_name_or_email();
            if !name.is_empty() {
                lines.push(Line::from(vec![
                    Span::styled("  Signed in as ", theme.muted()),
                    Span::raw(name.to_string()),
                ]));
            }

            if profile.is_complete() {
                lines.push(Line::from(Span::styled("  Your profile is complete.", theme.success())));
            } else {
                lines.push(Line::from(vec![
                    Span::styled("  Your profile is incomplete. ", theme.highlight()),
                    Span::styled("[p]", theme.help_key()),
                    Span::raw(" Complete now"),
                ]));
            }

            lines.push(Line::from(""));
            if profile.email_verified {
                lines.push(Line::from(Span::styled("  Email verified", theme.success())));
            } else if app.is_polling_verification() {
                lines.push(Line::from(Span::styled(
                    "  Verification email sent. Waiting for you to open the link...",
                    theme.highlight(),
                )));
            } else {
                lines.push(Line::from(vec![
                    Span::styled("  [v]", theme.help_key()),
                    Span::raw(" Verify email"),
                ]));
            }
        }
        None => {
            lines.push(Line::from(Span::styled("  Loading profile...", theme.muted())));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("  [3]", theme.help_key()),
        Span::raw(" Go to expenses"),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border(true));
    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
