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
        Line::from(Span::styled("  Expense Tracker", theme.title())),
        Line::from(""),
        Line::from("  Keep track of where your money goes."),
        Line::from(""),
    ];

    if app.is_logged_in() {
        lines.push(Line::from(vec![
            Span::styled("  [2]", theme.help_key()),
            Span::raw(" Welcome   "),
            Span::styled("[3]", theme.help_key()),
            Span::raw(" Expenses"),
        ]));
    } else {
        lines.push(Line::from(vec![
            Span::styled("  [l]", theme.help_key()),
            Span::raw(" Login or sign up to get started"),
        ]));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border(false));
    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
