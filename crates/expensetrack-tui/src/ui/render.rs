use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use expensetrack_core::utils::format_remaining;

use crate::app::{App, AppState, View};

use super::views::{auth, expenses, home, profile, welcome};

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title bar
            Constraint::Length(2), // Navbar
            Constraint::Min(10),   // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_navbar(frame, app, chunks[1]);
    render_main_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    // Render overlays
    if matches!(app.state, AppState::ShowingHelp) {
        render_help_overlay(frame, app);
    }

    if matches!(app.state, AppState::ConfirmingQuit) {
        render_quit_overlay(frame, app);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let title = if app.config.premium_theme {
        "  Expense Tracker ★ Premium"
    } else {
        "  Expense Tracker"
    };
    let help_hint = "[?] Help";

    let title_line = Line::from(vec![
        Span::styled(title, theme.title()),
        Span::raw(" ".repeat(
            (area.width as usize).saturating_sub(title.chars().count() + help_hint.len() + 2),
        )),
        Span::styled(help_hint, theme.muted()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(theme.muted());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_navbar(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let mut tabs = vec![("[1] Home", View::Home)];
    if app.is_logged_in() {
        tabs.push(("[2] Welcome", View::Welcome));
        tabs.push(("[3] Expenses", View::Expenses));
        tabs.push(("[4] Profile", View::Profile));
    }

    let mut spans = vec![Span::raw(" ")];
    for (i, (label, view)) in tabs.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", theme.muted()));
        }
        spans.push(Span::styled(*label, theme.tab(app.view == *view)));
    }

    let right = if app.is_logged_in() {
        "[l] Logout "
    } else {
        "[l] Login "
    };
    let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    let padding = (area.width as usize).saturating_sub(used + right.len());
    spans.push(Span::raw(" ".repeat(padding)));
    spans.push(Span::styled(right, theme.tab(app.view == View::Auth)));

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(theme.muted());
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Home => home::render(frame, app, area),
        View::Auth => auth::render(frame, app, area),
        View::ForgotPassword => auth::render_forgot_password(frame, app, area),
        View::Welcome => welcome::render(frame, app, area),
        View::Profile => profile::render(frame, app, area),
        View::Expenses => expenses::render(frame, app, area),
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let left_text = match app.status_message {
        Some(ref msg) => format!(" {} ", msg),
        None => format!(" {} ", app.view.title()),
    };

    let right_text = match app.session_seconds_left() {
        Some(secs) => format!(" Session {} | [q]uit ", format_remaining(secs)),
        None => " Not logged in | [q]uit ".to_string(),
    };

    let padding_len = (area.width as usize)
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.len());
    let status_line = Line::from(vec![
        Span::styled(left_text, theme.muted()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, theme.muted()),
    ]);
    frame.render_widget(Paragraph::new(status_line).style(theme.status_bar()), area);
}

fn help_entry<'a>(app: &App, key: &'a str, desc: &'a str) -> Line<'a> {
    let theme = app.theme();
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), theme.help_key()),
        Span::styled(desc, theme.help_desc()),
    ])
}

fn render_help_overlay(frame: &mut Frame, app: &App) {
    let theme = app.theme();
    let area = centered_rect_fixed(52, 24, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled("  Expense Tracker", theme.title())),
        Line::from(Span::styled(format!("  version {}", version), theme.muted())),
        Line::from(""),
        Line::from(Span::styled(" Navigation", theme.highlight())),
        help_entry(app, "1-4", "Home / Welcome / Expenses / Profile"),
        help_entry(app, "l", "Login or logout"),
        help_entry(app, "Tab/↑/↓", "Move between fields"),
        help_entry(app, "Enter", "Submit / next field"),
        help_entry(app, "Esc", "Leave a text field or go back"),
        Line::from(""),
        Line::from(Span::styled(" Expenses", theme.highlight())),
        help_entry(app, "←/→", "Change category"),
        help_entry(app, "e / d", "Edit / delete selected"),
        help_entry(app, "r", "Reload from server"),
        help_entry(app, "a / x", "Premium theme / download CSV"),
        Line::from(""),
        Line::from(Span::styled(" Welcome", theme.highlight())),
        help_entry(app, "v / p", "Verify email / edit profile"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", theme.muted()),
            Span::styled("?", theme.help_key()),
            Span::styled(" or ", theme.muted()),
            Span::styled("Esc", theme.help_key()),
            Span::styled(" to close", theme.muted()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
pub fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame, app: &App) {
    let theme = app.theme();
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            theme.highlight(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", theme.muted()),
            Span::styled("[Y]", theme.help_key()),
            Span::styled(" to quit, ", theme.muted()),
            Span::styled("[N]", theme.help_key()),
            Span::styled(" to cancel", theme.muted()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
