use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::{button_line, error_line, field_line};
use crate::app::{App, AuthField, AuthMode};
use crate::ui::render::centered_rect_fixed;

/// Login / signup form
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let form = &app.auth_form;
    let signup = form.mode == AuthMode::Signup;

    let mut lines = vec![Line::from("")];
    lines.push(field_line(theme, "Email", &form.email, form.focus == AuthField::Email, false));
    lines.push(field_line(
        theme,
        "Password",
        &form.password,
        form.focus == AuthField::Password,
        true,
    ));
    if signup {
        lines.push(field_line(
            theme,
            "Confirm",
            &form.confirm,
            form.focus == AuthField::Confirm,
            true,
        ));
    }
    lines.push(Line::from(""));

    let label = if app.busy {
        "Sending request..."
    } else if signup {
        "Sign Up"
    } else {
        "Login"
    };
    lines.push(button_line(theme, label, form.focus == AuthField::Submit));
    lines.push(Line::from(""));

    let toggle = if signup {
        "Have an account? Login"
    } else {
        "Create new account"
    };
    lines.push(Line::from(vec![
        Span::styled("  [s] ", theme.help_key()),
        Span::styled(toggle, theme.muted()),
        Span::styled("   [f] ", theme.help_key()),
        Span::styled("Forgot password", theme.muted()),
    ]));

    if let Some(line) = error_line(theme, form.error.as_deref()) {
        lines.push(Line::from(""));
        lines.push(line);
    }

    let height = lines.len() as u16 + 2;
    let area = centered_rect_fixed(58, height, area);
    frame.render_widget(Clear, area);

    let title = if signup { " Sign Up " } else { " Login " };
    let block = Block::default()
        .title(title)
        .title_style(theme.title())
        .borders(Borders::ALL)
        .border_style(theme.border(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Password reset request form
pub fn render_forgot_password(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Enter the email you registered with.",
            theme.muted(),
        )),
        Line::from(""),
        field_line(theme, "Email", &app.reset_email, true, false),
        Line::from(""),
    ];

    let label = if app.busy { "Sending..." } else { "Send Link" };
    lines.push(button_line(theme, label, false));
    lines.push(Line::from(vec![
        Span::styled("  Enter ", theme.help_key()),
        Span::styled("send   ", theme.muted()),
        Span::styled("Esc ", theme.help_key()),
        Span::styled("back to login", theme.muted()),
    ]));

    if let Some(ref message) = app.reset_message {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("  {}", message),
            theme.highlight(),
        )));
    }

    let height = lines.len() as u16 + 2;
    let area = centered_rect_fixed(58, height, area);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Forgot Password ")
        .title_style(theme.title())
        .borders(Borders::ALL)
        .border_style(theme.border(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
