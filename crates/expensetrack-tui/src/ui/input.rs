//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes. Views that own text fields see keys first;
//! anything they leave unhandled falls through to the global shortcuts.

use std::path::PathBuf;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{push_amount, push_text, App, AppState, AuthField, ExpenseField, ProfileField, View};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    let handled = match app.view {
        View::Auth => handle_auth_input(app, key),
        View::ForgotPassword => handle_forgot_password_input(app, key),
        View::Profile => handle_profile_input(app, key),
        View::Expenses => handle_expenses_input(app, key),
        View::Welcome => handle_welcome_input(app, key),
        View::Home => false,
    };
    if handled {
        return Ok(false);
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char('1') => app.set_view(View::Home),
        KeyCode::Char('2') => app.set_view(View::Welcome),
        KeyCode::Char('3') => app.set_view(View::Expenses),
        KeyCode::Char('4') => app.set_view(View::Profile),
        KeyCode::Char('l') => {
            if app.is_logged_in() {
                app.logout();
            } else {
                app.set_view(View::Auth);
            }
        }
        _ => {}
    }
    Ok(false)
}

fn handle_auth_input(app: &mut App, key: KeyEvent) -> bool {
    let focus = app.auth_form.focus;
    match key.code {
        KeyCode::Esc => {
            if focus == AuthField::Submit {
                app.set_view(View::Home);
            } else {
                app.auth_form.focus = AuthField::Submit;
            }
        }
        KeyCode::Down | KeyCode::Tab => app.auth_form.next_field(),
        KeyCode::Up | KeyCode::BackTab => app.auth_form.prev_field(),
        KeyCode::Enter => {
            if focus == AuthField::Submit {
                if !app.busy {
                    app.submit_auth();
                }
            } else {
                app.auth_form.next_field();
            }
        }
        KeyCode::Backspace => app.auth_form.pop_char(),
        KeyCode::Char(c) if focus != AuthField::Submit => app.auth_form.push_char(c),
        KeyCode::Char('s') => app.auth_form.toggle_mode(),
        KeyCode::Char('f') => app.set_view(View::ForgotPassword),
        _ => return false,
    }
    true
}

fn handle_forgot_password_input(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => app.set_view(View::Auth),
        KeyCode::Enter => {
            if !app.busy {
                app.submit_password_reset();
            }
        }
        KeyCode::Backspace => {
            app.reset_email.pop();
        }
        KeyCode::Char(c) => push_text(&mut app.reset_email, c),
        _ => return false,
    }
    true
}

fn handle_profile_input(app: &mut App, key: KeyEvent) -> bool {
    let focus = app.profile_focus;
    match key.code {
        KeyCode::Esc => {
            if focus == ProfileField::Submit {
                app.set_view(View::Welcome);
            } else {
                app.profile_focus = ProfileField::Submit;
            }
        }
        KeyCode::Down | KeyCode::Tab => app.profile_focus = focus.next(),
        KeyCode::Up | KeyCode::BackTab => app.profile_focus = focus.prev(),
        KeyCode::Enter => {
            if focus == ProfileField::Submit {
                if !app.busy {
                    app.submit_profile();
                }
            } else {
                app.profile_focus = focus.next();
            }
        }
        KeyCode::Backspace => {
            match focus {
                ProfileField::Name => app.profile_name.pop(),
                ProfileField::PhotoUrl => app.profile_photo.pop(),
                ProfileField::Submit => None,
            };
        }
        KeyCode::Char(c) => match focus {
            ProfileField::Name => push_text(&mut app.profile_name, c),
            ProfileField::PhotoUrl => push_text(&mut app.profile_photo, c),
            ProfileField::Submit => return false,
        },
        _ => return false,
    }
    true
}

fn handle_welcome_input(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('v') => {
            let verified = app.profile.as_ref().is_some_and(|p| p.email_verified);
            if !verified && !app.is_polling_verification() && !app.busy {
                app.verify_email();
            }
        }
        KeyCode::Char('p') => app.set_view(View::Profile),
        _ => return false,
    }
    true
}

fn handle_expenses_input(app: &mut App, key: KeyEvent) -> bool {
    let focus = app.expense_focus;
    match key.code {
        KeyCode::Esc => {
            if app.expense_form.editing.is_some() {
                app.cancel_edit();
            } else if focus.is_text() {
                app.expense_focus = ExpenseField::List;
            } else {
                return false;
            }
        }
        KeyCode::Tab => app.expense_focus = focus.next(),
        KeyCode::BackTab => app.expense_focus = focus.prev(),
        KeyCode::Down if focus == ExpenseField::List => app.select_next_expense(),
        KeyCode::Up if focus == ExpenseField::List => app.select_prev_expense(),
        KeyCode::Down => app.expense_focus = focus.next(),
        KeyCode::Up => app.expense_focus = focus.prev(),
        KeyCode::Left if focus == ExpenseField::Category => {
            app.expense_form.category = app.expense_form.category.prev();
        }
        KeyCode::Right if focus == ExpenseField::Category => {
            app.expense_form.category = app.expense_form.category.next();
        }
        KeyCode::Enter => match focus {
            ExpenseField::Submit => app.submit_expense(),
            ExpenseField::List => app.edit_selected_expense(),
            _ => app.expense_focus = focus.next(),
        },
        KeyCode::Backspace => match focus {
            ExpenseField::Money => {
                app.expense_form.money.pop();
            }
            ExpenseField::Description => {
                app.expense_form.description.pop();
            }
            _ => return false,
        },
        KeyCode::Char(c) => match focus {
            ExpenseField::Money => push_amount(&mut app.expense_form.money, c),
            ExpenseField::Description => push_text(&mut app.expense_form.description, c),
            ExpenseField::List => match c {
                'e' => app.edit_selected_expense(),
                'd' => app.delete_selected_expense(),
                'r' => app.refresh_expenses(),
                'a' => app.toggle_premium_theme(),
                'x' => app.download_expenses(&download_dir()),
                _ => return false,
            },
            ExpenseField::Category | ExpenseField::Submit => return false,
        },
        _ => return false,
    }
    true
}

/// CSV downloads land in the working directory.
fn download_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
