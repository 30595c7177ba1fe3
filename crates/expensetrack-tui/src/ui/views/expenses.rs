use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use expensetrack_core::expenses::ExpenseList;
use expensetrack_core::utils::{format_money, truncate_string};

use super::{button_line, error_line, field_line};
use crate::app::{App, ExpenseField};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(11), Constraint::Min(5)])
        .split(area);

    render_form(frame, app, chunks[0]);
    render_list(frame, app, chunks[1]);
}

fn render_form(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let form = &app.expense_form;
    let focus = app.expense_focus;

    let category_style = if focus == ExpenseField::Category {
        theme.selected()
    } else {
        theme.list_item()
    };

    let mut lines = vec![
        field_line(theme, "Money Spent", &form.money, focus == ExpenseField::Money, false),
        field_line(
            theme,
            "Description",
            &form.description,
            focus == ExpenseField::Description,
            false,
        ),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(format!("{:>12}: ", "Category"), theme.muted()),
            Span::styled(format!("◀ {} ▶", form.category), category_style),
        ]),
        Line::from(""),
    ];

    let label = if form.editing.is_some() {
        "Save Expense"
    } else {
        "Add Expense"
    };
    lines.push(button_line(theme, label, focus == ExpenseField::Submit));

    match error_line(theme, app.form_error.as_deref()) {
        Some(line) => lines.push(line),
        None if form.editing.is_some() => lines.push(Line::from(Span::styled(
            "  Editing. Esc to cancel",
            theme.muted(),
        ))),
        None => {}
    }

    let focused = focus != ExpenseField::List;
    let block = Block::default()
        .title(" New Expense ")
        .title_style(theme.title())
        .borders(Borders::ALL)
        .border_style(theme.border(focused));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_list(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let focused = app.expense_focus == ExpenseField::List;
    let description_width = (area.width as usize).saturating_sub(36).max(10);

    let items: Vec<ListItem> = app
        .expenses
        .iter()
        .enumerate()
        .map(|(i, expense)| {
            let pending = if ExpenseList::is_provisional(expense) {
                " …"
            } else {
                ""
            };
            let line = Line::from(format!(
                " {:>12}  {:<desc$}  {:<13}{}",
                format_money(expense.money),
                truncate_string(&expense.description, description_width),
                expense.category.as_str(),
                pending,
                desc = description_width,
            ));
            let style = if focused && i == app.expense_selection {
                theme.selected()
            } else {
                theme.list_item()
            };
            ListItem::new(line).style(style)
        })
        .collect();

    let mut title = format!(
        " Expenses ({}) | Total {} ",
        app.expenses.len(),
        format_money(app.expenses.total())
    );
    if app.premium_available() {
        title.push_str("| [a] Activate Premium  [x] Download Expenses ");
    }

    let block = Block::default()
        .title(title)
        .title_style(theme.title())
        .borders(Borders::ALL)
        .border_style(theme.border(focused));

    if items.is_empty() {
        let text = if app.busy {
            "  Loading..."
        } else {
            "  No expenses yet"
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(text, theme.muted()))).block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let list = List::new(items).block(block);
    let mut state = ListState::default();
    if focused {
        state.select(Some(app.expense_selection));
    }
    frame.render_stateful_widget(list, area, &mut state);
}
