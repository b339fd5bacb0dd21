//! Dialog Components
//!
//! Confirmation, warning, action-menu, and draft-form dialogs.

use crate::app::{App, DraftField, Mode};
use crate::resource::ResourceKind;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame, app: &App) {
    match app.mode {
        Mode::Confirm => render_confirm_dialog(f, app),
        Mode::Warning => render_warning_dialog(f, app),
        Mode::Actions => render_actions_menu(f, app),
        Mode::DraftForm => render_draft_form(f, app),
        _ => {}
    }
}

fn render_confirm_dialog(f: &mut Frame, app: &App) {
    let Some(pending) = &app.pending_action else {
        return;
    };

    let area = f.area();
    let popup_area = centered_rect(50, 25, area);

    f.render_widget(Clear, popup_area);

    let border_color = if pending.destructive {
        Color::Red
    } else {
        Color::Yellow
    };

    let title = if pending.destructive {
        " Confirm Destructive Action "
    } else {
        " Confirm Action "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(Span::styled(
            title,
            Style::default()
                .fg(border_color)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let content_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Length(2),
        ])
        .split(inner);

    // Message
    let message = Paragraph::new(Line::from(Span::styled(
        &pending.message,
        Style::default().fg(Color::White),
    )))
    .alignment(Alignment::Center);
    f.render_widget(message, content_chunks[0]);

    // Buttons
    let yes_style = if pending.selected_yes {
        Style::default()
            .fg(Color::Black)
            .bg(if pending.destructive {
                Color::Red
            } else {
                Color::Green
            })
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let no_style = if !pending.selected_yes {
        Style::default()
            .fg(Color::Black)
            .bg(Color::White)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let buttons = Line::from(vec![
        Span::raw("  "),
        Span::styled(" Yes (y) ", yes_style),
        Span::raw("    "),
        Span::styled(" No (n) ", no_style),
        Span::raw("  "),
    ]);

    let buttons_para = Paragraph::new(buttons).alignment(Alignment::Center);
    f.render_widget(buttons_para, content_chunks[2]);
}

fn render_warning_dialog(f: &mut Frame, app: &App) {
    let Some(message) = &app.warning_message else {
        return;
    };

    let area = f.area();
    let popup_area = centered_rect(50, 20, area);

    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(
            " Warning ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            message.as_str(),
            Style::default().fg(Color::White),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Press Enter or Esc to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(content).alignment(Alignment::Center);
    f.render_widget(paragraph, inner);
}

fn render_actions_menu(f: &mut Frame, app: &App) {
    let Some(menu) = &app.actions_menu else {
        return;
    };

    let target = app
        .tree
        .node(menu.node)
        .map(|n| n.content().label().to_string())
        .unwrap_or_default();

    let area = f.area();
    let height_percent = ((menu.entries.len() as u16 + 4) * 100 / area.height.max(1)).clamp(20, 80);
    let popup_area = centered_rect(40, height_percent, area);

    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            format!(" {} ", target),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let lines: Vec<Line> = menu
        .entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| match &entry.action {
            None => Line::from(Span::styled(
                "  ──────────────",
                Style::default().fg(Color::DarkGray),
            )),
            Some(_) => {
                let shortcut = entry
                    .shortcut
                    .map(|c| format!(" ({})", c))
                    .unwrap_or_default();
                let text = format!("  {}{}", entry.label, shortcut);

                let style = if !entry.enabled {
                    Style::default().fg(Color::DarkGray)
                } else if idx == menu.selected {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };
                Line::from(Span::styled(text, style))
            }
        })
        .collect();

    f.render_widget(Paragraph::new(lines), inner);
}

fn render_draft_form(f: &mut Frame, app: &App) {
    let Some(form) = &app.draft_form else {
        return;
    };

    let title = if form.draft.origin().is_some() {
        format!(" Edit {} ", form.draft.kind().display_name())
    } else {
        format!(" New {} ", form.draft.kind().display_name())
    };

    let area = f.area();
    let popup_area = centered_rect(55, 45, area);

    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            title,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let mut lines = vec![Line::from("")];

    if form.kind_choices.len() > 1 {
        lines.push(field_line(
            "Kind",
            form.draft.kind().display_name(),
            form.focused == DraftField::Kind,
            true,
        ));
    }

    lines.push(field_line(
        "Name",
        form.draft.name(),
        form.focused == DraftField::Name,
        false,
    ));

    if form.draft.kind().requires_sku() {
        lines.push(field_line(
            "Pricing tier",
            form.draft.sku().unwrap_or("<select>"),
            form.focused == DraftField::Sku,
            true,
        ));
    }

    if form.draft.kind() != &ResourceKind::ResourceGroup || form.draft.origin().is_none() {
        lines.push(field_line(
            "Location",
            form.draft.location().unwrap_or("<default>"),
            form.focused == DraftField::Location,
            true,
        ));
    }

    if let Some(group) = form.draft.resource_group() {
        lines.push(Line::from(vec![
            Span::styled("  Resource group: ", Style::default().fg(Color::DarkGray)),
            Span::styled(group.to_string(), Style::default().fg(Color::White)),
        ]));
    }

    lines.push(Line::from(""));
    if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            format!("  {}", error),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    } else if form.draft.is_modified() {
        lines.push(Line::from(Span::styled(
            "  modified",
            Style::default().fg(Color::Yellow),
        )));
    }

    f.render_widget(Paragraph::new(lines), inner);
}

/// Render one labeled form field; choice fields show cycling arrows
fn field_line(label: &str, value: &str, focused: bool, choice: bool) -> Line<'static> {
    let label_style = if focused {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let value_display = if focused && !choice {
        format!("{}_", value)
    } else if focused && choice {
        format!("< {} >", value)
    } else {
        value.to_string()
    };

    Line::from(vec![
        Span::styled(format!("  {:<14}", format!("{}:", label)), label_style),
        Span::styled(value_display, Style::default().fg(Color::White)),
    ])
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
