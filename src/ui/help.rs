//! Help Overlay
//!
//! Shows keyboard shortcuts and help information.

use crate::app::App;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame, _app: &App) {
    let area = f.area();
    let popup_area = centered_rect(70, 80, area);

    f.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Navigation",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(vec![
            Span::styled("  j/k, ↑/↓    ", Style::default().fg(Color::Yellow)),
            Span::raw("Move up/down"),
        ]),
        Line::from(vec![
            Span::styled("  g / G       ", Style::default().fg(Color::Yellow)),
            Span::raw("Go to top / bottom"),
        ]),
        Line::from(vec![
            Span::styled("  Ctrl+d/u    ", Style::default().fg(Color::Yellow)),
            Span::raw("Page down/up"),
        ]),
        Line::from(vec![
            Span::styled("  Enter/l/→   ", Style::default().fg(Color::Yellow)),
            Span::raw("Expand or collapse the selected node"),
        ]),
        Line::from(vec![
            Span::styled("  h/←         ", Style::default().fg(Color::Yellow)),
            Span::raw("Collapse, or jump to the parent node"),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Actions",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(vec![
            Span::styled("  a           ", Style::default().fg(Color::Yellow)),
            Span::raw("Open the action menu for the selected node"),
        ]),
        Line::from(vec![
            Span::styled("  f           ", Style::default().fg(Color::Yellow)),
            Span::raw("Add to / remove from favorites"),
        ]),
        Line::from(vec![
            Span::styled("  t           ", Style::default().fg(Color::Yellow)),
            Span::raw("Move favorite to top"),
        ]),
        Line::from(vec![
            Span::styled("  R           ", Style::default().fg(Color::Yellow)),
            Span::raw("Refresh node (retries after an error)"),
        ]),
        Line::from(vec![
            Span::styled("  n           ", Style::default().fg(Color::Yellow)),
            Span::raw("Create a resource in the selected container"),
        ]),
        Line::from(vec![
            Span::styled("  e           ", Style::default().fg(Color::Yellow)),
            Span::raw("Edit the selected resource"),
        ]),
        Line::from(vec![
            Span::styled("  D/Del       ", Style::default().fg(Color::Yellow)),
            Span::raw("Delete the selected resource (confirms first)"),
        ]),
        Line::from(vec![
            Span::styled("  u           ", Style::default().fg(Color::Yellow)),
            Span::raw("Unlink a linked resource (confirms first)"),
        ]),
        Line::from(vec![
            Span::styled("  o / c       ", Style::default().fg(Color::Yellow)),
            Span::raw("Open in portal / connect"),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled(
            "General",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(vec![
            Span::styled("  ?           ", Style::default().fg(Color::Yellow)),
            Span::raw("Toggle this help"),
        ]),
        Line::from(vec![
            Span::styled("  q, Ctrl+c   ", Style::default().fg(Color::Yellow)),
            Span::raw("Quit"),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " Help ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    f.render_widget(Paragraph::new(help_text), inner);
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
