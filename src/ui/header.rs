//! Header Component
//!
//! Displays subscription and context information.

use crate::app::App;
use crate::VERSION;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" taz v{} ", VERSION),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    // Row 1: Subscription and pin count
    let subscription_line = Line::from(vec![
        Span::styled(" Subscription: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            &app.subscription,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled("Favorites: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{}", app.favorites.len()),
            Style::default().fg(Color::White),
        ),
    ]);
    f.render_widget(Paragraph::new(subscription_line), rows[0]);

    // Row 2: Help hint
    let help_line = Line::from(vec![
        Span::styled(
            " ?:help  a:actions  f:favorite  R:refresh  q:quit",
            Style::default().fg(Color::DarkGray),
        ),
        if app.readonly {
            Span::styled(
                "  [READ-ONLY]",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::raw("")
        },
    ]);
    f.render_widget(Paragraph::new(help_line), rows[1]);
}
