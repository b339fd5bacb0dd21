//! Terminal User Interface rendering module
//!
//! This module handles all UI rendering for taz using the ratatui framework.
//! The main panel is the explorer tree with vim-style navigation; dialogs
//! (confirmation, draft form, action menu) render as centered overlays.
//!
//! # Architecture
//!
//! - [`splash`] - Startup splash screen animation
//! - `header` - Header bar with subscription info
//! - `help` - Help overlay showing keybindings
//! - `dialog` - Confirmation, warning, action-menu, and draft-form dialogs
//!
//! # Virtual Scrolling
//!
//! The tree rendering uses virtual scrolling: only visible rows are built,
//! with a scrollbar indicating position.

mod dialog;
mod header;
mod help;
pub mod splash;

use crate::app::{App, Mode};
use crate::resource::FormalStatus;
use crate::tree::{NodeContent, NodeState};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame,
};

pub fn render(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Header
            Constraint::Min(1),    // Tree panel
            Constraint::Length(1), // Footer/crumb
        ])
        .split(f.area());

    header::render(f, app, chunks[0]);
    render_tree(f, app, chunks[1]);
    render_crumb(f, app, chunks[2]);

    // Overlays
    match app.mode {
        Mode::Help => {
            help::render(f, app);
        }
        Mode::Confirm | Mode::Warning | Mode::Actions | Mode::DraftForm => {
            dialog::render(f, app);
        }
        _ => {}
    }
}

/// Render the explorer tree with virtual scrolling
fn render_tree(f: &mut Frame, app: &mut App, area: Rect) {
    let rows = app.rows();

    let title = format!(" {} [{}] ", app.subscription, rows.len());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .title_alignment(Alignment::Center);

    let inner_area = block.inner(area);
    f.render_widget(block, area);

    let visible_height = inner_area.height as usize;
    app.update_viewport(visible_height);
    app.ensure_visible();

    let total_rows = rows.len();
    let needs_scrollbar = total_rows > visible_height;

    let tree_area = if needs_scrollbar {
        Rect {
            width: inner_area.width.saturating_sub(1),
            ..inner_area
        }
    } else {
        inner_area
    };

    let range = app.visible_range();
    let lines: Vec<Line> = rows[range.clone()]
        .iter()
        .enumerate()
        .map(|(rel_idx, (id, depth))| {
            let abs_idx = range.start + rel_idx;
            render_row(app, *id, *depth, abs_idx == app.selected)
        })
        .collect();

    f.render_widget(Paragraph::new(lines), tree_area);

    if needs_scrollbar {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .symbols(symbols::scrollbar::VERTICAL)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"));

        let mut scrollbar_state = ScrollbarState::new(total_rows.saturating_sub(visible_height))
            .position(app.scroll_offset);

        f.render_stateful_widget(scrollbar, inner_area, &mut scrollbar_state);
    }
}

/// Build a single tree row: indent, expansion glyph, name, kind, status
fn render_row(app: &App, id: crate::tree::NodeId, depth: usize, selected: bool) -> Line<'static> {
    let Some(node) = app.tree.node(id) else {
        return Line::from("");
    };

    let indent = "  ".repeat(depth);
    let glyph = match node.state() {
        NodeState::Loading => "↻",
        NodeState::Populated => "▾",
        NodeState::Error(_) => "✗",
        NodeState::Collapsed if node.is_expandable() => "▸",
        NodeState::Collapsed => "·",
    };
    let glyph_style = match node.state() {
        NodeState::Loading => Style::default().fg(Color::Yellow),
        NodeState::Error(_) => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::DarkGray),
    };

    let mut spans = vec![
        Span::raw(format!(" {}", indent)),
        Span::styled(format!("{} ", glyph), glyph_style),
    ];

    match node.content() {
        NodeContent::Group { label, .. } => {
            let mut style = Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD);
            if selected {
                style = style.bg(Color::DarkGray);
            }
            spans.push(Span::styled(label.clone(), style));
        }
        NodeContent::Resource(resource) => {
            let mut name_style = Style::default().fg(Color::White);
            if selected {
                name_style = name_style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
            }
            spans.push(Span::styled(resource.name().to_string(), name_style));
            spans.push(Span::styled(
                format!("  {}", resource.kind().display_name()),
                Style::default().fg(Color::DarkGray),
            ));
            if resource.kind().capabilities().get_status {
                spans.push(Span::styled(
                    format!("  {} {}", resource.status().icon(), resource.status().label()),
                    status_style(resource.status()),
                ));
            }
            if app.favorites.contains(resource.id().as_str()) {
                spans.push(Span::styled("  ★", Style::default().fg(Color::Yellow)));
            }
        }
    }

    if let NodeState::Error(message) = node.state() {
        spans.push(Span::styled(
            format!("  {}", message),
            Style::default().fg(Color::Red),
        ));
    }

    Line::from(spans)
}

fn status_style(status: FormalStatus) -> Style {
    match status {
        FormalStatus::Running => Style::default().fg(Color::Green),
        FormalStatus::Stopped => Style::default().fg(Color::Gray),
        s if s.is_transitional() => Style::default().fg(Color::Yellow),
        _ => Style::default().fg(Color::DarkGray),
    }
}

fn render_crumb(f: &mut Frame, app: &App, area: Rect) {
    let status_text = if let Some(err) = &app.error_message {
        format!("Error: {}", err)
    } else if let Some(status) = &app.status_message {
        status.clone()
    } else if app.loading() {
        "Loading...".to_string()
    } else {
        match app.mode {
            Mode::Normal => {
                "Enter:expand  a:actions  f:pin  R:refresh  n:new  ?:help".to_string()
            }
            Mode::Actions => "j/k:move  Enter:run  Esc:close".to_string(),
            Mode::DraftForm => {
                "Tab:next field  ←/→:choices  Ctrl+r:reset  Enter:save  Esc:discard".to_string()
            }
            _ => String::new(),
        }
    };

    let style = if app.error_message.is_some() {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else if app.status_message.is_some() {
        Style::default().fg(Color::Green)
    } else if app.loading() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let crumb = Line::from(vec![
        Span::styled(
            format!("<{}>", app.subscription),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::styled(status_text, style),
    ]);

    f.render_widget(Paragraph::new(crumb), area);
}
