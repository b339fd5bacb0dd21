//! Event Handling
//!
//! Keyboard handling for taz: keys map to commands on the app state, and the
//! registry-gated actions all funnel through [`App::invoke_action`].

use crate::actions::ids;
use crate::app::{App, Mode};
use anyhow::Result;
use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use std::time::Duration;

/// Handle events, returns true if app should quit
pub fn handle_events(app: &mut App) -> Result<bool> {
    if poll(Duration::from_millis(100))? {
        if let Event::Key(key) = read()? {
            return handle_key_event(app, key.code, key.modifiers);
        }
    }
    Ok(false)
}

fn handle_key_event(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Result<bool> {
    // Global quit shortcut
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Ok(true);
    }

    match app.mode {
        Mode::Normal => handle_normal_mode(app, code, modifiers),
        Mode::Help => handle_help_mode(app, code),
        Mode::Confirm => handle_confirm_mode(app, code),
        Mode::Warning => handle_warning_mode(app, code),
        Mode::Actions => handle_actions_mode(app, code),
        Mode::DraftForm => handle_draft_form_mode(app, code, modifiers),
    }
}

fn handle_normal_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Result<bool> {
    // A new keypress clears the transient status line
    app.status_message = None;

    match code {
        // Quit
        KeyCode::Char('q') => return Ok(true),

        // Navigation - vim style + accessible alternatives
        KeyCode::Char('j') | KeyCode::Down => app.next(),
        KeyCode::Char('k') | KeyCode::Up => app.previous(),
        KeyCode::Char('g') | KeyCode::Home => app.go_to_top(),
        KeyCode::Char('G') | KeyCode::End => app.go_to_bottom(),
        KeyCode::PageDown => app.page_down(10),
        KeyCode::PageUp => app.page_up(10),

        // Ctrl+D/U for page navigation
        KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.page_down(10);
        }
        KeyCode::Char('u') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.page_up(10);
        }

        // Expand / collapse
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right | KeyCode::Char(' ') => {
            app.error_message = None;
            app.toggle_expand();
        }
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Backspace => {
            app.collapse_or_focus_parent();
        }

        // Refresh (also the retry path for a node in error)
        KeyCode::Char('R') => {
            app.error_message = None;
            app.refresh_selected();
        }

        // Context action menu
        KeyCode::Char('a') => {
            app.open_actions_menu();
        }

        // Action shortcuts; enablement is re-checked inside invoke_action
        KeyCode::Char('f') => {
            app.toggle_pin()?;
        }
        KeyCode::Char('t') => {
            if let Some(node) = app.selected_node() {
                app.invoke_action(ids::PROMOTE, node)?;
            }
        }
        KeyCode::Char('n') => {
            if let Some(node) = app.selected_node() {
                app.invoke_action(ids::CREATE, node)?;
            }
        }
        KeyCode::Char('e') => {
            if let Some(node) = app.selected_node() {
                app.invoke_action(ids::EDIT, node)?;
            }
        }
        KeyCode::Char('D') | KeyCode::Delete => {
            if let Some(node) = app.selected_node() {
                app.invoke_action(ids::DELETE, node)?;
            }
        }
        KeyCode::Char('o') => {
            if let Some(node) = app.selected_node() {
                app.invoke_action(ids::OPEN_PORTAL, node)?;
            }
        }
        KeyCode::Char('c') => {
            if let Some(node) = app.selected_node() {
                app.invoke_action(ids::CONNECT, node)?;
            }
        }
        KeyCode::Char('u') => {
            if let Some(node) = app.selected_node() {
                app.invoke_action(ids::UNLINK, node)?;
            }
        }

        // Help
        KeyCode::Char('?') => {
            app.enter_help_mode();
        }

        _ => {}
    }

    Ok(false)
}

fn handle_help_mode(app: &mut App, code: KeyCode) -> Result<bool> {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') | KeyCode::Enter => {
            app.exit_mode();
        }
        _ => {}
    }
    Ok(false)
}

fn handle_confirm_mode(app: &mut App, code: KeyCode) -> Result<bool> {
    match code {
        KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
            app.exit_mode();
        }
        KeyCode::Left | KeyCode::Char('h') => {
            if let Some(ref mut pending) = app.pending_action {
                pending.selected_yes = true;
            }
        }
        KeyCode::Right | KeyCode::Char('l') => {
            if let Some(ref mut pending) = app.pending_action {
                pending.selected_yes = false;
            }
        }
        KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
            let accepted = code != KeyCode::Enter
                || app
                    .pending_action
                    .as_ref()
                    .map(|p| p.selected_yes)
                    .unwrap_or(false);
            if accepted {
                app.confirm_pending()?;
            } else {
                app.exit_mode();
            }
        }
        _ => {}
    }
    Ok(false)
}

fn handle_warning_mode(app: &mut App, code: KeyCode) -> Result<bool> {
    match code {
        KeyCode::Esc | KeyCode::Enter => {
            app.exit_mode();
        }
        _ => {}
    }
    Ok(false)
}

fn handle_actions_mode(app: &mut App, code: KeyCode) -> Result<bool> {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('a') => {
            app.exit_mode();
        }
        KeyCode::Char('j') | KeyCode::Down => app.next(),
        KeyCode::Char('k') | KeyCode::Up => app.previous(),
        KeyCode::Enter => {
            app.activate_menu_entry()?;
        }
        _ => {}
    }
    Ok(false)
}

fn handle_draft_form_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Result<bool> {
    match code {
        KeyCode::Esc => {
            // closing the dialog discards the draft
            app.exit_mode();
        }
        KeyCode::Enter => {
            app.submit_draft();
        }
        KeyCode::Tab | KeyCode::Down => {
            app.form_focus_next();
        }
        KeyCode::BackTab | KeyCode::Up => {
            app.form_focus_previous();
        }
        KeyCode::Left => {
            app.form_cycle(-1);
        }
        KeyCode::Right => {
            app.form_cycle(1);
        }
        KeyCode::Backspace => {
            app.form_backspace();
        }
        KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.form_reset();
        }
        KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
            app.form_input_char(c);
        }
        _ => {}
    }
    Ok(false)
}
