//! Shared UI components (status bar, keybinds pane, modal helpers).
//!
//! Small building blocks reused by the users and roles screens.
//!
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::collections::{BTreeMap, BTreeSet};

use crate::app::keymap::{KeyAction, Keymap};
use crate::app::{ActiveTab, AppState, InputMode, ModalState};
use crate::model::UserStatus;

/// Render the bottom status bar with mode, counts and the active filter.
pub fn render_status_bar(f: &mut Frame, area: Rect, app: &AppState) {
    let mode = match app.input_mode {
        InputMode::Normal => "NORMAL",
        InputMode::SearchUsers => "SEARCH(users)",
        InputMode::SearchRoles => "SEARCH(roles)",
        InputMode::Modal => "MODAL",
    };
    let filter = match app.status_filter {
        Some(s) => format!("  status:[{}]", s.label()),
        None => String::new(),
    };
    let msg = format!(
        "mode: {mode}  shown users:{}  shown roles:{}  rows/page:{}{}  ?: help  K: keys",
        app.users.len(),
        app.roles.len(),
        app.rows_per_page,
        filter
    );
    let p = Paragraph::new(msg).style(Style::default().fg(app.theme.status_fg).bg(app.theme.status_bg));
    f.render_widget(p, area);
}

/// Render the right-side keybinds viewer, grouped by purpose.
pub fn render_keybinds_panel(f: &mut Frame, area: Rect, app: &AppState) {
    let block = Block::default()
        .title("Keybindings")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border));
    let inner = block.inner(area);

    let mut general: BTreeMap<&'static str, BTreeSet<String>> = BTreeMap::new();
    let mut navigation: BTreeMap<&'static str, BTreeSet<String>> = BTreeMap::new();

    for ((mods, code), action) in app.keymap.all_bindings() {
        let key = Keymap::format_key(mods, code);
        let (section, label) = match action {
            KeyAction::Quit => (&mut general, "Quit"),
            KeyAction::SwitchTab => (&mut general, "Switch tab"),
            KeyAction::OpenFilterMenu => (&mut general, "Filter by status"),
            KeyAction::StartSearch => (&mut general, "Search"),
            KeyAction::New => (&mut general, "New user / role"),
            KeyAction::DeleteSelection => (&mut general, "Delete selection"),
            KeyAction::EnterAction => (&mut general, "Actions"),
            KeyAction::Reload => (&mut general, "Reload"),
            KeyAction::OpenHelp => (&mut general, "Help"),
            KeyAction::ToggleFocus => (&mut general, "Toggle pane"),
            KeyAction::ToggleKeybindsPane => (&mut general, "Toggle keybindings"),
            KeyAction::MoveUp => (&mut navigation, "Move up"),
            KeyAction::MoveDown => (&mut navigation, "Move down"),
            KeyAction::PageUp => (&mut navigation, "Page up"),
            KeyAction::PageDown => (&mut navigation, "Page down"),
            KeyAction::Ignore => continue,
        };
        section.entry(label).or_default().insert(key);
    }

    let label_w = general
        .keys()
        .chain(navigation.keys())
        .map(|k| k.len())
        .max()
        .unwrap_or(0)
        .min((inner.width as usize).saturating_sub(10));

    let mut lines: Vec<Line> = Vec::new();
    for (title, section) in [("General:", &general), ("Navigation:", &navigation)] {
        if !lines.is_empty() {
            lines.push(Line::raw(""));
        }
        lines.push(Line::from(Span::styled(title, Style::default().add_modifier(Modifier::BOLD))));
        for (label, keys) in section {
            let label: String = label.chars().take(label_w).collect();
            lines.push(Line::from(vec![
                Span::raw(format!("  {label:>label_w$} │ ")),
                Span::styled(
                    keys.iter().cloned().collect::<Vec<_>>().join(", "),
                    Style::default().add_modifier(Modifier::ITALIC),
                ),
            ]));
        }
    }
    lines.push(Line::raw(""));
    lines.push(Line::from(Span::styled("In dialogs:", Style::default().add_modifier(Modifier::BOLD))));
    for (label, value) in [("Cancel", "Esc"), ("Confirm", "Enter"), ("Toggle / cycle", "Space"), ("Next field", "Tab")] {
        lines.push(Line::from(vec![
            Span::raw(format!("  {label:>label_w$} │ ")),
            Span::styled(value, Style::default().add_modifier(Modifier::ITALIC)),
        ]));
    }

    let p = Paragraph::new(lines).wrap(Wrap { trim: false });
    f.render_widget(block, area);
    f.render_widget(p, inner);
}

/// Compute a rectangle centered within `area` with a maximum size.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

/// Lines for a simple menu with a marker on the selected entry.
pub fn menu_text(options: &[&str], selected: usize) -> String {
    let mut text = String::new();
    for (idx, label) in options.iter().enumerate() {
        let marker = if idx == selected { "▶" } else { " " };
        text.push_str(&format!("{marker} {label}\n"));
    }
    text
}

/// Draw `body` in a bordered box over whatever is below it.
pub fn render_boxed(f: &mut Frame, rect: Rect, app: &AppState, title: &str, body: String) {
    let p = Paragraph::new(body).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(title.to_string())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    );
    f.render_widget(Clear, rect);
    f.render_widget(p, rect);
}

/// Render a generic informational modal dialog.
pub fn render_info_modal(f: &mut Frame, area: Rect, app: &AppState, state: &ModalState) {
    if let ModalState::Info { message } = state {
        let max_w = area.width.saturating_sub(6).max(30);
        let width = 50u16.min(max_w);
        let approx_lines = (message.len() as u16 / width.saturating_sub(4).max(10)).max(1);
        let max_h = area.height.saturating_sub(6).max(5);
        let height = (approx_lines + 4).min(max_h).max(5);
        let rect = centered_rect(width, height, area);
        render_boxed(f, rect, app, "Info", format!("{message}\n\nEnter / Esc to close"));
    }
}

/// Render the single-line text editor used by the modify dialogs.
pub fn render_text_input_modal(f: &mut Frame, area: Rect, app: &AppState, state: &ModalState) {
    if let ModalState::ModifyTextInput { field, value } = state {
        let rect = centered_rect(56, 7, area);
        render_boxed(f, rect, app, "Input", format!("{}:\n{value}_\n\nEnter: save  Esc: cancel", field.label()));
    }
}

/// Render the status filter menu.
pub fn render_filter_modal(f: &mut Frame, area: Rect, app: &AppState, state: &ModalState) {
    if let ModalState::FilterMenu { selected } = state {
        let rect = centered_rect(40, (UserStatus::ALL.len() + 3) as u16, area);
        let mut options = vec!["Show all"];
        options.extend(UserStatus::ALL.iter().map(|s| s.label()));
        render_boxed(f, rect, app, "Filter users by status", menu_text(&options, *selected));
    }
}

/// Render the help modal with usage information.
pub fn render_help_modal(f: &mut Frame, area: Rect, app: &AppState) {
    let width = 72u16.min(area.width.saturating_sub(4)).max(50);
    let height = 20u16.min(area.height.saturating_sub(4)).max(12);
    let rect = centered_rect(width, height, area);

    let key = |k: &'static str| Span::styled(k, Style::default().add_modifier(Modifier::ITALIC));
    let heading = |t: &'static str| Line::from(Span::styled(t, Style::default().add_modifier(Modifier::BOLD)));
    let tab_hint = match app.active_tab {
        ActiveTab::Users => "Users tab: Enter opens Modify / Delete for the selected user.",
        ActiveTab::Roles => "Roles tab: Enter opens Modify / Delete for the selected role.",
    };

    let lines: Vec<Line> = vec![
        heading("Help"),
        Line::raw(""),
        Line::from(vec![Span::raw("Navigation: "), key("Arrow keys / h j k l, PageUp / PageDown")]),
        Line::from(vec![Span::raw("Search: "), key("/"), Span::raw(" then type; Enter applies, Esc cancels")]),
        Line::from(vec![Span::raw("Switch tab: "), key("Tab")]),
        Line::from(vec![Span::raw("Focus the user's roles pane: "), key("Shift+Tab")]),
        Line::from(vec![Span::raw("Filter users by status: "), key("f")]),
        Line::from(vec![Span::raw("New user / role: "), key("n")]),
        Line::from(vec![Span::raw("Delete selection: "), key("Delete / d")]),
        Line::from(vec![Span::raw("Reload from backend: "), key("r")]),
        Line::from(vec![Span::raw("Keybindings pane: "), key("Shift+K")]),
        Line::from(vec![Span::raw("Quit: "), key("q")]),
        Line::raw(""),
        heading("Current tab"),
        Line::raw(tab_hint),
        Line::raw("Deleting a role that is still assigned to users is refused."),
        Line::raw(""),
        Line::from(vec![Span::raw("Close help: "), key("Esc / Enter")]),
    ];

    let p = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .title("Help")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    );
    f.render_widget(Clear, rect);
    f.render_widget(p, rect);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn centered_rect_fits_inside_area() {
		let area = Rect { x: 0, y: 0, width: 20, height: 10 };
		let r = centered_rect(40, 4, area);
		assert_eq!(r.width, 20);
		assert_eq!(r.y, 3);
	}

	#[test]
	fn menu_text_marks_selection() {
		assert_eq!(menu_text(&["A", "B"], 1), "  A\n▶ B\n");
	}
}
