use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};

use crate::app::{AppState, ModalState, UsersFocus};
use crate::model::UserStatus;
use crate::ui::components::{centered_rect, menu_text, render_boxed};

fn page_bounds(selected: usize, rows_per_page: usize, len: usize) -> (usize, usize) {
    let per_page = rows_per_page.max(1);
    let start = (selected / per_page) * per_page;
    (start.min(len), (start + per_page).min(len))
}

pub fn render_users_table(f: &mut Frame, area: Rect, app: &mut AppState) {
    let body_height = area.height.saturating_sub(3) as usize;
    if body_height > 0 {
        app.rows_per_page = body_height;
    }

    let (start, end) = page_bounds(app.selected_user_index, app.rows_per_page, app.users.len());
    let focused = app.users_focus == UsersFocus::UsersList;
    let rows = app.users[start..end].iter().enumerate().map(|(i, u)| {
        let style = if focused && start + i == app.selected_user_index {
            Style::default().fg(app.theme.highlight_fg).bg(app.theme.highlight_bg).add_modifier(Modifier::BOLD)
        } else if u.status == UserStatus::Locked {
            Style::default().fg(app.theme.muted)
        } else {
            Style::default().fg(app.theme.text)
        };
        Row::new(vec![
            Cell::from(u.id.clone()),
            Cell::from(u.name.clone()),
            Cell::from(u.email.clone()),
            Cell::from(u.status.label()),
        ])
        .style(style)
    });

    let widths = [
        Constraint::Length(8),
        Constraint::Percentage(30),
        Constraint::Percentage(45),
        Constraint::Length(10),
    ];
    let header = Row::new(vec!["ID", "NAME", "EMAIL", "STATUS"])
        .style(Style::default().fg(app.theme.title).add_modifier(Modifier::BOLD));
    let title = if app.data.loading { "Users (loading)" } else { "Users" };

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .column_spacing(1);

    f.render_widget(table, area);
}

pub fn render_user_details(f: &mut Frame, area: Rect, app: &AppState) {
    let text = match app.selected_user() {
        Some(u) => format!(
            "ID: {}\nName: {}\nEmail: {}\nStatus: {}\nRoles: {}",
            u.id,
            u.name,
            u.email,
            u.status.label(),
            u.roles.len()
        ),
        None if app.data.loading => "Loading users...".to_string(),
        None => "No user selected".to_string(),
    };
    let p = Paragraph::new(text).style(Style::default().fg(app.theme.text)).block(
        Block::default()
            .title("Details")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    );
    f.render_widget(p, area);
}

/// The selected user's roles. Shift+Tab moves focus here.
pub fn render_user_roles(f: &mut Frame, area: Rect, app: &mut AppState) {
    let count = app.selected_user().map(|u| app.data.user_roles(u).len()).unwrap_or(0);
    app.selected_user_role_index = app.selected_user_role_index.min(count.saturating_sub(1));

    let focused = app.users_focus == UsersFocus::RolesOf;
    let rows: Vec<Row> = match app.selected_user() {
        Some(u) => app
            .data
            .user_roles(u)
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                let style = if focused && i == app.selected_user_role_index {
                    Style::default().fg(app.theme.highlight_fg).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(app.theme.text)
                };
                Row::new(vec![
                    Cell::from(r.id.clone()),
                    Cell::from(r.name.clone()),
                    Cell::from(r.permissions.join(", ")),
                ])
                .style(style)
            })
            .collect(),
        None => Vec::new(),
    };

    let widths = [Constraint::Length(8), Constraint::Percentage(40), Constraint::Percentage(60)];
    let header = Row::new(vec!["ID", "ROLE", "PERMISSIONS"])
        .style(Style::default().fg(app.theme.title).add_modifier(Modifier::BOLD));
    let border = if focused { app.theme.highlight_fg } else { app.theme.border };
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title("Roles")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        )
        .column_spacing(1);
    f.render_widget(table, area);
}

pub fn render_user_modal(f: &mut Frame, area: Rect, app: &AppState, state: &ModalState) {
    let user_name = app.selected_user().map(|u| u.name.clone()).unwrap_or_default();
    match state {
        ModalState::Actions { selected } => {
            let rect = centered_rect(30, 6, area);
            render_boxed(f, rect, app, "Actions", menu_text(&["Modify", "Delete"], *selected));
        }
        ModalState::ModifyMenu { selected } => {
            let rect = centered_rect(36, 8, area);
            render_boxed(
                f,
                rect,
                app,
                &format!("Modify {user_name}"),
                menu_text(&["Name", "Email", "Status", "Roles"], *selected),
            );
        }
        ModalState::ChangeStatus { selected } => {
            let rect = centered_rect(32, (UserStatus::ALL.len() + 2) as u16, area);
            let options: Vec<&str> = UserStatus::ALL.iter().map(|s| s.label()).collect();
            render_boxed(f, rect, app, "Status", menu_text(&options, *selected));
        }
        ModalState::AssignRoles { selected, checked } => {
            let width = area.width.saturating_sub(10).clamp(40, 60);
            let height = area.height.saturating_sub(6).clamp(8, 20);
            let rect = centered_rect(width, height, area);
            let visible = rect.height.saturating_sub(4) as usize;
            let (start, end) = page_bounds(*selected, visible, app.data.roles.len());
            let mut body = String::new();
            for (i, r) in app.data.roles[start..end].iter().enumerate() {
                let idx = start + i;
                let marker = if idx == *selected { "▶" } else { " " };
                let mark = if checked.contains(&idx) { "[x]" } else { "[ ]" };
                body.push_str(&format!("{marker} {mark} {} ({})\n", r.name, r.id));
            }
            if app.data.roles.is_empty() {
                body.push_str("No roles defined\n");
            }
            body.push_str("\nSpace: toggle  Enter: save");
            render_boxed(f, rect, app, &format!("Roles of {user_name}"), body);
        }
        ModalState::DeleteConfirm { selected } => {
            let rect = centered_rect(50, 6, area);
            let yes = if *selected == 0 { "[Yes]" } else { " Yes " };
            let no = if *selected == 1 { "[No]" } else { " No  " };
            let body = format!("Delete user '{user_name}'?\n\n  {yes}    {no}");
            render_boxed(f, rect, app, "Confirm delete", body);
        }
        ModalState::UserAddInput { selected, name, email, status } => {
            let rect = centered_rect(60, 9, area);
            let m = |i: usize| if *selected == i { "▶" } else { " " };
            let body = format!(
                "{} Name:   {name}\n{} Email:  {email}\n{} Status: {} (Space to change)\n{} Create\n\nTab: next field  Esc: cancel",
                m(0),
                m(1),
                m(2),
                status.label(),
                m(3),
            );
            render_boxed(f, rect, app, "New user", body);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn page_bounds_follow_selection() {
		assert_eq!(page_bounds(0, 10, 25), (0, 10));
		assert_eq!(page_bounds(12, 10, 25), (10, 20));
		assert_eq!(page_bounds(24, 10, 25), (20, 25));
		assert_eq!(page_bounds(0, 0, 0), (0, 0));
	}
}
