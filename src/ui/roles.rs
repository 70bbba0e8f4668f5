use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};

use crate::app::{AppState, ModalState};
use crate::ui::components::{centered_rect, menu_text, render_boxed};

pub fn render_roles_table(f: &mut Frame, area: Rect, app: &mut AppState) {
    let body_height = area.height.saturating_sub(3) as usize;
    if body_height > 0 {
        app.rows_per_page = body_height;
    }

    let per_page = app.rows_per_page.max(1);
    let start = ((app.selected_role_index / per_page) * per_page).min(app.roles.len());
    let end = (start + per_page).min(app.roles.len());

    let rows = app.roles[start..end].iter().enumerate().map(|(i, r)| {
        let style = if start + i == app.selected_role_index {
            Style::default().fg(app.theme.highlight_fg).bg(app.theme.highlight_bg).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(app.theme.text)
        };
        Row::new(vec![
            Cell::from(r.id.clone()),
            Cell::from(r.name.clone()),
            Cell::from(r.permissions.join(", ")),
        ])
        .style(style)
    });

    let widths = [Constraint::Length(8), Constraint::Percentage(35), Constraint::Percentage(65)];
    let header = Row::new(vec!["ID", "NAME", "PERMISSIONS"])
        .style(Style::default().fg(app.theme.title).add_modifier(Modifier::BOLD));
    let title = if app.data.loading { "Roles (loading)" } else { "Roles" };

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

pub fn render_role_details(f: &mut Frame, area: Rect, app: &AppState) {
    let text = match app.selected_role() {
        Some(r) => format!(
            "ID: {}\nName: {}\nDescription: {}\nPermissions: {}\nAssigned to: {} user(s)",
            r.id,
            r.name,
            r.description,
            r.permissions.join(", "),
            app.data.role_members(&r.id).len()
        ),
        None if app.data.loading => "Loading roles...".to_string(),
        None => "No role selected".to_string(),
    };
    let p = Paragraph::new(text).style(Style::default().fg(app.theme.text)).block(
        Block::default()
            .title("Details")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    );
    f.render_widget(p, area);
}

pub fn render_role_members(f: &mut Frame, area: Rect, app: &AppState) {
    let rows: Vec<Row> = match app.selected_role() {
        Some(r) => app
            .data
            .role_members(&r.id)
            .into_iter()
            .map(|u| {
                Row::new(vec![
                    Cell::from(u.id.clone()),
                    Cell::from(u.name.clone()),
                    Cell::from(u.status.label()),
                ])
            })
            .collect(),
        None => Vec::new(),
    };
    let widths = [Constraint::Length(8), Constraint::Percentage(60), Constraint::Length(10)];
    let header = Row::new(vec!["ID", "USER", "STATUS"])
        .style(Style::default().fg(app.theme.title).add_modifier(Modifier::BOLD));
    let table = Table::new(rows, widths)
        .header(header)
        .style(Style::default().fg(app.theme.text))
        .block(
            Block::default()
                .title("Members")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .column_spacing(1);
    f.render_widget(table, area);
}

pub fn render_role_modal(f: &mut Frame, area: Rect, app: &AppState, state: &ModalState) {
    let role_name = app.selected_role().map(|r| r.name.clone()).unwrap_or_default();
    match state {
        ModalState::RolesActions { selected } => {
            let rect = centered_rect(30, 6, area);
            render_boxed(f, rect, app, "Role actions", menu_text(&["Modify", "Delete"], *selected));
        }
        ModalState::RoleModifyMenu { selected } => {
            let rect = centered_rect(36, 7, area);
            render_boxed(
                f,
                rect,
                app,
                &format!("Modify {role_name}"),
                menu_text(&["Name", "Description", "Permissions"], *selected),
            );
        }
        ModalState::RoleAddInput { selected, name, description, permissions } => {
            let rect = centered_rect(64, 9, area);
            let m = |i: usize| if *selected == i { "▶" } else { " " };
            let body = format!(
                "{} Name:        {name}\n{} Description: {description}\n{} Permissions: {permissions}\n{} Create\n\nPermissions are comma separated",
                m(0),
                m(1),
                m(2),
                m(3),
            );
            render_boxed(f, rect, app, "New role", body);
        }
        ModalState::RoleDeleteConfirm { selected } => {
            let members = app.selected_role().map(|r| app.data.role_members(&r.id).len()).unwrap_or(0);
            let rect = centered_rect(54, 7, area);
            let yes = if *selected == 0 { "[Yes]" } else { " Yes " };
            let no = if *selected == 1 { "[No]" } else { " No  " };
            let mut body = format!("Delete role '{role_name}'?\n");
            if members > 0 {
                body.push_str(&format!("Still assigned to {members} user(s); the backend will refuse.\n"));
            }
            body.push_str(&format!("\n  {yes}    {no}"));
            render_boxed(f, rect, app, "Confirm delete", body);
        }
        _ => {}
    }
}
