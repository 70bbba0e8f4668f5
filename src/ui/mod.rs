pub mod components;
pub mod roles;
pub mod users;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::{ActiveTab, AppState, InputMode, ModalState};

pub fn render(f: &mut Frame, app: &mut AppState) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5), Constraint::Length(1)].as_ref())
        .split(f.area());
    let (main, side) = if app.show_keybinds {
        let split = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)].as_ref())
            .split(root[1]);
        (split[0], Some(split[1]))
    } else {
        (root[1], None)
    };
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(main);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(5)].as_ref())
        .split(body[1]);

    render_header(f, root[0], app);

    match app.active_tab {
        ActiveTab::Users => {
            users::render_users_table(f, body[0], app);
            users::render_user_details(f, right[0], app);
            users::render_user_roles(f, right[1], app);
        }
        ActiveTab::Roles => {
            roles::render_roles_table(f, body[0], app);
            roles::render_role_details(f, right[0], app);
            roles::render_role_members(f, right[1], app);
        }
    }

    if let Some(side) = side {
        components::render_keybinds_panel(f, side, app);
    }
    components::render_status_bar(f, root[2], app);

    if app.modal.is_some() {
        let area = f.area();
        render_modal(f, area, app);
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &AppState) {
    let tabs = match app.active_tab {
        ActiveTab::Users => "[Users]  Roles",
        ActiveTab::Roles => "Users  [Roles]",
    };
    let prompt = match app.input_mode {
        InputMode::SearchUsers => format!("  Search users: {}", app.search_query),
        InputMode::SearchRoles => format!("  Search roles: {}", app.search_query),
        InputMode::Normal | InputMode::Modal => String::new(),
    };
    let mut spans = vec![Span::raw(format!(
        "{tabs}{prompt}  users:{}  roles:{}",
        app.data.users.len(),
        app.data.roles.len()
    ))];
    if app.data.loading {
        spans.push(Span::styled("  Loading...", Style::default().fg(app.theme.muted)));
    }
    if let Some(err) = &app.data.error {
        spans.push(Span::styled(
            format!("  {err}"),
            Style::default().fg(app.theme.error_fg).add_modifier(Modifier::BOLD),
        ));
    }
    let p = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .title("rbac-admin")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .style(Style::default().fg(app.theme.header_fg).bg(app.theme.header_bg));
    f.render_widget(p, area);
}

fn render_modal(f: &mut Frame, area: Rect, app: &AppState) {
    let Some(state) = app.modal.as_ref() else { return };
    match state {
        ModalState::Actions { .. }
        | ModalState::ModifyMenu { .. }
        | ModalState::ChangeStatus { .. }
        | ModalState::AssignRoles { .. }
        | ModalState::DeleteConfirm { .. }
        | ModalState::UserAddInput { .. } => users::render_user_modal(f, area, app, state),
        ModalState::RolesActions { .. }
        | ModalState::RoleModifyMenu { .. }
        | ModalState::RoleAddInput { .. }
        | ModalState::RoleDeleteConfirm { .. } => roles::render_role_modal(f, area, app, state),
        ModalState::ModifyTextInput { .. } => components::render_text_input_modal(f, area, app, state),
        ModalState::FilterMenu { .. } => components::render_filter_modal(f, area, app, state),
        ModalState::Help => components::render_help_modal(f, area, app),
        ModalState::Info { .. } => components::render_info_modal(f, area, app, state),
    }
}
