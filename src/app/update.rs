use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::time::Duration;

use crate::app::keymap::KeyAction;
use crate::app::{ActiveTab, AppState, InputMode, ModalState, ModifyField, PendingAction, UsersFocus};
use crate::model::{parse_permission_list, NewRole, NewUser, RolePatch, UserPatch, UserStatus};
use crate::search::{apply_filters_and_search, apply_search};
use crate::session::Session;
use crate::ui;

/// What the loop should do after a key press.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    Quit,
    Run(PendingAction),
}

const USER_ACTIONS: usize = 2; // Modify, Delete
const USER_MODIFY_OPTIONS: usize = 4; // Name, Email, Status, Roles
const ROLE_ACTIONS: usize = 2;
const ROLE_MODIFY_OPTIONS: usize = 3; // Name, Description, Permissions
const FILTER_OPTIONS: usize = 1 + UserStatus::ALL.len(); // All + each status
const ADD_USER_FIELDS: usize = 4; // name, email, status, submit
const ADD_ROLE_FIELDS: usize = 4; // name, description, permissions, submit

pub fn run_app(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    session: &Session,
    rt: &tokio::runtime::Runtime,
    mut app: AppState,
) -> Result<()> {
    app.sync_from(&session.snapshot());
    terminal.draw(|f| ui::render(f, &mut app)).context("draw")?;
    rt.block_on(perform(&mut app, session, PendingAction::Reload));

    loop {
        terminal.draw(|f| ui::render(f, &mut app)).context("draw")?;

        if !event::poll(Duration::from_millis(100)).context("poll terminal events")? {
            continue;
        }
        if let Event::Key(key) = event::read().context("read terminal event")? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match handle_key(&mut app, key) {
                Step::Continue => {}
                Step::Quit => break,
                Step::Run(pending) => rt.block_on(perform(&mut app, session, pending)),
            }
        }
    }

    tracing::info!(uptime_secs = app.started_at.elapsed().as_secs(), "tui: exit");
    Ok(())
}

/// Apply one key press to the state. Anything that needs the backend comes back as `Step::Run`.
pub fn handle_key(app: &mut AppState, key: KeyEvent) -> Step {
    match app.input_mode {
        InputMode::Normal => handle_normal_key(app, key),
        InputMode::Modal => handle_modal_key(app, key.code),
        InputMode::SearchUsers | InputMode::SearchRoles => {
            match key.code {
                KeyCode::Enter => {
                    apply_search(app);
                    app.input_mode = InputMode::Normal;
                }
                KeyCode::Esc => {
                    app.input_mode = InputMode::Normal;
                    app.search_query.clear();
                }
                KeyCode::Backspace => {
                    app.search_query.pop();
                }
                KeyCode::Char(c) => app.search_query.push(c),
                _ => {}
            }
            Step::Continue
        }
    }
}

fn handle_normal_key(app: &mut AppState, key: KeyEvent) -> Step {
    let Some(action) = app.keymap.resolve(&key) else {
        return Step::Continue;
    };
    match action {
        KeyAction::Quit => return Step::Quit,
        KeyAction::Reload => return Step::Run(PendingAction::Reload),
        KeyAction::Ignore => {}
        KeyAction::StartSearch => {
            let (mode, current) = match app.active_tab {
                ActiveTab::Users => (InputMode::SearchUsers, app.users_query.clone()),
                ActiveTab::Roles => (InputMode::SearchRoles, app.roles_query.clone()),
            };
            app.search_query = current;
            app.input_mode = mode;
        }
        KeyAction::SwitchTab => {
            app.active_tab = match app.active_tab {
                ActiveTab::Users => ActiveTab::Roles,
                ActiveTab::Roles => ActiveTab::Users,
            };
            app.users_focus = UsersFocus::UsersList;
        }
        KeyAction::ToggleFocus => {
            if app.active_tab == ActiveTab::Users {
                app.users_focus = match app.users_focus {
                    UsersFocus::UsersList => UsersFocus::RolesOf,
                    UsersFocus::RolesOf => UsersFocus::UsersList,
                };
                app.selected_user_role_index = 0;
            }
        }
        KeyAction::ToggleKeybindsPane => app.show_keybinds = !app.show_keybinds,
        KeyAction::OpenHelp => open_modal(app, ModalState::Help),
        KeyAction::OpenFilterMenu => {
            if app.active_tab == ActiveTab::Users {
                let selected = match app.status_filter {
                    None => 0,
                    Some(s) => 1 + UserStatus::ALL.iter().position(|x| *x == s).unwrap_or(0),
                };
                open_modal(app, ModalState::FilterMenu { selected });
            }
        }
        KeyAction::New => {
            let modal = match app.active_tab {
                ActiveTab::Users => ModalState::UserAddInput {
                    selected: 0,
                    name: String::new(),
                    email: String::new(),
                    status: UserStatus::Active,
                },
                ActiveTab::Roles => ModalState::RoleAddInput {
                    selected: 0,
                    name: String::new(),
                    description: String::new(),
                    permissions: String::new(),
                },
            };
            open_modal(app, modal);
        }
        KeyAction::DeleteSelection => match app.active_tab {
            ActiveTab::Users if app.selected_user().is_some() => {
                open_modal(app, ModalState::DeleteConfirm { selected: 1 })
            }
            ActiveTab::Roles if app.selected_role().is_some() => {
                open_modal(app, ModalState::RoleDeleteConfirm { selected: 1 })
            }
            _ => {}
        },
        KeyAction::EnterAction => match (app.active_tab, app.users_focus) {
            (ActiveTab::Users, UsersFocus::UsersList) => {
                if app.selected_user().is_some() {
                    open_modal(app, ModalState::Actions { selected: 0 });
                }
            }
            (ActiveTab::Users, UsersFocus::RolesOf) => jump_to_user_role(app),
            (ActiveTab::Roles, _) => {
                if app.selected_role().is_some() {
                    open_modal(app, ModalState::RolesActions { selected: 0 });
                }
            }
        },
        KeyAction::MoveUp => move_selection(app, -1),
        KeyAction::MoveDown => move_selection(app, 1),
        KeyAction::PageUp => move_selection(app, -(app.rows_per_page.max(1) as isize)),
        KeyAction::PageDown => move_selection(app, app.rows_per_page.max(1) as isize),
    }
    Step::Continue
}

/// Select the role highlighted in the user's roles pane on the Roles tab.
fn jump_to_user_role(app: &mut AppState) {
    let target = app
        .selected_user()
        .and_then(|u| app.data.user_roles(u).get(app.selected_user_role_index).map(|r| r.id.clone()));
    let Some(role_id) = target else { return };
    if !app.roles.iter().any(|r| r.id == role_id) {
        app.roles_query.clear();
        apply_filters_and_search(app);
    }
    if let Some(idx) = app.roles.iter().position(|r| r.id == role_id) {
        app.selected_role_index = idx;
        app.active_tab = ActiveTab::Roles;
        app.users_focus = UsersFocus::UsersList;
    }
}

fn move_selection(app: &mut AppState, delta: isize) {
    let (index, len) = match (app.active_tab, app.users_focus) {
        (ActiveTab::Users, UsersFocus::UsersList) => (&mut app.selected_user_index, app.users.len()),
        (ActiveTab::Users, UsersFocus::RolesOf) => {
            let len = app.selected_user().map(|u| app.data.user_roles(u).len()).unwrap_or(0);
            (&mut app.selected_user_role_index, len)
        }
        (ActiveTab::Roles, _) => (&mut app.selected_role_index, app.roles.len()),
    };
    *index = step_index(*index, delta, len);
}

fn step_index(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    current.saturating_add_signed(delta).min(len - 1)
}

fn open_modal(app: &mut AppState, modal: ModalState) {
    app.modal = Some(modal);
    app.input_mode = InputMode::Modal;
}

fn close_modal(app: &mut AppState) {
    app.modal = None;
    app.input_mode = InputMode::Normal;
}

fn info(app: &mut AppState, message: impl Into<String>) {
    open_modal(app, ModalState::Info { message: message.into() });
}

/// Up/Down over a menu of `len` entries.
fn menu_nav(selected: &mut usize, code: KeyCode, len: usize) {
    match code {
        KeyCode::Up | KeyCode::Char('k') => *selected = selected.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => {
            if *selected + 1 < len {
                *selected += 1;
            }
        }
        _ => {}
    }
}

/// Up/Down/Tab over form fields. Letters are text input here, so no vim keys.
fn field_nav(selected: &mut usize, code: KeyCode, len: usize) {
    match code {
        KeyCode::Up | KeyCode::BackTab => *selected = selected.saturating_sub(1),
        KeyCode::Down | KeyCode::Tab => {
            if *selected + 1 < len {
                *selected += 1;
            }
        }
        _ => {}
    }
}

fn handle_modal_key(app: &mut AppState, code: KeyCode) -> Step {
    let Some(modal) = app.modal.as_mut() else {
        app.input_mode = InputMode::Normal;
        return Step::Continue;
    };
    let is_role_delete = matches!(modal, ModalState::RoleDeleteConfirm { .. });
    if code == KeyCode::Esc {
        let had_info = matches!(modal, ModalState::Info { .. });
        close_modal(app);
        return dismiss_error(app, had_info);
    }

    match modal {
        ModalState::Actions { selected } => {
            menu_nav(selected, code, USER_ACTIONS);
            if code == KeyCode::Enter {
                let next = match *selected {
                    0 => ModalState::ModifyMenu { selected: 0 },
                    _ => ModalState::DeleteConfirm { selected: 1 },
                };
                open_modal(app, next);
            }
        }
        ModalState::ModifyMenu { selected } => {
            menu_nav(selected, code, USER_MODIFY_OPTIONS);
            if code == KeyCode::Enter {
                let choice = *selected;
                let Some(user) = app.selected_user().cloned() else {
                    close_modal(app);
                    return Step::Continue;
                };
                let next = match choice {
                    0 => ModalState::ModifyTextInput { field: ModifyField::UserName, value: user.name },
                    1 => ModalState::ModifyTextInput { field: ModifyField::Email, value: user.email },
                    2 => ModalState::ChangeStatus {
                        selected: UserStatus::ALL.iter().position(|s| *s == user.status).unwrap_or(0),
                    },
                    _ => ModalState::AssignRoles {
                        selected: 0,
                        checked: app
                            .data
                            .roles
                            .iter()
                            .enumerate()
                            .filter(|(_, r)| user.has_role(&r.id))
                            .map(|(i, _)| i)
                            .collect(),
                    },
                };
                open_modal(app, next);
            }
        }
        ModalState::ModifyTextInput { field, value } => match code {
            KeyCode::Backspace => {
                value.pop();
            }
            KeyCode::Char(c) => value.push(c),
            KeyCode::Enter => {
                let field = *field;
                let value = value.trim().to_string();
                return submit_text_field(app, field, value);
            }
            _ => {}
        },
        ModalState::ChangeStatus { selected } => {
            menu_nav(selected, code, UserStatus::ALL.len());
            if code == KeyCode::Enter {
                let status = UserStatus::ALL[(*selected).min(UserStatus::ALL.len() - 1)];
                if let Some(user) = app.selected_user() {
                    return Step::Run(PendingAction::UpdateUser(UserPatch::new(user.id.clone()).status(status)));
                }
                close_modal(app);
            }
        }
        ModalState::AssignRoles { selected, checked } => {
            menu_nav(selected, code, app.data.roles.len());
            match code {
                KeyCode::Char(' ') => {
                    let idx = *selected;
                    if let Some(pos) = checked.iter().position(|i| *i == idx) {
                        checked.remove(pos);
                    } else if idx < app.data.roles.len() {
                        checked.push(idx);
                    }
                }
                KeyCode::Enter => {
                    let mut picked = checked.clone();
                    picked.sort_unstable();
                    let ids: Vec<String> = picked
                        .into_iter()
                        .filter_map(|i| app.data.roles.get(i).map(|r| r.id.clone()))
                        .collect();
                    if let Some(user) = app.selected_user() {
                        return Step::Run(PendingAction::UpdateUser(UserPatch::new(user.id.clone()).roles(ids)));
                    }
                    close_modal(app);
                }
                _ => {}
            }
        }
        ModalState::DeleteConfirm { selected } | ModalState::RoleDeleteConfirm { selected } => {
            match code {
                KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down | KeyCode::Tab => {
                    *selected = 1 - (*selected).min(1);
                }
                KeyCode::Enter => {
                    let confirmed = *selected == 0;
                    close_modal(app);
                    if !confirmed {
                        return Step::Continue;
                    }
                    if is_role_delete {
                        if let Some(r) = app.selected_role() {
                            return Step::Run(PendingAction::DeleteRole { id: r.id.clone(), name: r.name.clone() });
                        }
                    } else if let Some(u) = app.selected_user() {
                        return Step::Run(PendingAction::DeleteUser { id: u.id.clone(), name: u.name.clone() });
                    }
                }
                _ => {}
            }
        }
        ModalState::UserAddInput { selected, name, email, status } => {
            field_nav(selected, code, ADD_USER_FIELDS);
            match (code, *selected) {
                (KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right, 2) => *status = status.next(),
                (KeyCode::Char(c), 0) => name.push(c),
                (KeyCode::Char(c), 1) => email.push(c),
                (KeyCode::Backspace, 0) => {
                    name.pop();
                }
                (KeyCode::Backspace, 1) => {
                    email.pop();
                }
                (KeyCode::Enter, s) if s + 1 < ADD_USER_FIELDS => *selected += 1,
                (KeyCode::Enter, _) => {
                    let name = name.trim().to_string();
                    let email = email.trim().to_string();
                    if name.is_empty() {
                        *selected = 0;
                        return Step::Continue;
                    }
                    if !email.contains('@') {
                        info(app, "Email must contain '@'");
                        return Step::Continue;
                    }
                    let user = NewUser::new(name, email).with_status(*status).with_roles(Vec::<String>::new());
                    return Step::Run(PendingAction::CreateUser(user));
                }
                _ => {}
            }
        }
        ModalState::RolesActions { selected } => {
            menu_nav(selected, code, ROLE_ACTIONS);
            if code == KeyCode::Enter {
                let next = match *selected {
                    0 => ModalState::RoleModifyMenu { selected: 0 },
                    _ => ModalState::RoleDeleteConfirm { selected: 1 },
                };
                open_modal(app, next);
            }
        }
        ModalState::RoleModifyMenu { selected } => {
            menu_nav(selected, code, ROLE_MODIFY_OPTIONS);
            if code == KeyCode::Enter {
                let choice = *selected;
                let Some(role) = app.selected_role().cloned() else {
                    close_modal(app);
                    return Step::Continue;
                };
                let next = match choice {
                    0 => ModalState::ModifyTextInput { field: ModifyField::RoleName, value: role.name },
                    1 => ModalState::ModifyTextInput { field: ModifyField::RoleDescription, value: role.description },
                    _ => ModalState::ModifyTextInput {
                        field: ModifyField::RolePermissions,
                        value: role.permissions.join(", "),
                    },
                };
                open_modal(app, next);
            }
        }
        ModalState::RoleAddInput { selected, name, description, permissions } => {
            field_nav(selected, code, ADD_ROLE_FIELDS);
            match code {
                KeyCode::Char(c) => {
                    if let Some(buf) = role_form_field(*selected, name, description, permissions) {
                        buf.push(c);
                    }
                }
                KeyCode::Backspace => {
                    if let Some(buf) = role_form_field(*selected, name, description, permissions) {
                        buf.pop();
                    }
                }
                KeyCode::Enter if *selected + 1 < ADD_ROLE_FIELDS => *selected += 1,
                KeyCode::Enter => {
                    let name = name.trim().to_string();
                    if name.is_empty() {
                        *selected = 0;
                        return Step::Continue;
                    }
                    let role = NewRole::new(name)
                        .with_description(description.trim())
                        .with_permissions(parse_permission_list(permissions));
                    return Step::Run(PendingAction::CreateRole(role));
                }
                _ => {}
            }
        }
        ModalState::FilterMenu { selected } => {
            menu_nav(selected, code, FILTER_OPTIONS);
            if code == KeyCode::Enter {
                app.status_filter = selected.checked_sub(1).and_then(|i| UserStatus::ALL.get(i).copied());
                app.selected_user_index = 0;
                apply_filters_and_search(app);
                close_modal(app);
            }
        }
        ModalState::Help => {
            if matches!(code, KeyCode::Enter | KeyCode::Char('?') | KeyCode::Char('q')) {
                close_modal(app);
            }
        }
        ModalState::Info { .. } => {
            if code == KeyCode::Enter {
                close_modal(app);
                return dismiss_error(app, true);
            }
        }
    }
    Step::Continue
}

fn role_form_field<'a>(
    selected: usize,
    name: &'a mut String,
    description: &'a mut String,
    permissions: &'a mut String,
) -> Option<&'a mut String> {
    match selected {
        0 => Some(name),
        1 => Some(description),
        2 => Some(permissions),
        _ => None,
    }
}

/// Closing an info dialog also acknowledges the session's error message.
fn dismiss_error(app: &AppState, was_info: bool) -> Step {
    if was_info && app.data.error.is_some() {
        Step::Run(PendingAction::ClearError)
    } else {
        Step::Continue
    }
}

fn submit_text_field(app: &mut AppState, field: ModifyField, value: String) -> Step {
    match field {
        ModifyField::UserName | ModifyField::Email => {
            let Some(user) = app.selected_user() else {
                close_modal(app);
                return Step::Continue;
            };
            let patch = UserPatch::new(user.id.clone());
            let patch = match field {
                ModifyField::UserName if value.is_empty() => {
                    info(app, "Name must not be empty");
                    return Step::Continue;
                }
                ModifyField::Email if !value.contains('@') => {
                    info(app, "Email must contain '@'");
                    return Step::Continue;
                }
                ModifyField::UserName => patch.name(value),
                _ => patch.email(value),
            };
            Step::Run(PendingAction::UpdateUser(patch))
        }
        ModifyField::RoleName | ModifyField::RoleDescription | ModifyField::RolePermissions => {
            let Some(role) = app.selected_role() else {
                close_modal(app);
                return Step::Continue;
            };
            let patch = RolePatch::new(role.id.clone());
            let patch = match field {
                ModifyField::RoleName if value.is_empty() => {
                    info(app, "Role name must not be empty");
                    return Step::Continue;
                }
                ModifyField::RoleName => patch.name(value),
                ModifyField::RoleDescription => patch.description(value),
                _ => patch.permissions(parse_permission_list(&value)),
            };
            Step::Run(PendingAction::UpdateRole(patch))
        }
    }
}

/// Run `pending` against the session, then redraw from the session's snapshot.
/// Failures end up in an info dialog carrying the session's error message.
pub async fn perform(app: &mut AppState, session: &Session, pending: PendingAction) {
    let outcome = match pending {
        PendingAction::Reload => session.load().await.map(|_| None),
        PendingAction::ClearError => {
            session.clear_error();
            Ok(None)
        }
        PendingAction::CreateUser(user) => session.add_user(user).await.map(|u| {
            app.users_query.clear();
            app.status_filter = None;
            Some((format!("Created user '{}' (id {})", u.name, u.id), Some(u.id)))
        }),
        PendingAction::UpdateUser(patch) => session
            .update_user(patch)
            .await
            .map(|u| Some((format!("Updated user '{}'", u.name), None))),
        PendingAction::DeleteUser { id, name } => session
            .remove_user(&id)
            .await
            .map(|_| Some((format!("Deleted user '{}'", name), None))),
        PendingAction::CreateRole(role) => session.add_role(role).await.map(|r| {
            app.roles_query.clear();
            Some((format!("Created role '{}' (id {})", r.name, r.id), Some(r.id)))
        }),
        PendingAction::UpdateRole(patch) => session
            .update_role(patch)
            .await
            .map(|r| Some((format!("Updated role '{}'", r.name), None))),
        PendingAction::DeleteRole { id, name } => session
            .remove_role(&id)
            .await
            .map(|_| Some((format!("Deleted role '{}'", name), None))),
    };

    app.sync_from(&session.snapshot());
    match outcome {
        Ok(None) => close_modal(app),
        Ok(Some((message, created))) => {
            if let Some(id) = created {
                select_by_id(app, &id);
            }
            info(app, message);
        }
        Err(e) => info(app, format!("Error: {e}")),
    }
}

fn select_by_id(app: &mut AppState, id: &str) {
    match app.active_tab {
        ActiveTab::Users => {
            if let Some(idx) = app.users.iter().position(|u| u.id == id) {
                app.selected_user_index = idx;
            }
        }
        ActiveTab::Roles => {
            if let Some(idx) = app.roles.iter().position(|r| r.id == id) {
                app.selected_role_index = idx;
            }
        }
    }
}
