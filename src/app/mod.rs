//! Application state types and entry glue.
//!
//! `AppState` is what the UI draws: a copy of the session snapshot (`data`),
//! the lists narrowed by search and status filter, plus selection, modal and
//! input state. It is refreshed from the session after every operation with
//! [`AppState::sync_from`].
//!
pub mod keymap;
pub mod theme;
pub mod update;

use std::time::Instant;

use crate::model::{NewRole, NewUser, Role, RolePatch, User, UserPatch, UserStatus};
use crate::session::Snapshot;

pub use theme::Theme;

/// Top-level active tab in the UI.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ActiveTab {
    Users,
    Roles,
}

/// Which subsection is focused on the Users screen.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UsersFocus {
    UsersList,
    RolesOf,
}

/// Current input mode for key handling.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    SearchUsers,
    SearchRoles,
    Modal,
}

/// Modal dialog states for user and role actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModalState {
    /// Modify / Delete for the selected user.
    Actions { selected: usize },
    ModifyMenu { selected: usize },
    ModifyTextInput { field: ModifyField, value: String },
    ChangeStatus { selected: usize },
    /// Multi-select over all roles; `checked` holds indices into `data.roles`.
    AssignRoles { selected: usize, checked: Vec<usize> },
    DeleteConfirm { selected: usize },
    UserAddInput { selected: usize, name: String, email: String, status: UserStatus },
    /// Modify / Delete for the selected role.
    RolesActions { selected: usize },
    RoleModifyMenu { selected: usize },
    RoleAddInput { selected: usize, name: String, description: String, permissions: String },
    RoleDeleteConfirm { selected: usize },
    FilterMenu { selected: usize },
    Help,
    Info { message: String },
}

/// Field selectors for text input dialogs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModifyField {
    UserName,
    Email,
    RoleName,
    RoleDescription,
    RolePermissions,
}

impl ModifyField {
    pub fn label(self) -> &'static str {
        match self {
            ModifyField::UserName => "Name",
            ModifyField::Email => "Email",
            ModifyField::RoleName => "Role name",
            ModifyField::RoleDescription => "Description",
            ModifyField::RolePermissions => "Permissions (comma separated)",
        }
    }
}

/// Operations handed from key handling to the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingAction {
    Reload,
    /// Acknowledge the error shown in the header.
    ClearError,
    CreateUser(NewUser),
    UpdateUser(UserPatch),
    DeleteUser { id: String, name: String },
    CreateRole(NewRole),
    UpdateRole(RolePatch),
    DeleteRole { id: String, name: String },
}

pub struct AppState {
    pub started_at: Instant,
    /// Last snapshot taken from the session, unfiltered.
    pub data: Snapshot,
    pub users: Vec<User>,
    pub roles: Vec<Role>,
    pub active_tab: ActiveTab,
    pub selected_user_index: usize,
    pub selected_role_index: usize,
    pub selected_user_role_index: usize,
    pub rows_per_page: usize,
    pub input_mode: InputMode,
    /// Text being typed in search mode.
    pub search_query: String,
    pub users_query: String,
    pub roles_query: String,
    pub status_filter: Option<UserStatus>,
    pub theme: Theme,
    pub keymap: keymap::Keymap,
    pub modal: Option<ModalState>,
    pub users_focus: UsersFocus,
    pub show_keybinds: bool,
}

impl AppState {
    /// Empty state, marked loading until the first snapshot arrives.
    pub fn new(theme: Theme, keymap: keymap::Keymap) -> Self {
        Self {
            started_at: Instant::now(),
            data: Snapshot::default(),
            users: Vec::new(),
            roles: Vec::new(),
            active_tab: ActiveTab::Users,
            selected_user_index: 0,
            selected_role_index: 0,
            selected_user_role_index: 0,
            rows_per_page: 10,
            input_mode: InputMode::Normal,
            search_query: String::new(),
            users_query: String::new(),
            roles_query: String::new(),
            status_filter: None,
            theme,
            keymap,
            modal: None,
            users_focus: UsersFocus::UsersList,
            show_keybinds: false,
        }
    }

    /// Take over the session snapshot, then re-apply search and filter.
    pub fn sync_from(&mut self, snap: &Snapshot) {
        self.data = snap.clone();
        crate::search::apply_filters_and_search(self);
    }

    pub fn selected_user(&self) -> Option<&User> {
        self.users.get(self.selected_user_index)
    }

    pub fn selected_role(&self) -> Option<&Role> {
        self.roles.get(self.selected_role_index)
    }
}

/// Re-export the application event loop entry function.
pub use update::run_app as run;
