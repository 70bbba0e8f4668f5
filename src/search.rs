use crate::app::{AppState, InputMode};
use crate::model::{Role, User};

/// Commit the typed query to the list being searched and recompute both lists.
pub fn apply_search(app: &mut AppState) {
    match app.input_mode {
        InputMode::SearchUsers => {
            app.users_query = app.search_query.clone();
            app.selected_user_index = 0;
        }
        InputMode::SearchRoles => {
            app.roles_query = app.search_query.clone();
            app.selected_role_index = 0;
        }
        InputMode::Normal | InputMode::Modal => {}
    }
    apply_filters_and_search(app);
}

/// Rebuild `users` and `roles` from the full lists, the status filter and both queries.
pub fn apply_filters_and_search(app: &mut AppState) {
    let uq = app.users_query.to_lowercase();
    let users: Vec<User> = app
        .data
        .users
        .iter()
        .filter(|u| app.status_filter.is_none_or(|s| u.status == s))
        .filter(|u| uq.is_empty() || user_matches(app, u, &uq))
        .cloned()
        .collect();
    app.users = users;

    let rq = app.roles_query.to_lowercase();
    app.roles = app
        .data
        .roles
        .iter()
        .filter(|r| rq.is_empty() || role_matches(r, &rq))
        .cloned()
        .collect();

    app.selected_user_index = app.selected_user_index.min(app.users.len().saturating_sub(1));
    app.selected_role_index = app.selected_role_index.min(app.roles.len().saturating_sub(1));
}

fn user_matches(app: &AppState, u: &User, q: &str) -> bool {
    u.id.to_lowercase().contains(q)
        || u.name.to_lowercase().contains(q)
        || u.email.to_lowercase().contains(q)
        || u.status.label().to_lowercase().contains(q)
        || app.data.user_roles(u).iter().any(|r| r.name.to_lowercase().contains(q))
}

fn role_matches(r: &Role, q: &str) -> bool {
    r.id.to_lowercase().contains(q)
        || r.name.to_lowercase().contains(q)
        || r.description.to_lowercase().contains(q)
        || r.permissions.iter().any(|p| p.to_lowercase().contains(q))
}
