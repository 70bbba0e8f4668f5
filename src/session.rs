//! Session state: the canonical snapshot of users and roles one UI works from.
//!
//! The session is the only writer of its snapshot. Readers either take a copy
//! with [`Session::snapshot`] or subscribe to every published change.
//! Mutations call the backend first and reconcile the snapshot only from the
//! backend's answer. Concurrent mutations are not coordinated; the last one
//! to reconcile wins until the next [`Session::load`].

use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::Result;
use crate::model::{NewRole, NewUser, Role, RolePatch, User, UserPatch};
use crate::service::SharedService;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub roles: Vec<Role>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self { users: Vec::new(), roles: Vec::new(), loading: true, error: None }
    }
}

impl Snapshot {
    pub fn role(&self, id: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == id)
    }

    /// Roles of `user` that are present in the snapshot, in assignment order.
    pub fn user_roles(&self, user: &User) -> Vec<&Role> {
        user.roles.iter().filter_map(|id| self.role(id)).collect()
    }

    /// Users holding the role `role_id`.
    pub fn role_members(&self, role_id: &str) -> Vec<&User> {
        self.users.iter().filter(|u| u.has_role(role_id)).collect()
    }
}

pub struct Session {
    service: SharedService,
    state: watch::Sender<Snapshot>,
}

impl Session {
    /// A session over `service`. The snapshot starts empty and loading.
    pub fn new(service: SharedService) -> Self {
        let (state, _) = watch::channel(Snapshot::default());
        Self { service, state }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    /// Fetch users and roles concurrently. `loading` is cleared whatever the outcome;
    /// on failure the lists keep their previous contents.
    pub async fn load(&self) -> Result<()> {
        self.state.send_modify(|s| s.loading = true);
        let fetched = tokio::try_join!(self.service.list_users(), self.service.list_roles());
        match fetched {
            Ok((users, roles)) => {
                info!(users = users.len(), roles = roles.len(), "session: loaded");
                self.state.send_modify(|s| {
                    s.users = users;
                    s.roles = roles;
                    s.loading = false;
                });
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "session: load failed");
                self.state.send_modify(|s| {
                    s.error = Some(e.to_string());
                    s.loading = false;
                });
                Err(e)
            }
        }
    }

    pub async fn add_user(&self, user: NewUser) -> Result<User> {
        let added = self.record(self.service.add_user(user).await)?;
        self.state.send_modify(|s| s.users.push(added.clone()));
        Ok(added)
    }

    pub async fn update_user(&self, patch: impl Into<UserPatch>) -> Result<User> {
        let updated = self.record(self.service.update_user(patch.into()).await)?;
        self.state.send_modify(|s| {
            for u in s.users.iter_mut().filter(|u| u.id == updated.id) {
                *u = updated.clone();
            }
        });
        Ok(updated)
    }

    pub async fn remove_user(&self, id: &str) -> Result<()> {
        self.record(self.service.remove_user(id).await)?;
        self.state.send_modify(|s| s.users.retain(|u| u.id != id));
        Ok(())
    }

    pub async fn add_role(&self, role: NewRole) -> Result<Role> {
        let added = self.record(self.service.add_role(role).await)?;
        self.state.send_modify(|s| s.roles.push(added.clone()));
        Ok(added)
    }

    pub async fn update_role(&self, patch: impl Into<RolePatch>) -> Result<Role> {
        let updated = self.record(self.service.update_role(patch.into()).await)?;
        self.state.send_modify(|s| {
            for r in s.roles.iter_mut().filter(|r| r.id == updated.id) {
                *r = updated.clone();
            }
        });
        Ok(updated)
    }

    pub async fn remove_role(&self, id: &str) -> Result<()> {
        self.record(self.service.remove_role(id).await)?;
        self.state.send_modify(|s| s.roles.retain(|r| r.id != id));
        Ok(())
    }

    /// Publish the message of a failed call, then hand the outcome back unchanged.
    fn record<T>(&self, outcome: Result<T>) -> Result<T> {
        if let Err(e) = &outcome {
            warn!(error = %e, "session: operation failed");
            let msg = e.to_string();
            self.state.send_modify(|s| s.error = Some(msg));
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::backend::InMemoryBackend;
	use std::sync::Arc;

	#[tokio::test]
	async fn subscribers_see_reconciled_changes() {
		let session = Session::new(Arc::new(InMemoryBackend::new()));
		let mut rx = session.subscribe();
		session.load().await.unwrap();
		session.add_role(NewRole::new("Auditor")).await.unwrap();
		assert!(rx.has_changed().unwrap());
		let seen = rx.borrow_and_update().clone();
		assert_eq!(seen.roles.len(), 1);
		assert!(!seen.loading);
	}

	#[test]
	fn user_roles_follow_assignment_order_and_skip_unknown_ids() {
		let d = crate::backend::Directory::sample(crate::backend::IdStrategy::Sequential);
		let snap = Snapshot { users: d.users().to_vec(), roles: d.roles().to_vec(), loading: false, error: None };
		let mut user = snap.users[0].clone();
		user.roles = vec!["3".to_string(), "missing".to_string(), "1".to_string()];
		let names: Vec<&str> = snap.user_roles(&user).iter().map(|r| r.name.as_str()).collect();
		assert_eq!(names, ["Viewer", "Admin"]);

		let members: Vec<&str> = snap.role_members("3").iter().map(|u| u.id.as_str()).collect();
		assert_eq!(members, ["3", "4"]);
		assert!(snap.role_members("missing").is_empty());
	}

	#[tokio::test]
	async fn clear_error_resets_message() {
		let session = Session::new(Arc::new(InMemoryBackend::new()));
		assert!(session.remove_user("nope").await.is_err());
		assert!(session.snapshot().error.is_some());
		session.clear_error();
		assert!(session.snapshot().error.is_none());
	}
}
