//! Synchronous user/role store shared by the in-memory backend and the
//! bridge backend's mock mode.
//!
//! Each method is one complete operation: it either applies fully or leaves
//! the store untouched.

use crate::error::{Entity, Result, ServiceError};
use crate::model::{slugify, NewRole, NewUser, Role, RolePatch, User, UserPatch, UserStatus};

/// How a store assigns ids to new records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum IdStrategy {
    /// Decimal counter per entity kind, starting at "1". Never reuses a value.
    #[default]
    Sequential,
    /// UUID v4.
    Random,
    /// Roles get an id derived from the name and a collision is rejected.
    /// User names are not unique, so users get a UUID v4.
    Slug,
}

#[derive(Clone, Debug, Default)]
pub struct Directory {
    users: Vec<User>,
    roles: Vec<Role>,
    ids: IdStrategy,
    user_seq: u64,
    role_seq: u64,
}

impl Directory {
    pub fn new(ids: IdStrategy) -> Self {
        Self { ids, ..Self::default() }
    }

    /// A store holding the fixed sample roles (Admin, Editor, Viewer) and five
    /// sample users referencing them.
    pub fn sample(ids: IdStrategy) -> Self {
        let role = |id: &str, name: &str, description: &str, perms: &[&str]| Role {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            permissions: perms.iter().map(|p| p.to_string()).collect(),
        };
        let user = |id: &str, name: &str, email: &str, status: UserStatus, roles: &[&str]| User {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            status,
        };
        let roles = vec![
            role("1", "Admin", "Administrator with full access", &["read", "write", "delete"]),
            role("2", "Editor", "Can edit content", &["read", "write"]),
            role("3", "Viewer", "Read-only access", &["read"]),
        ];
        let users = vec![
            user("1", "John Doe", "john.doe@example.com", UserStatus::Active, &["1"]),
            user("2", "Jane Smith", "jane.smith@example.com", UserStatus::Active, &["2"]),
            user("3", "Bob Johnson", "bob.johnson@example.com", UserStatus::Locked, &["3"]),
            user("4", "Alice Williams", "alice.williams@example.com", UserStatus::SignedOn, &["2", "3"]),
            user("5", "Charlie Brown", "charlie.brown@example.com", UserStatus::Active, &["1", "2"]),
        ];
        Self {
            user_seq: users.len() as u64,
            role_seq: roles.len() as u64,
            users,
            roles,
            ids,
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn add_user(&mut self, user: NewUser) -> Result<User> {
        let name = user.name.clone().unwrap_or_default();
        let id = self.next_id(Entity::User, &name)?;
        let stored = user.into_user(id);
        self.users.push(stored.clone());
        Ok(stored)
    }

    pub fn update_user(&mut self, patch: UserPatch) -> Result<User> {
        let Some(existing) = self.users.iter_mut().find(|u| u.id == patch.id) else {
            return Err(ServiceError::not_found(Entity::User, patch.id));
        };
        existing.apply(patch);
        Ok(existing.clone())
    }

    pub fn remove_user(&mut self, id: &str) -> Result<()> {
        let before = self.users.len();
        self.users.retain(|u| u.id != id);
        if self.users.len() == before {
            return Err(ServiceError::not_found(Entity::User, id));
        }
        Ok(())
    }

    pub fn add_role(&mut self, role: NewRole) -> Result<Role> {
        let name = role.name.clone().unwrap_or_default();
        let id = self.next_id(Entity::Role, &name)?;
        let stored = role.into_role(id);
        self.roles.push(stored.clone());
        Ok(stored)
    }

    pub fn update_role(&mut self, patch: RolePatch) -> Result<Role> {
        let Some(existing) = self.roles.iter_mut().find(|r| r.id == patch.id) else {
            return Err(ServiceError::not_found(Entity::Role, patch.id));
        };
        existing.apply(patch);
        Ok(existing.clone())
    }

    pub fn remove_role(&mut self, id: &str) -> Result<()> {
        let Some(pos) = self.roles.iter().position(|r| r.id == id) else {
            return Err(ServiceError::not_found(Entity::Role, id));
        };
        let holders = self.users.iter().filter(|u| u.has_role(id)).count();
        if holders > 0 {
            return Err(ServiceError::ReferentialIntegrity { role_id: id.to_string(), users: holders });
        }
        self.roles.remove(pos);
        Ok(())
    }

    fn id_taken(&self, entity: Entity, id: &str) -> bool {
        match entity {
            Entity::User => self.users.iter().any(|u| u.id == id),
            Entity::Role => self.roles.iter().any(|r| r.id == id),
        }
    }

    fn next_id(&mut self, entity: Entity, name: &str) -> Result<String> {
        match self.ids {
            IdStrategy::Sequential => loop {
                let seq = match entity {
                    Entity::User => &mut self.user_seq,
                    Entity::Role => &mut self.role_seq,
                };
                *seq += 1;
                let candidate = seq.to_string();
                if !self.id_taken(entity, &candidate) {
                    return Ok(candidate);
                }
            },
            IdStrategy::Random => self.random_id(entity),
            IdStrategy::Slug if entity == Entity::User => self.random_id(entity),
            IdStrategy::Slug => {
                let base = if name.trim().is_empty() { crate::model::DEFAULT_ROLE_NAME } else { name };
                let candidate = slugify(base);
                if self.id_taken(entity, &candidate) {
                    return Err(ServiceError::Conflict { entity, id: candidate });
                }
                Ok(candidate)
            }
        }
    }

    fn random_id(&self, entity: Entity) -> Result<String> {
        loop {
            let candidate = uuid::Uuid::new_v4().to_string();
            if !self.id_taken(entity, &candidate) {
                return Ok(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ErrorKind;

	#[test]
	fn sequential_ids_are_not_reused_after_removal() {
		let mut d = Directory::new(IdStrategy::Sequential);
		let a = d.add_user(NewUser::new("A", "a@x.com")).unwrap();
		let b = d.add_user(NewUser::new("B", "b@x.com")).unwrap();
		d.remove_user(&a.id).unwrap();
		let c = d.add_user(NewUser::new("C", "c@x.com")).unwrap();
		assert_eq!(a.id, "1");
		assert_eq!(b.id, "2");
		assert_eq!(c.id, "3");
	}

	#[test]
	fn slug_mode_gives_same_name_users_distinct_ids() {
		let mut d = Directory::new(IdStrategy::Slug);
		let a = d.add_user(NewUser::new("John Smith", "john@x.com")).unwrap();
		let b = d.add_user(NewUser::new("John Smith", "john.smith@y.org")).unwrap();
		assert_ne!(a.id, b.id);
		assert_ne!(a.id, "john-smith");
		assert!(uuid::Uuid::parse_str(&b.id).is_ok());
		assert_eq!(d.users().len(), 2);
	}

	#[test]
	fn slug_ids_reject_collisions() {
		let mut d = Directory::new(IdStrategy::Slug);
		let r = d.add_role(NewRole::new("Release Manager")).unwrap();
		assert_eq!(r.id, "release-manager");
		let err = d.add_role(NewRole::new("release   manager")).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Conflict);
		assert_eq!(d.roles().len(), 1);
	}

	#[test]
	fn sample_users_reference_existing_roles() {
		let d = Directory::sample(IdStrategy::Sequential);
		for u in d.users() {
			for r in &u.roles {
				assert!(d.roles().iter().any(|role| &role.id == r), "{} -> {}", u.name, r);
			}
		}
	}

	#[test]
	fn sample_counters_continue_after_seed() {
		let mut d = Directory::sample(IdStrategy::Sequential);
		let u = d.add_user(NewUser::new("Z", "z@x.com")).unwrap();
		assert_eq!(u.id, "6");
		let r = d.add_role(NewRole::new("Auditor")).unwrap();
		assert_eq!(r.id, "4");
	}

	#[test]
	fn removing_referenced_role_is_blocked() {
		let mut d = Directory::sample(IdStrategy::Sequential);
		let err = d.remove_role("1").unwrap_err();
		assert_eq!(err, ServiceError::ReferentialIntegrity { role_id: "1".into(), users: 2 });
		assert_eq!(d.roles().len(), 3);
	}
}
