//! Canonical entity model: users, roles and the user status vocabulary.
//!
//! Users reference roles by role `id`. Partial records (`NewUser`, `UserPatch`,
//! and the role equivalents) carry `Option` fields; creating a record from a
//! partial applies the defaults below, patching leaves `None` fields alone.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ServiceError;

pub const DEFAULT_USER_NAME: &str = "New User";
pub const DEFAULT_ROLE_NAME: &str = "New Role";

/// Account status. Every spelling seen at a boundary maps onto one of these.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
    Locked,
    SignedOn,
}

impl UserStatus {
    pub const ALL: [UserStatus; 4] = [
        UserStatus::Active,
        UserStatus::Inactive,
        UserStatus::Locked,
        UserStatus::SignedOn,
    ];

    /// Canonical wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Locked => "locked",
            UserStatus::SignedOn => "signed-on",
        }
    }

    /// Display label for tables and forms.
    pub fn label(self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Inactive => "Inactive",
            UserStatus::Locked => "Locked",
            UserStatus::SignedOn => "Signed on",
        }
    }

    /// Next status in `ALL`, wrapping around. Used by the forms to cycle values.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for UserStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();
        match norm.as_str() {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            "locked" => Ok(UserStatus::Locked),
            "signed" | "signedon" => Ok(UserStatus::SignedOn),
            _ => Err(ServiceError::InvalidStatus(s.to_string())),
        }
    }
}

impl TryFrom<String> for UserStatus {
    type Error = ServiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UserStatus> for &'static str {
    fn from(s: UserStatus) -> Self {
        s.as_str()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Role ids, in assignment order.
    pub roles: Vec<String>,
    pub status: UserStatus,
}

impl User {
    pub fn has_role(&self, role_id: &str) -> bool {
        self.roles.iter().any(|r| r == role_id)
    }

    /// Merge the set fields of `patch` into this record. The id never changes.
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(roles) = patch.roles {
            self.roles = roles;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

/// A user as supplied by a writer, before the backend assigns an id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub roles: Option<Vec<String>>,
    pub status: Option<UserStatus>,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_status(mut self, status: UserStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Build the stored record, filling every unset field with its default.
    pub fn into_user(self, id: String) -> User {
        User {
            id,
            name: self
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_USER_NAME.to_string()),
            email: self.email.unwrap_or_default(),
            roles: self.roles.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
        }
    }
}

/// Partial update keyed by `id`. `None` means "leave unchanged".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
}

impl UserPatch {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn roles(mut self, roles: Vec<String>) -> Self {
        self.roles = Some(roles);
        self
    }

    pub fn status(mut self, status: UserStatus) -> Self {
        self.status = Some(status);
        self
    }
}

impl From<User> for UserPatch {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: Some(u.name),
            email: Some(u.email),
            roles: Some(u.roles),
            status: Some(u.status),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Opaque capability strings. `"*"` carries no special meaning here.
    pub permissions: Vec<String>,
}

impl Role {
    pub fn apply(&mut self, patch: RolePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(permissions) = patch.permissions {
            self.permissions = dedup_preserving_order(permissions);
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewRole {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

impl NewRole {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Self::default() }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = Some(permissions.into_iter().map(Into::into).collect());
        self
    }

    pub fn into_role(self, id: String) -> Role {
        Role {
            id,
            name: self
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_ROLE_NAME.to_string()),
            description: self.description.unwrap_or_default(),
            permissions: dedup_preserving_order(self.permissions.unwrap_or_default()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl RolePatch {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn permissions(mut self, permissions: Vec<String>) -> Self {
        self.permissions = Some(dedup_preserving_order(permissions));
        self
    }
}

impl From<Role> for RolePatch {
    fn from(r: Role) -> Self {
        Self {
            id: r.id,
            name: Some(r.name),
            description: Some(r.description),
            permissions: Some(r.permissions),
        }
    }
}

/// Lower-case the name and join whitespace-separated words with `-`.
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// Split a comma separated permission list as typed into a form.
pub fn parse_permission_list(input: &str) -> Vec<String> {
    dedup_preserving_order(
        input
            .split(',')
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| p.to_string())
            .collect(),
    )
}

pub(crate) fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn role_apply_keeps_permissions_a_set() {
		let mut role = NewRole::new("Ops").into_role("1".to_string());
		let patch = RolePatch {
			id: "1".to_string(),
			permissions: Some(vec!["read".into(), "write".into(), "read".into()]),
			..RolePatch::default()
		};
		role.apply(patch);
		assert_eq!(role.permissions, vec!["read", "write"]);

		let raw: RolePatch = serde_json::from_str(r#"{"id":"1","permissions":["x","x"]}"#).unwrap();
		role.apply(raw);
		assert_eq!(role.permissions, vec!["x"]);
	}

	#[test]
	fn status_accepts_every_known_spelling() {
		for s in ["active", "ACTIVE", "Active"] {
			assert_eq!(s.parse::<UserStatus>().unwrap(), UserStatus::Active);
		}
		for s in ["inactive", "INACTIVE"] {
			assert_eq!(s.parse::<UserStatus>().unwrap(), UserStatus::Inactive);
		}
		for s in ["locked", "LOCKED", "Locked"] {
			assert_eq!(s.parse::<UserStatus>().unwrap(), UserStatus::Locked);
		}
		for s in ["signed", "Signed on", "signed-on", "SIGNED_ON"] {
			assert_eq!(s.parse::<UserStatus>().unwrap(), UserStatus::SignedOn);
		}
		assert!("banned".parse::<UserStatus>().is_err());
	}

	#[test]
	fn status_serializes_canonically() {
		let json = serde_json::to_string(&UserStatus::SignedOn).unwrap();
		assert_eq!(json, "\"signed-on\"");
		let back: UserStatus = serde_json::from_str("\"Signed on\"").unwrap();
		assert_eq!(back, UserStatus::SignedOn);
	}

	#[test]
	fn new_user_defaults_fill_missing_fields() {
		let u = NewUser::default().into_user("7".into());
		assert_eq!(u.id, "7");
		assert_eq!(u.name, DEFAULT_USER_NAME);
		assert_eq!(u.email, "");
		assert!(u.roles.is_empty());
		assert_eq!(u.status, UserStatus::Active);
	}

	#[test]
	fn patch_leaves_unset_fields_alone() {
		let mut u = NewUser::new("A", "a@x.com").with_roles(["1"]).into_user("1".into());
		u.apply(UserPatch::new("1").name("B"));
		assert_eq!(u.name, "B");
		assert_eq!(u.email, "a@x.com");
		assert_eq!(u.roles, vec!["1".to_string()]);
	}

	#[test]
	fn slug_and_permission_parsing() {
		assert_eq!(slugify("  Release   Manager "), "release-manager");
		assert_eq!(parse_permission_list("read, write,,read , *"), vec!["read", "write", "*"]);
	}
}
