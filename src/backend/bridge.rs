//! Bridge backend: forwards every operation to a host-provided object whose
//! methods take a success callback and an error callback, or serves the
//! sample data locally when running in mock mode.
//!
//! Host payloads are loose: any field may be missing and the field names and
//! status spellings of older hosts are accepted (`role` for `roles`,
//! `authorities` for `permissions`, `"Signed on"`, `"ACTIVE"`, ...). Results
//! are filled with defaults before they leave this module, so callers only
//! ever see complete canonical records.

use std::sync::{Arc, Mutex as StdMutex, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, warn};

use super::directory::{Directory, IdStrategy};
use crate::error::{Entity, Result, ServiceError};
use crate::model::{
    dedup_preserving_order, NewRole, NewUser, Role, RolePatch, User, UserPatch, UserStatus,
    DEFAULT_ROLE_NAME, DEFAULT_USER_NAME,
};
use crate::service::ManagementService;

/// Failure payload handed to an error callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostError(pub String);

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for HostError {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for HostError {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<serde_json::Value> for HostError {
    /// Hosts reject with whatever they have: a bare string, an object with a
    /// `message`, or something else entirely.
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::String(s) => Self(s),
            serde_json::Value::Object(ref map) => match map.get("message").and_then(|m| m.as_str()) {
                Some(msg) => Self(msg.to_string()),
                None => Self(v.to_string()),
            },
            other => Self(other.to_string()),
        }
    }
}

pub type OnSuccess<T> = Box<dyn FnOnce(T) + Send + 'static>;
pub type OnError = Box<dyn FnOnce(HostError) + Send + 'static>;

/// A user as exchanged with the host.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(alias = "role", skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// A role as exchanged with the host.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostRole {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(alias = "authorities", skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl From<NewUser> for HostUser {
    fn from(u: NewUser) -> Self {
        Self {
            id: None,
            name: u.name,
            email: u.email,
            roles: u.roles,
            status: u.status.map(|s| s.as_str().to_string()),
        }
    }
}

impl From<UserPatch> for HostUser {
    fn from(p: UserPatch) -> Self {
        Self {
            id: None,
            name: p.name,
            email: p.email,
            roles: p.roles,
            status: p.status.map(|s| s.as_str().to_string()),
        }
    }
}

impl From<NewRole> for HostRole {
    fn from(r: NewRole) -> Self {
        Self { id: None, name: r.name, description: r.description, permissions: r.permissions }
    }
}

impl From<RolePatch> for HostRole {
    fn from(p: RolePatch) -> Self {
        Self { id: None, name: p.name, description: p.description, permissions: p.permissions }
    }
}

impl HostUser {
    /// Fill missing fields with defaults. A record without an id is unusable.
    pub fn reconcile(self) -> Result<User> {
        let id = self
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ServiceError::transport("host returned a user without an id"))?;
        let status = match self.status.as_deref() {
            None => UserStatus::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(id = %id, status = raw, "bridge: unknown status from host, using default");
                UserStatus::default()
            }),
        };
        Ok(User {
            name: self
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_USER_NAME.to_string()),
            email: self.email.unwrap_or_default(),
            roles: self.roles.unwrap_or_default(),
            status,
            id,
        })
    }
}

impl HostRole {
    pub fn reconcile(self) -> Result<Role> {
        let id = self
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ServiceError::transport("host returned a role without an id"))?;
        Ok(Role {
            id,
            name: self
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_ROLE_NAME.to_string()),
            description: self.description.unwrap_or_default(),
            permissions: dedup_preserving_order(self.permissions.unwrap_or_default()),
        })
    }
}

/// The callback-style API a host application exposes.
///
/// Every method must eventually invoke at most one of its two callbacks. Only
/// the first invocation counts; later ones are logged and dropped. Dropping
/// both callbacks without calling either fails the request.
pub trait HostBridge: Send + Sync {
    fn get_all_users(&self, on_success: OnSuccess<Vec<HostUser>>, on_error: OnError);
    fn add_user(&self, user: HostUser, on_success: OnSuccess<HostUser>, on_error: OnError);
    fn remove_user(&self, user_id: &str, on_success: OnSuccess<bool>, on_error: OnError);
    fn modify_user(&self, user_id: &str, data: HostUser, on_success: OnSuccess<HostUser>, on_error: OnError);

    fn get_all_roles(&self, on_success: OnSuccess<Vec<HostRole>>, on_error: OnError);
    fn add_role(&self, role: HostRole, on_success: OnSuccess<HostRole>, on_error: OnError);
    fn remove_role(&self, role_id: &str, on_success: OnSuccess<bool>, on_error: OnError);
    fn modify_role(&self, role_id: &str, data: HostRole, on_success: OnSuccess<HostRole>, on_error: OnError);
}

/// Where the host installs its bridge object. Cloning shares the slot.
#[derive(Clone, Default)]
pub struct BridgeSlot {
    inner: Arc<RwLock<Option<Arc<dyn HostBridge>>>>,
}

impl BridgeSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, host: Arc<dyn HostBridge>) {
        *self.inner.write().unwrap_or_else(|p| p.into_inner()) = Some(host);
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(|p| p.into_inner()) = None;
    }

    pub fn get(&self) -> Option<Arc<dyn HostBridge>> {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn is_installed(&self) -> bool {
        self.get().is_some()
    }
}

type Outcome<T> = std::result::Result<T, HostError>;
type Pending<T> = Arc<StdMutex<Option<oneshot::Sender<Outcome<T>>>>>;

fn settle<T>(pending: &Pending<T>, outcome: Outcome<T>) {
    let sender = pending.lock().unwrap_or_else(|p| p.into_inner()).take();
    match sender {
        Some(tx) => {
            let _ = tx.send(outcome);
        }
        None => warn!("bridge: host invoked a second callback for the same request; ignored"),
    }
}

/// A success/error callback pair that settles one receiver exactly once.
fn callback_pair<T: Send + 'static>() -> (OnSuccess<T>, OnError, oneshot::Receiver<Outcome<T>>) {
    let (tx, rx) = oneshot::channel();
    let pending: Pending<T> = Arc::new(StdMutex::new(Some(tx)));
    let on_ok = Arc::clone(&pending);
    let on_success: OnSuccess<T> = Box::new(move |value| settle(&on_ok, Ok(value)));
    let on_error: OnError = Box::new(move |err| settle(&pending, Err(err)));
    (on_success, on_error, rx)
}

enum Mode {
    Mock(Mutex<Directory>),
    Live(BridgeSlot),
}

pub struct BridgeBackend {
    mode: Mode,
}

impl BridgeBackend {
    /// Serve the sample users and roles locally, exactly like the in-memory backend.
    pub fn mock() -> Self {
        Self::mock_with_ids(IdStrategy::Sequential)
    }

    /// Mock mode over the sample data, assigning new ids with `ids`.
    pub fn mock_with_ids(ids: IdStrategy) -> Self {
        Self { mode: Mode::Mock(Mutex::new(Directory::sample(ids))) }
    }

    /// Forward to whatever host is installed in `slot` at call time.
    pub fn live(slot: BridgeSlot) -> Self {
        Self { mode: Mode::Live(slot) }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self.mode, Mode::Mock(_))
    }

    async fn call<T, F>(slot: &BridgeSlot, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn HostBridge, OnSuccess<T>, OnError) + Send,
    {
        let Some(host) = slot.get() else {
            error!(op, "bridge: no host installed");
            return Err(ServiceError::BackendUnavailable);
        };
        let (on_success, on_error, rx) = callback_pair::<T>();
        debug!(op, "bridge: forwarding to host");
        f(host.as_ref(), on_success, on_error);
        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(op, error = %e, "bridge: host rejected request");
                Err(ServiceError::Transport(e.0))
            }
            Err(_) => Err(ServiceError::transport(format!("{op}: host dropped the request"))),
        }
    }
}

#[async_trait]
impl ManagementService for BridgeBackend {
    async fn list_users(&self) -> Result<Vec<User>> {
        match &self.mode {
            Mode::Mock(dir) => Ok(dir.lock().await.users().to_vec()),
            Mode::Live(slot) => {
                let users = Self::call(slot, "getAllUsers", |h, ok, err| h.get_all_users(ok, err)).await?;
                users.into_iter().map(HostUser::reconcile).collect()
            }
        }
    }

    async fn add_user(&self, user: NewUser) -> Result<User> {
        match &self.mode {
            Mode::Mock(dir) => dir.lock().await.add_user(user),
            Mode::Live(slot) => {
                let payload = HostUser::from(user);
                Self::call(slot, "addUser", move |h, ok, err| h.add_user(payload, ok, err))
                    .await?
                    .reconcile()
            }
        }
    }

    async fn update_user(&self, patch: UserPatch) -> Result<User> {
        match &self.mode {
            Mode::Mock(dir) => dir.lock().await.update_user(patch),
            Mode::Live(slot) => {
                let id = patch.id.clone();
                let payload = HostUser::from(patch);
                let mut updated = Self::call(slot, "modifyUser", |h, ok, err| h.modify_user(&id, payload, ok, err)).await?;
                // Some hosts echo the record without its id.
                updated.id.get_or_insert(id);
                updated.reconcile()
            }
        }
    }

    async fn remove_user(&self, id: &str) -> Result<()> {
        match &self.mode {
            Mode::Mock(dir) => dir.lock().await.remove_user(id),
            Mode::Live(slot) => {
                let removed = Self::call(slot, "removeUser", |h, ok, err| h.remove_user(id, ok, err)).await?;
                if removed { Ok(()) } else { Err(ServiceError::not_found(Entity::User, id)) }
            }
        }
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        match &self.mode {
            Mode::Mock(dir) => Ok(dir.lock().await.roles().to_vec()),
            Mode::Live(slot) => {
                let roles = Self::call(slot, "getAllRoles", |h, ok, err| h.get_all_roles(ok, err)).await?;
                roles.into_iter().map(HostRole::reconcile).collect()
            }
        }
    }

    async fn add_role(&self, role: NewRole) -> Result<Role> {
        match &self.mode {
            Mode::Mock(dir) => dir.lock().await.add_role(role),
            Mode::Live(slot) => {
                let payload = HostRole::from(role);
                Self::call(slot, "addRole", move |h, ok, err| h.add_role(payload, ok, err))
                    .await?
                    .reconcile()
            }
        }
    }

    async fn update_role(&self, patch: RolePatch) -> Result<Role> {
        match &self.mode {
            Mode::Mock(dir) => dir.lock().await.update_role(patch),
            Mode::Live(slot) => {
                let id = patch.id.clone();
                let payload = HostRole::from(patch);
                let mut updated = Self::call(slot, "modifyRole", |h, ok, err| h.modify_role(&id, payload, ok, err)).await?;
                updated.id.get_or_insert(id);
                updated.reconcile()
            }
        }
    }

    async fn remove_role(&self, id: &str) -> Result<()> {
        match &self.mode {
            Mode::Mock(dir) => dir.lock().await.remove_role(id),
            Mode::Live(slot) => {
                let removed = Self::call(slot, "removeRole", |h, ok, err| h.remove_role(id, ok, err)).await?;
                if removed { Ok(()) } else { Err(ServiceError::not_found(Entity::Role, id)) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn host_user_accepts_legacy_field_names() {
		let raw = r#"{"id":"4","name":"Alice","role":["Editor","Viewer"],"status":"Signed on"}"#;
		let host: HostUser = serde_json::from_str(raw).unwrap();
		let user = host.reconcile().unwrap();
		assert_eq!(user.roles, vec!["Editor", "Viewer"]);
		assert_eq!(user.status, UserStatus::SignedOn);
		assert_eq!(user.email, "");
	}

	#[test]
	fn host_role_accepts_authorities() {
		let raw = r#"{"id":"admin","name":"Administrator","authorities":["*"]}"#;
		let role: Role = serde_json::from_str::<HostRole>(raw).unwrap().reconcile().unwrap();
		assert_eq!(role.permissions, vec!["*"]);
		assert_eq!(role.description, "");
	}

	#[test]
	fn host_role_permissions_are_deduplicated() {
		let raw = r#"{"id":"ed","name":"Editor","permissions":["read","write","read"]}"#;
		let role = serde_json::from_str::<HostRole>(raw).unwrap().reconcile().unwrap();
		assert_eq!(role.permissions, vec!["read", "write"]);
	}

	#[test]
	fn reconcile_defaults_missing_fields() {
		let user = HostUser { id: Some("9".into()), ..HostUser::default() }.reconcile().unwrap();
		assert_eq!(user.name, DEFAULT_USER_NAME);
		assert_eq!(user.status, UserStatus::Active);
		assert!(user.roles.is_empty());

		let role = HostRole { id: Some("r".into()), ..HostRole::default() }.reconcile().unwrap();
		assert_eq!(role.name, DEFAULT_ROLE_NAME);
		assert!(role.permissions.is_empty());
	}

	#[test]
	fn reconcile_rejects_missing_id() {
		let err = HostUser { name: Some("x".into()), ..HostUser::default() }.reconcile().unwrap_err();
		assert_eq!(err.kind(), crate::error::ErrorKind::Transport);
	}

	#[test]
	fn unknown_host_status_falls_back_to_active() {
		let host = HostUser { id: Some("1".into()), status: Some("suspended".into()), ..HostUser::default() };
		assert_eq!(host.reconcile().unwrap().status, UserStatus::Active);
	}

	#[test]
	fn patch_payload_only_carries_set_fields() {
		let payload = HostUser::from(UserPatch::new("1").name("B"));
		let json = serde_json::to_value(&payload).unwrap();
		assert_eq!(json, serde_json::json!({ "name": "B" }));
	}

	#[test]
	fn host_error_from_json_prefers_message() {
		let e = HostError::from(serde_json::json!({ "message": "denied", "code": 7 }));
		assert_eq!(e.0, "denied");
		let e = HostError::from(serde_json::json!(404));
		assert_eq!(e.0, "404");
	}

	#[tokio::test]
	async fn only_the_first_callback_settles() {
		let (ok, err, rx) = callback_pair::<u32>();
		ok(1);
		err(HostError::from("late"));
		assert_eq!(rx.await.unwrap(), Ok(1));
	}
}
