//! The management service contract every backend fulfils.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{NewRole, NewUser, Role, RolePatch, User, UserPatch};

/// Endpoint name under which an IDE host exposes a remote `ManagementService`.
pub const SERVICE_PATH: &str = "/services/user-management";

/// CRUD over users and roles.
///
/// Lists are snapshot copies. Removing an unknown id is an error
/// ([`ServiceError::NotFound`](crate::error::ServiceError::NotFound)), as is
/// removing a role that any user still references.
#[async_trait]
pub trait ManagementService: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn add_user(&self, user: NewUser) -> Result<User>;
    async fn update_user(&self, patch: UserPatch) -> Result<User>;
    async fn remove_user(&self, id: &str) -> Result<()>;

    async fn list_roles(&self) -> Result<Vec<Role>>;
    async fn add_role(&self, role: NewRole) -> Result<Role>;
    async fn update_role(&self, patch: RolePatch) -> Result<Role>;
    async fn remove_role(&self, id: &str) -> Result<()>;
}

pub type SharedService = Arc<dyn ManagementService>;
