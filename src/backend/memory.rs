//! In-memory backend: the default store for demos and tests.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::directory::{Directory, IdStrategy};
use crate::error::Result;
use crate::model::{NewRole, NewUser, Role, RolePatch, User, UserPatch};
use crate::service::ManagementService;

/// Users and roles held for the lifetime of the instance. Nothing is persisted.
pub struct InMemoryBackend {
    dir: Mutex<Directory>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_ids(IdStrategy::default())
    }

    pub fn with_ids(ids: IdStrategy) -> Self {
        Self { dir: Mutex::new(Directory::new(ids)) }
    }

    /// Start from the sample users and roles.
    pub fn seeded(ids: IdStrategy) -> Self {
        Self { dir: Mutex::new(Directory::sample(ids)) }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ManagementService for InMemoryBackend {
    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.dir.lock().await.users().to_vec())
    }

    async fn add_user(&self, user: NewUser) -> Result<User> {
        let stored = self.dir.lock().await.add_user(user)?;
        debug!(id = %stored.id, "memory: user added");
        Ok(stored)
    }

    async fn update_user(&self, patch: UserPatch) -> Result<User> {
        self.dir.lock().await.update_user(patch)
    }

    async fn remove_user(&self, id: &str) -> Result<()> {
        self.dir.lock().await.remove_user(id)?;
        debug!(id, "memory: user removed");
        Ok(())
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        Ok(self.dir.lock().await.roles().to_vec())
    }

    async fn add_role(&self, role: NewRole) -> Result<Role> {
        let stored = self.dir.lock().await.add_role(role)?;
        debug!(id = %stored.id, "memory: role added");
        Ok(stored)
    }

    async fn update_role(&self, patch: RolePatch) -> Result<Role> {
        self.dir.lock().await.update_role(patch)
    }

    async fn remove_role(&self, id: &str) -> Result<()> {
        self.dir.lock().await.remove_role(id)?;
        debug!(id, "memory: role removed");
        Ok(())
    }
}
