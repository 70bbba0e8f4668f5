//! Error and result types shared by the service contract, backends and session.
//!
//! Every failure a backend reports is a [`ServiceError`]. The `Display` text is
//! the human-readable message the session records; [`ServiceError::kind`] gives
//! callers something stable to match on.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Which entity an operation referred to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    User,
    Role,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::User => write!(f, "User"),
            Entity::Role => write!(f, "Role"),
        }
    }
}

/// Machine-readable classification of a [`ServiceError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    ReferentialIntegrity,
    BackendUnavailable,
    Transport,
    Conflict,
    InvalidStatus,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: Entity, id: String },

    #[error("Cannot delete role '{role_id}': assigned to {users} user(s)")]
    ReferentialIntegrity { role_id: String, users: usize },

    #[error("Bridge not available")]
    BackendUnavailable,

    #[error("{0}")]
    Transport(String),

    #[error("A {entity} with ID '{id}' already exists")]
    Conflict { entity: Entity, id: String },

    #[error("unknown status '{0}'")]
    InvalidStatus(String),
}

impl ServiceError {
    pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::NotFound { .. } => ErrorKind::NotFound,
            ServiceError::ReferentialIntegrity { .. } => ErrorKind::ReferentialIntegrity,
            ServiceError::BackendUnavailable => ErrorKind::BackendUnavailable,
            ServiceError::Transport(_) => ErrorKind::Transport,
            ServiceError::Conflict { .. } => ErrorKind::Conflict,
            ServiceError::InvalidStatus(_) => ErrorKind::InvalidStatus,
        }
    }
}
