//! Library crate for rbac-admin.
//!
//! Users and roles administration behind one asynchronous service boundary:
//! - Entities and patches (`model`)
//! - The service contract (`service`) and its backends (`backend`)
//! - The session that loads, mutates and reconciles a snapshot (`session`)
//! - Host-page mounting of sessions (`embed`)
//! - Command line, config files and logging (`config`, `logging`)
//! - The terminal front end (`app`, `search`, `ui`)
//!
//! It is used by the `rbac-admin` binary and by tests.
#![deny(rustdoc::broken_intra_doc_links)]

pub mod app;
pub mod backend;
pub mod config;
pub mod embed;
pub mod error;
pub mod logging;
pub mod model;
pub mod search;
pub mod service;
pub mod session;
pub mod ui;

pub use backend::{BridgeBackend, BridgeSlot, HostBridge, IdStrategy, InMemoryBackend};
pub use embed::Embedder;
pub use error::{ErrorKind, Result, ServiceError};
pub use model::{NewRole, NewUser, Role, RolePatch, User, UserPatch, UserStatus};
pub use service::{ManagementService, SharedService};
pub use session::{Session, Snapshot};
