//! Concrete fulfilments of [`ManagementService`](crate::service::ManagementService).

pub mod bridge;
pub mod directory;
pub mod memory;

pub use bridge::{BridgeBackend, BridgeSlot, HostBridge, HostError, HostRole, HostUser};
pub use directory::{Directory, IdStrategy};
pub use memory::InMemoryBackend;
