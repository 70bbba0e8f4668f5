//! Embedding entry points: mount and unmount a session per named container.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{error, info};

use crate::service::SharedService;
use crate::session::Session;

/// Keeps at most one mounted [`Session`] per container id, all over the same backend.
pub struct Embedder {
    service: SharedService,
    mounted: Mutex<HashMap<String, Arc<Session>>>,
}

impl Embedder {
    pub fn new(service: SharedService) -> Self {
        Self { service, mounted: Mutex::new(HashMap::new()) }
    }

    /// Mount a session into `container_id` and load it.
    ///
    /// Rendering an already-mounted container returns the existing session
    /// untouched. A blank id names no container: the call is logged and
    /// nothing is mounted. A failed initial load still mounts; the failure is
    /// in the session's `error`.
    pub async fn render(&self, container_id: &str) -> Option<Arc<Session>> {
        if container_id.trim().is_empty() {
            error!("embed: container with id {:?} not found", container_id);
            return None;
        }
        let session = {
            let mut mounted = self.mounted.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(existing) = mounted.get(container_id) {
                return Some(Arc::clone(existing));
            }
            let session = Arc::new(Session::new(Arc::clone(&self.service)));
            mounted.insert(container_id.to_string(), Arc::clone(&session));
            session
        };
        info!(container = container_id, "embed: mounted");
        let _ = session.load().await;
        Some(session)
    }

    /// Drop the session mounted in `container_id`. Returns whether one was mounted.
    pub fn unmount(&self, container_id: &str) -> bool {
        let removed = self
            .mounted
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(container_id)
            .is_some();
        if removed {
            info!(container = container_id, "embed: unmounted");
        }
        removed
    }

    pub fn is_mounted(&self, container_id: &str) -> bool {
        self.mounted.lock().unwrap_or_else(|p| p.into_inner()).contains_key(container_id)
    }

    pub fn session(&self, container_id: &str) -> Option<Arc<Session>> {
        self.mounted.lock().unwrap_or_else(|p| p.into_inner()).get(container_id).cloned()
    }
}
