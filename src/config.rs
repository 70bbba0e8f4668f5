//! Command-line options and config file locations.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use crate::backend::{BridgeBackend, BridgeSlot, IdStrategy, InMemoryBackend};
use crate::service::SharedService;

pub const APP_DIR: &str = "rbac-admin";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Local in-memory store.
    Memory,
    /// Bridge backend serving the sample data locally.
    MockBridge,
    /// Bridge backend forwarding to a host. No host is attached in the
    /// terminal build, so every operation reports the bridge as unavailable.
    LiveBridge,
}

#[derive(Clone, Debug, Parser)]
#[command(name = "rbac-admin", version, about = "Administer users and roles")]
pub struct Cli {
    #[arg(long, value_enum, default_value_t = BackendKind::Memory, env = "RBAC_ADMIN_BACKEND")]
    pub backend: BackendKind,

    /// Start the in-memory backend with the sample users and roles.
    #[arg(long)]
    pub seed: bool,

    /// Id assignment for the in-memory and mock-bridge backends. With `slug`,
    /// roles are named by their slug and users get a UUID.
    #[arg(long, value_enum, default_value_t = IdStrategy::Sequential)]
    pub ids: IdStrategy,

    /// Log file; the terminal is owned by the UI.
    #[arg(long, env = "RBAC_ADMIN_LOG_FILE", default_value = "rbac-admin.log")]
    pub log_file: PathBuf,

    /// Used when RUST_LOG is not set.
    #[arg(long, env = "RBAC_ADMIN_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Directory for theme.conf and keybinds.conf.
    #[arg(long, env = "RBAC_ADMIN_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,
}

impl Cli {
    /// The backend the session will talk to, plus the bridge slot when live.
    pub fn build_service(&self) -> (SharedService, Option<BridgeSlot>) {
        match self.backend {
            BackendKind::Memory if self.seed => (Arc::new(InMemoryBackend::seeded(self.ids)), None),
            BackendKind::Memory => (Arc::new(InMemoryBackend::with_ids(self.ids)), None),
            BackendKind::MockBridge => (Arc::new(BridgeBackend::mock_with_ids(self.ids)), None),
            BackendKind::LiveBridge => {
                let slot = BridgeSlot::new();
                (Arc::new(BridgeBackend::live(slot.clone())), Some(slot))
            }
        }
    }

    /// Where config files are written when they do not exist yet.
    pub fn config_write_path(&self, file: &str) -> PathBuf {
        match &self.config_dir {
            Some(dir) => dir.join(file),
            None => config_dir().map(|d| d.join(file)).unwrap_or_else(|| PathBuf::from(file)),
        }
    }
}

/// `$XDG_CONFIG_HOME/rbac-admin`, else `$HOME/.config/rbac-admin`.
pub fn config_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(xdg).join(APP_DIR));
    }
    std::env::var_os("HOME")
        .filter(|v| !v.is_empty())
        .map(|home| PathBuf::from(home).join(".config").join(APP_DIR))
}

/// First existing copy of `file`: the config directory, then the working directory.
pub fn config_file_read_path(file: &str) -> Option<PathBuf> {
    config_dir()
        .map(|d| d.join(file))
        .into_iter()
        .chain(std::iter::once(PathBuf::from(file)))
        .find(|p| p.exists())
}

/// One `key = value` line of a config file. Blank lines and `#` comments yield `None`.
pub fn parse_assignment(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let (key, value) = (key.trim(), value.trim());
    (!key.is_empty() && !value.is_empty()).then_some((key, value))
}
