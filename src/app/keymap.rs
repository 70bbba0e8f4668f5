//! Keybinding configuration: parse `keybinds.conf`, provide defaults, and map keys to actions.
//!
//! The file format is one binding per line, `<Action> = <KeySpec>`, with `#`
//! comments. Bindings in the file override the defaults; anything not listed
//! keeps its default key.

use std::collections::HashMap;
use std::path::Path;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::config::{config_file_read_path, parse_assignment};

/// Semantic keyboard actions that can be bound to key combinations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// Exit the application.
    Quit,
    /// Open the status filter menu (Users tab).
    OpenFilterMenu,
    OpenHelp,
    StartSearch,
    /// New user on the Users tab, new role on the Roles tab.
    New,
    DeleteSelection,
    /// Switch between Users and Roles tabs.
    SwitchTab,
    /// Toggle focus between the users list and the user's roles pane.
    ToggleFocus,
    ToggleKeybindsPane,
    /// Open the action menu for the selected row.
    EnterAction,
    /// Refetch users and roles from the backend.
    Reload,
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    Ignore,
}

use KeyCode::{BackTab, Char, Delete, Down, Enter, Esc, Left, PageDown, PageUp, Right, Tab, Up};

const NONE: KeyModifiers = KeyModifiers::NONE;

/// Bindings used when `keybinds.conf` says nothing about a key.
const DEFAULT_BINDINGS: &[(KeyModifiers, KeyCode, KeyAction)] = &[
    (NONE, Char('q'), KeyAction::Quit),
    (KeyModifiers::CONTROL, Char('c'), KeyAction::Quit),
    (NONE, Esc, KeyAction::Ignore),
    (NONE, Char('f'), KeyAction::OpenFilterMenu),
    (NONE, Char('/'), KeyAction::StartSearch),
    (NONE, Char('n'), KeyAction::New),
    (NONE, Char('?'), KeyAction::OpenHelp),
    (NONE, Char('r'), KeyAction::Reload),
    (NONE, Delete, KeyAction::DeleteSelection),
    (NONE, Char('d'), KeyAction::DeleteSelection),
    (NONE, Tab, KeyAction::SwitchTab),
    // Shift+Tab arrives as BackTab, with or without SHIFT depending on the terminal
    (NONE, BackTab, KeyAction::ToggleFocus),
    (KeyModifiers::SHIFT, BackTab, KeyAction::ToggleFocus),
    (NONE, Enter, KeyAction::EnterAction),
    (NONE, Up, KeyAction::MoveUp),
    (NONE, Char('k'), KeyAction::MoveUp),
    (NONE, Down, KeyAction::MoveDown),
    (NONE, Char('j'), KeyAction::MoveDown),
    (NONE, Left, KeyAction::PageUp),
    (NONE, Char('h'), KeyAction::PageUp),
    (NONE, PageUp, KeyAction::PageUp),
    (NONE, Right, KeyAction::PageDown),
    (NONE, Char('l'), KeyAction::PageDown),
    (NONE, PageDown, KeyAction::PageDown),
    (NONE, Char('K'), KeyAction::ToggleKeybindsPane),
    (KeyModifiers::SHIFT, Char('K'), KeyAction::ToggleKeybindsPane),
];

const ACTION_NAMES: &[(KeyAction, &str)] = &[
    (KeyAction::Quit, "Quit"),
    (KeyAction::OpenFilterMenu, "OpenFilterMenu"),
    (KeyAction::OpenHelp, "OpenHelp"),
    (KeyAction::StartSearch, "StartSearch"),
    (KeyAction::New, "New"),
    (KeyAction::DeleteSelection, "DeleteSelection"),
    (KeyAction::SwitchTab, "SwitchTab"),
    (KeyAction::ToggleFocus, "ToggleFocus"),
    (KeyAction::ToggleKeybindsPane, "ToggleKeybindsPane"),
    (KeyAction::EnterAction, "EnterAction"),
    (KeyAction::Reload, "Reload"),
    (KeyAction::MoveUp, "MoveUp"),
    (KeyAction::MoveDown, "MoveDown"),
    (KeyAction::PageUp, "PageUp"),
    (KeyAction::PageDown, "PageDown"),
    (KeyAction::Ignore, "Ignore"),
];

const KEY_NAMES: &[(KeyCode, &str)] = &[
    (Enter, "Enter"),
    (Delete, "Delete"),
    (Esc, "Esc"),
    (Tab, "Tab"),
    (BackTab, "BackTab"),
    (Up, "Up"),
    (Down, "Down"),
    (Left, "Left"),
    (Right, "Right"),
    (PageUp, "PageUp"),
    (PageDown, "PageDown"),
];

/// Maps `(KeyModifiers, KeyCode)` pairs to [`KeyAction`]s.
#[derive(Clone, Debug)]
pub struct Keymap {
    bindings: HashMap<(KeyModifiers, KeyCode), KeyAction>,
}

impl Keymap {
    pub fn new_defaults() -> Self {
        let bindings = DEFAULT_BINDINGS.iter().map(|&(mods, code, action)| ((mods, code), action)).collect();
        Self { bindings }
    }

    /// Load `path`, falling back to the config directory copy, else write defaults to `path`.
    pub fn load_or_init(path: &str) -> Self {
        let source = if Path::new(path).exists() {
            Some(path.to_string())
        } else {
            config_file_read_path("keybinds.conf").map(|p| p.to_string_lossy().into_owned())
        };
        if let Some(source) = source {
            return Self::from_file(&source).unwrap_or_default();
        }
        let km = Self::default();
        if let Err(e) = km.write_file(path) {
            tracing::warn!(path, error = %e, "keymap: could not write defaults");
        }
        km
    }

    /// Read bindings from a file on top of the defaults. `None` if unreadable.
    pub fn from_file(path: &str) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        let mut map = Self::default();
        for (action, key) in contents.lines().filter_map(parse_assignment) {
            match (parse_action(action), parse_key(key)) {
                (Some(action), Some(key)) => {
                    map.bindings.insert(key, action);
                }
                _ => tracing::debug!(path, action, key, "keymap: skipping unknown binding"),
            }
        }
        Some(map)
    }

    pub fn write_file(&self, path: &str) -> std::io::Result<()> {
        let mut entries: Vec<(&'static str, String)> = self
            .bindings
            .iter()
            .filter(|(_, action)| **action != KeyAction::Ignore)
            .map(|(&(mods, code), &action)| (format_action(action), Self::format_key(mods, code)))
            .collect();
        entries.sort();

        let mut out = vec![
            "# rbac-admin keybindings".to_string(),
            "# Format: <Action> = <KeySpec>".to_string(),
            "# KeySpec examples: q, Ctrl+q, Enter, Esc, Tab, BackTab, Up, Down, Left, Right, PageUp, PageDown, Delete, /, n, f, r".to_string(),
            String::new(),
        ];
        out.extend(entries.into_iter().map(|(action, key)| format!("{action} = {key}")));
        out.push(String::new());
        std::fs::write(path, out.join("\n"))
    }

    pub fn resolve(&self, key: &KeyEvent) -> Option<KeyAction> {
        self.bindings.get(&(key.modifiers, key.code)).copied()
    }

    pub fn all_bindings(&self) -> Vec<((KeyModifiers, KeyCode), KeyAction)> {
        self.bindings.iter().map(|(k, v)| (*k, *v)).collect()
    }

    /// Key spec such as "Ctrl+q" or "BackTab", as read back by the file parser.
    pub fn format_key(mods: KeyModifiers, code: KeyCode) -> String {
        let base = match KEY_NAMES.iter().find(|(k, _)| *k == code) {
            Some((_, name)) => name.to_string(),
            None => match code {
                Char(c) => c.to_string(),
                other => format!("{other:?}"),
            },
        };
        if mods.contains(KeyModifiers::CONTROL) {
            format!("Ctrl+{base}")
        } else {
            base
        }
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new_defaults()
    }
}

fn parse_key(spec: &str) -> Option<(KeyModifiers, KeyCode)> {
    let spec = spec.trim();
    let (mods, rest) = match spec.strip_prefix("Ctrl+") {
        Some(rest) => (KeyModifiers::CONTROL, rest),
        None => (NONE, spec),
    };
    if rest == "Escape" {
        return Some((mods, Esc));
    }
    if let Some((code, _)) = KEY_NAMES.iter().find(|(_, name)| *name == rest) {
        return Some((mods, *code));
    }
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some((mods, Char(c))),
        _ => None,
    }
}

fn parse_action(s: &str) -> Option<KeyAction> {
    ACTION_NAMES.iter().find(|(_, name)| *name == s.trim()).map(|(a, _)| *a)
}

pub fn format_action(a: KeyAction) -> &'static str {
    ACTION_NAMES.iter().find(|(action, _)| *action == a).map(|(_, name)| *name).unwrap_or("Ignore")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn file_overrides_defaults() {
		let mut path = std::env::temp_dir();
		path.push(format!("rbac_admin_keys_{}.conf", std::process::id()));
		std::fs::write(&path, "# custom\nQuit = Ctrl+x\nReload = F5\n").unwrap();
		let km = Keymap::from_file(&path.to_string_lossy()).unwrap();
		std::fs::remove_file(&path).ok();

		let ctrl_x = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL);
		assert_eq!(km.resolve(&ctrl_x), Some(KeyAction::Quit));
		// unparseable key spec is skipped, default stays
		let r = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE);
		assert_eq!(km.resolve(&r), Some(KeyAction::Reload));
	}

	#[test]
	fn written_file_reads_back() {
		let mut path = std::env::temp_dir();
		path.push(format!("rbac_admin_keys_rt_{}.conf", std::process::id()));
		let p = path.to_string_lossy().to_string();
		Keymap::default().write_file(&p).unwrap();
		let km = Keymap::from_file(&p).unwrap();
		std::fs::remove_file(&path).ok();
		let mut a = Keymap::default().all_bindings();
		let mut b = km.all_bindings();
		a.sort_by_key(|(k, _)| format!("{:?}", k));
		b.sort_by_key(|(k, _)| format!("{:?}", k));
		assert_eq!(a, b);
	}
}
