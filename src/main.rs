//! rbac-admin binary entry point.
//!
//! Parses flags, starts logging, builds the backend and session, then runs
//! the TUI in raw mode and restores the terminal on exit.
//!
use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use rbac_admin::app::{self, AppState, Theme, keymap::Keymap};
use rbac_admin::config::Cli;
use rbac_admin::{Session, logging};

/// Initialize a Crossterm-backed `ratatui` terminal in raw mode.
fn init_terminal() -> Result<Terminal<CrosstermBackend<std::io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn load_app_state(cli: &Cli) -> AppState {
    let theme_path = cli.config_write_path("theme.conf");
    if let Some(dir) = theme_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "config: could not create directory");
        }
    }
    let keys_path = cli.config_write_path("keybinds.conf");
    let theme = Theme::load_or_init(&theme_path.to_string_lossy());
    let keymap = Keymap::load_or_init(&keys_path.to_string_lossy());
    AppState::new(theme, keymap)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_file, &cli.log_level)?;
    tracing::info!(backend = ?cli.backend, seed = cli.seed, ids = ?cli.ids, "starting");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;
    let (service, _slot) = cli.build_service();
    let session = Session::new(service);
    let state = load_app_state(&cli);

    let mut terminal = init_terminal().context("init terminal")?;

    let res = app::run(&mut terminal, &session, &rt, state);

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture).ok();
    terminal.show_cursor().ok();

    if let Err(err) = &res {
        tracing::error!(error = %err, "application error");
        eprintln!("application error: {err:#}");
    }
    res
}
