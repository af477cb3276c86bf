use anyhow::{Context, Result};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::Stdout;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::dashboard::App;
use super::runtime::{EventLoop, Frontend};
use crate::config::DashboardConfig;
use crate::control_plane::ControlPlane;
use crate::tui::event::InputPump;
use crate::tui::session_store::SystemClock;
use crate::tui::ui;

type CrosstermTerminal = Terminal<CrosstermBackend<Stdout>>;

struct TerminalFrontend {
    terminal: CrosstermTerminal,
}

impl Frontend for TerminalFrontend {
    fn render(&mut self, app: &mut App) -> Result<()> {
        self.terminal
            .draw(|frame| ui::draw(frame, app))
            .context("Failed to draw frame")?;
        Ok(())
    }
}

fn setup_terminal() -> Result<CrosstermTerminal> {
    crossterm::terminal::enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(
        stdout,
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture,
        crossterm::event::EnableBracketedPaste
    )?;

    // Set up panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::event::DisableMouseCapture,
            crossterm::event::DisableBracketedPaste,
            crossterm::cursor::Show
        );
        original_hook(panic_info);
    }));

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("Failed to create terminal")
}

fn restore_terminal(terminal: &mut CrosstermTerminal) -> Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::event::DisableBracketedPaste,
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::event::DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the interactive dashboard until the user quits or `cancel` fires.
pub async fn run_tui(
    plane: Arc<dyn ControlPlane>,
    config: &DashboardConfig,
    cancel: CancellationToken,
) -> Result<()> {
    let mut event_loop = EventLoop::connect(plane, cancel.clone())
        .await
        .context("Failed to subscribe to the control plane")?;

    let mut frontend = TerminalFrontend {
        terminal: setup_terminal()?,
    };
    let pump = InputPump::spawn(config.tick_rate(), event_loop.sender(), cancel.child_token());
    let mut app = App::new(config, Some(Arc::new(SystemClock)));
    info!("dashboard started");

    let result = event_loop.run(&mut app, &mut frontend).await;

    event_loop.shutdown();
    pump.abort();
    restore_terminal(&mut frontend.terminal)?;
    result
}
