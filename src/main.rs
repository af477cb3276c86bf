use anyhow::{Context, Result};
use clap::Parser;
use conductor_dashboard::app::{headless, tui_runner};
use conductor_dashboard::config::DashboardConfig;
use conductor_dashboard::control_plane::{simulator, ControlPlane, InMemoryControlPlane};
use conductor_dashboard::{logging, paths, GIT_SHA};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "conductor")]
#[command(about = "Terminal dashboard for supervising agent workflows")]
#[command(version = GIT_SHA)]
struct Cli {
    /// Config file (defaults to ~/.conductor/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Soft cap on cached workflow sessions
    #[arg(long)]
    max_sessions: Option<usize>,

    /// trace, debug, info, warn or error
    #[arg(long)]
    log_level: Option<String>,

    /// Workflows seeded into the demo control plane
    #[arg(long)]
    demo_workflows: Option<usize>,

    /// Milliseconds between demo events
    #[arg(long, default_value = "400")]
    demo_interval_ms: u64,

    /// Print JSON status lines instead of drawing the dashboard
    #[arg(long)]
    headless: bool,
}

fn load_config(cli: &Cli) -> Result<DashboardConfig> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => paths::config_path()?,
    };
    let mut config = DashboardConfig::load_or_default(&path)?;
    if let Some(max) = cli.max_sessions {
        config.max_sessions = max;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(count) = cli.demo_workflows {
        config.demo_workflows = count;
    }
    config.validated()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    logging::init_logging(&paths::log_path()?, &config.log_level)
        .context("Failed to initialize logging")?;
    info!(sha = GIT_SHA, max_sessions = config.max_sessions, "conductor starting");

    let cancel = CancellationToken::new();
    let plane = InMemoryControlPlane::new();
    let ids = simulator::seed_workflows(&plane, config.demo_workflows);
    let producer = simulator::spawn(
        plane.clone(),
        ids,
        Duration::from_millis(cli.demo_interval_ms.max(1)),
        cancel.child_token(),
    );
    let plane: Arc<dyn ControlPlane> = Arc::new(plane);

    let result = if cli.headless {
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.cancel();
            }
        });
        headless::run_headless(plane, &config, cancel.clone()).await
    } else {
        tui_runner::run_tui(plane, &config, cancel.clone()).await
    };

    cancel.cancel();
    let _ = producer.await;
    info!("conductor stopped");
    result
}
