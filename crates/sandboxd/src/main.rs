//! `sandboxd`: session-scoped file and shell gateway for AI agents.

use std::future::IntoFuture;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sandbox_core::telemetry::{init_tracing, parse_level};
use sandboxd::{router, AppState, Config, LogFormat};
use tracing::{info, warn, Level};

/// How long in-flight requests may run after a shutdown signal.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "sandboxd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Agent Sandbox: session-scoped file and shell access over RPC", long_about = None)]
struct Cli {
    /// Config file (default: configs/config.toml, optional)
    #[arg(short, long, env = "SANDBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Emit JSON-formatted log lines regardless of log.format
    #[arg(long)]
    json: bool,

    /// Log at debug level regardless of log.level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    let json = cli.json || config.log.format == LogFormat::Json;
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        parse_level(&config.log.level)
    };
    init_tracing(json, level);

    let state = AppState::from_config(&config).context("failed to initialize services")?;
    let app = router(state, config.request_timeout());

    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        address = %addr,
        workspace = %config.sandbox.workspace_dir.display(),
        shell_timeout_secs = config.sandbox.shell_timeout_secs,
        max_file_size = config.sandbox.max_file_size,
        "sandboxd listening"
    );

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = stop_rx.await;
    });
    let mut server = tokio::spawn(server.into_future());

    tokio::select! {
        res = &mut server => {
            res.context("server task panicked")?.context("server error")?;
            return Ok(());
        }
        () = shutdown_signal() => {}
    }

    info!(drain_secs = SHUTDOWN_DRAIN.as_secs(), "shutting down");
    let _ = stop_tx.send(());
    match tokio::time::timeout(SHUTDOWN_DRAIN, &mut server).await {
        Ok(res) => res.context("server task panicked")?.context("server error")?,
        Err(_) => {
            warn!("in-flight requests did not finish in time; forcing exit");
            server.abort();
        }
    }

    info!("sandboxd stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}
