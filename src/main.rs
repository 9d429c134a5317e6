//! Frontier Control - player control and view/reload state machine
//!
//! Runs one play session headless. It handles:
//! - Input frames read as JSON lines from stdin
//! - A fixed-rate tick loop stepping the control state machine
//! - HUD state and fire/reload/view events written as JSON lines to stdout

mod config;
mod game;
mod io;
mod util;

use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, LogFormat};
use crate::game::{GameSession, SessionSettings};
use crate::io::protocol::ClientMsg;
use crate::io::run_stdio;
use crate::util::time::{init_process_time, uptime_secs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level, config.log_format);

    init_process_time();

    info!("Starting Frontier Control");
    info!(
        tick_rate = config.tick_rate,
        hud_rate = config.hud_rate,
        seed = config.session_seed,
        "Session configuration"
    );

    let mut session = GameSession::spawn(SessionSettings::from_config(&config));
    let stdio = run_stdio(session.link(), config.input_rate_limit);

    let finished = tokio::select! {
        result = session.join() => Some(result),
        _ = shutdown_signal() => None,
    };

    let summary = match finished {
        Some(result) => result?,
        None => {
            // Quit through the input channel so the closing lines still go out
            let _ = session.send(ClientMsg::Quit).await;
            match tokio::time::timeout(Duration::from_secs(1), session.join()).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(session_id = %session.id(), "Session did not stop in time, aborting");
                    session.shutdown();
                    return Ok(());
                }
            }
        }
    };

    info!(
        session_id = %summary.session_id,
        started_at = %summary.started_at,
        ticks = summary.ticks,
        shots_fired = summary.shots_fired,
        play_time_secs = summary.play_time.as_secs_f32(),
        "Session summary"
    );

    let hud = session.hud();
    info!(
        ammo = hud.ammo,
        max_ammo = hud.max_ammo,
        view = hud.view.name(),
        weather = ?hud.weather,
        time_of_day = hud.time_of_day,
        position = ?hud.position,
        "Final HUD state"
    );

    // Let the writer flush the closing lines
    match tokio::time::timeout(Duration::from_secs(1), stdio.writer).await {
        Ok(Ok(Err(e))) => warn!(error = %e, "Output write failed"),
        Err(_) => warn!("Output writer did not finish in time"),
        _ => {}
    }
    stdio.reader.abort();

    info!(uptime_secs = uptime_secs(), "Shutdown complete");
    Ok(())
}

/// Initialize tracing/logging. Logs go to stderr, stdout carries the protocol.
fn init_tracing(log_level: &str, format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
