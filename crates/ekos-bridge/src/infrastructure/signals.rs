//! Waiting for the operator's stop signal.

use anyhow::Context;
use tracing::info;

use crate::domain::Signal;

/// Resolves with the first of SIGHUP, SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if a signal handler cannot be installed.
#[cfg(unix)]
pub async fn wait_for_signal() -> anyhow::Result<Signal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sighup = signal(SignalKind::hangup()).context("failed to install SIGHUP handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;

    let received = tokio::select! {
        _ = sighup.recv() => Signal::Hangup,
        _ = sigint.recv() => Signal::Interrupt,
        _ = sigterm.recv() => Signal::Terminate,
    };
    info!("received {received}");
    Ok(received)
}

/// Resolves on Ctrl+C, reported as SIGINT.
///
/// # Errors
///
/// Returns an error if the Ctrl+C handler cannot be installed.
#[cfg(not(unix))]
pub async fn wait_for_signal() -> anyhow::Result<Signal> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("received {}", Signal::Interrupt);
    Ok(Signal::Interrupt)
}
