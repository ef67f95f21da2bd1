use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Resolves on Ctrl+C or, on unix, SIGTERM. Returns the signal name.
///
/// # Errors
/// Returns an error if a signal handler cannot be installed.
pub async fn wait_for_shutdown() -> anyhow::Result<&'static str> {
    let received = tokio::select! {
        biased;
        res = signal::ctrl_c() => res.map(|()| "SIGINT")?,
        res = terminate() => res?,
    };
    tracing::info!(signal = received, "shutdown signal received");
    Ok(received)
}

#[cfg(unix)]
async fn terminate() -> anyhow::Result<&'static str> {
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    sigterm.recv().await;
    Ok("SIGTERM")
}

#[cfg(not(unix))]
async fn terminate() -> anyhow::Result<&'static str> {
    std::future::pending().await
}

/// Cancel `cancel` when a shutdown signal arrives.
///
/// A failure to install handlers is logged and also cancels the token, so the
/// process never runs without a way to stop.
#[must_use]
pub fn spawn_shutdown_listener(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {}
            res = wait_for_shutdown() => {
                if let Err(e) = res {
                    tracing::error!(error = %e, "signal handling failed; shutting down");
                }
                cancel.cancel();
            }
        }
    })
}
