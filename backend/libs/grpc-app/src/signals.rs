//! Termination triggers for `App::run`

use std::fmt;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

/// What ended the serving period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    CtrlC,
    #[cfg(unix)]
    Sigterm,
    Timeout,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::CtrlC => f.write_str("ctrl-c"),
            #[cfg(unix)]
            Termination::Sigterm => f.write_str("sigterm"),
            Termination::Timeout => f.write_str("timeout"),
        }
    }
}

/// Wait for Ctrl+C, SIGTERM, or the optional timeout, whichever fires first.
///
/// A signal handler that cannot be installed is logged and treated as one
/// that never fires, so the server keeps serving.
pub async fn wait_for_termination(timeout: Option<Duration>) -> Termination {
    let termination = tokio::select! {
        t = wait_ctrl_c() => t,
        t = wait_sigterm() => t,
        t = wait_timeout(timeout) => t,
    };

    info!(trigger = %termination, "Termination requested, initiating graceful shutdown");
    termination
}

async fn wait_ctrl_c() -> Termination {
    match signal::ctrl_c().await {
        Ok(()) => Termination::CtrlC,
        Err(e) => {
            error!(error = %e, "Error handling Ctrl+C signal");
            std::future::pending().await
        }
    }
}

#[cfg(unix)]
async fn wait_sigterm() -> Termination {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut handler) => {
            handler.recv().await;
            Termination::Sigterm
        }
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_sigterm() -> Termination {
    std::future::pending().await
}

async fn wait_timeout(timeout: Option<Duration>) -> Termination {
    match timeout {
        Some(duration) => {
            tokio::time::sleep(duration).await;
            Termination::Timeout
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_ends_wait() {
        let termination = wait_for_termination(Some(Duration::from_secs(5))).await;
        assert_eq!(termination, Termination::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_timeout_keeps_waiting() {
        let waited =
            tokio::time::timeout(Duration::from_secs(60), wait_for_termination(None)).await;
        assert!(waited.is_err());
    }
}
