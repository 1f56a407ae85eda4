//! Graceful shutdown on process termination signals.

use std::fmt;
use std::io;

use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    Terminate,
    Interrupt,
    CtrlBreak,
    CtrlClose,
    CtrlShutdown,
}

impl fmt::Display for StopSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StopSignal::Terminate => "SIGTERM",
            StopSignal::Interrupt => "SIGINT",
            StopSignal::CtrlBreak => "CTRL_BREAK",
            StopSignal::CtrlClose => "CTRL_CLOSE",
            StopSignal::CtrlShutdown => "CTRL_SHUTDOWN",
        };
        f.write_str(name)
    }
}

#[cfg(unix)]
async fn wait_for_signal_impl() -> io::Result<StopSignal> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    Ok(tokio::select! {
        _ = terminate.recv() => StopSignal::Terminate,
        _ = interrupt.recv() => StopSignal::Interrupt,
    })
}

#[cfg(windows)]
async fn wait_for_signal_impl() -> io::Result<StopSignal> {
    use tokio::signal::windows;

    let mut ctrl_c = windows::ctrl_c()?;
    let mut ctrl_break = windows::ctrl_break()?;
    let mut ctrl_close = windows::ctrl_close()?;
    let mut ctrl_shutdown = windows::ctrl_shutdown()?;

    Ok(tokio::select! {
        _ = ctrl_c.recv() => StopSignal::Interrupt,
        _ = ctrl_break.recv() => StopSignal::CtrlBreak,
        _ = ctrl_close.recv() => StopSignal::CtrlClose,
        _ = ctrl_shutdown.recv() => StopSignal::CtrlShutdown,
    })
}

/// Registers the handlers and resolves on the first stop request.
/// Fails only if a handler cannot be installed.
pub async fn wait_for_stop_signal() -> io::Result<StopSignal> {
    wait_for_signal_impl().await
}

/// Graceful shutdown trigger for servers. Never resolves if the handlers
/// cannot be installed: the process then runs until killed.
pub async fn shutdown_signal() {
    stop_requested(wait_for_stop_signal()).await
}

async fn stop_requested<F>(wait: F)
where
    F: Future<Output = io::Result<StopSignal>>,
{
    match wait.await {
        Ok(sig) => debug!("Received signal: {}", sig),
        Err(e) => {
            error!("stop signal handler unavailable, graceful shutdown disabled: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
