//! Turns SIGINT/SIGTERM into the poller's shutdown flag.

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, warn};

/// Spawns a task that flips `shutdown` to true on the first trapped signal.
///
/// The handlers are registered before this returns, so a signal sent
/// right after the call is already caught instead of killing the process.
pub fn spawn_signal_bridge(shutdown: watch::Sender<bool>) -> JoinHandle<()> {
    let signals = Signals::install();

    tokio::spawn(async move {
        let name = signals.recv().await;
        warn!("Received {}", name);
        if shutdown.send(true).is_err() {
            warn!("Poller already stopped, nothing to shut down");
        }
    })
}

/// Registered signal streams. A handler that failed to install is
/// logged and left as `None`; the other one stays armed.
#[cfg(unix)]
struct Signals {
    interrupt: Option<Signal>,
    terminate: Option<Signal>,
}

#[cfg(unix)]
impl Signals {
    fn install() -> Self {
        Self {
            interrupt: listen(SignalKind::interrupt(), "SIGINT"),
            terminate: listen(SignalKind::terminate(), "SIGTERM"),
        }
    }

    /// Resolves with the name of the first signal received.
    async fn recv(mut self) -> &'static str {
        tokio::select! {
            () = next(self.interrupt.as_mut()) => "SIGINT",
            () = next(self.terminate.as_mut()) => "SIGTERM",
        }
    }
}

#[cfg(unix)]
fn listen(kind: SignalKind, name: &str) -> Option<Signal> {
    match signal(kind) {
        Ok(stream) => Some(stream),
        Err(e) => {
            error!("Failed to install {} handler: {}", name, e);
            None
        }
    }
}

#[cfg(unix)]
async fn next(stream: Option<&mut Signal>) {
    match stream {
        Some(stream) => {
            stream.recv().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(not(unix))]
struct Signals {
    ctrl_c: Option<tokio::signal::windows::CtrlC>,
}

#[cfg(not(unix))]
impl Signals {
    fn install() -> Self {
        let ctrl_c = match tokio::signal::windows::ctrl_c() {
            Ok(stream) => Some(stream),
            Err(e) => {
                error!("Failed to install SIGINT handler: {}", e);
                None
            }
        };
        Self { ctrl_c }
    }

    async fn recv(mut self) -> &'static str {
        match self.ctrl_c.as_mut() {
            Some(stream) => {
                stream.recv().await;
            }
            None => std::future::pending::<()>().await,
        }
        "SIGINT"
    }
}
