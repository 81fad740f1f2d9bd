//! Ctrl+C / SIGTERM handling
//!
//! The sync loop is synchronous; signals are awaited on a dedicated thread
//! running a single-threaded tokio runtime, which raises the stop flag.
//! Handlers are registered before `install` returns, so a signal that
//! arrives during the first cycle is caught.

use tracing::info;
use vaultsync_core::StopHandle;

/// Raise `stop` on the first Ctrl+C or SIGTERM.
pub fn install(stop: StopHandle) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let signals = {
        let _guard = runtime.enter();
        Signals::register()?
    };

    std::thread::Builder::new()
        .name("vaultsync-signals".to_string())
        .spawn(move || {
            runtime.block_on(signals.recv());
            stop.request_stop();
        })?;
    Ok(())
}

#[cfg(unix)]
struct Signals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => {
                info!("Received Ctrl+C, finishing the current cycle");
            },
            _ = self.terminate.recv() => {
                info!("Received SIGTERM, finishing the current cycle");
            },
        }
    }
}

#[cfg(windows)]
struct Signals {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(windows)]
impl Signals {
    fn register() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    async fn recv(mut self) {
        self.ctrl_c.recv().await;
        info!("Received Ctrl+C, finishing the current cycle");
    }
}
