//! Shutdown signals for a process holding a mounted volume.
//!
//! The first SIGINT, SIGTERM or SIGHUP wakes [`ShutdownSignals::wait`] so the
//! caller can unmount cleanly; a second one exits the process immediately.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::flag;
use signal_hook::iterator::Signals;

/// Signals that request an unmount.
pub const SHUTDOWN_SIGNALS: [i32; 3] = [SIGINT, SIGTERM, SIGHUP];

/// Registered shutdown handlers.
pub struct ShutdownSignals {
    signals: Signals,
    requested: Arc<AtomicBool>,
}

impl ShutdownSignals {
    /// Registers handlers for [`SHUTDOWN_SIGNALS`].
    pub fn install() -> io::Result<Self> {
        let requested = Arc::new(AtomicBool::new(false));
        for sig in SHUTDOWN_SIGNALS {
            // Registered first so it sees the flag before this signal sets it.
            flag::register_conditional_shutdown(sig, 1, Arc::clone(&requested))?;
            flag::register(sig, Arc::clone(&requested))?;
        }
        let signals = Signals::new(SHUTDOWN_SIGNALS)?;
        Ok(Self { signals, requested })
    }

    /// Blocks until a shutdown signal arrives and returns it.
    pub fn wait(&mut self) -> i32 {
        self.signals.forever().next().unwrap_or(SIGTERM)
    }

    /// Whether a shutdown signal has been received.
    pub fn requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Conventional name of a shutdown signal.
pub fn signal_name(sig: i32) -> &'static str {
    match sig {
        SIGINT => "SIGINT",
        SIGTERM => "SIGTERM",
        SIGHUP => "SIGHUP",
        _ => "signal",
    }
}
