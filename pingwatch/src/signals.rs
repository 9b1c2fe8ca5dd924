//! Signal flags, set by `signal-hook`'s registered handlers and polled at
//! the top of each event-loop iteration — replacing the original's
//! handler-mutates-global-state pattern with the documented safe
//! equivalent (see `signal_hook::flag`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM, SIGWINCH};
use signal_hook::flag;

pub struct Signals {
    pub shutdown: Arc<AtomicBool>,
    pub winch: Arc<AtomicBool>,
}

impl Signals {
    pub fn install() -> std::io::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let winch = Arc::new(AtomicBool::new(false));

        flag::register(SIGHUP, Arc::clone(&shutdown))?;
        flag::register(SIGINT, Arc::clone(&shutdown))?;
        flag::register(SIGTERM, Arc::clone(&shutdown))?;
        flag::register(SIGWINCH, Arc::clone(&winch))?;

        Ok(Self { shutdown, winch })
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Returns whether a resize occurred since the last check, clearing the
    /// flag as a side effect.
    pub fn take_winch(&self) -> bool {
        self.winch.swap(false, Ordering::Relaxed)
    }
}
