//! Ctrl+C handling for long-running commands.
//!
//! The first Ctrl+C asks the running command to stop (playback or a pending
//! request); a second one exits the process at once with [`EXIT_CODE`].

use std::fmt;
use std::pin::pin;
use std::process;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tokio::sync::Notify;

/// Exit status of a command stopped by Ctrl+C.
pub const EXIT_CODE: i32 = 130;

struct StopSignal {
    requested: AtomicBool,
    wake: Notify,
}

static STOP: LazyLock<StopSignal> = LazyLock::new(|| StopSignal {
    requested: AtomicBool::new(false),
    wake: Notify::new(),
});

/// Returned by commands that stopped because of Ctrl+C.
#[derive(Debug)]
pub struct InterruptedError;

impl fmt::Display for InterruptedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Interrupted")
    }
}

impl std::error::Error for InterruptedError {}

/// Routes Ctrl+C to [`request_stop`].
///
/// # Errors
/// Returns an error if a handler is already registered.
pub fn init() -> Result<()> {
    ctrlc::set_handler(request_stop).context("Error setting Ctrl+C handler")
}

/// Marks the process as stopping and wakes every waiter. A repeated request
/// exits immediately.
pub fn request_stop() {
    if STOP.requested.swap(true, Ordering::SeqCst) {
        process::exit(EXIT_CODE);
    }
    STOP.wake.notify_waiters();
}

pub fn stop_requested() -> bool {
    STOP.requested.load(Ordering::SeqCst)
}

/// Resolves once a stop has been requested, immediately if one already was.
pub async fn wait_for_interrupt() {
    let mut notified = pin!(STOP.wake.notified());
    // Register before checking the flag so a request in between is not lost.
    if notified.as_mut().enable() || stop_requested() {
        return;
    }
    notified.await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_request_wakes_pending_and_later_waiters() {
        let pending = tokio::spawn(wait_for_interrupt());
        tokio::task::yield_now().await;
        assert!(!stop_requested());

        request_stop();

        pending.await.unwrap();
        assert!(stop_requested());
        wait_for_interrupt().await;
    }
}
