// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Graceful-shutdown signal handling.
//!
//! All ten termination signals are treated identically: the first delivery
//! raises a flag that the cycle loop observes between cycles. Nothing is
//! interrupted mid-transaction; an exchange in flight runs to completion or
//! to socket error before the flag is seen.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

/// The signals that terminate the bridge gracefully.
///
/// `SIGIO`/`SIGPOLL` share a number on Linux; both spellings are listed so
/// the intent stays visible on platforms where they differ.
pub const TERM_SIGNALS: [(i32, &str); 10] = [
    (libc::SIGINT, "SIGINT"),
    (libc::SIGTERM, "SIGTERM"),
    (libc::SIGHUP, "SIGHUP"),
    (libc::SIGIO, "SIGIO"),
    (libc::SIGPIPE, "SIGPIPE"),
    (libc::SIGPOLL, "SIGPOLL"),
    (libc::SIGPROF, "SIGPROF"),
    (libc::SIGUSR1, "SIGUSR1"),
    (libc::SIGUSR2, "SIGUSR2"),
    (libc::SIGVTALRM, "SIGVTALRM"),
];

// =============================================================================
// ShutdownFlag
// =============================================================================

/// A clonable flag raised on the first termination signal.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    raised: Arc<AtomicBool>,
}

impl ShutdownFlag {
    /// Creates a lowered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag. Idempotent.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once shutdown has been requested.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

/// Installs one listener per termination signal; each raises `flag` on
/// delivery.
///
/// Must run inside a tokio runtime. Fails when the OS refuses a handler
/// registration.
pub fn install_handlers(flag: &ShutdownFlag) -> io::Result<()> {
    for (number, name) in TERM_SIGNALS {
        let mut stream = signal(SignalKind::from_raw(number))?;
        let flag = flag.clone();
        tokio::spawn(async move {
            if stream.recv().await.is_some() {
                info!(signal = name, "termination signal received");
                flag.raise();
            }
        });
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn flag_starts_lowered_and_latches() {
        let flag = ShutdownFlag::new();
        assert!(!flag.is_raised());

        flag.raise();
        assert!(flag.is_raised());

        // Clones observe the same state.
        let clone = flag.clone();
        assert!(clone.is_raised());
    }

    #[tokio::test]
    async fn signal_raises_flag() {
        let flag = ShutdownFlag::new();
        install_handlers(&flag).unwrap();

        // SAFETY: raising a signal in our own process; the handler above
        // turns it into a flag store.
        unsafe {
            libc::raise(libc::SIGUSR2);
        }

        for _ in 0..100 {
            if flag.is_raised() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("SIGUSR2 did not raise the shutdown flag");
    }
}
