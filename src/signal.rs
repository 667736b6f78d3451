//! Process-wide interrupt flag, installed once before the poll loop starts
//! (spec §5 / §9). Grounded on
//! `examples/original_source/src/signal/SignalHandler.cpp`'s
//! `volatile sig_atomic_t isInterrupted` + `handleSignals()`: a signal-safe
//! flag flipped by the SIGINT handler, checked by `ServerManager::run`
//! between poll cycles, and SIGPIPE ignored process-wide since every socket
//! write already tolerates a dropped peer instead of dying to the signal.

use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigint(_sig: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Install the SIGINT handler and ignore SIGPIPE. Call once at startup,
/// before `ServerManager::run`.
pub fn install() {
    unsafe {
        libc::signal(libc::SIGINT, handle_sigint as libc::sighandler_t);
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
}

pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_flips_the_flag() {
        handle_sigint(libc::SIGINT);
        assert!(is_interrupted());
        INTERRUPTED.store(false, Ordering::SeqCst);
    }
}
