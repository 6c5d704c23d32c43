//! SIGINT/SIGTERM handling for processes parked in semaphore waits.
//!
//! The handler does only async-signal-safe work: it raises a process-local
//! flag and, if a wake target is registered, posts that semaphore once. The
//! post covers a signal that lands just before a process enters `sem_wait`,
//! which `EINTR` alone would miss. Cleanup itself always runs from normal
//! control flow after the interrupted wait returns.
//!
//! Handlers are installed without `SA_RESTART`, so a blocked `sem_wait`
//! fails with `EINTR` instead of being resumed.

use crate::semaphore::NamedSemaphore;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

static REQUESTED: AtomicBool = AtomicBool::new(false);
static WAKE_TARGET: AtomicPtr<libc::sem_t> = AtomicPtr::new(ptr::null_mut());

extern "C" fn on_shutdown_signal(_signal: libc::c_int) {
    REQUESTED.store(true, Ordering::SeqCst);
    let target = WAKE_TARGET.load(Ordering::SeqCst);
    if !target.is_null() {
        // SAFETY: sem_post is async-signal-safe, and the target is cleared
        // before the semaphore it points to is closed.
        unsafe { libc::sem_post(target) };
    }
}

/// Installs the shutdown handler for SIGINT and SIGTERM.
pub fn install() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_shutdown_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for sig in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only touches atomics and calls sem_post.
        unsafe { signal::sigaction(sig, &action)? };
    }
    Ok(())
}

/// True once a shutdown signal has been received by this process.
pub fn requested() -> bool {
    REQUESTED.load(Ordering::SeqCst)
}

/// Registers the semaphore the handler posts to wake this process.
pub(crate) fn set_wake_target(sem: &NamedSemaphore) {
    WAKE_TARGET.store(sem.as_raw(), Ordering::SeqCst);
}

/// Unregisters `sem` if it is the current wake target. Must run before the
/// semaphore is closed.
pub(crate) fn clear_wake_target(sem: &NamedSemaphore) {
    let _ = WAKE_TARGET.compare_exchange(
        sem.as_raw(),
        ptr::null_mut(),
        Ordering::SeqCst,
        Ordering::SeqCst,
    );
}
