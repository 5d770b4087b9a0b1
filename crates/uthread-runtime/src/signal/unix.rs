//! Unix signal handling for timer preemption

use nix::errno::Errno;
use nix::sys::pthread::{pthread_kill, pthread_self, Pthread};
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uthread_core::error::TimerError;

/// OS thread that called `init`; ticks are only processed there
static OWNER: AtomicUsize = AtomicUsize::new(0);
static OWNER_SET: AtomicBool = AtomicBool::new(false);

fn single(sig: Signal) -> SigSet {
    let mut set = SigSet::empty();
    set.add(sig);
    set
}

fn mask_error(e: Errno) -> TimerError {
    TimerError::Mask(e as i32)
}

/// Install `handler` for `sig` and record the calling thread as owner.
///
/// `sig` stays blocked while the handler runs; interrupted system calls
/// are restarted.
pub fn install_handler(sig: Signal, handler: extern "C" fn(libc::c_int)) -> Result<(), TimerError> {
    let action = SigAction::new(SigHandler::Handler(handler), SaFlags::SA_RESTART, single(sig));
    // SAFETY: the handler only touches state guarded by the timer mask.
    unsafe { signal::sigaction(sig, &action) }
        .map_err(|e| TimerError::HandlerInstall(e as i32))?;

    OWNER.store(pthread_self() as usize, Ordering::SeqCst);
    OWNER_SET.store(true, Ordering::SeqCst);
    Ok(())
}

/// Put back the default disposition for `sig`
pub fn restore_default(sig: Signal) -> Result<(), TimerError> {
    let action = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    // SAFETY: installing SIG_DFL.
    unsafe { signal::sigaction(sig, &action) }
        .map_err(|e| TimerError::HandlerInstall(e as i32))?;
    Ok(())
}

/// Whether the caller is the OS thread the uthreads run on
#[inline]
pub fn on_owner_thread() -> bool {
    !OWNER_SET.load(Ordering::Relaxed) || OWNER.load(Ordering::Relaxed) == pthread_self() as usize
}

/// Re-raise `sig` on the owner thread. Async-signal-safe.
pub fn forward_to_owner(sig: Signal) -> bool {
    if !OWNER_SET.load(Ordering::Relaxed) {
        return false;
    }
    let owner = OWNER.load(Ordering::Relaxed) as Pthread;
    pthread_kill(owner, sig).is_ok()
}

/// Block `sig` on the calling thread
pub fn mask(sig: Signal) -> Result<(), TimerError> {
    signal::pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&single(sig)), None).map_err(mask_error)
}

/// Unblock `sig` on the calling thread
pub fn unmask(sig: Signal) -> Result<(), TimerError> {
    signal::pthread_sigmask(SigmaskHow::SIG_UNBLOCK, Some(&single(sig)), None).map_err(mask_error)
}

/// Whether `sig` is currently blocked on the calling thread
pub fn is_masked(sig: Signal) -> bool {
    SigSet::thread_get_mask()
        .map(|set| set.contains(sig))
        .unwrap_or(false)
}

/// RAII guard keeping the timer signal blocked
///
/// Dropping restores the mask that was in place on entry, so nested
/// sections leave the signal blocked until the outermost one ends. The
/// guard lives on the stack of the thread that entered it; a thread that
/// is switched out while holding one unmasks when it is resumed and the
/// guard drops.
#[must_use = "the signal is unmasked again when the guard is dropped"]
pub struct CriticalSection {
    previous: SigSet,
    // Mask state is per OS thread
    _not_send: PhantomData<*const ()>,
}

impl CriticalSection {
    pub fn enter(sig: Signal) -> Result<Self, TimerError> {
        let previous = single(sig)
            .thread_swap_mask(SigmaskHow::SIG_BLOCK)
            .map_err(mask_error)?;
        Ok(Self {
            previous,
            _not_send: PhantomData,
        })
    }

    /// Whether this section was entered with the signal already blocked
    pub fn is_nested(&self, sig: Signal) -> bool {
        self.previous.contains(sig)
    }
}

impl Drop for CriticalSection {
    fn drop(&mut self) {
        let _ = self.previous.thread_set_mask();
    }
}
