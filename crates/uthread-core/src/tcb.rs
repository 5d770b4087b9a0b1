//! Thread control block

use crate::id::Tid;
use crate::state::ThreadState;
use crate::traits::ThreadPlatform;

/// Per-thread bookkeeping
///
/// The TCB owns its stack; dropping the TCB releases it. The main thread
/// runs on the process stack and has none.
pub struct Tcb<P: ThreadPlatform> {
    tid: Tid,

    pub(crate) state: ThreadState,

    pub(crate) stack: Option<P::Stack>,

    /// Valid once the thread has been switched out at least once, or
    /// since spawn for a thread that has never run (bootstrap context)
    pub(crate) context: P::Context,

    /// Entry point of a thread that has not run yet
    pub(crate) entry: Option<P::Entry>,

    /// Quanta during which this thread was the running one
    pub(crate) quantums_run: u64,

    /// Ticks left before a sleeping thread may run. Zero when not asleep.
    pub(crate) sleep_remaining: u32,
}

impl<P: ThreadPlatform> Tcb<P> {
    /// TCB for the initial thread, already running its first quantum
    pub(crate) fn main(context: P::Context) -> Self {
        Self {
            tid: Tid::MAIN,
            state: ThreadState::Running,
            stack: None,
            context,
            entry: None,
            quantums_run: 1,
            sleep_remaining: 0,
        }
    }

    /// TCB for a spawned thread, ready but never run
    pub(crate) fn spawned(tid: Tid, stack: P::Stack, context: P::Context, entry: P::Entry) -> Self {
        Self {
            tid,
            state: ThreadState::Ready,
            stack: Some(stack),
            context,
            entry: Some(entry),
            quantums_run: 0,
            sleep_remaining: 0,
        }
    }

    #[inline]
    pub fn tid(&self) -> Tid {
        self.tid
    }

    #[inline]
    pub fn state(&self) -> ThreadState {
        self.state
    }

    #[inline]
    pub fn quantums_run(&self) -> u64 {
        self.quantums_run
    }

    #[inline]
    pub fn sleep_remaining(&self) -> u32 {
        self.sleep_remaining
    }

    /// Whether a sleep countdown is active (regardless of blocking)
    #[inline]
    pub fn is_asleep(&self) -> bool {
        self.sleep_remaining > 0
    }

    #[inline]
    pub fn has_started(&self) -> bool {
        self.entry.is_none()
    }

    #[inline]
    pub fn stack(&self) -> Option<&P::Stack> {
        self.stack.as_ref()
    }
}

impl<P: ThreadPlatform> core::fmt::Debug for Tcb<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tcb")
            .field("tid", &self.tid)
            .field("state", &self.state)
            .field("quantums_run", &self.quantums_run)
            .field("sleep_remaining", &self.sleep_remaining)
            .field("started", &self.has_started())
            .finish()
    }
}
