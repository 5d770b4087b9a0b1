//! Thread state

use core::fmt;

/// Scheduling state of a thread control block
///
/// A free table slot has no state at all; `Terminated` only appears as the
/// outgoing state handed to `schedule` when the running thread ends itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ThreadState {
    /// Owns the CPU. Exactly one TCB is in this state.
    Running = 0,

    /// Waiting in the ready queue
    Ready = 1,

    /// Explicitly blocked; may also be counting down a sleep
    Blocked = 2,

    /// Counting down a sleep and not blocked
    Sleeping = 3,

    /// Ended; the slot is about to be released
    Terminated = 4,
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThreadState::Running => "RUNNING",
            ThreadState::Ready => "READY",
            ThreadState::Blocked => "BLOCKED",
            ThreadState::Sleeping => "SLEEPING",
            ThreadState::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ThreadState::Sleeping.to_string(), "SLEEPING");
    }
}
