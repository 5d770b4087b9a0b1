//! Error types for the uthread library

use core::fmt;
use crate::id::Tid;

/// Result type for library operations
pub type ThreadResult<T> = Result<T, ThreadError>;

/// Errors reported by library operations
///
/// Usage errors leave the scheduler untouched and are handed back to the
/// caller. Fatal errors (see [`ThreadError::is_fatal`]) mean the process
/// cannot keep scheduling; the runtime terminates the process on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadError {
    /// Quantum length must be positive
    InvalidQuantum,

    /// Identifier is outside `[0, MAX_THREADS)`
    InvalidTid(i64),

    /// Identifier is in range but no live thread owns it
    NoSuchThread(Tid),

    /// The main thread cannot be blocked
    BlockMain,

    /// The main thread cannot sleep
    SleepMain,

    /// Sleep length must be positive
    InvalidSleep,

    /// Entry point was null
    NullEntry,

    /// Every TCB slot is taken
    NoSlotsAvailable,

    /// `init` has not been called
    NotInitialized,

    /// `init` was already called
    AlreadyInitialized,

    /// Runtime configuration rejected
    InvalidConfig(&'static str),

    /// Stack memory could not be obtained
    Memory(MemoryError),

    /// Timer or signal setup failed
    Timer(TimerError),

    /// A switch was required but the ready queue was empty
    NothingToRun,
}

impl ThreadError {
    /// Whether the error is unrecoverable for the process
    #[inline]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            ThreadError::Memory(_) | ThreadError::Timer(_) | ThreadError::NothingToRun
        )
    }
}

impl fmt::Display for ThreadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadError::InvalidQuantum => write!(f, "quantum_usecs must be positive"),
            ThreadError::InvalidTid(tid) => write!(f, "thread id {} is out of range", tid),
            ThreadError::NoSuchThread(tid) => write!(f, "thread {} does not exist", tid),
            ThreadError::BlockMain => write!(f, "the main thread cannot be blocked"),
            ThreadError::SleepMain => write!(f, "the main thread cannot sleep"),
            ThreadError::InvalidSleep => write!(f, "num_quantums must be positive"),
            ThreadError::NullEntry => write!(f, "entry point is null"),
            ThreadError::NoSlotsAvailable => write!(f, "maximum number of threads reached"),
            ThreadError::NotInitialized => write!(f, "library not initialized"),
            ThreadError::AlreadyInitialized => write!(f, "library already initialized"),
            ThreadError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            ThreadError::Memory(e) => write!(f, "memory error: {}", e),
            ThreadError::Timer(e) => write!(f, "timer error: {}", e),
            ThreadError::NothingToRun => write!(f, "there are no threads to run"),
        }
    }
}

impl std::error::Error for ThreadError {}

/// Stack memory errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// mmap failed
    AllocationFailed(i32),

    /// mprotect of the guard page failed
    ProtectionFailed(i32),

    /// Requested stack size is too small or overflows
    InvalidSize(usize),
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::AllocationFailed(errno) => {
                write!(f, "stack allocation failed (errno {})", errno)
            }
            MemoryError::ProtectionFailed(errno) => {
                write!(f, "guard page protection failed (errno {})", errno)
            }
            MemoryError::InvalidSize(size) => write!(f, "invalid stack size {}", size),
        }
    }
}

impl From<MemoryError> for ThreadError {
    fn from(e: MemoryError) -> Self {
        ThreadError::Memory(e)
    }
}

/// Preemption timer errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// sigaction failed
    HandlerInstall(i32),

    /// setitimer failed
    Arm(i32),

    /// sigprocmask failed
    Mask(i32),
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerError::HandlerInstall(errno) => write!(f, "sigaction failed (errno {})", errno),
            TimerError::Arm(errno) => write!(f, "setitimer failed (errno {})", errno),
            TimerError::Mask(errno) => write!(f, "sigprocmask failed (errno {})", errno),
        }
    }
}

impl From<TimerError> for ThreadError {
    fn from(e: TimerError) -> Self {
        ThreadError::Timer(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = ThreadError::NoSuchThread(Tid::new(4));
        assert_eq!(format!("{}", e), "thread 4 does not exist");

        let e = ThreadError::Memory(MemoryError::AllocationFailed(12));
        assert_eq!(format!("{}", e), "memory error: stack allocation failed (errno 12)");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(!ThreadError::BlockMain.is_fatal());
        assert!(!ThreadError::NoSlotsAvailable.is_fatal());
        assert!(!ThreadError::InvalidTid(-1).is_fatal());
        assert!(ThreadError::NothingToRun.is_fatal());
        assert!(ThreadError::Timer(TimerError::Arm(22)).is_fatal());
    }

    #[test]
    fn test_error_conversion() {
        let err: ThreadError = MemoryError::InvalidSize(0).into();
        assert!(matches!(err, ThreadError::Memory(MemoryError::InvalidSize(0))));
        let err: ThreadError = TimerError::Mask(1).into();
        assert!(err.is_fatal());
    }
}
