//! # uthread-core
//!
//! Core types and the scheduler state machine for uthread, a library of
//! preemptively scheduled user-level threads.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! Stacks, register contexts, signals and the timer are provided by
//! `uthread-runtime` through the [`ThreadPlatform`] trait.
//!
//! ## Modules
//!
//! - `id` - Thread identifier type
//! - `state` - Thread state enum
//! - `tcb` - Thread control block
//! - `slot` - Fixed-capacity TCB table with lowest-free allocation
//! - `ready_queue` - FIFO of runnable threads
//! - `sleep_set` - Threads counting down a sleep
//! - `scheduler` - Spawn/terminate/block/resume/sleep/tick state machine
//! - `error` - Error types
//! - `traits` - Platform trait
//! - `kprint` - Signal-safe kernel-style print macros
//! - `env` - Environment variable utilities

pub mod id;
pub mod state;
pub mod tcb;
pub mod slot;
pub mod ready_queue;
pub mod sleep_set;
pub mod scheduler;
pub mod error;
pub mod traits;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use id::Tid;
pub use state::ThreadState;
pub use tcb::Tcb;
pub use slot::SlotTable;
pub use ready_queue::ReadyQueue;
pub use sleep_set::SleepSet;
pub use scheduler::{Scheduler, Switch, Termination};
pub use error::{MemoryError, ThreadError, ThreadResult, TimerError};
pub use traits::ThreadPlatform;
pub use env::{env_get, env_get_bool, env_get_opt, env_get_size};

/// Constants shared by all platforms
pub mod constants {
    /// Smallest stack accepted by the configuration
    pub const MIN_STACK_SIZE: usize = 16 * 1024;

    /// Guard page size (4 KB)
    pub const GUARD_SIZE: usize = 4096;

    /// Required stack pointer alignment at a call boundary
    pub const STACK_ALIGN: usize = 16;
}
