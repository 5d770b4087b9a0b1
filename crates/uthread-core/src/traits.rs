//! Platform trait
//!
//! The scheduler core never touches raw memory or registers. Everything
//! that does (stack mapping, register snapshots, the entry point type)
//! is supplied by an implementation of [`ThreadPlatform`], which lives in
//! `uthread-runtime` for real threads and in test modules as a mock.

use crate::error::MemoryError;

/// Resources the scheduler needs from the platform
pub trait ThreadPlatform {
    /// Owned stack memory; released when dropped
    type Stack;

    /// Saved execution context (register snapshot)
    type Context;

    /// User entry point, held by the TCB until the thread first runs
    type Entry;

    /// Allocate a fresh stack for a new thread
    fn allocate_stack(&mut self) -> Result<Self::Stack, MemoryError>;

    /// Context that starts executing the bootstrap routine on `stack` the
    /// first time it is resumed
    fn bootstrap_context(&mut self, stack: &Self::Stack) -> Self::Context;

    /// Empty context for the initial thread; filled by its first suspend
    fn main_context(&mut self) -> Self::Context;
}
