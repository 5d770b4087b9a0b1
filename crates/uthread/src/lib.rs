//! # uthread - preemptive user-level threads
//!
//! Green threads multiplexed onto the calling OS thread. Threads are
//! scheduled round-robin from a FIFO ready queue and preempted by an
//! interval timer at the end of every quantum.
//!
//! ## Quick Start
//!
//! ```ignore
//! use uthread::{critical, get_tid, init, spawn};
//!
//! fn main() {
//!     init(10_000).unwrap(); // 10ms quantum; this thread becomes tid 0
//!
//!     let tid = spawn(|| {
//!         critical(|| println!("hello from {}", get_tid().unwrap()));
//!     })
//!     .unwrap();
//!
//!     // Spin until the timer hands the CPU to `tid` and it finishes
//!     while uthread::thread_state(tid).is_ok() {}
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      User Code                              │
//! │      init, spawn, block, resume, sleep, terminate, ...      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │               Runtime (uthread-runtime)                     │
//! │   signal mask, timer handler, register switch, stacks       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Scheduler core (uthread-core)                  │
//! │     TCB table, FIFO ready queue, sleep set, accounting      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Caveats
//!
//! Any thread may be preempted at any instruction. Code that is not
//! reentrant with respect to other uthreads on the same OS thread
//! (printing through `std::io`, heap allocation, holding a lock) must
//! run inside [`critical`].
//!
//! Usage errors are returned and reported on stderr as
//! `thread library error: <msg>`. System errors (out of memory, timer
//! failures) print `system error: <msg>` and exit the process with
//! status 1.

pub mod ffi;

// Re-export core types
pub use uthread_core::{ThreadError, ThreadResult, ThreadState, Tid};

// Re-export kprint macros for debug logging
pub use uthread_core::{kdebug, kerror, kinfo, kprintln, ktrace, kwarn};
pub use uthread_core::kprint::{self, set_log_level, LogLevel};

// Re-export runtime configuration
pub use uthread_runtime::{RuntimeConfig, TimerKind};

use uthread_runtime::runtime;

/// Print usage errors the way the library reports them
fn report<T>(result: ThreadResult<T>) -> ThreadResult<T> {
    if let Err(e) = &result {
        kprint::library_error(e);
    }
    result
}

/// Initialize the library with a quantum of `quantum_usecs` microseconds.
///
/// The calling thread becomes thread 0 and is running its first quantum.
/// Configuration comes from the compile-time defaults and `UT_*`
/// environment variables; see [`RuntimeConfig::from_env`].
pub fn init(quantum_usecs: u64) -> ThreadResult<()> {
    init_with_config(quantum_usecs, RuntimeConfig::from_env())
}

/// [`init`] with an explicit configuration
pub fn init_with_config(quantum_usecs: u64, config: RuntimeConfig) -> ThreadResult<()> {
    report(runtime::init(quantum_usecs, config))
}

/// Create a thread that runs `f`, returning its id.
///
/// The new thread is appended to the ready queue. It ends when `f`
/// returns, panics, or it is terminated.
pub fn spawn<F>(f: F) -> ThreadResult<Tid>
where
    F: FnOnce() + 'static,
{
    report(runtime::spawn(f))
}

/// Terminate thread `tid`.
///
/// Terminating thread 0 ends the process with status 0. Terminating the
/// calling thread does not return.
pub fn terminate(tid: Tid) -> ThreadResult<()> {
    report(runtime::terminate(tid))
}

/// Block thread `tid` until [`resume`]. Thread 0 cannot be blocked.
///
/// Blocking the caller switches to the next ready thread. Blocking a
/// blocked thread does nothing.
pub fn block(tid: Tid) -> ThreadResult<()> {
    report(runtime::block(tid))
}

/// Make a blocked thread runnable again. No effect on other threads.
///
/// A thread that was blocked while sleeping keeps sleeping until its
/// countdown ends.
pub fn resume(tid: Tid) -> ThreadResult<()> {
    report(runtime::resume(tid))
}

/// Suspend the calling thread for `num_quantums` timer ticks.
///
/// Thread 0 cannot sleep.
pub fn sleep(num_quantums: u32) -> ThreadResult<()> {
    report(runtime::sleep(num_quantums))
}

/// Id of the calling thread
pub fn get_tid() -> ThreadResult<Tid> {
    report(runtime::current())
}

/// Quanta started since `init`, the current one included
pub fn get_total_quantums() -> ThreadResult<u64> {
    report(runtime::total_quantums())
}

/// Quanta during which `tid` was running, the current one included
pub fn get_quantums(tid: Tid) -> ThreadResult<u64> {
    report(runtime::quantums(tid))
}

/// Scheduling state of a live thread
pub fn thread_state(tid: Tid) -> ThreadResult<ThreadState> {
    runtime::state(tid)
}

/// Run `f` with preemption held off.
///
/// Use this for work that must not be interleaved with other uthreads,
/// such as printing or allocating. A pending tick fires once `f` returns.
pub fn critical<R>(f: impl FnOnce() -> R) -> R {
    runtime::critical(f)
}

/// Whether [`init`] has completed
pub fn is_initialized() -> bool {
    runtime::is_initialized()
}
