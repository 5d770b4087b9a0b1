//! Signal handling for preemption
//!
//! The preemption timer's signal is the only source of asynchronous
//! re-entry into the scheduler. This module installs its handler,
//! provides the critical-section mask every scheduler mutation runs
//! under, and routes a signal that reached the wrong OS thread back to
//! the one that owns the uthreads.

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use unix::*;
    } else {
        compile_error!("uthread preemption requires a unix target");
    }
}
