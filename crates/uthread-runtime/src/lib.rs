//! # uthread-runtime
//!
//! Platform-specific runtime for uthread.
//!
//! This crate provides:
//! - Stack memory (mmap with a guard page)
//! - Context switching (architecture-specific assembly)
//! - Timer preemption (`setitimer` + signal handler)
//! - Signal masking for scheduler critical sections
//! - The process-global runtime driving `uthread_core::Scheduler`

pub mod arch;
pub mod config;
pub mod memory;
pub mod runtime;
pub mod signal;
pub mod timer;

// Re-exports
pub use config::{ConfigError, RuntimeConfig};
pub use runtime::RuntimeScheduler;
pub use timer::{PreemptionTimer, TimerKind};

// Platform detection
cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod platform_linux;
        pub use platform_linux::{Entry, LinuxPlatform as CurrentPlatform};
    } else {
        compile_error!("Unsupported platform");
    }
}
