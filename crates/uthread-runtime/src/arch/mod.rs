//! Architecture-specific context switching
//!
//! Each architecture provides the same surface:
//! - `SavedRegs` - callee-saved register snapshot
//! - `bootstrap` - make a context that enters a start routine on a new stack
//! - `switch_context` - save the current context, resume another
//! - `thread_trampoline` - first frame of every spawned thread

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        mod x86_64;
        pub use self::x86_64::*;
    } else if #[cfg(target_arch = "aarch64")] {
        mod aarch64;
        pub use self::aarch64::*;
    } else {
        compile_error!("Unsupported architecture");
    }
}
