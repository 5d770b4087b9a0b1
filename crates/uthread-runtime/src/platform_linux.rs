//! Linux platform implementation

use crate::arch::{self, SavedRegs};
use crate::memory::StackRegion;
use uthread_core::error::MemoryError;
use uthread_core::traits::ThreadPlatform;

/// Boxed user entry point
pub type Entry = Box<dyn FnOnce() + 'static>;

/// Linux platform handler
///
/// Hands the scheduler mmap'ed stacks and register contexts that enter
/// `start` on their first resume.
pub struct LinuxPlatform {
    stack_size: usize,
    start: extern "C" fn() -> !,
}

impl LinuxPlatform {
    pub fn new(stack_size: usize, start: extern "C" fn() -> !) -> Self {
        Self { stack_size, start }
    }

    #[inline]
    pub fn stack_size(&self) -> usize {
        self.stack_size
    }
}

impl ThreadPlatform for LinuxPlatform {
    type Stack = StackRegion;
    type Context = SavedRegs;
    type Entry = Entry;

    fn allocate_stack(&mut self) -> Result<StackRegion, MemoryError> {
        StackRegion::allocate(self.stack_size)
    }

    fn bootstrap_context(&mut self, stack: &StackRegion) -> SavedRegs {
        let mut regs = SavedRegs::new();
        // SAFETY: the stack is owned by the TCB holding this context.
        unsafe { arch::bootstrap(&mut regs, stack.top(), self.start) };
        regs
    }

    fn main_context(&mut self) -> SavedRegs {
        SavedRegs::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn unreachable_start() -> ! {
        std::process::abort()
    }

    #[test]
    fn test_bootstrap_points_into_own_stack() {
        let mut platform = LinuxPlatform::new(32 * 1024, unreachable_start);
        let stack = platform.allocate_stack().unwrap();
        let regs = platform.bootstrap_context(&stack);

        assert!(stack.usable_size() >= platform.stack_size());
        assert!(stack.contains(regs.stack_pointer() - 1));
        assert_eq!(regs.resume_address(), arch::thread_trampoline as usize);
    }

    #[test]
    fn test_main_context_is_blank() {
        let mut platform = LinuxPlatform::new(32 * 1024, unreachable_start);
        assert_eq!(platform.main_context().stack_pointer(), 0);
    }

    #[test]
    fn test_scheduler_over_real_platform() {
        use uthread_core::{Scheduler, Tid};

        let platform = LinuxPlatform::new(32 * 1024, unreachable_start);
        let mut sched = Scheduler::new(platform, 4, 1_000).unwrap();
        let tid = sched.spawn(Box::new(|| {})).unwrap();
        assert_eq!(tid, Tid::new(1));
        assert!(sched.thread(tid).unwrap().stack().is_some());
        assert!(sched.take_entry(tid).is_some());
    }
}
