//! aarch64 context switching implementation
//!
//! AAPCS64 callee-saved state: x19-x28, frame pointer, link register, sp
//! and the low halves of v8-v15.

use std::arch::naked_asm;
use uthread_core::constants::STACK_ALIGN;

/// Saved execution context
///
/// Offsets are fixed; `switch_context` addresses fields directly.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SavedRegs {
    pub x: [u64; 10], // x19-x28, 0x00
    pub fp: u64,      // x29, 0x50
    pub lr: u64,      // x30, 0x58
    pub sp: u64,      // 0x60
    pub d: [u64; 8],  // d8-d15, 0x68
}

impl SavedRegs {
    pub const fn new() -> Self {
        Self {
            x: [0; 10],
            fp: 0,
            lr: 0,
            sp: 0,
            d: [0; 8],
        }
    }

    #[inline]
    pub fn stack_pointer(&self) -> usize {
        self.sp as usize
    }

    #[inline]
    pub fn resume_address(&self) -> usize {
        self.lr as usize
    }
}

/// Prepare `regs` so that switching to it calls `start` on a fresh stack.
///
/// # Safety
///
/// `stack_top` must be the top of a writable stack that outlives the context.
#[inline]
pub unsafe fn bootstrap(regs: &mut SavedRegs, stack_top: *mut u8, start: extern "C" fn() -> !) {
    *regs = SavedRegs::new();
    regs.sp = (stack_top as u64) & !(STACK_ALIGN as u64 - 1);
    regs.lr = thread_trampoline as usize as u64;
    regs.x[0] = start as usize as u64;
}

/// First code a fresh thread runs: call the start routine held in x19.
#[unsafe(naked)]
pub unsafe extern "C" fn thread_trampoline() {
    naked_asm!(
        "mov x29, xzr",
        "mov x30, xzr",
        "blr x19",
        "brk #1",
    );
}

/// Save the current context into `from` and resume `to`.
///
/// # Safety
///
/// Both pointers must be valid; `to` must hold a context produced by
/// `bootstrap` or by a previous `switch_context`.
#[unsafe(naked)]
pub unsafe extern "C" fn switch_context(_from: *mut SavedRegs, _to: *const SavedRegs) {
    naked_asm!(
        // Save into `from` (x0)
        "stp x19, x20, [x0, #0x00]",
        "stp x21, x22, [x0, #0x10]",
        "stp x23, x24, [x0, #0x20]",
        "stp x25, x26, [x0, #0x30]",
        "stp x27, x28, [x0, #0x40]",
        "stp x29, x30, [x0, #0x50]",
        "mov x9, sp",
        "str x9, [x0, #0x60]",
        "stp d8, d9, [x0, #0x68]",
        "stp d10, d11, [x0, #0x78]",
        "stp d12, d13, [x0, #0x88]",
        "stp d14, d15, [x0, #0x98]",
        // Load from `to` (x1)
        "ldp x19, x20, [x1, #0x00]",
        "ldp x21, x22, [x1, #0x10]",
        "ldp x23, x24, [x1, #0x20]",
        "ldp x25, x26, [x1, #0x30]",
        "ldp x27, x28, [x1, #0x40]",
        "ldp x29, x30, [x1, #0x50]",
        "ldr x9, [x1, #0x60]",
        "mov sp, x9",
        "ldp d8, d9, [x1, #0x68]",
        "ldp d10, d11, [x1, #0x78]",
        "ldp d12, d13, [x1, #0x88]",
        "ldp d14, d15, [x1, #0x98]",
        // Resume at the saved link register
        "ret",
    );
}
