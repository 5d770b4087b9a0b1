//! x86_64 context switching implementation
//!
//! Only the System V callee-saved state is kept: every switch happens
//! through a function call, so the caller-saved registers are already dead.

use std::arch::naked_asm;
use uthread_core::constants::STACK_ALIGN;

/// MXCSR after reset: all exceptions masked, round to nearest
const MXCSR_DEFAULT: u32 = 0x1F80;

/// x87 control word after `fninit`
const FPU_CW_DEFAULT: u16 = 0x037F;

/// Saved execution context
///
/// Offsets are fixed; `switch_context` addresses fields directly.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SavedRegs {
    pub rsp: u64,    // 0x00
    pub rip: u64,    // 0x08
    pub rbx: u64,    // 0x10
    pub rbp: u64,    // 0x18
    pub r12: u64,    // 0x20
    pub r13: u64,    // 0x28
    pub r14: u64,    // 0x30
    pub r15: u64,    // 0x38
    pub mxcsr: u32,  // 0x40
    pub fpu_cw: u16, // 0x44
    _pad: u16,
}

impl SavedRegs {
    pub const fn new() -> Self {
        Self {
            rsp: 0,
            rip: 0,
            rbx: 0,
            rbp: 0,
            r12: 0,
            r13: 0,
            r14: 0,
            r15: 0,
            mxcsr: MXCSR_DEFAULT,
            fpu_cw: FPU_CW_DEFAULT,
            _pad: 0,
        }
    }

    /// Stack pointer the context resumes with
    #[inline]
    pub fn stack_pointer(&self) -> usize {
        self.rsp as usize
    }

    /// Address execution resumes at
    #[inline]
    pub fn resume_address(&self) -> usize {
        self.rip as usize
    }
}

impl Default for SavedRegs {
    fn default() -> Self {
        Self::new()
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
    // 16-byte aligned before the trampoline's `call`, as the ABI requires
    regs.rsp = (stack_top as u64) & !(STACK_ALIGN as u64 - 1);
    regs.rip = thread_trampoline as usize as u64;
    regs.r12 = start as usize as u64;
}

/// First code a fresh thread runs: clear the frame chain, call the start
/// routine held in r12. The start routine never returns.
#[unsafe(naked)]
pub unsafe extern "C" fn thread_trampoline() {
    naked_asm!(
        "xor ebp, ebp",
        "call r12",
        "ud2",
    );
}

/// Save the current context into `from` and resume `to`.
///
/// Returns when some later switch resumes `from`.
///
/// # Safety
///
/// Both pointers must be valid; `to` must hold a context produced by
/// `bootstrap` or by a previous `switch_context`.
#[unsafe(naked)]
pub unsafe extern "C" fn switch_context(_from: *mut SavedRegs, _to: *const SavedRegs) {
    naked_asm!(
        // Save into `from` (RDI)
        "mov [rdi + 0x00], rsp",
        "lea rax, [rip + 2f]",
        "mov [rdi + 0x08], rax",
        "mov [rdi + 0x10], rbx",
        "mov [rdi + 0x18], rbp",
        "mov [rdi + 0x20], r12",
        "mov [rdi + 0x28], r13",
        "mov [rdi + 0x30], r14",
        "mov [rdi + 0x38], r15",
        "stmxcsr dword ptr [rdi + 0x40]",
        "fnstcw word ptr [rdi + 0x44]",
        // Load from `to` (RSI)
        "mov rsp, [rsi + 0x00]",
        "mov rax, [rsi + 0x08]",
        "mov rbx, [rsi + 0x10]",
        "mov rbp, [rsi + 0x18]",
        "mov r12, [rsi + 0x20]",
        "mov r13, [rsi + 0x28]",
        "mov r14, [rsi + 0x30]",
        "mov r15, [rsi + 0x38]",
        "ldmxcsr dword ptr [rsi + 0x40]",
        "fldcw word ptr [rsi + 0x44]",
        "jmp rax",
        // Resume point of a saved context
        "2:",
        "ret",
    );
}
