//! Process-global runtime
//!
//! Glues the scheduler core to the real machine: one instance per process,
//! mutated only with the timer signal masked, either inside a
//! [`CriticalSection`] or from the timer handler (where the kernel keeps
//! the signal blocked). Every operation that hands the CPU to another
//! thread ends in [`commit`], which performs the register switch.
//!
//! Errors the caller can recover from are returned; fatal ones never
//! come back: the timer is disarmed, `system error: ...` is printed and
//! the process exits with status 1.

use crate::arch::{self, SavedRegs};
use crate::config::RuntimeConfig;
use crate::platform_linux::{Entry, LinuxPlatform};
use crate::signal::{self, CriticalSection};
use crate::timer::PreemptionTimer;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use std::panic::{self, AssertUnwindSafe};
use std::ptr::addr_of_mut;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use uthread_core::error::{ThreadError, ThreadResult};
use uthread_core::kprint::{self, LogLevel};
use uthread_core::{kdebug, kerror, ktrace, Scheduler, Switch, Termination, ThreadState, Tid};

/// Scheduler over the real platform
pub type RuntimeScheduler = Scheduler<LinuxPlatform>;

/// Everything the timer handler and the API share
pub(crate) struct Runtime {
    sched: RuntimeScheduler,
    timer: PreemptionTimer,
    rearm_on_switch: bool,
}

/// Global runtime instance
static mut RUNTIME: Option<Runtime> = None;
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Raw number of the timer signal, readable without touching `RUNTIME`
static TIMER_SIGNAL: AtomicI32 = AtomicI32::new(0);

/// # Safety
///
/// The timer signal must be masked (or the caller is the timer handler)
/// and no other reference obtained from here may be live.
#[inline]
unsafe fn runtime() -> Option<&'static mut Runtime> {
    (*addr_of_mut!(RUNTIME)).as_mut()
}

#[inline]
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

/// The preemption signal, once `init` has run
pub fn timer_signal() -> Option<Signal> {
    match TIMER_SIGNAL.load(Ordering::Acquire) {
        0 => None,
        raw => Signal::try_from(raw).ok(),
    }
}

/// Print `system error: <err>` and exit(1). Disarms the timer first.
pub fn fatal(err: &ThreadError) -> ! {
    stop_timer();
    kprint::system_error(err);
    std::process::exit(1)
}

/// `fatal` for the timer handler, where `exit` is not safe
fn fatal_in_handler(err: &ThreadError) -> ! {
    stop_timer();
    kprint::system_error(err);
    // SAFETY: _exit is async-signal-safe.
    unsafe { libc::_exit(1) }
}

/// Exit path for a switch: ticks commit from the signal handler
fn fatal_for(voluntary: bool) -> fn(&ThreadError) -> ! {
    if voluntary {
        fatal
    } else {
        fatal_in_handler
    }
}

fn stop_timer() {
    if let Some(sig) = timer_signal() {
        // Keep further ticks out while shutting down
        let _ = signal::mask(sig);
        // SAFETY: masked; nothing else can hold the runtime.
        if let Some(rt) = unsafe { runtime() } {
            let _ = rt.timer.disarm();
        }
        let _ = signal::restore_default(sig);
    }
}

/// Pass usage errors through, escalate fatal ones
#[inline]
fn escalate<T>(result: ThreadResult<T>) -> ThreadResult<T> {
    match result {
        Err(e) if e.is_fatal() => fatal(&e),
        other => other,
    }
}

/// Mask the timer for the lifetime of the returned guard
fn enter() -> ThreadResult<(CriticalSection, &'static mut Runtime)> {
    let sig = timer_signal().ok_or(ThreadError::NotInitialized)?;
    let guard = escalate(CriticalSection::enter(sig).map_err(ThreadError::from))?;
    // SAFETY: masked above; the reference does not outlive the guard.
    let rt = unsafe { runtime() }.ok_or(ThreadError::NotInitialized)?;
    Ok((guard, rt))
}

/// Run `op` on the runtime with the timer masked
fn with_runtime<T>(op: impl FnOnce(&mut Runtime) -> ThreadResult<T>) -> ThreadResult<T> {
    let (_guard, rt) = enter()?;
    escalate(op(rt))
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Initialize the library; the caller becomes thread 0.
pub fn init(quantum_usecs: u64, config: RuntimeConfig) -> ThreadResult<()> {
    if is_initialized() {
        return Err(ThreadError::AlreadyInitialized);
    }
    if quantum_usecs == 0 {
        return Err(ThreadError::InvalidQuantum);
    }
    config.validate()?;

    kprint::init();
    if config.debug_logging && kprint::log_level() < LogLevel::Debug {
        kprint::set_log_level(LogLevel::Debug);
    }

    let platform = LinuxPlatform::new(config.stack_size, thread_start);
    let sched = Scheduler::new(platform, config.max_threads, quantum_usecs)?;
    let timer = PreemptionTimer::new(config.timer, quantum_usecs);
    let sig = timer.signal();

    let _guard = escalate(CriticalSection::enter(sig).map_err(ThreadError::from))?;

    // SAFETY: not initialized yet and the signal is masked.
    unsafe {
        *addr_of_mut!(RUNTIME) = Some(Runtime {
            sched,
            timer,
            rearm_on_switch: config.rearm_on_switch,
        });
    }
    TIMER_SIGNAL.store(sig as i32, Ordering::Release);
    INITIALIZED.store(true, Ordering::Release);
    kprint::set_current_tid(Tid::MAIN.as_u32());

    escalate(signal::install_handler(sig, on_timer_signal).map_err(ThreadError::from))?;
    escalate(timer.arm().map_err(ThreadError::from))?;

    config.print();
    kdebug!("initialized: quantum {}us, timer {}", quantum_usecs, config.timer);
    Ok(())
}

/// Create a thread running `f`; it is appended to the ready queue.
pub fn spawn<F>(f: F) -> ThreadResult<Tid>
where
    F: FnOnce() + 'static,
{
    with_runtime(|rt| {
        // Boxed under the mask: the allocator is not reentrant
        let entry: Entry = Box::new(f);
        let tid = rt.sched.spawn(entry)?;
        kdebug!("spawn -> {}", tid);
        Ok(tid)
    })
}

/// End `tid`. Never returns when `tid` is the caller or thread 0.
pub fn terminate(tid: Tid) -> ThreadResult<()> {
    let (_guard, rt) = enter()?;
    match escalate(rt.sched.terminate(tid))? {
        Termination::Removed => {
            kdebug!("terminated {}", tid);
            Ok(())
        }
        Termination::Switch(sw) => {
            kdebug!("{} terminated itself", tid);
            // SAFETY: masked; `rt` is not used after the switch.
            unsafe { commit(rt, sw, true) };
            // A terminated context is never resumed
            fatal(&ThreadError::NoSuchThread(tid))
        }
        Termination::Process => exit_process(rt),
    }
}

fn exit_process(rt: &mut Runtime) -> ! {
    let _ = rt.timer.disarm();
    let _ = signal::restore_default(rt.timer.signal());
    let released = rt.sched.release_all();
    kdebug!("main thread terminated; released {} threads", released);
    std::process::exit(0)
}

/// Block `tid`; switches away when it is the caller.
pub fn block(tid: Tid) -> ThreadResult<()> {
    let (_guard, rt) = enter()?;
    if let Some(sw) = escalate(rt.sched.block(tid))? {
        // SAFETY: masked; `rt` is not used after the switch.
        unsafe { commit(rt, sw, true) };
    }
    Ok(())
}

pub fn resume(tid: Tid) -> ThreadResult<()> {
    with_runtime(|rt| rt.sched.resume(tid))
}

/// Sleep the caller for `quanta` timer ticks.
pub fn sleep(quanta: u32) -> ThreadResult<()> {
    let (_guard, rt) = enter()?;
    let sw = escalate(rt.sched.sleep(quanta))?;
    ktrace!("sleeping for {} quanta", quanta);
    // SAFETY: masked; `rt` is not used after the switch.
    unsafe { commit(rt, sw, true) };
    Ok(())
}

// ============================================================================
// Queries
// ============================================================================

pub fn current() -> ThreadResult<Tid> {
    with_runtime(|rt| Ok(rt.sched.running()))
}

pub fn total_quantums() -> ThreadResult<u64> {
    with_runtime(|rt| Ok(rt.sched.total_quantums()))
}

pub fn quantums(tid: Tid) -> ThreadResult<u64> {
    with_runtime(|rt| rt.sched.quantums(tid))
}

pub fn state(tid: Tid) -> ThreadResult<ThreadState> {
    with_runtime(|rt| rt.sched.state(tid))
}

/// Validate a C-style integer thread id against the table
pub fn resolve(raw: i64) -> ThreadResult<Tid> {
    with_runtime(|rt| rt.sched.lookup(raw))
}

/// Run `f` without being preempted (plain call before `init`)
pub fn critical<R>(f: impl FnOnce() -> R) -> R {
    match timer_signal() {
        Some(sig) => {
            let _guard = match CriticalSection::enter(sig) {
                Ok(guard) => guard,
                Err(e) => fatal(&e.into()),
            };
            f()
        }
        None => f(),
    }
}

// ============================================================================
// Switching
// ============================================================================

/// Carry out a switch decided by the scheduler.
///
/// Returns once the outgoing thread is resumed (never, if it was
/// terminated). The incoming side reaps any stack parked by a
/// self-terminated thread.
///
/// # Safety
///
/// The timer must be masked. `rt` must not be used after this call;
/// other threads mutate the runtime while the caller is switched out.
unsafe fn commit(rt: &mut Runtime, sw: Switch, voluntary: bool) {
    if !sw.is_transfer() {
        return;
    }
    let die = fatal_for(voluntary);

    if voluntary && rt.rearm_on_switch {
        if let Err(e) = rt.timer.arm() {
            die(&e.into());
        }
    }

    let Some(to) = rt.sched.context_ptr(sw.to) else {
        die(&ThreadError::NoSuchThread(sw.to));
    };
    // A terminated thread's registers go to a throwaway slot on its own
    // stack, which stays mapped until the incoming thread reaps it.
    let mut discard = SavedRegs::new();
    let from = if sw.save {
        match rt.sched.context_ptr(sw.from) {
            Some(ptr) => ptr,
            None => die(&ThreadError::NoSuchThread(sw.from)),
        }
    } else {
        &mut discard as *mut SavedRegs
    };

    kprint::set_current_tid(sw.to.as_u32());
    arch::switch_context(from, to);

    // Resumed: back on the outgoing thread's stack
    reap();
}

/// Free the stack of a thread that terminated itself
fn reap() {
    // SAFETY: called right after a switch, still masked.
    if let Some(rt) = unsafe { runtime() } {
        if rt.sched.reap() {
            ktrace!("reaped terminated stack");
        }
    }
}

/// Timer signal handler: one scheduler tick
extern "C" fn on_timer_signal(raw: libc::c_int) {
    if !signal::on_owner_thread() {
        if let Ok(sig) = Signal::try_from(raw) {
            signal::forward_to_owner(sig);
        }
        return;
    }

    let saved_errno = Errno::last_raw();
    // SAFETY: the kernel blocks the timer signal while this runs.
    if let Some(rt) = unsafe { runtime() } {
        match rt.sched.tick() {
            // SAFETY: as above; `rt` is dead after the switch.
            Ok(sw) => unsafe { commit(rt, sw, false) },
            Err(e) => fatal_in_handler(&e),
        }
    }
    Errno::set_raw(saved_errno);
}

/// First Rust frame of every spawned thread.
///
/// Entered through the trampoline with the timer masked; unmasks, runs
/// the entry point and terminates the thread when it returns or panics.
extern "C" fn thread_start() -> ! {
    reap();

    // SAFETY: still masked from the switch that got us here.
    let (tid, entry) = match unsafe { runtime() } {
        Some(rt) => {
            let tid = rt.sched.running();
            (tid, rt.sched.take_entry(tid))
        }
        None => std::process::abort(),
    };

    if let Some(sig) = timer_signal() {
        if let Err(e) = signal::unmask(sig) {
            fatal(&e.into());
        }
    }

    if let Some(entry) = entry {
        if panic::catch_unwind(AssertUnwindSafe(entry)).is_err() {
            kerror!("thread {} panicked", tid);
        }
    }

    if let Err(e) = terminate(tid) {
        fatal(&e);
    }
    fatal(&ThreadError::NoSuchThread(tid))
}
