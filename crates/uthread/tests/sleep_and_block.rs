//! Sleep countdowns, blocking, and the blocked-sleeper overlay.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use uthread::{critical, ThreadState, Tid};

static SLEPT_AT: AtomicU64 = AtomicU64::new(0);
static WOKE_AT: AtomicU64 = AtomicU64::new(0);
static SPINS: AtomicU64 = AtomicU64::new(0);
static STOP: AtomicBool = AtomicBool::new(false);
static OVERLAY_DONE: AtomicBool = AtomicBool::new(false);

fn wait_for(what: &str, budget: u64, cond: impl Fn() -> bool) {
    let deadline = uthread::get_total_quantums().unwrap() + budget;
    while !cond() {
        if uthread::get_total_quantums().unwrap() > deadline {
            panic!("timed out waiting for {}", what);
        }
        std::hint::spin_loop();
    }
}

fn quanta_pass(n: u64) {
    let target = uthread::get_total_quantums().unwrap() + n;
    wait_for("quanta to pass", n + 10_000, || uthread::get_total_quantums().unwrap() >= target);
}

fn sleep_countdown() {
    let sleeper = uthread::spawn(|| {
        SLEPT_AT.store(uthread::get_total_quantums().unwrap(), Ordering::SeqCst);
        uthread::sleep(3).unwrap();
        WOKE_AT.store(uthread::get_total_quantums().unwrap(), Ordering::SeqCst);
    })
    .unwrap();

    wait_for("sleeper to wake", 10_000, || WOKE_AT.load(Ordering::SeqCst) != 0);
    let slept = SLEPT_AT.load(Ordering::SeqCst);
    let woke = WOKE_AT.load(Ordering::SeqCst);
    assert!(woke >= slept + 3, "woke after {} quanta", woke - slept);

    wait_for("sleeper to exit", 10_000, || uthread::thread_state(sleeper).is_err());
}

fn block_and_resume() {
    let spinner = uthread::spawn(|| {
        while !STOP.load(Ordering::Relaxed) {
            SPINS.fetch_add(1, Ordering::Relaxed);
        }
    })
    .unwrap();

    wait_for("spinner to run", 10_000, || SPINS.load(Ordering::Relaxed) > 0);
    uthread::block(spinner).unwrap();
    let frozen = SPINS.load(Ordering::Relaxed);
    let charged = uthread::get_quantums(spinner).unwrap();

    quanta_pass(5);
    assert_eq!(SPINS.load(Ordering::Relaxed), frozen);
    assert_eq!(uthread::get_quantums(spinner).unwrap(), charged);
    assert_eq!(uthread::thread_state(spinner), Ok(ThreadState::Blocked));

    uthread::resume(spinner).unwrap();
    wait_for("spinner to continue", 10_000, || SPINS.load(Ordering::Relaxed) > frozen);

    STOP.store(true, Ordering::Relaxed);
    wait_for("spinner to exit", 10_000, || uthread::thread_state(spinner).is_err());
}

fn blocked_sleeper() {
    let tid = uthread::spawn(|| {
        uthread::sleep(2).unwrap();
        OVERLAY_DONE.store(true, Ordering::SeqCst);
    })
    .unwrap();

    wait_for("thread to fall asleep", 10_000, || {
        uthread::thread_state(tid) == Ok(ThreadState::Sleeping)
    });
    uthread::block(tid).unwrap();

    // Countdown ends while blocked; the block still holds
    quanta_pass(6);
    assert!(!OVERLAY_DONE.load(Ordering::SeqCst));
    assert_eq!(uthread::thread_state(tid), Ok(ThreadState::Blocked));

    uthread::resume(tid).unwrap();
    wait_for("thread to finish", 10_000, || OVERLAY_DONE.load(Ordering::SeqCst));
}

fn resume_keeps_sleeping() {
    let tid = uthread::spawn(|| {
        uthread::sleep(50).unwrap();
    })
    .unwrap();

    wait_for("thread to fall asleep", 10_000, || {
        uthread::thread_state(tid) == Ok(ThreadState::Sleeping)
    });
    critical(|| {
        uthread::block(tid).unwrap();
        uthread::resume(tid).unwrap();
        assert_eq!(uthread::thread_state(tid), Ok(ThreadState::Sleeping));
    });

    wait_for("sleeper to exit", 10_000, || uthread::thread_state(tid).is_err());
}

fn main() {
    uthread::init(1_000).unwrap();

    sleep_countdown();
    block_and_resume();
    blocked_sleeper();
    resume_keeps_sleeping();

    critical(|| println!("sleep_and_block: ok"));
    let _ = uthread::terminate(Tid::MAIN);
    unreachable!("terminating thread 0 exits the process");
}
