//! Basic uthread example
//!
//! Spawns a few threads that print, sleep and finish, then blocks and
//! resumes one of them from the main thread.
//!
//! # Environment Variables
//!
//! - `UT_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `UT_TIMER=real` - Preempt on wall-clock time instead of CPU time

use std::sync::atomic::{AtomicUsize, Ordering};

use uthread::{critical, kdebug, kinfo, ThreadState, Tid};

// UT_LOG_LEVEL=debug cargo run -p uthread-basic
static COMPLETED: AtomicUsize = AtomicUsize::new(0);

const WORKERS: usize = 3;

fn worker(n: usize) {
    let me = uthread::get_tid().unwrap_or(Tid::MAIN);
    for round in 0..3 {
        critical(|| println!("[worker {} / tid {}] round {}", n, me, round));
        // Sleep a little longer each round
        if let Err(e) = uthread::sleep(round + 1) {
            kdebug!("sleep failed: {}", e);
        }
    }
    kdebug!("[worker {}] finished", n);
    COMPLETED.fetch_add(1, Ordering::SeqCst);
}

fn main() {
    println!("=== uthread Basic Example ===\n");

    if let Err(e) = uthread::init(10_000) {
        eprintln!("init failed: {}", e);
        std::process::exit(1);
    }

    let mut tids = Vec::new();
    for n in 1..=WORKERS {
        match uthread::spawn(move || worker(n)) {
            Ok(tid) => {
                critical(|| println!("Spawned worker {} (tid={})", n, tid));
                tids.push(tid);
            }
            Err(e) => eprintln!("spawn failed: {}", e),
        }
    }

    // Hold the first worker for a while
    if let Some(&first) = tids.first() {
        if uthread::block(first).is_ok() {
            critical(|| println!("Blocked tid {}", first));
            let until = uthread::get_total_quantums().unwrap_or(0) + 20;
            while uthread::get_total_quantums().unwrap_or(until) < until {
                std::hint::spin_loop();
            }
            if uthread::thread_state(first) == Ok(ThreadState::Blocked) {
                critical(|| println!("tid {} is still blocked after 20 quanta", first));
            }
            let _ = uthread::resume(first);
        }
    }

    while COMPLETED.load(Ordering::SeqCst) < tids.len() {
        std::hint::spin_loop();
    }

    let total = uthread::get_total_quantums().unwrap_or(0);
    let main_share = uthread::get_quantums(Tid::MAIN).unwrap_or(0);
    kinfo!("{} worker(s) completed", COMPLETED.load(Ordering::SeqCst));
    critical(|| {
        println!("\nTotal quanta: {}, main thread ran {}", total, main_share);
        println!("\n=== Example Complete ===");
    });

    let _ = uthread::terminate(Tid::MAIN);
}
