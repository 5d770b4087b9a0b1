//! Preemption demo
//!
//! CPU-bound threads that never yield. The timer still rotates them in
//! FIFO order, so every thread receives about the same number of quanta.
//!
//! Usage: `preemption [threads] [quantum_usecs] [quanta]`

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use uthread::{critical, kinfo, kwarn, Tid};

const MAX_DEMO_THREADS: usize = 16;

static STOP: AtomicBool = AtomicBool::new(false);
static SPINS: [AtomicU64; MAX_DEMO_THREADS] = [const { AtomicU64::new(0) }; MAX_DEMO_THREADS];

fn arg<T: std::str::FromStr>(idx: usize, default: T) -> T {
    std::env::args()
        .nth(idx)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn spinner(slot: usize) {
    while !STOP.load(Ordering::Relaxed) {
        SPINS[slot].fetch_add(1, Ordering::Relaxed);
    }
}

fn main() {
    let threads = arg(1, 4usize).clamp(1, MAX_DEMO_THREADS);
    let quantum: u64 = arg(2, 5_000);
    let quanta: u64 = arg(3, 200);

    println!("=== uthread Preemption Demo ===");
    println!("{} spinners, {}us quantum, {} quanta\n", threads, quantum, quanta);

    if let Err(e) = uthread::init(quantum) {
        eprintln!("init failed: {}", e);
        std::process::exit(1);
    }

    let mut tids = Vec::with_capacity(threads);
    for slot in 0..threads {
        match uthread::spawn(move || spinner(slot)) {
            Ok(tid) => tids.push((slot, tid)),
            Err(e) => kwarn!("spawn {} failed: {}", slot, e),
        }
    }

    while uthread::get_total_quantums().unwrap_or(quanta) < quanta {
        std::hint::spin_loop();
    }

    // Snapshot with the timer held off so the numbers agree
    let report: Vec<(Tid, u64, u64)> = critical(|| {
        tids.iter()
            .map(|&(slot, tid)| {
                let q = uthread::get_quantums(tid).unwrap_or(0);
                (tid, q, SPINS[slot].load(Ordering::Relaxed))
            })
            .collect()
    });
    STOP.store(true, Ordering::Relaxed);

    let min = report.iter().map(|r| r.1).min().unwrap_or(0);
    let max = report.iter().map(|r| r.1).max().unwrap_or(0);

    critical(|| {
        println!("{:>5} {:>8} {:>14}", "tid", "quanta", "spins");
        for (tid, q, spins) in &report {
            println!("{:>5} {:>8} {:>14}", tid, q, spins);
        }
        println!(
            "\nmain: {} quanta, total: {}",
            uthread::get_quantums(Tid::MAIN).unwrap_or(0),
            uthread::get_total_quantums().unwrap_or(0)
        );
        println!("spread between spinners: {}", max - min);
    });
    kinfo!("preemption demo done");

    let _ = uthread::terminate(Tid::MAIN);
}
