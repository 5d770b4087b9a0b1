//! C ABI
//!
//! `uthread_*` entry points with `int` arguments. Every call returns `-1`
//! on a usage error (after printing `thread library error: ...`); system
//! errors end the process as in the Rust API.

use crate::{report, ThreadError, Tid};
use libc::c_int;
use uthread_runtime::runtime;

/// Thread entry point; `None` is a null pointer
pub type ThreadEntry = Option<extern "C" fn()>;

const FAILURE: c_int = -1;

fn to_c<T>(result: crate::ThreadResult<T>, f: impl FnOnce(T) -> c_int) -> c_int {
    match result {
        Ok(value) => f(value),
        Err(_) => FAILURE,
    }
}

fn saturate(n: u64) -> c_int {
    c_int::try_from(n).unwrap_or(c_int::MAX)
}

fn tid_to_c(tid: Tid) -> c_int {
    saturate(u64::from(tid.as_u32()))
}

fn resolve(tid: c_int) -> crate::ThreadResult<Tid> {
    report(runtime::resolve(i64::from(tid)))
}

/// Initialize with a quantum of `quantum_usecs` microseconds
#[no_mangle]
pub extern "C" fn uthread_init(quantum_usecs: c_int) -> c_int {
    let Ok(quantum) = u64::try_from(quantum_usecs) else {
        return to_c(report::<()>(Err(ThreadError::InvalidQuantum)), |_| 0);
    };
    to_c(crate::init(quantum), |_| 0)
}

/// Create a thread running `entry_point`; returns its id
#[no_mangle]
pub extern "C" fn uthread_spawn(entry_point: ThreadEntry) -> c_int {
    let Some(entry) = entry_point else {
        return to_c(report::<()>(Err(ThreadError::NullEntry)), |_| 0);
    };
    to_c(crate::spawn(move || entry()), tid_to_c)
}

#[no_mangle]
pub extern "C" fn uthread_terminate(tid: c_int) -> c_int {
    to_c(resolve(tid).and_then(crate::terminate), |_| 0)
}

#[no_mangle]
pub extern "C" fn uthread_block(tid: c_int) -> c_int {
    to_c(resolve(tid).and_then(crate::block), |_| 0)
}

#[no_mangle]
pub extern "C" fn uthread_resume(tid: c_int) -> c_int {
    to_c(resolve(tid).and_then(crate::resume), |_| 0)
}

/// Sleep the caller for `num_quantums` ticks; non-positive counts fail
#[no_mangle]
pub extern "C" fn uthread_sleep(num_quantums: c_int) -> c_int {
    // Negative maps to 0, which the scheduler rejects
    let quanta = u32::try_from(num_quantums).unwrap_or(0);
    to_c(crate::sleep(quanta), |_| 0)
}

#[no_mangle]
pub extern "C" fn uthread_get_tid() -> c_int {
    to_c(crate::get_tid(), tid_to_c)
}

#[no_mangle]
pub extern "C" fn uthread_get_total_quantums() -> c_int {
    to_c(crate::get_total_quantums(), saturate)
}

#[no_mangle]
pub extern "C" fn uthread_get_quantums(tid: c_int) -> c_int {
    to_c(resolve(tid).and_then(crate::get_quantums), saturate)
}
