//! Preemption timer
//!
//! A periodic interval timer (`setitimer`) whose expiry signal drives the
//! scheduler tick. The first expiry and the period are both one quantum.

use crate::config::ConfigError;
use nix::errno::Errno;
use nix::sys::signal::Signal;
use std::fmt;
use std::str::FromStr;
use uthread_core::error::TimerError;

/// Clock the preemption timer counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerKind {
    /// User CPU time of the process (`ITIMER_VIRTUAL`, `SIGVTALRM`)
    #[default]
    Virtual,
    /// Wall-clock time (`ITIMER_REAL`, `SIGALRM`)
    Real,
    /// User + system CPU time (`ITIMER_PROF`, `SIGPROF`)
    Prof,
}

impl TimerKind {
    /// Signal raised on expiry
    pub fn signal(self) -> Signal {
        match self {
            TimerKind::Virtual => Signal::SIGVTALRM,
            TimerKind::Real => Signal::SIGALRM,
            TimerKind::Prof => Signal::SIGPROF,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TimerKind::Virtual => "virtual",
            TimerKind::Real => "real",
            TimerKind::Prof => "prof",
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TimerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "virtual" | "vtalrm" => Ok(TimerKind::Virtual),
            "real" | "alrm" => Ok(TimerKind::Real),
            "prof" => Ok(TimerKind::Prof),
            _ => Err(ConfigError::InvalidValue("timer must be virtual, real or prof")),
        }
    }
}

/// Split a quantum in microseconds into a `timeval`
pub fn quantum_to_timeval(usecs: u64) -> libc::timeval {
    libc::timeval {
        tv_sec: (usecs / 1_000_000) as libc::time_t,
        tv_usec: (usecs % 1_000_000) as libc::suseconds_t,
    }
}

/// Periodic timer firing once per quantum
#[derive(Clone, Copy)]
pub struct PreemptionTimer {
    kind: TimerKind,
    quantum: libc::timeval,
}

impl PreemptionTimer {
    pub fn new(kind: TimerKind, quantum_usecs: u64) -> Self {
        Self {
            kind,
            quantum: quantum_to_timeval(quantum_usecs),
        }
    }

    #[inline]
    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    #[inline]
    pub fn signal(&self) -> Signal {
        self.kind.signal()
    }

    /// Start (or restart) a full quantum. Async-signal-safe.
    pub fn arm(&self) -> Result<(), TimerError> {
        set_timer(
            self.kind,
            &libc::itimerval {
                it_interval: self.quantum,
                it_value: self.quantum,
            },
        )
    }

    /// Stop the timer. Async-signal-safe.
    pub fn disarm(&self) -> Result<(), TimerError> {
        let zero = libc::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        set_timer(
            self.kind,
            &libc::itimerval {
                it_interval: zero,
                it_value: zero,
            },
        )
    }
}

impl fmt::Debug for PreemptionTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreemptionTimer")
            .field("kind", &self.kind)
            .field("sec", &self.quantum.tv_sec)
            .field("usec", &self.quantum.tv_usec)
            .finish()
    }
}

fn set_timer(kind: TimerKind, value: &libc::itimerval) -> Result<(), TimerError> {
    // The `which` type differs between libc flavours; keep it inferred.
    let which = match kind {
        TimerKind::Virtual => libc::ITIMER_VIRTUAL,
        TimerKind::Real => libc::ITIMER_REAL,
        TimerKind::Prof => libc::ITIMER_PROF,
    };
    // SAFETY: `value` is a valid itimerval; the old value is not requested.
    let ret = unsafe { libc::setitimer(which, value, std::ptr::null_mut()) };
    if ret != 0 {
        return Err(TimerError::Arm(Errno::last() as i32));
    }
    Ok(())
}
