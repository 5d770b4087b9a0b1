//! Kernel-style print macros for uthread
//!
//! Output may be produced from inside the preemption signal handler and
//! from green threads that were suspended halfway through a print, so
//! nothing here takes a lock or allocates: every line is formatted into a
//! fixed buffer on the caller's stack and handed to a single `write(2)` on
//! stderr. Lines longer than the buffer are truncated.
//!
//! Each leveled line carries the tid of the running uthread, e.g.
//! `[DEBUG] [t3] sleeping for 2 quanta`.
//!
//! # Environment Variables
//!
//! - `UT_LOG_LEVEL=<level>` - off, error, warn, info, debug, trace (or 0-5).
//!   Default: warn.
//!
//! The level is read once by [`init`]. The runtime calls it before the
//! timer handler is installed; reading the environment is not
//! async-signal-safe.
//!
//! # Usage
//!
//! ```ignore
//! use uthread_core::{kdebug, kwarn};
//!
//! kdebug!("spawned {}", tid);
//! kwarn!("timer fired on foreign thread");
//! ```

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

/// Log levels (matches common conventions)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let level = match s.trim().to_ascii_lowercase().as_str() {
            "off" | "0" => LogLevel::Off,
            "error" | "1" => LogLevel::Error,
            "warn" | "2" => LogLevel::Warn,
            "info" | "3" => LogLevel::Info,
            "debug" | "4" => LogLevel::Debug,
            "trace" | "5" => LogLevel::Trace,
            _ => return None,
        };
        Some(level)
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Off => "",
            LogLevel::Error => "[ERROR]",
            LogLevel::Warn => "[WARN] ",
            LogLevel::Info => "[INFO] ",
            LogLevel::Debug => "[DEBUG]",
            LogLevel::Trace => "[TRACE]",
        }
    }
}

/// Longest line emitted in one piece
pub const LINE_MAX: usize = 512;

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Warn as u8);
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Tid shown in the line tag; `u32::MAX` before the library is initialized
static CURRENT_TID: AtomicU32 = AtomicU32::new(u32::MAX);

/// Initialize logging from environment variables
pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    if let Ok(val) = std::env::var("UT_LOG_LEVEL") {
        if let Some(level) = LogLevel::parse(&val) {
            LOG_LEVEL.store(level as u8, Ordering::Relaxed);
        }
    }
}

/// Get current log level
#[inline]
pub fn log_level() -> LogLevel {
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Set log level programmatically
pub fn set_log_level(level: LogLevel) {
    INITIALIZED.store(true, Ordering::SeqCst);
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Check if a log level is enabled
#[inline]
pub fn level_enabled(level: LogLevel) -> bool {
    level != LogLevel::Off && level <= log_level()
}

/// Record the running uthread for the line tag. Called on every switch.
#[inline]
pub fn set_current_tid(tid: u32) {
    CURRENT_TID.store(tid, Ordering::Relaxed);
}

/// Fixed line buffer; excess output is dropped
struct LineBuf {
    buf: [u8; LINE_MAX],
    len: usize,
}

impl LineBuf {
    const fn new() -> Self {
        Self {
            buf: [0; LINE_MAX],
            len: 0,
        }
    }

    fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Terminate with a newline, overwriting the last byte when full
    fn finish_line(&mut self) {
        if self.len == LINE_MAX {
            self.len -= 1;
        }
        self.buf[self.len] = b'\n';
        self.len += 1;
    }

    fn emit(&self) {
        let mut bytes = self.as_bytes();
        while !bytes.is_empty() {
            // SAFETY: buffer is valid for `bytes.len()` bytes.
            let n = unsafe { libc::write(libc::STDERR_FILENO, bytes.as_ptr().cast(), bytes.len()) };
            if n <= 0 {
                if n < 0 && errno() == libc::EINTR {
                    continue;
                }
                return;
            }
            bytes = &bytes[n as usize..];
        }
    }
}

impl Write for LineBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = LINE_MAX - self.len;
        let n = s.len().min(room);
        self.buf[self.len..self.len + n].copy_from_slice(&s.as_bytes()[..n]);
        self.len += n;
        Ok(())
    }
}

fn errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

fn format_line(prefix: Option<&str>, args: fmt::Arguments<'_>) -> LineBuf {
    let mut line = LineBuf::new();
    if let Some(prefix) = prefix {
        let _ = line.write_str(prefix);
        let _ = line.write_str(" ");
    }
    let _ = line.write_fmt(args);
    line.finish_line();
    line
}

fn tagged_line(level: LogLevel, args: fmt::Arguments<'_>) -> LineBuf {
    let mut line = LineBuf::new();
    let _ = line.write_str(level.prefix());
    match CURRENT_TID.load(Ordering::Relaxed) {
        u32::MAX => {
            let _ = line.write_str(" [t-] ");
        }
        tid => {
            let _ = write!(line, " [t{}] ", tid);
        }
    }
    let _ = line.write_fmt(args);
    line.finish_line();
    line
}

#[doc(hidden)]
pub fn _kprintln_impl(args: fmt::Arguments<'_>) {
    format_line(None, args).emit();
}

#[doc(hidden)]
pub fn _klog_impl(level: LogLevel, args: fmt::Arguments<'_>) {
    if !level_enabled(level) {
        return;
    }
    tagged_line(level, args).emit();
}

fn library_line(level: LogLevel, msg: &dyn fmt::Display) -> Option<LineBuf> {
    if level == LogLevel::Off {
        return None;
    }
    Some(format_line(Some("thread library error:"), format_args!("{}", msg)))
}

/// `thread library error: <msg>` on stderr unless logging is off
pub fn library_error(msg: &dyn fmt::Display) {
    if let Some(line) = library_line(log_level(), msg) {
        line.emit();
    }
}

/// `system error: <msg>` on stderr, whatever the log level
pub fn system_error(msg: &dyn fmt::Display) {
    format_line(Some("system error:"), format_args!("{}", msg)).emit();
}

// ============================================================================
// Public Macros
// ============================================================================

/// Print a line to stderr. Safe to call from a signal handler.
#[macro_export]
macro_rules! kprintln {
    () => {{
        $crate::kprint::_kprintln_impl(format_args!(""));
    }};
    ($($arg:tt)*) => {{
        $crate::kprint::_kprintln_impl(format_args!($($arg)*));
    }};
}

/// Error level log (always shown unless logging is off)
#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl(
            $crate::kprint::LogLevel::Error,
            format_args!($($arg)*)
        );
    }};
}

/// Warning level log
#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl(
            $crate::kprint::LogLevel::Warn,
            format_args!($($arg)*)
        );
    }};
}

/// Info level log
#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl(
            $crate::kprint::LogLevel::Info,
            format_args!($($arg)*)
        );
    }};
}

/// Debug level log
#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl(
            $crate::kprint::LogLevel::Debug,
            format_args!($($arg)*)
        );
    }};
}

/// Trace level log (most verbose)
#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl(
            $crate::kprint::LogLevel::Trace,
            format_args!($($arg)*)
        );
    }};
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_levels() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse(" 1 "), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("off"), Some(LogLevel::Off));
        assert_eq!(LogLevel::parse("loud"), None);
        assert_eq!(LogLevel::from_u8(99), LogLevel::Trace);
    }

    #[test]
    fn test_line_format() {
        let line = format_line(Some("system error:"), format_args!("mmap failed ({})", 12));
        assert_eq!(line.as_bytes(), b"system error: mmap failed (12)\n");
    }

    #[test]
    fn test_library_error_follows_level() {
        assert!(library_line(LogLevel::Off, &"bad tid").is_none());

        let line = library_line(LogLevel::Error, &"bad tid").unwrap();
        assert_eq!(line.as_bytes(), b"thread library error: bad tid\n");
        assert!(library_line(LogLevel::Trace, &"bad tid").is_some());
    }

    #[test]
    fn test_tid_tag() {
        set_current_tid(7);
        let line = tagged_line(LogLevel::Info, format_args!("hello"));
        assert_eq!(line.as_bytes(), b"[INFO]  [t7] hello\n");
    }

    #[test]
    fn test_truncates_long_lines() {
        let long = "x".repeat(LINE_MAX * 2);
        let line = format_line(None, format_args!("{}", long));
        assert_eq!(line.as_bytes().len(), LINE_MAX);
        assert_eq!(line.as_bytes()[LINE_MAX - 1], b'\n');
    }

    #[test]
    fn test_macros_compile() {
        set_log_level(LogLevel::Off);
        assert!(!level_enabled(LogLevel::Error));

        kerror!("error {}", "msg");
        kwarn!("warn");
        kinfo!("info");
        kdebug!("debug");
        ktrace!("trace");
    }
}
