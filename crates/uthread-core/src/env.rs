//! Environment variable utilities
//!
//! Runtime overrides for the compiled-in configuration are read through
//! these helpers (`UT_MAX_THREADS`, `UT_STACK_SIZE`, ...). Unset or
//! unparsable variables fall back to the supplied default.
//!
//! ```ignore
//! use uthread_core::env::{env_get, env_get_bool, env_get_size};
//!
//! let max: usize = env_get("UT_MAX_THREADS", 100);
//! let stack = env_get_size("UT_STACK_SIZE", 256 * 1024); // accepts "512k", "1M"
//! let rearm = env_get_bool("UT_REARM_ON_SWITCH", true);
//! ```

use std::str::FromStr;

/// Get environment variable parsed as type T, or return default
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// `Some(T)` if the variable is set and parses
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Get environment variable as boolean
///
/// "1", "true", "yes", "on" are true and "0", "false", "no", "off" are
/// false (case-insensitive). Anything else yields `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => parse_bool(&val).unwrap_or(default),
        Err(_) => default,
    }
}

/// Get environment variable as a byte count with optional k/m/g suffix
#[inline]
pub fn env_get_size(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_size(&v))
        .unwrap_or(default)
}

pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// "4096", "256k", "1M", "2G" (binary multiples)
pub fn parse_size(s: &str) -> Option<usize> {
    let s = s.trim();
    let (digits, shift) = match s.chars().last()? {
        'k' | 'K' => (&s[..s.len() - 1], 10),
        'm' | 'M' => (&s[..s.len() - 1], 20),
        'g' | 'G' => (&s[..s.len() - 1], 30),
        _ => (s, 0),
    };
    let base: usize = digits.trim().parse().ok()?;
    base.checked_mul(1usize << shift)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_get_default() {
        let val: usize = env_get("__UT_TEST_UNSET_VAR__", 42);
        assert_eq!(val, 42);
        assert!(env_get_opt::<u64>("__UT_TEST_UNSET_VAR__").is_none());
    }

    #[test]
    fn test_env_get_with_set_var() {
        std::env::set_var("__UT_TEST_NUM__", " 123 ");
        let val: usize = env_get("__UT_TEST_NUM__", 0);
        assert_eq!(val, 123);
        std::env::remove_var("__UT_TEST_NUM__");
    }

    #[test]
    fn test_env_get_invalid_parse() {
        std::env::set_var("__UT_TEST_INVALID__", "not_a_number");
        let val: usize = env_get("__UT_TEST_INVALID__", 99);
        assert_eq!(val, 99);
        std::env::remove_var("__UT_TEST_INVALID__");
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("No"), Some(false));
        assert_eq!(parse_bool("garbage"), None);
    }

    #[test]
    fn test_env_get_bool_garbage_keeps_default() {
        std::env::set_var("__UT_TEST_BOOL__", "maybe");
        assert!(env_get_bool("__UT_TEST_BOOL__", true));
        assert!(!env_get_bool("__UT_TEST_BOOL__", false));
        std::env::remove_var("__UT_TEST_BOOL__");
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("4096"), Some(4096));
        assert_eq!(parse_size("256k"), Some(256 * 1024));
        assert_eq!(parse_size("1M"), Some(1 << 20));
        assert_eq!(parse_size(" 2g "), Some(2 << 30));
        assert_eq!(parse_size("k"), None);
        assert_eq!(parse_size(""), None);
        assert_eq!(parse_size("-1"), None);
    }
}
