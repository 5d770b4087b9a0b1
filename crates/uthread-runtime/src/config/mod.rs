//! uthread runtime configuration
//!
//! Provides compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Environment variables (runtime)
//! 2. User's config file named by `UT_CONFIG_RS` (compile-time)
//! 3. Library defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use uthread_runtime::config::RuntimeConfig;
//! use uthread_runtime::timer::TimerKind;
//!
//! let config = RuntimeConfig::from_env()
//!     .max_threads(16)
//!     .timer(TimerKind::Real);
//! ```

pub mod defaults;

use crate::timer::TimerKind;
use uthread_core::constants::MIN_STACK_SIZE;
use uthread_core::env::{env_get, env_get_bool, env_get_opt, env_get_size};
use uthread_core::error::ThreadError;
use uthread_core::kinfo;

/// Runtime configuration with builder pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// TCB table size, main thread included
    pub max_threads: usize,
    /// Usable stack bytes per spawned thread (a guard page is added)
    pub stack_size: usize,
    /// Clock driving preemption
    pub timer: TimerKind,
    /// Restart the quantum on voluntary switches
    pub rearm_on_switch: bool,
    /// Raise the log level to debug at init
    pub debug_logging: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl RuntimeConfig {
    /// Create config from compile-time defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `UT_MAX_THREADS` - TCB table size
    /// - `UT_STACK_SIZE` - Stack bytes per thread (`262144`, `256k`, `1M`)
    /// - `UT_TIMER` - `virtual`, `real` or `prof`
    /// - `UT_REARM_ON_SWITCH` - Restart quantum on voluntary switch (0/1)
    /// - `UT_DEBUG` - Enable debug logging (0/1)
    pub fn from_env() -> Self {
        let base = Self::new();
        Self {
            max_threads: env_get("UT_MAX_THREADS", base.max_threads),
            stack_size: env_get_size("UT_STACK_SIZE", base.stack_size),
            timer: env_get_opt("UT_TIMER").unwrap_or(base.timer),
            rearm_on_switch: env_get_bool("UT_REARM_ON_SWITCH", base.rearm_on_switch),
            debug_logging: env_get_bool("UT_DEBUG", base.debug_logging),
        }
    }

    /// Create config with compile-time defaults only (no env override).
    pub fn new() -> Self {
        Self {
            max_threads: defaults::MAX_THREADS,
            stack_size: defaults::STACK_SIZE,
            timer: defaults::TIMER_KIND.parse().unwrap_or_default(),
            rearm_on_switch: defaults::REARM_ON_SWITCH,
            debug_logging: defaults::DEBUG_LOGGING || cfg!(feature = "debug-logging"),
        }
    }

    // Builder methods

    pub fn max_threads(mut self, n: usize) -> Self {
        self.max_threads = n;
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    pub fn timer(mut self, kind: TimerKind) -> Self {
        self.timer = kind;
        self
    }

    pub fn rearm_on_switch(mut self, enable: bool) -> Self {
        self.rearm_on_switch = enable;
        self
    }

    pub fn debug_logging(mut self, enable: bool) -> Self {
        self.debug_logging = enable;
        self
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_threads == 0 {
            return Err(ConfigError::InvalidValue("max_threads must be > 0"));
        }
        if self.max_threads > u32::MAX as usize {
            return Err(ConfigError::InvalidValue("max_threads does not fit a tid"));
        }
        if self.stack_size < MIN_STACK_SIZE {
            return Err(ConfigError::InvalidValue("stack_size must be >= 16KB"));
        }
        Ok(())
    }

    /// Log configuration at info level
    pub fn print(&self) {
        kinfo!("uthread configuration:");
        kinfo!("  max_threads:      {}", self.max_threads);
        kinfo!("  stack_size:       {}", self.stack_size);
        kinfo!("  timer:            {}", self.timer);
        kinfo!("  rearm_on_switch:  {}", self.rearm_on_switch);
        kinfo!("  debug_logging:    {}", self.debug_logging);
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for ThreadError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::InvalidValue(msg) => ThreadError::InvalidConfig(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RuntimeConfig::new();
        assert!(config.max_threads >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = RuntimeConfig::new()
            .max_threads(8)
            .stack_size(64 * 1024)
            .timer(TimerKind::Prof)
            .rearm_on_switch(false);

        assert_eq!(config.max_threads, 8);
        assert_eq!(config.stack_size, 64 * 1024);
        assert_eq!(config.timer, TimerKind::Prof);
        assert!(!config.rearm_on_switch);
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            RuntimeConfig::new().max_threads(0).validate(),
            Err(ConfigError::InvalidValue("max_threads must be > 0"))
        );
        assert!(RuntimeConfig::new().stack_size(4096).validate().is_err());
        assert!(RuntimeConfig::new().stack_size(MIN_STACK_SIZE).validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("UT_MAX_THREADS", "12");
        std::env::set_var("UT_STACK_SIZE", "64k");
        std::env::set_var("UT_TIMER", "real");
        let config = RuntimeConfig::from_env();
        std::env::remove_var("UT_MAX_THREADS");
        std::env::remove_var("UT_STACK_SIZE");
        std::env::remove_var("UT_TIMER");

        assert_eq!(config.max_threads, 12);
        assert_eq!(config.stack_size, 64 * 1024);
        assert_eq!(config.timer, TimerKind::Real);
    }

    #[test]
    fn test_config_error_maps_to_usage_error() {
        let err: ThreadError = ConfigError::InvalidValue("x").into();
        assert_eq!(err, ThreadError::InvalidConfig("x"));
        assert!(!err.is_fatal());
    }
}
