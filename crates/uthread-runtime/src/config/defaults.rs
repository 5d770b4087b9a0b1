//! Compile-time defaults, generated by build.rs from the library defaults
//! and the optional `UT_CONFIG_RS` user file.

include!(concat!(env!("OUT_DIR"), "/ut_merged_config.rs"));
