//! Build script for uthread-runtime
//!
//! Produces `OUT_DIR/ut_merged_config.rs`, the compile-time defaults
//! included by `config::defaults`:
//! 1. Start with library defaults
//! 2. If `UT_CONFIG_RS` names a file, read its `pub const NAME: TYPE = VALUE;` lines
//! 3. User values replace defaults of the same name; unknown names are reported
//!
//! A user file only lists what it changes, e.g.
//!
//! ```text
//! pub const MAX_THREADS: usize = 32;
//! pub const TIMER_KIND: &str = "real";
//! ```

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

/// Configuration parameter definition
struct ConfigParam {
    name: &'static str,
    rust_type: &'static str,
    default_value: &'static str,
    doc: &'static str,
}

const CONFIG_PARAMS: &[ConfigParam] = &[
    ConfigParam {
        name: "MAX_THREADS",
        rust_type: "usize",
        default_value: "100",
        doc: "Size of the TCB table, main thread included",
    },
    ConfigParam {
        name: "STACK_SIZE",
        rust_type: "usize",
        default_value: "256 * 1024",
        doc: "Usable stack bytes per spawned thread",
    },
    ConfigParam {
        name: "TIMER_KIND",
        rust_type: "&str",
        default_value: "\"virtual\"",
        doc: "Preemption clock: \"virtual\", \"real\" or \"prof\"",
    },
    ConfigParam {
        name: "REARM_ON_SWITCH",
        rust_type: "bool",
        default_value: "true",
        doc: "Restart the quantum when a thread gives up the CPU voluntarily",
    },
    ConfigParam {
        name: "DEBUG_LOGGING",
        rust_type: "bool",
        default_value: "false",
        doc: "Raise the log level to debug at init",
    },
];

fn main() {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let dest_path = Path::new(&out_dir).join("ut_merged_config.rs");

    let mut config: BTreeMap<&'static str, String> = CONFIG_PARAMS
        .iter()
        .map(|p| (p.name, p.default_value.to_string()))
        .collect();

    let user_path = env::var("UT_CONFIG_RS").ok();
    if let Some(path) = &user_path {
        println!("cargo:rerun-if-changed={}", path);
        match fs::read_to_string(path) {
            Ok(content) => {
                for unknown in merge_user_config(&content, &mut config) {
                    println!("cargo:warning=Unknown config parameter in {}: {}", path, unknown);
                }
                println!("cargo:warning=Using custom config: {}", path);
            }
            Err(e) => {
                println!("cargo:warning=Failed to read UT_CONFIG_RS ({}): {}", path, e);
            }
        }
    }
    println!("cargo:rerun-if-env-changed=UT_CONFIG_RS");
    println!("cargo:rerun-if-changed=build.rs");

    let output = render(&config, user_path.as_deref());
    fs::write(&dest_path, output).expect("Failed to write merged config");
}

/// Apply recognised constants from `content`; returns unrecognised names
fn merge_user_config(content: &str, config: &mut BTreeMap<&'static str, String>) -> Vec<String> {
    let mut unknown = Vec::new();
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let Some((name, value)) = parse_const_line(line) else {
            continue;
        };
        match CONFIG_PARAMS.iter().find(|p| p.name == name) {
            Some(param) => {
                config.insert(param.name, value);
            }
            None => unknown.push(name),
        }
    }
    unknown
}

/// `pub const NAME: TYPE = VALUE;` -> (NAME, VALUE)
fn parse_const_line(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix("pub const ")?.trim();
    let (name, rest) = rest.split_once(':')?;
    let (_, value) = rest.split_once('=')?;
    let value = value.trim();
    let value = value.strip_suffix(';').unwrap_or(value).trim();
    if value.is_empty() {
        return None;
    }
    Some((name.trim().to_string(), value.to_string()))
}

fn render(config: &BTreeMap<&'static str, String>, user_path: Option<&str>) -> String {
    let mut output = String::from("// Auto-generated by build.rs - do not edit\n");
    match user_path {
        Some(path) => output.push_str(&format!("// Library defaults merged with {}\n\n", path)),
        None => output.push_str("// Library defaults\n\n"),
    }

    for param in CONFIG_PARAMS {
        let value = config.get(param.name).map(String::as_str).unwrap_or(param.default_value);
        let ty = if param.rust_type == "&str" { "&'static str" } else { param.rust_type };
        output.push_str(&format!("/// {}\n", param.doc));
        output.push_str(&format!("pub const {}: {} = {};\n", param.name, ty, value));
    }
    output
}
