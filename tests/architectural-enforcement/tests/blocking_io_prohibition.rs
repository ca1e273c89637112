//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Production code runs on the tokio runtime and MUST NOT block it.
//! **Required**: `tokio::fs`, `tokio::net`, `tokio::time`, not `std::fs`,
//! `std::net` sockets or `std::thread::sleep`.
//!
//! **Exceptions**: code that runs before the runtime starts (see `ALLOWLIST`).

use architectural_enforcement::{is_allowed, production_lines};

/// Files allowed to block, with the reason
const ALLOWLIST: &[(&str, &str)] = &[(
    "hotwire/core/src/config.rs",
    "configuration is loaded before the runtime starts",
)];

const FORBIDDEN: &[(&str, &str)] = &[
    ("std::fs", "Blocking file I/O"),
    ("std::net::TcpStream", "Blocking network I/O"),
    ("std::net::TcpListener", "Blocking network I/O"),
    ("std::net::UdpSocket", "Blocking network I/O"),
    ("std::thread::sleep", "Blocking sleep"),
    ("std::process::Command", "Blocking process I/O"),
];

#[test]
fn test_no_blocking_io_in_production_code() {
    let violations: Vec<String> = production_lines()
        .into_iter()
        .filter(|line| !is_allowed(line, ALLOWLIST))
        .flat_map(|line| {
            FORBIDDEN
                .iter()
                .filter(|(pattern, _)| line.code.contains(pattern))
                .map(|(_, kind)| format!("{kind}: {line}"))
                .collect::<Vec<_>>()
        })
        .collect();

    if !violations.is_empty() {
        eprintln!("\n❌ Blocking calls found in production code:\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ Use tokio::fs, tokio::net and tokio::time instead.");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.",
            violations.len()
        );
    }
}

#[test]
fn test_no_sleep_in_production_code() {
    let violations: Vec<String> = production_lines()
        .into_iter()
        .filter(|line| line.code.contains("time::sleep("))
        .map(|line| line.to_string())
        .collect();

    assert!(
        violations.is_empty(),
        "Sleeps found in production code; use tokio::time::interval or wait on I/O:\n{}",
        violations.join("\n")
    );
}
