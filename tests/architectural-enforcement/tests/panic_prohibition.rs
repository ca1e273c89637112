//! Integration Test: Panic Prohibition
//!
//! **Policy**: Library and daemon code propagates errors with `?`, logs them,
//! or maps them to an HTTP status. Panicking shortcuts are for tests only.

use architectural_enforcement::production_lines;

const FORBIDDEN: &[&str] = &[
    ".unwrap()",
    ".expect(",
    "panic!(",
    "todo!(",
    "unimplemented!(",
];

#[test]
fn test_no_panics_in_production_code() {
    let violations: Vec<String> = production_lines()
        .into_iter()
        .filter(|line| FORBIDDEN.iter().any(|pattern| line.code.contains(pattern)))
        .map(|line| line.to_string())
        .collect();

    if !violations.is_empty() {
        eprintln!("\n❌ Panicking calls found in production code:\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        panic!(
            "\nFound {} panic violation(s) in production code.",
            violations.len()
        );
    }
}

#[test]
fn test_registries_use_parking_lot() {
    let violations: Vec<String> = production_lines()
        .into_iter()
        .filter(|line| {
            line.code.contains("std::sync::Mutex") || line.code.contains("std::sync::RwLock")
        })
        .map(|line| line.to_string())
        .collect();

    assert!(
        violations.is_empty(),
        "Use parking_lot locks for shared state:\n{}",
        violations.join("\n")
    );
}
