//! Token-membership comparison between expected and materialized values.
//!
//! The target table stores each organization's domains as a single
//! comma-joined string. A domain counts as present only when it appears
//! as a whole comma-delimited token, never as a substring (`ab.com`
//! must not match inside `xab.com`).

/// Delimiter separating domains inside the materialized value.
pub const VALUE_DELIMITER: char = ',';

/// Return the expected values absent from the comma-joined `actual` list.
///
/// Output preserves the order of `expected` and drops duplicates, so no
/// `(key, expected)` pair is ever reported twice by the same worker.
pub fn missing_expected(expected: &[String], actual: &str) -> Vec<String> {
    let mut missing = Vec::new();

    for value in expected {
        if actual.split(VALUE_DELIMITER).any(|token| token == value) {
            continue;
        }
        if !missing.contains(value) {
            missing.push(value.clone());
        }
    }

    missing
}
