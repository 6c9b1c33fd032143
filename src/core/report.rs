//! Diagnostic output after a live fetch.

use std::io::Write;

use crate::core::constants::REPORT_PREFIX;

/// Receives the names of resolved variables after a pass that called a
/// backend. Never called on a full cache hit.
pub trait Reporter {
    fn report(&self, variables: &[String]);
}

/// Writes one line to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stderr;

impl Reporter for Stderr {
    fn report(&self, variables: &[String]) {
        // Nothing useful to do if stderr is closed.
        let _ = writeln!(std::io::stderr(), "{}", format_report(variables));
    }
}

/// Discards reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Reporter for Silent {
    fn report(&self, _variables: &[String]) {}
}

/// The diagnostic line for `variables`.
pub fn format_report(variables: &[String]) -> String {
    format!("{} {}", REPORT_PREFIX, variables.join(", "))
}
