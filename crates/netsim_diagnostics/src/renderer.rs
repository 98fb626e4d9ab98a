//! Plain-text rendering of diagnostics.

use crate::diagnostic::{Diagnostic, Locus};

/// Formats diagnostics for a particular output target.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// Renders diagnostics in a rustc-like terminal layout:
///
/// ```text
/// warning[W101]: ports of width 4 and 2 share a net
///   --> circuit `main`, net #3
///    = note: the narrower width is simulated
/// ```
pub struct TerminalRenderer;

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = format!("{}[{}]: {}\n", diag.severity, diag.code, diag.message);
        if diag.locus != Locus::Design {
            out.push_str(&format!("  --> {}\n", diag.locus));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}
