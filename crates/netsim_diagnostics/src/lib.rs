//! Diagnostic creation, severity management, and rendering.
//!
//! Structural checks (width conflicts, rejected edits) and simulation
//! findings (oscillation, failed evaluations) are reported as [`Diagnostic`]s
//! collected in a thread-safe [`DiagnosticSink`] and formatted by a
//! [`DiagnosticRenderer`].

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::{Diagnostic, Locus};
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
