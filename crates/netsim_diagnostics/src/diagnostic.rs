//! Structured diagnostic messages anchored to circuit locations.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where in a design a diagnostic points.
///
/// Component and net numbers are the raw arena indices of the circuit crate,
/// kept as plain integers so this crate stays independent of it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locus {
    /// Not tied to a particular circuit.
    Design,
    /// A whole circuit.
    Circuit {
        /// The circuit name.
        circuit: String,
    },
    /// One component instance.
    Component {
        /// The circuit name.
        circuit: String,
        /// Raw component index.
        component: u32,
    },
    /// One net of a circuit.
    Net {
        /// The circuit name.
        circuit: String,
        /// Raw net index.
        net: u32,
    },
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locus::Design => write!(f, "design"),
            Locus::Circuit { circuit } => write!(f, "circuit `{circuit}`"),
            Locus::Component { circuit, component } => {
                write!(f, "circuit `{circuit}`, component #{component}")
            }
            Locus::Net { circuit, net } => write!(f, "circuit `{circuit}`, net #{net}"),
        }
    }
}

/// A structured diagnostic message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The code identifying the kind of diagnostic.
    pub code: DiagnosticCode,
    /// The main diagnostic message.
    pub message: String,
    /// The location the diagnostic refers to.
    pub locus: Locus,
    /// Explanatory footnotes.
    pub notes: Vec<String>,
    /// Actionable suggestions.
    pub help: Vec<String>,
}

impl Diagnostic {
    /// Creates a new error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>, locus: Locus) -> Self {
        Self::with_severity(Severity::Error, code, message, locus)
    }

    /// Creates a new warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>, locus: Locus) -> Self {
        Self::with_severity(Severity::Warning, code, message, locus)
    }

    fn with_severity(
        severity: Severity,
        code: DiagnosticCode,
        message: impl Into<String>,
        locus: Locus,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            locus,
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a help message to this diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}
