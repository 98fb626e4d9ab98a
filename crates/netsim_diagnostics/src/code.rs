//! Diagnostic codes with category prefixes for structured identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic code, determining its prefix letter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Structural errors that reject an edit, prefixed with `E`.
    Error,
    /// Structural findings that do not stop simulation, prefixed with `W`.
    Warning,
    /// Runtime simulation findings, prefixed with `S`.
    Simulation,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
            Category::Simulation => 'S',
        }
    }
}

/// A category prefix plus a numeric identifier, displayed as e.g. `W101`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }

    /// Ports of different widths are wired into one net.
    pub const WIDTH_MISMATCH: Self = Self::new(Category::Warning, 101);
    /// A sub-circuit has no pins and cannot be connected.
    pub const EMPTY_INTERFACE: Self = Self::new(Category::Warning, 103);
    /// A structural edit was rejected.
    pub const EDIT_REJECTED: Self = Self::new(Category::Error, 201);
    /// Propagation did not settle within the round bound.
    pub const OSCILLATION: Self = Self::new(Category::Simulation, 301);
    /// A component evaluation failed and drove error values.
    pub const EVALUATION_FAILED: Self = Self::new(Category::Simulation, 302);
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}
