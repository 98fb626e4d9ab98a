//! Error types shared by value operations.

/// Two values (or two connected ports) disagree on their declared bit width.
///
/// Raised by every binary [`Value`](crate::Value) operation. The simulator
/// never propagates this as a hard failure; it converts the affected net to
/// an all-error value instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("width mismatch: {left} bits vs {right} bits")]
pub struct WidthMismatch {
    /// Width of the left-hand operand.
    pub left: u32,
    /// Width of the right-hand operand.
    pub right: u32,
}

/// A string could not be parsed as a [`Value`](crate::Value).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value literal '{input}'")]
pub struct ParseValueError {
    /// The input that failed to parse.
    pub input: String,
}
