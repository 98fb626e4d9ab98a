//! Shared foundational types for the netsim logic simulator.
//!
//! This crate provides the four-state [`Bit`], the fixed-width [`Value`]
//! vector carried by nets and ports, width errors, tick-rate frequencies and
//! content fingerprints.

#![warn(missing_docs)]

pub mod error;
pub mod frequency;
pub mod hash;
pub mod logic;
pub mod value;

pub use error::{ParseValueError, WidthMismatch};
pub use frequency::{Frequency, ParseFrequencyError};
pub use hash::ContentHash;
pub use logic::Bit;
pub use value::Value;
