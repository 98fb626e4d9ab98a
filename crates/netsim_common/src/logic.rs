//! Four-state per-bit logic with multi-driver combination and gate truth tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// A single bit of a simulated signal.
///
/// - `Zero` / `One` are driven, defined levels.
/// - `Unknown` means no driver has defined the bit (floating or uninitialized).
/// - `Error` means the bit is in conflict or was produced by a failed evaluation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum Bit {
    /// Logic low.
    Zero = 0,
    /// Logic high.
    One = 1,
    /// Undriven or not yet known.
    Unknown = 2,
    /// Conflicting drivers or failed evaluation.
    Error = 3,
}

impl Bit {
    /// Converts a character to a [`Bit`].
    ///
    /// Accepts '0', '1', 'u'/'U'/'x'/'X' for unknown and 'e'/'E' for error.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Bit::Zero),
            '1' => Some(Bit::One),
            'u' | 'U' | 'x' | 'X' => Some(Bit::Unknown),
            'e' | 'E' => Some(Bit::Error),
            _ => None,
        }
    }

    /// Converts a boolean to a defined bit.
    pub fn from_bool(value: bool) -> Self {
        if value {
            Bit::One
        } else {
            Bit::Zero
        }
    }

    /// Returns `true` for `Zero` and `One`.
    pub fn is_defined(self) -> bool {
        matches!(self, Bit::Zero | Bit::One)
    }

    /// Resolves two drivers asserting onto the same bit.
    ///
    /// ```text
    ///     0  1  U  E
    /// 0 | 0  E  0  E
    /// 1 | E  1  1  E
    /// U | 0  1  U  E
    /// E | E  E  E  E
    /// ```
    ///
    /// `Unknown` is the identity and `Error` absorbs, so the operation is
    /// commutative, associative and idempotent.
    pub fn combine(self, other: Self) -> Self {
        use Bit::*;
        match (self, other) {
            (Error, _) | (_, Error) => Error,
            (Unknown, b) | (b, Unknown) => b,
            (a, b) if a == b => a,
            _ => Error,
        }
    }

    pub(crate) fn from_bits(bits: u64) -> Self {
        match bits & 0b11 {
            0 => Bit::Zero,
            1 => Bit::One,
            2 => Bit::Unknown,
            _ => Bit::Error,
        }
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bit::Zero => write!(f, "0"),
            Bit::One => write!(f, "1"),
            Bit::Unknown => write!(f, "U"),
            Bit::Error => write!(f, "E"),
        }
    }
}

/// AND truth table:
/// ```text
///     0  1  U  E
/// 0 | 0  0  0  E
/// 1 | 0  1  U  E
/// U | 0  U  U  E
/// E | E  E  E  E
/// ```
impl BitAnd for Bit {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        use Bit::*;
        match (self, rhs) {
            (Error, _) | (_, Error) => Error,
            (Zero, _) | (_, Zero) => Zero,
            (One, One) => One,
            _ => Unknown,
        }
    }
}

/// OR truth table:
/// ```text
///     0  1  U  E
/// 0 | 0  1  U  E
/// 1 | 1  1  1  E
/// U | U  1  U  E
/// E | E  E  E  E
/// ```
impl BitOr for Bit {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        use Bit::*;
        match (self, rhs) {
            (Error, _) | (_, Error) => Error,
            (One, _) | (_, One) => One,
            (Zero, Zero) => Zero,
            _ => Unknown,
        }
    }
}

/// XOR truth table:
/// ```text
///     0  1  U  E
/// 0 | 0  1  U  E
/// 1 | 1  0  U  E
/// U | U  U  U  E
/// E | E  E  E  E
/// ```
impl BitXor for Bit {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        use Bit::*;
        match (self, rhs) {
            (Error, _) | (_, Error) => Error,
            (Zero, Zero) | (One, One) => Zero,
            (Zero, One) | (One, Zero) => One,
            _ => Unknown,
        }
    }
}

/// NOT: `!0 = 1`, `!1 = 0`, `!U = U`, `!E = E`.
impl Not for Bit {
    type Output = Self;

    fn not(self) -> Self {
        use Bit::*;
        match self {
            Zero => One,
            One => Zero,
            Unknown => Unknown,
            Error => Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Bit::{self, *};

    const ALL: [Bit; 4] = [Zero, One, Unknown, Error];

    #[test]
    fn and_truth_table() {
        // Zero forces the result unless an error is present
        assert_eq!(Zero & Zero, Zero);
        assert_eq!(Zero & One, Zero);
        assert_eq!(Zero & Unknown, Zero);
        assert_eq!(Unknown & Zero, Zero);
        assert_eq!(One & One, One);
        assert_eq!(One & Unknown, Unknown);
        assert_eq!(Unknown & Unknown, Unknown);
        for b in ALL {
            assert_eq!(Error & b, Error);
            assert_eq!(b & Error, Error);
        }
    }

    #[test]
    fn or_truth_table() {
        assert_eq!(One | Zero, One);
        assert_eq!(One | Unknown, One);
        assert_eq!(Unknown | One, One);
        assert_eq!(Zero | Zero, Zero);
        assert_eq!(Zero | Unknown, Unknown);
        assert_eq!(Unknown | Unknown, Unknown);
        for b in ALL {
            assert_eq!(Error | b, Error);
            assert_eq!(b | Error, Error);
        }
    }

    #[test]
    fn xor_truth_table() {
        assert_eq!(Zero ^ Zero, Zero);
        assert_eq!(Zero ^ One, One);
        assert_eq!(One ^ Zero, One);
        assert_eq!(One ^ One, Zero);
        assert_eq!(One ^ Unknown, Unknown);
        assert_eq!(Unknown ^ Zero, Unknown);
        assert_eq!(Unknown ^ Error, Error);
    }

    #[test]
    fn not_values() {
        assert_eq!(!Zero, One);
        assert_eq!(!One, Zero);
        assert_eq!(!Unknown, Unknown);
        assert_eq!(!Error, Error);
    }

    #[test]
    fn combine_table() {
        assert_eq!(Zero.combine(Zero), Zero);
        assert_eq!(One.combine(One), One);
        assert_eq!(Zero.combine(One), Error);
        assert_eq!(One.combine(Zero), Error);
        assert_eq!(Unknown.combine(Zero), Zero);
        assert_eq!(One.combine(Unknown), One);
        assert_eq!(Unknown.combine(Unknown), Unknown);
        assert_eq!(Error.combine(Unknown), Error);
    }

    #[test]
    fn combine_is_commutative_and_associative() {
        for a in ALL {
            for b in ALL {
                assert_eq!(a.combine(b), b.combine(a));
                for c in ALL {
                    assert_eq!(a.combine(b).combine(c), a.combine(b.combine(c)));
                }
            }
        }
    }

    #[test]
    fn display_and_parse() {
        assert_eq!(format!("{Zero}{One}{Unknown}{Error}"), "01UE");
        assert_eq!(Bit::from_char('x'), Some(Unknown));
        assert_eq!(Bit::from_char('E'), Some(Error));
        assert_eq!(Bit::from_char('z'), None);
    }

    #[test]
    fn from_bool_and_defined() {
        assert_eq!(Bit::from_bool(true), One);
        assert_eq!(Bit::from_bool(false), Zero);
        assert!(One.is_defined());
        assert!(!Unknown.is_defined());
        assert!(!Error.is_defined());
    }
}
