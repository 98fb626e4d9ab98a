//! Immutable fixed-width vectors of four-state bits.

use crate::error::{ParseValueError, WidthMismatch};
use crate::logic::Bit;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Not;
use std::str::FromStr;

/// Number of bits packed per u64 word.
const BITS_PER_WORD: u32 = 32;

/// A fixed-width vector of [`Bit`]s, the value carried by a net or port.
///
/// Each bit occupies 2 bits of storage, 32 bits per `u64` word. Bits beyond
/// `width` in the last word are always zero so that derived equality and
/// hashing compare only meaningful bits.
///
/// Index 0 is the least significant bit. The public API never mutates a
/// value in place; every operation returns a new `Value`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Value {
    width: u32,
    data: Vec<u64>,
}

impl Value {
    /// Creates a value of the given width with every bit set to `bit`.
    pub fn filled(width: u32, bit: Bit) -> Self {
        let pattern = match bit {
            Bit::Zero => 0,
            Bit::One => 0x5555_5555_5555_5555,
            Bit::Unknown => 0xAAAA_AAAA_AAAA_AAAA,
            Bit::Error => u64::MAX,
        };
        let mut v = Self {
            width,
            data: vec![pattern; word_count(width)],
        };
        v.clear_tail();
        v
    }

    /// All-`Unknown` value: what an undriven net carries.
    pub fn unknown(width: u32) -> Self {
        Self::filled(width, Bit::Unknown)
    }

    /// All-`Error` value.
    pub fn error(width: u32) -> Self {
        Self::filled(width, Bit::Error)
    }

    /// All-`Zero` value.
    pub fn zeros(width: u32) -> Self {
        Self::filled(width, Bit::Zero)
    }

    /// All-`One` value.
    pub fn ones(width: u32) -> Self {
        Self::filled(width, Bit::One)
    }

    /// Single-bit defined value.
    pub fn from_bool(value: bool) -> Self {
        Self::from_bits(&[Bit::from_bool(value)])
    }

    /// Creates a value from the low `width` bits of an integer.
    ///
    /// Bits above 64 are zero.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let mut v = Self::zeros(width);
        for i in 0..width.min(64) {
            if (value >> i) & 1 != 0 {
                v.set_bit(i, Bit::One);
            }
        }
        v
    }

    /// Creates a value from bits ordered LSB first.
    pub fn from_bits(bits: &[Bit]) -> Self {
        let mut v = Self::zeros(bits.len() as u32);
        for (i, &b) in bits.iter().enumerate() {
            v.set_bit(i as u32, b);
        }
        v
    }

    /// Returns the declared width in bits.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn get(&self, index: u32) -> Bit {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word = self.data[(index / BITS_PER_WORD) as usize];
        Bit::from_bits(word >> ((index % BITS_PER_WORD) * 2))
    }

    /// Iterates over the bits, least significant first.
    pub fn bits(&self) -> impl Iterator<Item = Bit> + '_ {
        (0..self.width).map(|i| self.get(i))
    }

    /// Returns a copy with bit `index` replaced.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn with_bit(&self, index: u32, bit: Bit) -> Self {
        let mut v = self.clone();
        v.set_bit(index, bit);
        v
    }

    /// Converts to an integer if every bit is defined and the width fits.
    pub fn to_u64(&self) -> Option<u64> {
        if self.width > 64 {
            return None;
        }
        let mut result = 0u64;
        for (i, bit) in self.bits().enumerate() {
            match bit {
                Bit::Zero => {}
                Bit::One => result |= 1 << i,
                Bit::Unknown | Bit::Error => return None,
            }
        }
        Some(result)
    }

    /// Returns `true` if every bit is `Zero` or `One`.
    pub fn is_fully_defined(&self) -> bool {
        self.bits().all(Bit::is_defined)
    }

    /// Returns `true` if any bit is `Error`.
    pub fn has_error(&self) -> bool {
        self.bits().any(|b| b == Bit::Error)
    }

    /// Returns `true` if every bit is `Unknown`.
    pub fn is_all_unknown(&self) -> bool {
        self.bits().all(|b| b == Bit::Unknown)
    }

    /// Resolves two drivers asserting onto the same net, bit by bit.
    ///
    /// See [`Bit::combine`] for the per-bit table. Commutative and
    /// associative, so any number of drivers can be folded in any order.
    pub fn combine(&self, other: &Value) -> Result<Value, WidthMismatch> {
        self.zip_with(other, Bit::combine)
    }

    /// Bitwise AND.
    pub fn and(&self, other: &Value) -> Result<Value, WidthMismatch> {
        self.zip_with(other, |a, b| a & b)
    }

    /// Bitwise OR.
    pub fn or(&self, other: &Value) -> Result<Value, WidthMismatch> {
        self.zip_with(other, |a, b| a | b)
    }

    /// Bitwise XOR.
    pub fn xor(&self, other: &Value) -> Result<Value, WidthMismatch> {
        self.zip_with(other, |a, b| a ^ b)
    }

    /// Adapts the value to `width`: truncates high bits, or pads with `Error`.
    ///
    /// Used where a port is wider than the net it reads.
    pub fn resize_to(&self, width: u32) -> Value {
        let mut v = Value::error(width);
        for i in 0..width.min(self.width) {
            v.set_bit(i, self.get(i));
        }
        v
    }

    /// Extracts `width` bits starting at `lo`; positions past the end read as `Error`.
    pub fn slice(&self, lo: u32, width: u32) -> Value {
        let mut v = Value::error(width);
        for i in 0..width {
            let src = lo + i;
            if src < self.width {
                v.set_bit(i, self.get(src));
            }
        }
        v
    }

    /// Concatenates values, the first part landing in the least significant bits.
    pub fn concat(parts: &[Value]) -> Value {
        let total: u32 = parts.iter().map(Value::width).sum();
        let mut v = Value::zeros(total);
        let mut offset = 0;
        for part in parts {
            for (i, bit) in part.bits().enumerate() {
                v.set_bit(offset + i as u32, bit);
            }
            offset += part.width;
        }
        v
    }

    fn zip_with(&self, other: &Value, f: impl Fn(Bit, Bit) -> Bit) -> Result<Value, WidthMismatch> {
        if self.width != other.width {
            return Err(WidthMismatch {
                left: self.width,
                right: other.width,
            });
        }
        let mut result = Value::zeros(self.width);
        for i in 0..self.width {
            result.set_bit(i, f(self.get(i), other.get(i)));
        }
        Ok(result)
    }

    fn set_bit(&mut self, index: u32, bit: Bit) {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word_idx = (index / BITS_PER_WORD) as usize;
        let shift = (index % BITS_PER_WORD) * 2;
        let mask = !(0b11u64 << shift);
        self.data[word_idx] = (self.data[word_idx] & mask) | ((bit as u64) << shift);
    }

    fn clear_tail(&mut self) {
        let used = self.width % BITS_PER_WORD;
        if used != 0 {
            if let Some(last) = self.data.last_mut() {
                *last &= (1u64 << (used * 2)) - 1;
            }
        }
    }
}

impl Not for &Value {
    type Output = Value;

    fn not(self) -> Value {
        let mut result = Value::zeros(self.width);
        for i in 0..self.width {
            result.set_bit(i, !self.get(i));
        }
        result
    }
}

impl Value {
    /// Bitwise NOT.
    pub fn not(&self) -> Value {
        !self
    }
}

/// Parses an MSB-first string of `0`, `1`, `U`/`X` and `E` characters.
///
/// Underscores are ignored as digit separators.
impl FromStr for Value {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseValueError {
            input: s.to_string(),
        };
        let digits: Vec<char> = s.trim().chars().filter(|&c| c != '_').collect();
        if digits.is_empty() {
            return Err(err());
        }
        let mut bits = Vec::with_capacity(digits.len());
        for c in digits.iter().rev() {
            bits.push(Bit::from_char(*c).ok_or_else(err)?);
        }
        Ok(Value::from_bits(&bits))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            write!(f, "{}", self.get(i))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({self})")
    }
}

fn word_count(width: u32) -> usize {
    width.div_ceil(BITS_PER_WORD) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v(s: &str) -> Value {
        s.parse().unwrap()
    }

    #[test]
    fn constructors_fill_every_bit() {
        assert_eq!(Value::unknown(4).to_string(), "UUUU");
        assert_eq!(Value::error(3).to_string(), "EEE");
        assert_eq!(Value::zeros(2).to_string(), "00");
        assert_eq!(Value::ones(5).to_string(), "11111");
    }

    #[test]
    fn filled_values_compare_equal_to_bitwise_built_ones() {
        let built = Value::from_bits(&[Bit::Unknown; 40]);
        assert_eq!(built, Value::unknown(40));
        let built = Value::from_bits(&[Bit::Error; 33]);
        assert_eq!(built, Value::error(33));
    }

    #[test]
    fn parse_msb_first() {
        let val = v("10UE");
        assert_eq!(val.width(), 4);
        assert_eq!(val.get(3), Bit::One);
        assert_eq!(val.get(2), Bit::Zero);
        assert_eq!(val.get(1), Bit::Unknown);
        assert_eq!(val.get(0), Bit::Error);
        assert_eq!(v("1010_0101").to_u64(), Some(0xA5));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("10z".parse::<Value>().is_err());
        assert!("".parse::<Value>().is_err());
    }

    #[test]
    fn u64_conversion() {
        assert_eq!(Value::from_u64(0b1011, 4).to_string(), "1011");
        assert_eq!(Value::from_u64(0xFF, 4).to_u64(), Some(0xF));
        assert_eq!(v("1U").to_u64(), None);
        assert_eq!(Value::zeros(65).to_u64(), None);
    }

    #[test]
    fn combine_resolves_per_bit() {
        assert_eq!(v("01UE").combine(&v("0U1U")).unwrap(), v("011E"));
        assert_eq!(v("1U0E").combine(&v("0U0U")).unwrap(), v("EU0E"));
        assert_eq!(v("10").combine(&v("01")).unwrap(), v("EE"));
    }

    #[test]
    fn combine_width_mismatch() {
        let err = v("10").combine(&v("100")).unwrap_err();
        assert_eq!(err, WidthMismatch { left: 2, right: 3 });
    }

    #[test]
    fn bitwise_ops() {
        assert_eq!(v("1100").and(&v("1010")).unwrap(), v("1000"));
        assert_eq!(v("1100").or(&v("1010")).unwrap(), v("1110"));
        assert_eq!(v("1100").xor(&v("1010")).unwrap(), v("0110"));
        assert_eq!(v("10UE").not(), v("01UE"));
        assert_eq!(v("0U").and(&v("UU")).unwrap(), v("0U"));
        assert_eq!(v("1U").or(&v("UU")).unwrap(), v("1U"));
        assert!(v("1").and(&v("11")).is_err());
    }

    #[test]
    fn resize_truncates_or_pads_with_error() {
        assert_eq!(v("1011").resize_to(2), v("11"));
        assert_eq!(v("10").resize_to(4), v("EE10"));
    }

    #[test]
    fn slice_and_concat() {
        let bus = v("1100_1010");
        assert_eq!(bus.slice(0, 4), v("1010"));
        assert_eq!(bus.slice(4, 4), v("1100"));
        assert_eq!(bus.slice(6, 4), v("EE11"));
        assert_eq!(Value::concat(&[v("1010"), v("1100")]), bus);
    }

    #[test]
    fn predicates() {
        assert!(v("10").is_fully_defined());
        assert!(!v("1U").is_fully_defined());
        assert!(v("1E").has_error());
        assert!(Value::unknown(3).is_all_unknown());
    }

    #[test]
    fn wide_values_span_words() {
        let val = Value::unknown(100).with_bit(99, Bit::One).with_bit(0, Bit::Zero);
        assert_eq!(val.get(99), Bit::One);
        assert_eq!(val.get(0), Bit::Zero);
        assert_eq!(val.get(50), Bit::Unknown);
    }

    #[test]
    fn serde_roundtrip() {
        let val = v("10UE1010");
        let json = serde_json::to_string(&val).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(val, back);
    }

    fn arb_bit() -> impl Strategy<Value = Bit> {
        prop_oneof![
            Just(Bit::Zero),
            Just(Bit::One),
            Just(Bit::Unknown),
            Just(Bit::Error)
        ]
    }

    fn arb_values(count: usize) -> impl Strategy<Value = Vec<Value>> {
        (1usize..70).prop_flat_map(move |width| {
            prop::collection::vec(
                prop::collection::vec(arb_bit(), width).prop_map(|bits| Value::from_bits(&bits)),
                count,
            )
        })
    }

    proptest! {
        #[test]
        fn combine_commutative(vals in arb_values(2)) {
            prop_assert_eq!(
                vals[0].combine(&vals[1]).unwrap(),
                vals[1].combine(&vals[0]).unwrap()
            );
        }

        #[test]
        fn combine_associative(vals in arb_values(3)) {
            let left = vals[0].combine(&vals[1]).unwrap().combine(&vals[2]).unwrap();
            let right = vals[0].combine(&vals[1].combine(&vals[2]).unwrap()).unwrap();
            prop_assert_eq!(left, right);
        }

        #[test]
        fn combine_unknown_is_identity(vals in arb_values(1)) {
            let unknown = Value::unknown(vals[0].width());
            prop_assert_eq!(vals[0].combine(&unknown).unwrap(), vals[0].clone());
        }

        #[test]
        fn combine_idempotent(vals in arb_values(1)) {
            prop_assert_eq!(vals[0].combine(&vals[0]).unwrap(), vals[0].clone());
        }

        #[test]
        fn double_not_preserves_value(vals in arb_values(1)) {
            prop_assert_eq!(vals[0].not().not(), vals[0].clone());
        }

        #[test]
        fn and_or_commutative(vals in arb_values(2)) {
            prop_assert_eq!(vals[0].and(&vals[1]).unwrap(), vals[1].and(&vals[0]).unwrap());
            prop_assert_eq!(vals[0].or(&vals[1]).unwrap(), vals[1].or(&vals[0]).unwrap());
        }
    }
}
