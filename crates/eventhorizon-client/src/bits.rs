//! Fixed-width bit vectors backing the compiled policy representation.
//!
//! Actions compile into a 128-bit vector split across two 64-bit words;
//! token types fit in a single word. Bit index assignment is part of the
//! wire contract shared with the server.

use std::ops::{BitAnd, BitOr, Not, Shl};

/// A 128-bit vector as a high and a low 64-bit word. Bits 0..=63 live in
/// `lo`, bits 64..=127 in `hi`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bits128 {
    pub hi: u64,
    pub lo: u64,
}

impl Bits128 {
    pub const ZERO: Bits128 = Bits128 { hi: 0, lo: 0 };
    pub const ONE: Bits128 = Bits128 { hi: 0, lo: 1 };
    pub const ALL: Bits128 = Bits128 {
        hi: u64::MAX,
        lo: u64::MAX,
    };

    pub fn new(hi: u64, lo: u64) -> Self {
        Self { hi, lo }
    }

    /// The vector with exactly bit `index` set. Indexes >= 128 yield zero.
    pub fn bit(index: u32) -> Self {
        if index < 64 {
            Self { hi: 0, lo: 1 << index }
        } else if index < 128 {
            Self {
                hi: 1 << (index - 64),
                lo: 0,
            }
        } else {
            Self::ZERO
        }
    }

    pub fn set(&mut self, index: u32) {
        *self = *self | Self::bit(index);
    }

    pub fn is_set(&self, index: u32) -> bool {
        (*self & Self::bit(index)).is_non_zero()
    }

    pub fn is_all_ones(&self) -> bool {
        self.hi == u64::MAX && self.lo == u64::MAX
    }

    pub fn is_non_zero(&self) -> bool {
        self.hi != 0 || self.lo != 0
    }
}

impl Shl<u32> for Bits128 {
    type Output = Bits128;

    /// Left shift with carry from `lo` into `hi`.
    fn shl(self, amount: u32) -> Bits128 {
        match amount {
            0 => self,
            1..=63 => Bits128 {
                hi: (self.hi << amount) | (self.lo >> (64 - amount)),
                lo: self.lo << amount,
            },
            64..=127 => Bits128 {
                hi: self.lo << (amount - 64),
                lo: 0,
            },
            _ => Bits128::ZERO,
        }
    }
}

impl BitAnd for Bits128 {
    type Output = Bits128;

    fn bitand(self, rhs: Bits128) -> Bits128 {
        Bits128 {
            hi: self.hi & rhs.hi,
            lo: self.lo & rhs.lo,
        }
    }
}

impl BitOr for Bits128 {
    type Output = Bits128;

    fn bitor(self, rhs: Bits128) -> Bits128 {
        Bits128 {
            hi: self.hi | rhs.hi,
            lo: self.lo | rhs.lo,
        }
    }
}

impl Not for Bits128 {
    type Output = Bits128;

    fn not(self) -> Bits128 {
        Bits128 {
            hi: !self.hi,
            lo: !self.lo,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn shift_carries_between_words() {
        assert_eq!(Bits128::ONE << 0, Bits128::new(0, 1));
        assert_eq!(Bits128::ONE << 63, Bits128::new(0, 1 << 63));
        assert_eq!(Bits128::ONE << 64, Bits128::new(1, 0));
        assert_eq!(Bits128::ONE << 127, Bits128::new(1 << 63, 0));
        assert_eq!(Bits128::ONE << 128, Bits128::ZERO);

        let spread = Bits128::new(0, u64::MAX);
        assert_eq!(spread << 32, Bits128::new(u64::MAX >> 32, u64::MAX << 32));
    }

    #[test]
    fn bit_indexing_spans_both_words() {
        assert_eq!(Bits128::bit(0), Bits128::new(0, 1));
        assert_eq!(Bits128::bit(65), Bits128::new(2, 0));
        assert_eq!(Bits128::bit(200), Bits128::ZERO);

        let mut bits = Bits128::ZERO;
        bits.set(3);
        bits.set(70);
        assert!(bits.is_set(3));
        assert!(bits.is_set(70));
        assert!(!bits.is_set(4));
    }

    #[test]
    fn boolean_ops_are_elementwise() {
        let a = Bits128::new(0b1100, 0b1010);
        let b = Bits128::new(0b1010, 0b0110);
        assert_eq!(a & b, Bits128::new(0b1000, 0b0010));
        assert_eq!(a | b, Bits128::new(0b1110, 0b1110));
        assert_eq!(!Bits128::ZERO, Bits128::ALL);
    }

    #[test]
    fn all_ones_and_non_zero() {
        assert!(Bits128::ALL.is_all_ones());
        assert!(!Bits128::new(u64::MAX, 0).is_all_ones());
        assert!(Bits128::new(0, 1).is_non_zero());
        assert!(!Bits128::ZERO.is_non_zero());
    }
}
