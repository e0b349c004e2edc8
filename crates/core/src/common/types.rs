//! Identifier newtypes used throughout the core.
//!
//! Each renaming structure hands out small integer ids. Wrapping them in
//! newtypes keeps rob ids, physical registers, and speculation tags from
//! being mixed up at call sites.

use serde::Deserialize;

/// A logical (architectural) register number, `x0`..`x31`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub struct RegId(pub u8);

/// A physical register id.
///
/// Id 0 is special: it is permanently mapped to the architectural zero
/// register, always reads as 0/valid, and is never allocated or freed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub struct PhysReg(pub u8);

impl PhysReg {
    /// The always-zero physical register.
    pub const ZERO: Self = Self(0);

    /// Returns true for the always-zero register.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// A speculation tag identifying a group of instructions between two
/// potential rollback points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpecTag(pub u8);

/// An index into the reorder buffer ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RobId(pub u16);

/// Builds a mask with bits `start..=end` set, wrapping modulo `2^width`.
///
/// When `start > end` the range wraps through the top of the ring, so the
/// mask covers `[start, 2^width)` and `[0, end]`. `start == end` yields a
/// single bit. The result is the cyclic interval used to invalidate the
/// wrong-path suffix of the speculation-tag ring.
#[must_use]
pub fn cyclic_mask(width: u32, start: u8, end: u8) -> u64 {
    debug_assert!(width <= 6, "tag rings are at most 64 entries");
    let size = 1u8 << width;
    debug_assert!(start < size && end < size);

    let full: u64 = if width == 6 { u64::MAX } else { (1u64 << (1u32 << width)) - 1 };
    // bits [0, b] inclusive
    let upto = |b: u8| -> u64 {
        if u32::from(b) + 1 == 64 { u64::MAX } else { (1u64 << (b + 1)) - 1 }
    };
    // bits [0, b) exclusive
    let below = |b: u8| -> u64 { (1u64 << b) - 1 };

    if start <= end {
        upto(end) & !below(start)
    } else {
        (full & !below(start)) | upto(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mask_simple_range() {
        assert_eq!(cyclic_mask(3, 1, 3), 0b0000_1110);
        assert_eq!(cyclic_mask(3, 0, 0), 0b0000_0001);
        assert_eq!(cyclic_mask(3, 5, 5), 0b0010_0000);
    }

    #[test]
    fn mask_wrapping_range() {
        assert_eq!(cyclic_mask(3, 6, 1), 0b1100_0011);
        assert_eq!(cyclic_mask(3, 7, 0), 0b1000_0001);
    }

    #[test]
    fn mask_full_ring() {
        assert_eq!(cyclic_mask(3, 1, 0), 0xFF);
        assert_eq!(cyclic_mask(2, 3, 2), 0x0F);
    }

    #[test]
    fn mask_width_six() {
        assert_eq!(cyclic_mask(6, 63, 0), (1 << 63) | 1);
        assert_eq!(cyclic_mask(6, 1, 0), u64::MAX);
    }

    proptest::proptest! {
        #[test]
        fn mask_matches_cyclic_membership(
            width in 1u32..=6,
            start in 0u8..64,
            end in 0u8..64,
        ) {
            let size = 1u8 << width;
            let (start, end) = (start % size, end % size);
            let mask = cyclic_mask(width, start, end);
            for bit in 0..size {
                let inside = if start <= end {
                    bit >= start && bit <= end
                } else {
                    bit >= start || bit <= end
                };
                proptest::prop_assert_eq!(mask >> bit & 1 == 1, inside);
            }
        }
    }
}
