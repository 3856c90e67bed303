//! Seven-segment glyph encoding
//!
//! Bit layout of a [`SegmentMask`]:
//!
//! ```text
//!    --a--
//!   |     |
//!   f     b
//!   |     |
//!    --g--
//!   |     |
//!   e     c
//!   |     |
//!    --d--  .dp
//! ```
//!
//! Bit 0 = a through bit 6 = g, bit 7 = decimal point. A set bit means lit;
//! electrical polarity is applied by the multiplexer.

/// Lit segments, one bit per segment
pub type SegmentMask = u8;

/// Glyph index for an all-off digit
pub const BLANK: u8 = 10;

/// Number of segment lines (a..g plus dp)
pub const SEGMENT_COUNT: usize = 8;

/// Decimal point bit
pub const DP: SegmentMask = 1 << 7;

const GLYPHS: [SegmentMask; 11] = [
    0x3F, // 0
    0x06, // 1
    0x5B, // 2
    0x4F, // 3
    0x66, // 4
    0x6D, // 5
    0x7D, // 6
    0x07, // 7
    0x7F, // 8
    0x6F, // 9
    0x00, // blank
];

/// Segment mask for a digit 0..=9 or [`BLANK`]
///
/// # Panics
///
/// If `glyph` is greater than [`BLANK`].
pub const fn encode(glyph: u8) -> SegmentMask {
    assert!(glyph <= BLANK, "glyph out of range");
    GLYPHS[glyph as usize]
}

/// Digit shown by `mask`, ignoring the decimal point
///
/// Returns `Some(BLANK)` for the all-off mask and `None` for masks that
/// are not a glyph.
pub fn decode(mask: SegmentMask) -> Option<u8> {
    let mask = mask & !DP;
    GLYPHS.iter().position(|&g| g == mask).map(|i| i as u8)
}

/// Whether segment `index` (0 = a .. 7 = dp) is lit in `mask`
pub const fn is_lit(mask: SegmentMask, index: usize) -> bool {
    mask & (1 << index) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_inverts_encode() {
        for digit in 0..=9 {
            assert_eq!(decode(encode(digit)), Some(digit));
        }
    }

    #[test]
    fn test_blank_is_all_off() {
        assert_eq!(encode(BLANK), 0);
        assert_eq!(decode(0), Some(BLANK));
    }

    #[test]
    fn test_glyphs_are_distinct() {
        for a in 0..=BLANK {
            for b in 0..=BLANK {
                assert_eq!(a == b, encode(a) == encode(b));
            }
        }
    }

    #[test]
    fn test_known_shapes() {
        // 8 lights a..g, 1 lights b and c
        assert_eq!(encode(8), 0b0111_1111);
        assert!(is_lit(encode(1), 1) && is_lit(encode(1), 2));
        assert!(!is_lit(encode(1), 0));
        assert!(!is_lit(encode(0), 6));
    }

    #[test]
    fn test_decode_ignores_decimal_point() {
        assert_eq!(decode(encode(7) | DP), Some(7));
        assert_eq!(decode(0b0100_0000), None);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_panics() {
        let glyph = core::hint::black_box(11);
        let _ = encode(glyph);
    }
}
