//! Tri-state telegram codec.
//!
//! The remotes this controller speaks to are built around PT2262/HX2262-family
//! encoder chips, which transmit 12 tri-state symbols ("trits": low, high or
//! floating) per telegram. A telegram plus its timing metadata packs into one
//! 32-bit wire word:
//!
//! ```text
//! pppppppp|prrrdddd|dddddddd|dddddddd
//! p = period in µs (9 bits, 0..512)
//! r = repeat count as log2 (3 bits; r=3 means the signal is sent 2^3=8 times)
//! d = the 12 trits folded as base-3 digits (20 bits)
//! ```
//!
//! Only the low 20 data bits identify a remote code. Period and repeats are
//! transmit-side parameters and never participate in code comparison.

/// Mask selecting the 20-bit data payload of a packed telegram word.
pub const CODE_MASK: u32 = 0xFFFFF;

/// Number of trits in one telegram.
pub const TELEGRAM_TRITS: usize = 12;

/// One ternary symbol. `Float` corresponds to the high-impedance state of a
/// PT2262 address/data pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trit {
    Low = 0,
    High = 1,
    Float = 2,
}

/// One complete logical RF message: 12 trits plus transmit timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Telegram {
    pub trits: [Trit; TELEGRAM_TRITS],
    /// Fundamental pulse-width unit in microseconds. Caller keeps this in
    /// 0..512; `pack` does not validate.
    pub period_us: u16,
    /// log2 of the transmit repeat count. Caller keeps this in 0..8.
    pub repeats_log2: u8,
}

impl Telegram {
    pub fn new(trits: [Trit; TELEGRAM_TRITS], period_us: u16, repeats_log2: u8) -> Self {
        Self {
            trits,
            period_us,
            repeats_log2,
        }
    }

    /// Pack into the 32-bit wire word. Trit 0 is the most significant base-3
    /// digit. Out-of-range period/repeats are the caller's responsibility and
    /// simply spill into neighbouring fields, matching the encoder hardware's
    /// behaviour of shifting whatever it is given.
    pub fn pack(&self) -> u32 {
        let mut data: u32 = 0;
        for &trit in &self.trits {
            data = data * 3 + trit as u32;
        }

        data |= (self.period_us as u32) << 23;
        data |= (self.repeats_log2 as u32) << 20;

        data
    }
}

/// Period field of a packed telegram word (bits 23-31).
pub fn wire_period_us(data: u32) -> u32 {
    data >> 23
}

/// Repeat-log2 field of a packed telegram word (bits 20-22).
pub fn wire_repeats_log2(data: u32) -> u8 {
    ((data >> 20) & 0b111) as u8
}

/// Compare a locally encoded telegram with a received wire word.
///
/// Only the 20-bit data payloads are compared; period and repeat metadata of
/// either operand is ignored.
pub fn is_same_code(encoded_telegram: u32, received_data: u32) -> bool {
    (encoded_telegram & CODE_MASK) == (received_data & CODE_MASK)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trits_from_digits(digits: [u8; 12]) -> [Trit; 12] {
        digits.map(|d| match d {
            0 => Trit::Low,
            1 => Trit::High,
            _ => Trit::Float,
        })
    }

    #[test]
    fn pack_folds_trits_as_base3_msb_first() {
        // 0,0,...,0,1 -> 1; 0,0,...,1,0 -> 3; 2,0,...,0 -> 2*3^11
        let mut digits = [0u8; 12];
        digits[11] = 1;
        assert_eq!(Telegram::new(trits_from_digits(digits), 0, 0).pack(), 1);

        let mut digits = [0u8; 12];
        digits[10] = 1;
        assert_eq!(Telegram::new(trits_from_digits(digits), 0, 0).pack(), 3);

        let mut digits = [0u8; 12];
        digits[0] = 2;
        assert_eq!(
            Telegram::new(trits_from_digits(digits), 0, 0).pack(),
            2 * 3u32.pow(11)
        );
    }

    #[test]
    fn pack_round_trips_period_and_repeats() {
        let trits = trits_from_digits([2, 1, 0, 2, 1, 0, 2, 1, 0, 2, 1, 0]);
        let data = Telegram::new(trits, 375, 4).pack();

        assert_eq!(wire_period_us(data), 375);
        assert_eq!(wire_repeats_log2(data), 4);

        // The data payload is untouched by the metadata fields.
        let bare = Telegram::new(trits, 0, 0).pack();
        assert_eq!(data & CODE_MASK, bare);
    }

    #[test]
    fn max_code_fits_in_20_bits() {
        // All-float telegram is the largest base-3 value: 3^12 - 1 = 531440.
        let data = Telegram::new([Trit::Float; 12], 0, 0).pack();
        assert_eq!(data, 531_440);
        assert!(data <= CODE_MASK);
    }

    #[test]
    fn same_code_masks_timing_metadata() {
        let trits = trits_from_digits([0, 2, 2, 0, 1, 1, 0, 2, 0, 2, 2, 0]);
        let a = Telegram::new(trits, 375, 4).pack();
        let b = Telegram::new(trits, 190, 2).pack();
        let received = a & CODE_MASK;

        assert!(is_same_code(a, received));
        assert!(is_same_code(b, received));
        assert!(is_same_code(a, b));
        assert!(!is_same_code(a, received ^ 1));
    }
}
