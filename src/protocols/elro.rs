//! Elro "Home Control" telegram layout.
//!
//! 5-bit DIP-switch system code, four devices A..D selected one-hot. The
//! Action family is the mirror image of this one: set bits are Low here and
//! the on/off trits are swapped.
//!
//! Trit layout:
//! - 0-4: system code bits (set -> Low, clear -> Float)
//! - 5-9: device one-hot (selected -> Low, others Float)
//! - 10: on ? Low : Float
//! - 11: !on ? Low : Float

use super::{with_default_timing, ProtocolKind};
use crate::telegram::{Telegram, Trit};

/// Measured pulse period of Elro remotes.
pub const PERIOD_US: u16 = 320;

/// Telegram for system code `0..=31`, device `'A'..='D'`.
pub fn telegram(system_code: u16, device: char, on: bool) -> Telegram {
    let mut trits = [Trit::Low; 12];
    let mut system_code = system_code;
    let device = (device as u32).wrapping_sub('A' as u32);

    for i in 0..5 {
        trits[i] = if system_code & 1 != 0 {
            Trit::Low
        } else {
            Trit::Float
        };
        system_code >>= 1;

        trits[i + 5] = if i as u32 == device {
            Trit::Low
        } else {
            Trit::Float
        };
    }

    trits[10] = if on { Trit::Low } else { Trit::Float };
    trits[11] = if !on { Trit::Low } else { Trit::Float };

    with_default_timing(ProtocolKind::Elro, trits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_code_bits_are_low_else_float() {
        let t = telegram(0b10010, 'A', true);
        assert_eq!(t.trits[0], Trit::Float);
        assert_eq!(t.trits[1], Trit::Low);
        assert_eq!(t.trits[2], Trit::Float);
        assert_eq!(t.trits[3], Trit::Float);
        assert_eq!(t.trits[4], Trit::Low);
    }

    #[test]
    fn command_trits_mirror_action_family() {
        let on = telegram(0, 'D', true);
        let off = telegram(0, 'D', false);
        assert_eq!(on.trits[10], Trit::Low);
        assert_eq!(on.trits[11], Trit::Float);
        assert_eq!(off.trits[10], Trit::Float);
        assert_eq!(off.trits[11], Trit::Low);
    }

    #[test]
    fn same_fields_produce_same_word() {
        assert_eq!(
            telegram(21, 'B', false).pack(),
            telegram(21, 'B', false).pack()
        );
        assert_ne!(
            telegram(21, 'B', false).pack(),
            telegram(20, 'B', false).pack()
        );
    }

    #[test]
    fn default_timing() {
        let t = telegram(0, 'A', false);
        assert_eq!(t.period_us, 320);
        assert_eq!(t.repeats_log2, 4);
    }
}
