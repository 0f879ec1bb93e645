//! "Action" store remote telegram layout.
//!
//! 5-bit DIP-switch system code, five devices A..E selected one-hot. Similar
//! hardware to Elro but with inverted bit symbols and swapped command trits.
//!
//! Trit layout:
//! - 0-4: system code bits (set -> High, clear -> Float)
//! - 5-9: device one-hot (selected -> Low, others Float)
//! - 10: !on ? Low : Float
//! - 11: on ? Low : Float

use super::{with_default_timing, ProtocolKind};
use crate::telegram::{Telegram, Trit};

/// Measured pulse period of Action remotes.
pub const PERIOD_US: u16 = 190;

/// Telegram for system code `0..=31`, device `'A'..='E'`.
pub fn telegram(system_code: u16, device: char, on: bool) -> Telegram {
    let mut trits = [Trit::Low; 12];
    let mut system_code = system_code;
    let device = (device as u32).wrapping_sub('A' as u32);

    for i in 0..5 {
        trits[i] = if system_code & 1 != 0 {
            Trit::High
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

    trits[10] = if !on { Trit::Low } else { Trit::Float };
    trits[11] = if on { Trit::Low } else { Trit::Float };

    with_default_timing(ProtocolKind::Action, trits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_code_bits_are_high_else_float() {
        // 0b00101: bits 0 and 2 set.
        let t = telegram(0b00101, 'A', true);
        assert_eq!(t.trits[0], Trit::High);
        assert_eq!(t.trits[1], Trit::Float);
        assert_eq!(t.trits[2], Trit::High);
        assert_eq!(t.trits[3], Trit::Float);
        assert_eq!(t.trits[4], Trit::Float);
    }

    #[test]
    fn device_is_one_hot_low() {
        let t = telegram(0, 'C', false);
        assert_eq!(t.trits[5], Trit::Float);
        assert_eq!(t.trits[6], Trit::Float);
        assert_eq!(t.trits[7], Trit::Low);
        assert_eq!(t.trits[8], Trit::Float);
        assert_eq!(t.trits[9], Trit::Float);
    }

    #[test]
    fn command_trits_swap_for_on_off() {
        let on = telegram(7, 'B', true);
        let off = telegram(7, 'B', false);
        assert_eq!(on.trits[10], Trit::Float);
        assert_eq!(on.trits[11], Trit::Low);
        assert_eq!(off.trits[10], Trit::Low);
        assert_eq!(off.trits[11], Trit::Float);
    }

    #[test]
    fn default_timing() {
        let t = telegram(1, 'A', true);
        assert_eq!(t.period_us, 190);
        assert_eq!(t.repeats_log2, 4);
    }
}
