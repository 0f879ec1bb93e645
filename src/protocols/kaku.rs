//! KlikAanKlikUit (KaKu) telegram layout.
//!
//! Remotes with an A..P address dial and 1..16 device dial, plus the M3E
//! group variant (address + 2-bit group + 2-bit device). Bits encode as
//! Float for 1 and Low for 0.
//!
//! Trit layout, plain variant:
//! - 0-3: address bits (A..P, 16 addresses)
//! - 4-7: device bits (1..16)
//! - 8-10: fixed Low, Float, Float
//! - 11: on ? Float : Low
//!
//! Group variant replaces trits 4-7 with 2 device bits (4-5) and 2 group
//! bits (6-7), matching the M3E chip's A4..A7 pins.

use super::{with_default_timing, ProtocolKind};
use crate::telegram::{Telegram, Trit};

/// Measured pulse period of KaKu remotes.
pub const PERIOD_US: u16 = 375;

fn bit_trit(bit: bool) -> Trit {
    if bit {
        Trit::Float
    } else {
        Trit::Low
    }
}

fn fixed_tail(trits: &mut [Trit; 12], on: bool) {
    trits[8] = Trit::Low;
    trits[9] = Trit::Float;
    trits[10] = Trit::Float;
    trits[11] = bit_trit(on);
}

/// Telegram for address `'A'..='P'`, device `1..=16`. Out-of-range inputs
/// wrap silently.
pub fn telegram(address: char, device: u16, on: bool) -> Telegram {
    let mut trits = [Trit::Low; 12];
    let mut address = (address as u32).wrapping_sub('A' as u32);
    let mut device = device.wrapping_sub(1);

    for i in 0..4 {
        trits[i] = bit_trit(address & 1 != 0);
        address >>= 1;

        trits[i + 4] = bit_trit(device & 1 != 0);
        device >>= 1;
    }

    fixed_tail(&mut trits, on);
    with_default_timing(ProtocolKind::KaKu, trits)
}

/// Telegram for the group variant: address `'A'..='P'`, group `1..=4`,
/// device `1..=4`.
pub fn group_telegram(address: char, group: u16, device: u16, on: bool) -> Telegram {
    let mut trits = [Trit::Low; 12];
    let mut address = (address as u32).wrapping_sub('A' as u32);
    let mut group = group.wrapping_sub(1);
    let mut device = device.wrapping_sub(1);

    // Address, M3E pins A0-A3.
    for i in 0..4 {
        trits[i] = bit_trit(address & 1 != 0);
        address >>= 1;
    }

    // Device, M3E pins A4-A5.
    for i in 4..6 {
        trits[i] = bit_trit(device & 1 != 0);
        device >>= 1;
    }

    // Group, M3E pins A6-A7.
    for i in 6..8 {
        trits[i] = bit_trit(group & 1 != 0);
        group >>= 1;
    }

    fixed_tail(&mut trits, on);
    with_default_timing(ProtocolKind::KaKu, trits)
}
