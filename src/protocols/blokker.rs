//! "Blokker" store remote telegram layout.
//!
//! No address dial: eight devices, selected by a 3-bit index. All unused
//! trits stay Low.
//!
//! Trit layout:
//! - 1-3: device bits (set -> Low, clear -> High)
//! - 8: on ? High : Low
//! - everything else Low

use super::{with_default_timing, ProtocolKind};
use crate::telegram::{Telegram, Trit};

/// Measured pulse period of Blokker remotes.
pub const PERIOD_US: u16 = 230;

/// Telegram for device `1..=8`.
pub fn telegram(device: u16, on: bool) -> Telegram {
    let mut trits = [Trit::Low; 12];
    let mut device = device.wrapping_sub(1);

    for i in 1..4 {
        trits[i] = if device & 1 != 0 { Trit::Low } else { Trit::High };
        device >>= 1;
    }

    trits[8] = if on { Trit::High } else { Trit::Low };

    with_default_timing(ProtocolKind::Blokker, trits)
}
