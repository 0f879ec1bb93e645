//! Pulse-exact telegram transmitter.
//!
//! Drives the OOK transmit pin through the same four-interval symbol shapes
//! the receiver decodes, timed with busy-wait delays. `send` blocks the
//! calling task for the whole transmission (up to a few seconds at 16
//! repeats); while it runs, the paired receiver is gated off so the
//! controller never decodes its own signal.

use super::hal::{MicrosClock, OutputPin};
use super::ReceiverGate;
use crate::telegram::{wire_period_us, wire_repeats_log2, Telegram, Trit, CODE_MASK, TELEGRAM_TRITS};
use std::sync::Arc;

/// Intervals of the terminating sync, in periods: one high, then the long
/// gap the receiver derives its period estimate from.
const SYNC_HIGH_PERIODS: u32 = 1;
const SYNC_GAP_PERIODS: u32 = 31;

pub struct Transmitter<P: OutputPin, C: MicrosClock> {
    pin: P,
    clock: C,
    /// Default period for wire words with a zero period field, and the
    /// timing `encode_telegram` stamps onto raw trits.
    period_us: u32,
    repeats_log2: u8,
    gate: Option<Arc<ReceiverGate>>,
}

impl<P: OutputPin, C: MicrosClock> Transmitter<P, C> {
    pub fn new(pin: P, clock: C, period_us: u32, repeats_log2: u8) -> Self {
        Self {
            pin,
            clock,
            period_us,
            repeats_log2,
            gate: None,
        }
    }

    /// Pair with a receiver: the gate is switched off for the duration of
    /// every transmission and back on afterwards.
    pub fn with_gate(mut self, gate: Arc<ReceiverGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Transmit a telegram using its own timing fields.
    pub fn send(&mut self, telegram: &Telegram) {
        self.send_telegram(telegram.pack());
    }

    /// Encode and transmit raw trits with the transmitter's own timing.
    pub fn encode_telegram(&mut self, trits: [Trit; TELEGRAM_TRITS]) {
        let telegram = Telegram::new(trits, self.period_us as u16, self.repeats_log2);
        self.send(&telegram);
    }

    /// Transmit a packed wire word. A zero period field falls back to the
    /// transmitter default (a 0 µs period is meaningless); the repeat field
    /// is taken as-is, so zero means a single transmission.
    pub fn send_telegram(&mut self, data: u32) {
        let mut period = wire_period_us(data);
        if period == 0 {
            period = self.period_us;
        }

        if let Some(gate) = &self.gate {
            gate.disable();
        }

        self.send_code(data & CODE_MASK, period, wire_repeats_log2(data));

        if let Some(gate) = &self.gate {
            gate.enable();
        }
    }

    /// Emit the raw pulse train: `2^repeats_log2` transmissions of twelve
    /// symbols each, every transmission trailed by the terminating sync.
    fn send_code(&mut self, code: u32, period_us: u32, repeats_log2: u8) {
        // Refold base 3 into base 4 up front so the per-symbol dispatch in
        // the timing-critical loop is a shift and a mask. The first trit of
        // the telegram ends up in the low bit pair.
        let mut rest = code & CODE_MASK;
        let mut data_base4: u32 = 0;
        for _ in 0..TELEGRAM_TRITS {
            data_base4 <<= 2;
            data_base4 |= rest % 3;
            rest /= 3;
        }

        let repeats = 1u32 << repeats_log2;

        for _ in 0..repeats {
            let mut symbols = data_base4;
            for _ in 0..TELEGRAM_TRITS {
                let intervals: [u32; 4] = match symbols & 0b11 {
                    0 => [1, 3, 1, 3],
                    1 => [3, 1, 3, 1],
                    _ => [1, 3, 3, 1],
                };
                symbols >>= 2;

                for (i, n) in intervals.into_iter().enumerate() {
                    self.pin.set(i % 2 == 0);
                    self.clock.delay_us(n * period_us);
                }
            }

            self.pin.set(true);
            self.clock.delay_us(SYNC_HIGH_PERIODS * period_us);
            self.pin.set(false);
            self.clock.delay_us(SYNC_GAP_PERIODS * period_us);
        }
    }
}
