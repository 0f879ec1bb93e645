//! Edge-timing telegram receiver.
//!
//! A state machine fed one call per logic-level transition of the receive
//! pin. Polarity is never inspected; every decision is made from the duration
//! between consecutive edges. One telegram is 12 symbols of 4 edge-intervals
//! each (48 decode states) followed by a short edge and a long terminating
//! sync gap; the sync gap of one transmission doubles as the lead-in of the
//! next, which is what makes repeat counting possible without re-syncing.
//!
//! The handler must complete in microseconds and never allocate or block:
//! further edges can arrive before it returns. Malformed timing at any point
//! silently resets the machine to sync search — decoding failure is invisible
//! to callers and the next sync gap starts a fresh attempt.

use super::ReceiverGate;
use std::sync::Arc;

/// Waiting for a sync gap; no period estimate yet.
const STATE_SYNC_WAIT: i8 = -1;
/// First terminal-sync sub-state (the short edge before the long gap).
const STATE_TERMINAL_SHORT: i8 = 48;

/// Minimal inter-edge time (µs) that counts as a sync gap: 31 periods of the
/// shortest practical period (120 µs).
const MIN_SYNC_GAP_US: u32 = 31 * 120;

/// Callback invoked synchronously from the edge handler with
/// `(received_code, period_us)`. Must be fast and must not re-enter the
/// receiver.
pub type TelegramCallback = Box<dyn FnMut(u32, u32) + Send>;

/// Telegram receiver state. One instance per physical receive pin, owned by
/// whoever services the edge interrupt.
pub struct Receiver {
    gate: Arc<ReceiverGate>,
    min_repeats: u8,
    callback: TelegramCallback,

    state: i8,
    /// Period estimate in µs, derived from the most recent sync gap.
    period: u32,
    /// 4-bit shift pattern accumulating the current symbol's edge intervals.
    received_bit: u16,
    /// Base-3 accumulator of decoded trits.
    received_code: u32,
    previous_code: u32,
    repeats: u8,
    /// Rolling window of the last three edge timestamps. Durations are
    /// computed one edge behind the newest, giving the noise filter one edge
    /// of lookahead.
    edge_ts: [u32; 3],

    // Tolerance bands, derived from the period with generous margins for
    // cheap oscillators. Integer math only.
    min1_period: u32,
    max1_period: u32,
    min3_period: u32,
    max3_period: u32,

    /// Set when a too-short interval was seen: drop the next edge too.
    skip: bool,
    in_callback: bool,
}

impl Receiver {
    /// `min_repeats` is the number of identical consecutive codes required
    /// before the callback fires. 0 and 1 both mean "fire on the first valid
    /// code" (the counter is incremented before the threshold check).
    pub fn new(gate: Arc<ReceiverGate>, min_repeats: u8, callback: TelegramCallback) -> Self {
        Self {
            gate,
            min_repeats,
            callback,
            state: STATE_SYNC_WAIT,
            period: 0,
            received_bit: 0,
            received_code: 0,
            previous_code: 0,
            repeats: 0,
            edge_ts: [0; 3],
            min1_period: 0,
            max1_period: 0,
            min3_period: 0,
            max3_period: 0,
            skip: false,
            in_callback: false,
        }
    }

    pub fn gate(&self) -> Arc<ReceiverGate> {
        Arc::clone(&self.gate)
    }

    /// Process one edge of the receive pin, timestamped in wrapping
    /// microseconds. Interrupt-context entry point: non-blocking, no
    /// allocation, silent on failure.
    pub fn handle_edge(&mut self, now_us: u32) {
        if !self.gate.is_enabled() {
            return;
        }
        if self.gate.take_resync() {
            self.state = STATE_SYNC_WAIT;
        }

        self.edge_ts[1] = self.edge_ts[2];
        self.edge_ts[2] = now_us;

        if self.skip {
            self.skip = false;
            return;
        }

        // Low-pass filter against double-triggering: a too-short interval
        // mid-decode drops this edge and the next one.
        if self.state >= 0
            && self.edge_ts[2].wrapping_sub(self.edge_ts[1]) < self.min1_period
        {
            self.skip = true;
            return;
        }

        let duration = self.edge_ts[1].wrapping_sub(self.edge_ts[0]);
        self.edge_ts[0] = self.edge_ts[1];

        // With state >= 0, duration is always at least one period.

        if self.state == STATE_SYNC_WAIT {
            if duration > MIN_SYNC_GAP_US {
                // Sync gap found: derive the period and tolerance bands.
                self.period = duration / 31;
                self.received_code = 0;
                self.previous_code = 0;
                self.repeats = 0;

                self.min1_period = self.period * 4 / 10;
                self.max1_period = self.period * 16 / 10;
                self.min3_period = self.period * 23 / 10;
                self.max3_period = self.period * 37 / 10;
            } else {
                return;
            }
        } else if self.state < STATE_TERMINAL_SHORT {
            // Decoding a symbol: each interval is 1 or 3 periods, nothing else.
            self.received_bit <<= 1;

            if duration <= self.max1_period {
                self.received_bit &= 0b1110;
            } else if duration >= self.min3_period && duration <= self.max3_period {
                self.received_bit |= 0b1;
            } else {
                self.state = STATE_SYNC_WAIT;
                return;
            }

            if self.state % 4 == 3 {
                // Symbol complete: the 4-interval pattern selects the trit.
                self.received_code = self.received_code.wrapping_mul(3);

                match self.received_bit & 0b1111 {
                    0b0101 => {} // short long short long: trit 0
                    0b1010 => self.received_code += 1, // long short long short: trit 1
                    0b0110 => self.received_code += 2, // short long long short: trit "float"
                    _ => {
                        self.state = STATE_SYNC_WAIT;
                        return;
                    }
                }
            }
        } else if self.state == STATE_TERMINAL_SHORT {
            // First part of the terminating sync must be one period.
            if duration > self.max1_period {
                self.state = STATE_SYNC_WAIT;
                return;
            }
        } else {
            // Second part: the long terminating gap, 25..36 periods.
            if duration < self.period * 25 || duration > self.period * 36 {
                self.state = STATE_SYNC_WAIT;
                return;
            }

            // received_code is a fully valid candidate.

            if self.received_code != self.previous_code {
                self.repeats = 0;
                self.previous_code = self.received_code;
            }

            self.repeats += 1;

            if self.repeats >= self.min_repeats {
                if !self.in_callback {
                    self.in_callback = true;
                    (self.callback)(self.received_code, self.period);
                    self.in_callback = false;
                }
                self.state = STATE_SYNC_WAIT;
                return;
            }

            // Below the repeat threshold: the terminating gap already serves
            // as the next transmission's sync, so resume decoding directly.
            self.received_code = 0;
            self.state = 0;
            return;
        }

        self.state += 1;
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> i8 {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn period(&self) -> u32 {
        self.period
    }
}
