//! PWM-positioned blinds.
//!
//! A blind is driven by one channel of a servo-style PWM peripheral, hidden
//! behind [BlindOutput]. Positions are raw compare values calibrated per
//! blind: `min`, `mid` and `max` are the three points the operator teaches,
//! everything else is clamped into that range. The output is only energized
//! while a move settles, then switched off so the motor never hums at rest.

use super::name_hash;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long a move is given to complete before the output is de-energized.
const DEFAULT_SETTLE_MS: u64 = 7_000;

fn default_settle_ms() -> u64 {
    DEFAULT_SETTLE_MS
}

/// PWM peripheral seam: per-channel enable and compare value.
pub trait BlindOutput {
    fn enable(&mut self, channel: u8, enabled: bool);
    fn set_compare(&mut self, channel: u8, value: i32);
}

/// Which calibration point the blind currently sits at (or nearest to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlindState {
    #[default]
    Min,
    Mid,
    Max,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blind {
    pub name: String,
    pub channel: u8,
    pub min_position: i32,
    pub mid_position: i32,
    pub max_position: i32,
    /// Manual-adjust increment, derived from the calibration range.
    pub step: i32,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Runtime position; unknown after a reload until the first move.
    #[serde(skip)]
    curr_position: i32,
    #[serde(skip)]
    position_state: BlindState,
}

impl Blind {
    pub fn new(name: impl Into<String>, channel: u8) -> Self {
        Self {
            name: name.into(),
            channel,
            min_position: 0,
            mid_position: 0,
            max_position: 0,
            step: 0,
            settle_ms: DEFAULT_SETTLE_MS,
            curr_position: 0,
            position_state: BlindState::Min,
        }
    }

    /// Teach the three calibration points, in any order. The step size is
    /// 1/30 of the full travel.
    pub fn set_bounds(&mut self, a: i32, b: i32, c: i32) {
        let mut points = [a, b, c];
        points.sort_unstable();
        self.min_position = points[0];
        self.mid_position = points[1];
        self.max_position = points[2];
        self.step = (self.max_position - self.min_position) / 30;
    }

    /// Drive the output to `position`, clamped into the calibrated range,
    /// and reclassify which calibration point the blind now sits nearest to.
    pub fn set_position(&mut self, output: &mut dyn BlindOutput, position: i32) {
        let position = position.clamp(self.min_position, self.max_position);
        output.set_compare(self.channel, position);
        self.curr_position = position;

        let d_min = (position - self.min_position).abs();
        let d_mid = (position - self.mid_position).abs();
        let d_max = (position - self.max_position).abs();

        // Strict comparisons: a position equidistant from two calibration
        // points falls through to Max.
        self.position_state = if d_min < d_mid && d_min < d_max {
            BlindState::Min
        } else if d_mid < d_min && d_mid < d_max {
            BlindState::Mid
        } else {
            BlindState::Max
        };
    }

    /// Move to the requested calibration point, or cycle Mid, Max, Min when
    /// none is given. Blocks for the settle time with the output energized,
    /// then switches the channel off.
    pub fn toggle_state(&mut self, output: &mut dyn BlindOutput, requested: Option<BlindState>) {
        let next = requested.unwrap_or(match self.position_state {
            BlindState::Mid => BlindState::Max,
            BlindState::Max => BlindState::Min,
            BlindState::Min => BlindState::Mid,
        });
        let target = match next {
            BlindState::Min => self.min_position,
            BlindState::Mid => self.mid_position,
            BlindState::Max => self.max_position,
        };

        tracing::info!(blind = %self.name, ?next, target, "moving blind");

        output.enable(self.channel, true);
        self.set_position(output, target);
        std::thread::sleep(Duration::from_millis(self.settle_ms));
        output.enable(self.channel, false);
    }

    /// Manual nudge by whole calibration steps (negative = towards min).
    pub fn step_by(&mut self, output: &mut dyn BlindOutput, steps: i32) {
        self.set_position(output, self.curr_position + steps * self.step);
    }

    pub fn state(&self) -> BlindState {
        self.position_state
    }

    pub fn position(&self) -> i32 {
        self.curr_position
    }

    /// Stable local key: name byte-sum plus channel and the lower bound.
    pub fn identity_hash(&self) -> u32 {
        name_hash(&self.name)
            .wrapping_add(self.channel as u32)
            .wrapping_add(self.min_position as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeOutput {
        enabled: Vec<(u8, bool)>,
        compares: Vec<(u8, i32)>,
    }

    impl BlindOutput for FakeOutput {
        fn enable(&mut self, channel: u8, enabled: bool) {
            self.enabled.push((channel, enabled));
        }

        fn set_compare(&mut self, channel: u8, value: i32) {
            self.compares.push((channel, value));
        }
    }

    fn calibrated() -> Blind {
        let mut blind = Blind::new("study", 2);
        blind.set_bounds(4200, 1200, 2700);
        blind.settle_ms = 0;
        blind
    }

    #[test]
    fn bounds_are_sorted_and_step_derived() {
        let blind = calibrated();
        assert_eq!(blind.min_position, 1200);
        assert_eq!(blind.mid_position, 2700);
        assert_eq!(blind.max_position, 4200);
        assert_eq!(blind.step, 100);
    }

    #[test]
    fn position_is_clamped_to_the_calibrated_range() {
        let mut blind = calibrated();
        let mut out = FakeOutput::default();

        blind.set_position(&mut out, 100);
        assert_eq!(blind.position(), 1200);
        blind.set_position(&mut out, 9000);
        assert_eq!(blind.position(), 4200);
        assert_eq!(out.compares, vec![(2, 1200), (2, 4200)]);
    }

    #[test]
    fn nearest_calibration_point_classifies_the_state() {
        let mut blind = calibrated();
        let mut out = FakeOutput::default();

        blind.set_position(&mut out, 1300);
        assert_eq!(blind.state(), BlindState::Min);
        blind.set_position(&mut out, 2600);
        assert_eq!(blind.state(), BlindState::Mid);
        blind.set_position(&mut out, 4100);
        assert_eq!(blind.state(), BlindState::Max);

        // Exactly between two points no strict comparison holds, so both
        // ties fall through to Max.
        blind.set_position(&mut out, 1950);
        assert_eq!(blind.state(), BlindState::Max);
        blind.set_position(&mut out, 3450);
        assert_eq!(blind.state(), BlindState::Max);
    }

    #[test]
    fn toggle_cycles_mid_max_min() {
        let mut blind = calibrated();
        let mut out = FakeOutput::default();

        assert_eq!(blind.state(), BlindState::Min);
        blind.toggle_state(&mut out, None);
        assert_eq!(blind.state(), BlindState::Mid);
        blind.toggle_state(&mut out, None);
        assert_eq!(blind.state(), BlindState::Max);
        blind.toggle_state(&mut out, None);
        assert_eq!(blind.state(), BlindState::Min);

        // Each move energizes the channel only for the settle window.
        assert_eq!(
            out.enabled,
            vec![
                (2, true),
                (2, false),
                (2, true),
                (2, false),
                (2, true),
                (2, false)
            ]
        );
    }

    #[test]
    fn requested_state_overrides_the_cycle() {
        let mut blind = calibrated();
        let mut out = FakeOutput::default();

        blind.toggle_state(&mut out, Some(BlindState::Max));
        assert_eq!(blind.state(), BlindState::Max);
        assert_eq!(blind.position(), 4200);
    }

    #[test]
    fn step_by_moves_in_calibration_steps() {
        let mut blind = calibrated();
        let mut out = FakeOutput::default();

        blind.set_position(&mut out, 2700);
        blind.step_by(&mut out, 3);
        assert_eq!(blind.position(), 3000);
        blind.step_by(&mut out, -40);
        assert_eq!(blind.position(), 1200);
    }

    #[test]
    fn settle_and_runtime_state_survive_serialization() {
        let blind = calibrated();
        let json = serde_json::to_string(&blind).unwrap();
        let back: Blind = serde_json::from_str(&json).unwrap();
        assert_eq!(back.min_position, 1200);
        assert_eq!(back.settle_ms, 0);
        assert_eq!(back.state(), BlindState::Min);

        // Documents written before the settle field existed get the default.
        let back: Blind = serde_json::from_str(
            r#"{"name":"study","channel":2,"min_position":0,"mid_position":1,"max_position":2,"step":0}"#,
        )
        .unwrap();
        assert_eq!(back.settle_ms, DEFAULT_SETTLE_MS);
    }
}
