//! Remote-button registry and the interrupt/task hand-off latch.
//!
//! The receive callback runs in interrupt context and must not touch the
//! device lists, so it only posts the decoded code into a [CodeLatch]. The
//! control loop polls the latch, looks the code up in the [ButtonRegistry]
//! and applies the bound event to the matching device. Learning a new button
//! uses the same latch with actions suppressed, so pressing the remote during
//! a learn window assigns the code instead of firing it.

use crate::devices::{Blind, BlindOutput, Light};
use crate::signal::hal::{MicrosClock, OutputPin};
use crate::signal::transmitter::Transmitter;
use crate::telegram::{is_same_code, CODE_MASK};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// What pressing a bound button does. `event_hash` of the owning
/// [RemoteButton] selects the target device; `Action` ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteEvent {
    LightOn,
    LightOff,
    LightToggle,
    BlindToggle,
    Action,
}

/// One learned remote code and its binding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RemoteButton {
    /// 20-bit telegram data of the button.
    pub code: u32,
    pub event: RemoteEvent,
    /// Identity hash of the bound device (unused for `Action`).
    pub event_hash: u32,
}

/// Single-slot mailbox between the receive callback and the control loop.
///
/// A code is posted only into an empty latch; while one is pending, further
/// telegrams are dropped. Code 0 is not a valid telegram (an all-Low telegram
/// never identifies a button worth binding), so it doubles as the empty
/// marker.
#[derive(Debug, Default)]
pub struct CodeLatch {
    code: AtomicU32,
    learning: AtomicBool,
}

impl CodeLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post a decoded code. Returns false when a previous code is still
    /// pending. Interrupt-context safe.
    pub fn post(&self, code: u32) -> bool {
        self.code
            .compare_exchange(0, code & CODE_MASK, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    /// Take the pending code, leaving the latch empty.
    pub fn take(&self) -> Option<u32> {
        match self.code.swap(0, Ordering::AcqRel) {
            0 => None,
            code => Some(code),
        }
    }

    /// Suppress actions: posted codes are kept for assignment instead of
    /// being dispatched. Clears any stale pending code.
    pub fn begin_learn(&self) {
        self.learning.store(true, Ordering::Release);
        self.code.store(0, Ordering::Release);
    }

    pub fn end_learn(&self) {
        self.learning.store(false, Ordering::Release);
    }

    pub fn actions_enabled(&self) -> bool {
        !self.learning.load(Ordering::Acquire)
    }
}

/// The learned button list plus dispatch against the device lists.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ButtonRegistry {
    buttons: Vec<RemoteButton>,
}

impl ButtonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buttons(&self) -> &[RemoteButton] {
        &self.buttons
    }

    pub fn add(&mut self, button: RemoteButton) {
        self.buttons.push(button);
    }

    pub fn remove(&mut self, index: usize) -> Option<RemoteButton> {
        if index < self.buttons.len() {
            Some(self.buttons.remove(index))
        } else {
            None
        }
    }

    /// Look a received code up, ignoring timing metadata on either side.
    pub fn find(&self, code: u32) -> Option<&RemoteButton> {
        self.buttons.iter().find(|b| is_same_code(b.code, code))
    }

    /// Apply the event bound to `code` against the device lists. Returns
    /// false when the code is unknown or its target device is gone.
    pub fn dispatch<P: OutputPin, C: MicrosClock>(
        &self,
        code: u32,
        lights: &mut [Light],
        blinds: &mut [Blind],
        transmitter: &mut Transmitter<P, C>,
        blind_output: &mut dyn BlindOutput,
    ) -> bool {
        let Some(button) = self.find(code) else {
            tracing::debug!(code, "unbound remote code");
            return false;
        };

        match button.event {
            RemoteEvent::LightOn | RemoteEvent::LightOff | RemoteEvent::LightToggle => {
                let Some(light) = lights
                    .iter_mut()
                    .find(|l| l.identity_hash() == button.event_hash)
                else {
                    tracing::warn!(hash = button.event_hash, "bound light not found");
                    return false;
                };
                match button.event {
                    RemoteEvent::LightOn => light.on_off(transmitter, true),
                    RemoteEvent::LightOff => light.on_off(transmitter, false),
                    _ => light.toggle(transmitter),
                }
            }
            RemoteEvent::BlindToggle => {
                let Some(blind) = blinds
                    .iter_mut()
                    .find(|b| b.identity_hash() == button.event_hash)
                else {
                    tracing::warn!(hash = button.event_hash, "bound blind not found");
                    return false;
                };
                blind.toggle_state(blind_output, None);
            }
            RemoteEvent::Action => {
                tracing::info!(code = button.code, "remote action");
            }
        }
        true
    }

    /// Wait up to `timeout` for the next code pressed on a remote and bind
    /// it. Actions are suppressed for the duration of the wait.
    pub fn learn(
        &mut self,
        latch: &CodeLatch,
        event: RemoteEvent,
        event_hash: u32,
        timeout: Duration,
    ) -> Option<RemoteButton> {
        latch.begin_learn();
        tracing::info!(?event, "press the remote button to assign");

        let deadline = Instant::now() + timeout;
        let code = loop {
            if let Some(code) = latch.take() {
                break Some(code);
            }
            if Instant::now() >= deadline {
                break None;
            }
            std::thread::sleep(Duration::from_millis(10));
        };
        latch.end_learn();

        let button = RemoteButton {
            code: code?,
            event,
            event_hash,
        };
        tracing::info!(code = button.code, ?event, "button learned");
        self.add(button);
        Some(button)
    }
}
