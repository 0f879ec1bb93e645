//! Controlled devices: RF-switched lights and PWM-driven blinds.
//!
//! Both device kinds are plain serde data plus behaviour; the persisted form
//! (see `storage`) carries only the identity and calibration fields, never
//! runtime state.

pub mod blind;
pub mod light;

pub use blind::{Blind, BlindOutput, BlindState};
pub use light::{Light, LightKind};

/// Wrapping byte-sum of a device name. Combined with the small identity
/// fields this gives each device a stable key across list reloads. It is
/// deliberately weak (order-independent, so anagrams collide); collisions
/// only matter between devices configured on the same controller, where the
/// operator picks the names.
pub(crate) fn name_hash(name: &str) -> u32 {
    name.bytes().fold(0u32, |acc, b| acc.wrapping_add(b as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_hash_is_order_independent() {
        assert_eq!(name_hash("hall"), name_hash("llah"));
        assert_ne!(name_hash("hall"), name_hash("halls"));
        assert_eq!(name_hash(""), 0);
    }
}
