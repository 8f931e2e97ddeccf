//! Reason codes attached to report members

use super::bit_string::{BitString, bit_string_wrapper};
use serde::{Deserialize, Serialize};

/// ReasonForInclusion bit string (7 bits). Bit 0 is reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonForInclusion(BitString);

bit_string_wrapper!(ReasonForInclusion, 7);

impl ReasonForInclusion {
    pub const DATA_CHANGE: usize = 1;
    pub const QUALITY_CHANGE: usize = 2;
    pub const DATA_UPDATE: usize = 3;
    pub const INTEGRITY: usize = 4;
    pub const GENERAL_INTERROGATION: usize = 5;
    pub const APPLICATION_TRIGGER: usize = 6;

    pub fn integrity() -> Self {
        let mut reason = Self::new();
        reason.set_integrity(true);
        reason
    }

    pub fn general_interrogation() -> Self {
        let mut reason = Self::new();
        reason.set_general_interrogation(true);
        reason
    }

    /// Merge the bits of `other` into `self`
    pub fn merge(&mut self, other: &ReasonForInclusion) {
        for index in 1..Self::NUM_BITS {
            if other.flag(index) {
                self.set_flag(index, true);
            }
        }
    }

    pub fn is_data_change(&self) -> bool {
        self.flag(Self::DATA_CHANGE)
    }

    pub fn is_quality_change(&self) -> bool {
        self.flag(Self::QUALITY_CHANGE)
    }

    pub fn is_data_update(&self) -> bool {
        self.flag(Self::DATA_UPDATE)
    }

    pub fn is_integrity(&self) -> bool {
        self.flag(Self::INTEGRITY)
    }

    pub fn is_general_interrogation(&self) -> bool {
        self.flag(Self::GENERAL_INTERROGATION)
    }

    pub fn is_application_trigger(&self) -> bool {
        self.flag(Self::APPLICATION_TRIGGER)
    }

    pub fn set_data_change(&mut self, value: bool) {
        self.set_flag(Self::DATA_CHANGE, value);
    }

    pub fn set_quality_change(&mut self, value: bool) {
        self.set_flag(Self::QUALITY_CHANGE, value);
    }

    pub fn set_data_update(&mut self, value: bool) {
        self.set_flag(Self::DATA_UPDATE, value);
    }

    pub fn set_integrity(&mut self, value: bool) {
        self.set_flag(Self::INTEGRITY, value);
    }

    pub fn set_general_interrogation(&mut self, value: bool) {
        self.set_flag(Self::GENERAL_INTERROGATION, value);
    }

    pub fn set_application_trigger(&mut self, value: bool) {
        self.set_flag(Self::APPLICATION_TRIGGER, value);
    }
}
