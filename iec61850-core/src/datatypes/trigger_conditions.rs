//! Trigger options of a report control block

use super::bit_string::{BitString, bit_string_wrapper};
use serde::{Deserialize, Serialize};

/// TrgOps bit string (6 bits). Bit 0 is reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConditions(BitString);

bit_string_wrapper!(TriggerConditions, 6);

impl TriggerConditions {
    pub const DATA_CHANGE: usize = 1;
    pub const QUALITY_CHANGE: usize = 2;
    pub const DATA_UPDATE: usize = 3;
    pub const INTEGRITY: usize = 4;
    pub const GENERAL_INTERROGATION: usize = 5;

    /// Value a freshly loaded RCB carries: general interrogation only
    pub fn default_value() -> Self {
        let mut trg = Self::new();
        trg.set_general_interrogation(true);
        trg
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_value() {
        let trg = TriggerConditions::default_value();
        assert!(trg.is_general_interrogation());
        assert!(!trg.is_data_change());
        assert_eq!(trg.bit_string().as_bytes(), &[0x04]);
    }

    #[test]
    fn test_set_flags() {
        let mut trg = TriggerConditions::new();
        trg.set_data_change(true);
        trg.set_integrity(true);
        assert_eq!(trg.bit_string().as_bytes(), &[0x48]);
    }
}
