//! Optional fields of a report control block

use super::bit_string::{BitString, bit_string_wrapper};
use serde::{Deserialize, Serialize};

/// OptFlds bit string (10 bits). Bit 0 is reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptFlds(BitString);

bit_string_wrapper!(OptFlds, 10);

impl OptFlds {
    pub const SEQUENCE_NUMBER: usize = 1;
    pub const REPORT_TIMESTAMP: usize = 2;
    pub const REASON_FOR_INCLUSION: usize = 3;
    pub const DATA_SET_NAME: usize = 4;
    pub const DATA_REFERENCE: usize = 5;
    pub const BUFFER_OVERFLOW: usize = 6;
    pub const ENTRY_ID: usize = 7;
    pub const CONFIGURATION_REVISION: usize = 8;
    pub const SEGMENTATION: usize = 9;

    /// Value a freshly loaded RCB carries: only buffer-overflow set
    pub fn default_value() -> Self {
        let mut flds = Self::new();
        flds.set_buffer_overflow(true);
        flds
    }

    pub fn is_sequence_number(&self) -> bool {
        self.flag(Self::SEQUENCE_NUMBER)
    }

    pub fn is_report_timestamp(&self) -> bool {
        self.flag(Self::REPORT_TIMESTAMP)
    }

    pub fn is_reason_for_inclusion(&self) -> bool {
        self.flag(Self::REASON_FOR_INCLUSION)
    }

    pub fn is_data_set_name(&self) -> bool {
        self.flag(Self::DATA_SET_NAME)
    }

    pub fn is_data_reference(&self) -> bool {
        self.flag(Self::DATA_REFERENCE)
    }

    pub fn is_buffer_overflow(&self) -> bool {
        self.flag(Self::BUFFER_OVERFLOW)
    }

    pub fn is_entry_id(&self) -> bool {
        self.flag(Self::ENTRY_ID)
    }

    pub fn is_configuration_revision(&self) -> bool {
        self.flag(Self::CONFIGURATION_REVISION)
    }

    pub fn is_segmentation(&self) -> bool {
        self.flag(Self::SEGMENTATION)
    }

    pub fn set_sequence_number(&mut self, value: bool) {
        self.set_flag(Self::SEQUENCE_NUMBER, value);
    }

    pub fn set_report_timestamp(&mut self, value: bool) {
        self.set_flag(Self::REPORT_TIMESTAMP, value);
    }

    pub fn set_reason_for_inclusion(&mut self, value: bool) {
        self.set_flag(Self::REASON_FOR_INCLUSION, value);
    }

    pub fn set_data_set_name(&mut self, value: bool) {
        self.set_flag(Self::DATA_SET_NAME, value);
    }

    pub fn set_data_reference(&mut self, value: bool) {
        self.set_flag(Self::DATA_REFERENCE, value);
    }

    pub fn set_buffer_overflow(&mut self, value: bool) {
        self.set_flag(Self::BUFFER_OVERFLOW, value);
    }

    pub fn set_entry_id(&mut self, value: bool) {
        self.set_flag(Self::ENTRY_ID, value);
    }

    pub fn set_configuration_revision(&mut self, value: bool) {
        self.set_flag(Self::CONFIGURATION_REVISION, value);
    }

    pub fn set_segmentation(&mut self, value: bool) {
        self.set_flag(Self::SEGMENTATION, value);
    }
}
