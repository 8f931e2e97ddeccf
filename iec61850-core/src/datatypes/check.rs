//! Two-bit control related bit strings

use super::bit_string::{BitString, bit_string_wrapper};
use serde::{Deserialize, Serialize};

/// Check attribute of control services: synchrocheck and interlock-check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check(BitString);

bit_string_wrapper!(Check, 2);

impl Check {
    pub fn is_synchrocheck(&self) -> bool {
        self.flag(0)
    }

    pub fn is_interlock_check(&self) -> bool {
        self.flag(1)
    }

    pub fn set_synchrocheck(&mut self, value: bool) {
        self.set_flag(0, value);
    }

    pub fn set_interlock_check(&mut self, value: bool) {
        self.set_flag(1, value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoubleBitPosValue {
    Intermediate,
    Off,
    On,
    BadState,
}

/// Double point position (Dbpos)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoubleBitPos(BitString);

bit_string_wrapper!(DoubleBitPos, 2);

impl DoubleBitPos {
    pub fn position(&self) -> DoubleBitPosValue {
        match (self.flag(0), self.flag(1)) {
            (false, false) => DoubleBitPosValue::Intermediate,
            (false, true) => DoubleBitPosValue::Off,
            (true, false) => DoubleBitPosValue::On,
            (true, true) => DoubleBitPosValue::BadState,
        }
    }

    pub fn set_position(&mut self, position: DoubleBitPosValue) {
        let (high, low) = match position {
            DoubleBitPosValue::Intermediate => (false, false),
            DoubleBitPosValue::Off => (false, true),
            DoubleBitPosValue::On => (true, false),
            DoubleBitPosValue::BadState => (true, true),
        };
        self.set_flag(0, high);
        self.set_flag(1, low);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TapCommandValue {
    Stop,
    Lower,
    Higher,
    Reserved,
}

/// Step position command (Tcmd)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapCommand(BitString);

bit_string_wrapper!(TapCommand, 2);

impl TapCommand {
    pub fn command(&self) -> TapCommandValue {
        match (self.flag(0), self.flag(1)) {
            (false, false) => TapCommandValue::Stop,
            (false, true) => TapCommandValue::Lower,
            (true, false) => TapCommandValue::Higher,
            (true, true) => TapCommandValue::Reserved,
        }
    }

    pub fn set_command(&mut self, command: TapCommandValue) {
        let (high, low) = match command {
            TapCommandValue::Stop => (false, false),
            TapCommandValue::Lower => (false, true),
            TapCommandValue::Higher => (true, false),
            TapCommandValue::Reserved => (true, true),
        };
        self.set_flag(0, high);
        self.set_flag(1, low);
    }
}
