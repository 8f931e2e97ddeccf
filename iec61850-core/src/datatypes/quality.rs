//! Quality attribute (13-bit bit string)

use super::bit_string::{BitString, bit_string_wrapper};
use serde::{Deserialize, Serialize};

/// Validity encoded in the first two bits of a quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Validity {
    Good,
    Invalid,
    Reserved,
    Questionable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quality(BitString);

bit_string_wrapper!(Quality, 13);

impl Quality {
    pub const OVERFLOW: usize = 2;
    pub const OUT_OF_RANGE: usize = 3;
    pub const BAD_REFERENCE: usize = 4;
    pub const OSCILLATORY: usize = 5;
    pub const FAILURE: usize = 6;
    pub const OLD_DATA: usize = 7;
    pub const INCONSISTENT: usize = 8;
    pub const INACCURATE: usize = 9;
    pub const SOURCE_SUBSTITUTED: usize = 10;
    pub const TEST: usize = 11;
    pub const OPERATOR_BLOCKED: usize = 12;

    pub fn validity(&self) -> Validity {
        match (self.flag(0), self.flag(1)) {
            (false, false) => Validity::Good,
            (false, true) => Validity::Invalid,
            (true, false) => Validity::Reserved,
            (true, true) => Validity::Questionable,
        }
    }

    pub fn set_validity(&mut self, validity: Validity) {
        let (high, low) = match validity {
            Validity::Good => (false, false),
            Validity::Invalid => (false, true),
            Validity::Reserved => (true, false),
            Validity::Questionable => (true, true),
        };
        self.set_flag(0, high);
        self.set_flag(1, low);
    }

    pub fn is_detail(&self, index: usize) -> bool {
        self.flag(index)
    }

    pub fn set_detail(&mut self, index: usize, value: bool) {
        if index >= Self::OVERFLOW {
            self.set_flag(index, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity() {
        let mut q = Quality::new();
        assert_eq!(q.validity(), Validity::Good);
        q.set_validity(Validity::Questionable);
        assert_eq!(q.validity(), Validity::Questionable);
        assert_eq!(q.bit_string().as_bytes(), &[0xC0, 0x00]);
    }

    #[test]
    fn test_detail_bits() {
        let mut q = Quality::new();
        q.set_detail(Quality::OPERATOR_BLOCKED, true);
        assert!(q.is_detail(Quality::OPERATOR_BLOCKED));
        assert_eq!(q.bit_string().as_bytes(), &[0x00, 0x08]);
    }
}
