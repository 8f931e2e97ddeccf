//! Bit string type for the MMS data algebra

use crate::error::{Iec61850Error, Iec61850Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arbitrary string of bits (zeros and ones). Bit 0 is the most significant bit of the first byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitString {
    bytes: Vec<u8>,
    num_bits: usize,
}

impl BitString {
    /// Construct a new bit string object.
    ///
    /// # Arguments
    ///
    /// * `bit_string` - The bit string as a byte array
    /// * `num_bits` - The number of bits
    ///
    /// # Errors
    ///
    /// Returns an error if `num_bits > bit_string.len() * 8`
    pub fn new(bit_string: Vec<u8>, num_bits: usize) -> Iec61850Result<Self> {
        if num_bits > bit_string.len() * 8 {
            return Err(Iec61850Error::InvalidData(format!(
                "bit_string is too short to hold all bits. Need {} bytes for {} bits",
                num_bits.div_ceil(8),
                num_bits
            )));
        }

        Ok(Self {
            bytes: bit_string,
            num_bits,
        })
    }

    /// All-zero bit string of the given length
    pub fn zeroed(num_bits: usize) -> Self {
        Self {
            bytes: vec![0; num_bits.div_ceil(8)],
            num_bits,
        }
    }

    /// Build a bit string from a list of booleans
    pub fn from_bits(bits: &[bool]) -> Self {
        let mut bit_string = Self::zeroed(bits.len());
        for (index, bit) in bits.iter().enumerate() {
            if *bit {
                bit_string.bytes[index / 8] |= 0x80 >> (index % 8);
            }
        }
        bit_string
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Get the bit at a specific position
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds
    pub fn get_bit(&self, index: usize) -> Iec61850Result<bool> {
        if index >= self.num_bits {
            return Err(Iec61850Error::InvalidData(format!(
                "Bit index {} out of bounds (num_bits: {})",
                index, self.num_bits
            )));
        }
        let byte_index = index / 8;
        let bit_index = 7 - (index % 8); // MSB first
        Ok((self.bytes[byte_index] >> bit_index) & 1 == 1)
    }

    /// Bit at `index`, `false` when out of range
    pub fn bit(&self, index: usize) -> bool {
        self.get_bit(index).unwrap_or(false)
    }

    /// Set the bit at a specific position
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds
    pub fn set_bit(&mut self, index: usize, value: bool) -> Iec61850Result<()> {
        if index >= self.num_bits {
            return Err(Iec61850Error::InvalidData(format!(
                "Bit index {} out of bounds (num_bits: {})",
                index, self.num_bits
            )));
        }
        let byte_index = index / 8;
        let bit_index = 7 - (index % 8); // MSB first
        if value {
            self.bytes[byte_index] |= 1 << bit_index;
        } else {
            self.bytes[byte_index] &= !(1 << bit_index);
        }
        Ok(())
    }

    /// Bits as booleans, MSB first
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.num_bits).map(|i| self.bit(i))
    }

    pub fn count_ones(&self) -> usize {
        self.iter().filter(|b| *b).count()
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.iter() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Implements the shared surface of the fixed-length bit-string composites.
macro_rules! bit_string_wrapper {
    ($name:ident, $len:expr) => {
        impl $name {
            pub const NUM_BITS: usize = $len;

            pub fn new() -> Self {
                Self($crate::datatypes::BitString::zeroed($len))
            }

            /// Wrap an existing bit string. Shorter strings are zero-extended.
            pub fn from_bit_string(bits: $crate::datatypes::BitString) -> Self {
                if bits.num_bits() >= $len {
                    return Self(bits);
                }
                let mut extended = $crate::datatypes::BitString::zeroed($len);
                for (i, bit) in bits.iter().enumerate() {
                    if bit {
                        let _ = extended.set_bit(i, true);
                    }
                }
                Self(extended)
            }

            pub fn bit_string(&self) -> &$crate::datatypes::BitString {
                &self.0
            }

            pub fn into_bit_string(self) -> $crate::datatypes::BitString {
                self.0
            }

            fn flag(&self, index: usize) -> bool {
                self.0.bit(index)
            }

            fn set_flag(&mut self, index: usize, value: bool) {
                let _ = self.0.set_bit(index, value);
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

pub(crate) use bit_string_wrapper;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_string_new() {
        let bytes = vec![0xFF, 0x00, 0xAA];
        let bit_string = BitString::new(bytes.clone(), 24).unwrap();
        assert_eq!(bit_string.as_bytes(), &bytes);
        assert_eq!(bit_string.num_bits(), 24);
    }

    #[test]
    fn test_bit_string_invalid() {
        let result = BitString::new(vec![0xFF], 16);
        assert!(result.is_err());
    }

    #[test]
    fn test_bit_string_msb_first() {
        let mut bits = BitString::zeroed(10);
        bits.set_bit(0, true).unwrap();
        bits.set_bit(9, true).unwrap();
        assert_eq!(bits.as_bytes(), &[0x80, 0x40]);
        assert!(bits.get_bit(10).is_err());
        assert_eq!(bits.to_string(), "1000000001");
    }

    #[test]
    fn test_bit_string_from_bits() {
        let bits = BitString::from_bits(&[true, true]);
        assert_eq!(bits.as_bytes(), &[0xC0]);
        assert_eq!(bits.count_ones(), 2);
    }
}
