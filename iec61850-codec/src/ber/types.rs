//! BER encoding types (Tag, Length)

use iec61850_core::{Iec61850Error, Iec61850Result};

/// BER Tag Class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BerTagClass {
    /// Universal class (00)
    Universal = 0,
    /// Application class (01)
    Application = 1,
    /// Context-specific class (10)
    ContextSpecific = 2,
    /// Private class (11)
    Private = 3,
}

impl BerTagClass {
    /// Get tag class from bits 7-6 of the tag byte
    pub fn from_bits(bits: u8) -> Self {
        match (bits >> 6) & 0x03 {
            0 => BerTagClass::Universal,
            1 => BerTagClass::Application,
            2 => BerTagClass::ContextSpecific,
            _ => BerTagClass::Private,
        }
    }

    pub fn to_bits(self) -> u8 {
        (self as u8) << 6
    }
}

/// BER Tag
///
/// Short form (tag number 0-30):
/// ```text
/// Bits: 8 7 6 5 4 3 2 1
///       C C P T T T T T
/// ```
///
/// Extended form (tag number > 30):
/// ```text
/// First byte:  C C P 1 1 1 1 1
/// Following bytes: 1 T T T T T T T ... 0 T T T T T T T
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BerTag {
    class: BerTagClass,
    constructed: bool,
    number: u32,
}

impl BerTag {
    pub const INTEGER: BerTag = BerTag::universal(false, 2);
    pub const NULL: BerTag = BerTag::universal(false, 5);
    pub const SEQUENCE: BerTag = BerTag::universal(true, 16);
    pub const VISIBLE_STRING: BerTag = BerTag::universal(false, 26);
    pub const GRAPHIC_STRING: BerTag = BerTag::universal(false, 25);

    pub const fn new(class: BerTagClass, constructed: bool, number: u32) -> Self {
        Self {
            class,
            constructed,
            number,
        }
    }

    pub const fn universal(constructed: bool, number: u32) -> Self {
        Self::new(BerTagClass::Universal, constructed, number)
    }

    pub const fn application(constructed: bool, number: u32) -> Self {
        Self::new(BerTagClass::Application, constructed, number)
    }

    /// Primitive context specific tag `[n] IMPLICIT`
    pub const fn context(number: u32) -> Self {
        Self::new(BerTagClass::ContextSpecific, false, number)
    }

    /// Constructed context specific tag
    pub const fn context_constructed(number: u32) -> Self {
        Self::new(BerTagClass::ContextSpecific, true, number)
    }

    pub fn class(&self) -> BerTagClass {
        self.class
    }

    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// Context specific tag with the given number, primitive or constructed
    pub fn is_context(&self, number: u32) -> bool {
        self.class == BerTagClass::ContextSpecific && self.number == number
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut result = Vec::new();
        let class_bits = self.class.to_bits();
        let constructed_bit = if self.constructed { 0x20 } else { 0x00 };

        if self.number <= 30 {
            result.push(class_bits | constructed_bit | (self.number as u8 & 0x1F));
            return result;
        }

        result.push(class_bits | constructed_bit | 0x1F);
        let mut remaining = self.number;
        let mut bytes = Vec::new();
        while remaining > 0 {
            bytes.push((remaining & 0x7F) as u8);
            remaining >>= 7;
        }
        let last = bytes.len() - 1;
        for (i, &byte) in bytes.iter().rev().enumerate() {
            if i < last {
                result.push(byte | 0x80);
            } else {
                result.push(byte);
            }
        }
        result
    }

    /// Decode a tag, returning it with the number of bytes consumed
    pub fn decode(data: &[u8]) -> Iec61850Result<(Self, usize)> {
        let first = *data
            .first()
            .ok_or_else(|| Iec61850Error::Decoding("empty buffer for tag decoding".to_string()))?;
        let class = BerTagClass::from_bits(first);
        let constructed = first & 0x20 != 0;

        if first & 0x1F != 0x1F {
            return Ok((Self::new(class, constructed, (first & 0x1F) as u32), 1));
        }

        let mut number: u32 = 0;
        for (i, &byte) in data.iter().enumerate().skip(1) {
            if i > 5 {
                break;
            }
            number = (number << 7) | (byte & 0x7F) as u32;
            if byte & 0x80 == 0 {
                return Ok((Self::new(class, constructed, number), i + 1));
            }
        }
        Err(Iec61850Error::Decoding(
            "invalid extended tag encoding".to_string(),
        ))
    }
}

/// BER Length, short form for 0-127, long form otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BerLength {
    Short(u8),
    Long(usize),
}

impl BerLength {
    pub fn new(length: usize) -> Self {
        if length < 128 {
            BerLength::Short(length as u8)
        } else {
            BerLength::Long(length)
        }
    }

    pub fn value(&self) -> usize {
        match self {
            BerLength::Short(l) => *l as usize,
            BerLength::Long(l) => *l,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            BerLength::Short(length) => vec![*length],
            BerLength::Long(length) => {
                let num_bytes = (usize::BITS - length.leading_zeros()).div_ceil(8).max(1) as usize;
                let mut result = vec![0x80 | (num_bytes as u8)];
                for i in (0..num_bytes).rev() {
                    result.push(((*length >> (i * 8)) & 0xFF) as u8);
                }
                result
            }
        }
    }

    /// Decode a definite length, returning it with the number of bytes consumed
    pub fn decode(data: &[u8]) -> Iec61850Result<(Self, usize)> {
        let first = *data.first().ok_or_else(|| {
            Iec61850Error::Decoding("empty buffer for length decoding".to_string())
        })?;

        if first & 0x80 == 0 {
            return Ok((BerLength::Short(first & 0x7F), 1));
        }

        let num_bytes = (first & 0x7F) as usize;
        if num_bytes == 0 {
            return Err(Iec61850Error::Decoding(
                "indefinite length encoding not supported".to_string(),
            ));
        }
        if num_bytes > 4 {
            return Err(Iec61850Error::Decoding(format!(
                "length encoding too large: {} bytes (max 4)",
                num_bytes
            )));
        }
        if data.len() < 1 + num_bytes {
            return Err(Iec61850Error::Decoding(format!(
                "buffer too short for long form length: need {} bytes, got {}",
                1 + num_bytes,
                data.len()
            )));
        }

        let length = data[1..=num_bytes]
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize);
        Ok((BerLength::Long(length), 1 + num_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ber_tag_short_form() {
        assert_eq!(BerTag::INTEGER.encode(), vec![0x02]);
        assert_eq!(BerTag::context_constructed(0).encode(), vec![0xA0]);
        assert_eq!(BerTag::context(17).encode(), vec![0x91]);
    }

    #[test]
    fn test_ber_tag_extended_form() {
        let tag = BerTag::context_constructed(72);
        let encoded = tag.encode();
        assert_eq!(encoded, vec![0xBF, 0x48]);
        let (decoded, consumed) = BerTag::decode(&encoded).unwrap();
        assert_eq!(consumed, 2);
        assert_eq!(decoded, tag);
    }

    #[test]
    fn test_ber_length_long() {
        let encoded = BerLength::new(1000).encode();
        assert_eq!(encoded, vec![0x82, 0x03, 0xE8]);
        let (length, consumed) = BerLength::decode(&encoded).unwrap();
        assert_eq!(consumed, 3);
        assert_eq!(length.value(), 1000);
    }

    #[test]
    fn test_indefinite_length_rejected() {
        assert!(BerLength::decode(&[0x80]).is_err());
    }
}
