//! BER decoder

use super::types::{BerLength, BerTag};
use iec61850_core::{Iec61850Error, Iec61850Result};

/// BER decoder reading TLV triplets from a byte buffer.
///
/// The decoder keeps a position that advances as values are decoded. The
/// content of a constructed value is decoded with a nested decoder created
/// from the returned value slice.
#[derive(Debug, Clone)]
pub struct BerDecoder<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> BerDecoder<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    pub fn has_remaining(&self) -> bool {
        self.position < self.buffer.len()
    }

    fn read_bytes(&mut self, count: usize) -> Iec61850Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(Iec61850Error::Decoding(format!(
                "buffer exhausted: need {} bytes, have {}",
                count,
                self.remaining()
            )));
        }
        let start = self.position;
        self.position += count;
        Ok(&self.buffer[start..start + count])
    }

    /// Decode a TLV triplet, returning the tag and the value bytes
    pub fn decode_tlv(&mut self) -> Iec61850Result<(BerTag, &'a [u8])> {
        let (tag, tag_bytes) = BerTag::decode(&self.buffer[self.position..])?;
        self.position += tag_bytes;
        let (length, length_bytes) = BerLength::decode(&self.buffer[self.position..])?;
        self.position += length_bytes;
        let value = self.read_bytes(length.value())?;
        Ok((tag, value))
    }

    /// Tag of the next value without consuming it
    pub fn peek_tag(&self) -> Iec61850Result<Option<BerTag>> {
        if !self.has_remaining() {
            return Ok(None);
        }
        BerTag::decode(&self.buffer[self.position..]).map(|(tag, _)| Some(tag))
    }

    /// Decode the next value, which must carry `tag`
    pub fn expect(&mut self, tag: BerTag) -> Iec61850Result<&'a [u8]> {
        let (actual, value) = self.decode_tlv()?;
        if actual != tag {
            return Err(Iec61850Error::Decoding(format!(
                "expected tag {:?}, got {:?}",
                tag, actual
            )));
        }
        Ok(value)
    }

    /// Decode the next value if it carries `tag`
    pub fn optional(&mut self, tag: BerTag) -> Iec61850Result<Option<&'a [u8]>> {
        match self.peek_tag()? {
            Some(actual) if actual == tag => self.expect(tag).map(Some),
            _ => Ok(None),
        }
    }

    /// Nested decoder over the content of a constructed value carrying `tag`
    pub fn expect_constructed(&mut self, tag: BerTag) -> Iec61850Result<BerDecoder<'a>> {
        self.expect(tag).map(BerDecoder::new)
    }

    pub fn decode_integer(&mut self, tag: BerTag) -> Iec61850Result<i64> {
        decode_integer_value(self.expect(tag)?)
    }

    pub fn decode_unsigned(&mut self, tag: BerTag) -> Iec61850Result<u64> {
        decode_unsigned_value(self.expect(tag)?)
    }

    pub fn decode_boolean(&mut self, tag: BerTag) -> Iec61850Result<bool> {
        decode_boolean_value(self.expect(tag)?)
    }

    pub fn decode_string(&mut self, tag: BerTag) -> Iec61850Result<String> {
        decode_string_value(self.expect(tag)?)
    }
}

/// Narrow a decoded integer to the width of the field it fills
pub fn narrow<S, T>(value: S) -> Iec61850Result<T>
where
    S: Copy + std::fmt::Display,
    T: TryFrom<S>,
{
    T::try_from(value).map_err(|_| Iec61850Error::Decoding(format!("integer {} out of range", value)))
}

/// Big-endian two's complement bytes to i64
pub fn decode_integer_value(bytes: &[u8]) -> Iec61850Result<i64> {
    if bytes.is_empty() {
        return Err(Iec61850Error::Decoding("empty integer encoding".to_string()));
    }
    if bytes.len() > 8 {
        return Err(Iec61850Error::Decoding(format!(
            "integer too large: {} bytes (max 8)",
            bytes.len()
        )));
    }
    let init: i64 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
    Ok(bytes.iter().fold(init, |acc, &b| (acc << 8) | b as i64))
}

pub fn decode_unsigned_value(bytes: &[u8]) -> Iec61850Result<u64> {
    let bytes = match bytes {
        [0, rest @ ..] if !rest.is_empty() => rest,
        _ => bytes,
    };
    if bytes.is_empty() || bytes.len() > 8 {
        return Err(Iec61850Error::Decoding(format!(
            "invalid unsigned encoding of {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}

pub fn decode_boolean_value(bytes: &[u8]) -> Iec61850Result<bool> {
    match bytes {
        [b] => Ok(*b != 0),
        _ => Err(Iec61850Error::Decoding(format!(
            "invalid boolean length {}",
            bytes.len()
        ))),
    }
}

pub fn decode_string_value(bytes: &[u8]) -> Iec61850Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Iec61850Error::Decoding(format!("invalid string: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_integer_value() {
        assert_eq!(decode_integer_value(&[0x7F]).unwrap(), 127);
        assert_eq!(decode_integer_value(&[0xFF, 0x7F]).unwrap(), -129);
        assert_eq!(decode_integer_value(&[0x00, 0x80]).unwrap(), 128);
        assert!(decode_integer_value(&[]).is_err());
    }

    #[test]
    fn test_narrow() {
        assert_eq!(narrow::<u64, u8>(255).unwrap(), 255);
        assert!(narrow::<u64, u8>(256).is_err());
        assert!(narrow::<i64, u32>(-1).is_err());
    }

    #[test]
    fn test_decode_unsigned_value() {
        assert_eq!(decode_unsigned_value(&[0x00, 0xC8]).unwrap(), 200);
        assert_eq!(decode_unsigned_value(&[0x00]).unwrap(), 0);
    }

    #[test]
    fn test_optional_and_nested() {
        let data = [0xA2, 0x03, 0x83, 0x01, 0xFF, 0x85, 0x01, 0x05];
        let mut decoder = BerDecoder::new(&data);
        assert!(decoder.optional(BerTag::context(0)).unwrap().is_none());
        let mut inner = decoder
            .expect_constructed(BerTag::context_constructed(2))
            .unwrap();
        assert!(inner.decode_boolean(BerTag::context(3)).unwrap());
        assert_eq!(decoder.decode_integer(BerTag::context(5)).unwrap(), 5);
        assert!(!decoder.has_remaining());
    }

    #[test]
    fn test_truncated_value() {
        let mut decoder = BerDecoder::new(&[0x85, 0x04, 0x01]);
        assert!(decoder.decode_tlv().is_err());
    }
}
