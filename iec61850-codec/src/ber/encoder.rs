//! BER encoder

use super::types::{BerLength, BerTag};
use iec61850_core::Iec61850Result;

/// BER encoder writing TLV triplets into a growing buffer.
///
/// Constructed values are built with [`BerEncoder::encode_constructed`], which
/// encodes the content into a nested encoder first so the length is known.
#[derive(Debug, Default)]
pub struct BerEncoder {
    buffer: Vec<u8>,
}

impl BerEncoder {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Encode a TLV (Tag-Length-Value) triplet
    ///
    /// # Arguments
    /// * `tag` - BER tag
    /// * `value` - Value bytes (already encoded)
    pub fn encode_tlv(&mut self, tag: &BerTag, value: &[u8]) {
        self.buffer.extend_from_slice(&tag.encode());
        self.buffer
            .extend_from_slice(&BerLength::new(value.len()).encode());
        self.buffer.extend_from_slice(value);
    }

    /// Encode a constructed value whose content is produced by `content`
    ///
    /// # Errors
    ///
    /// Propagates any error returned by `content`
    pub fn encode_constructed<F>(&mut self, tag: BerTag, content: F) -> Iec61850Result<()>
    where
        F: FnOnce(&mut BerEncoder) -> Iec61850Result<()>,
    {
        let mut inner = BerEncoder::new();
        content(&mut inner)?;
        self.encode_tlv(&tag, &inner.buffer);
        Ok(())
    }

    /// Two's complement integer, minimal encoding
    pub fn encode_integer(&mut self, tag: BerTag, value: i64) {
        self.encode_tlv(&tag, &integer_bytes(value));
    }

    /// Unsigned integer; a leading zero byte is added when the high bit is set
    pub fn encode_unsigned(&mut self, tag: BerTag, value: u64) {
        self.encode_tlv(&tag, &unsigned_bytes(value));
    }

    pub fn encode_boolean(&mut self, tag: BerTag, value: bool) {
        self.encode_tlv(&tag, &[if value { 0xFF } else { 0x00 }]);
    }

    pub fn encode_null(&mut self, tag: BerTag) {
        self.encode_tlv(&tag, &[]);
    }

    pub fn encode_string(&mut self, tag: BerTag, value: &str) {
        self.encode_tlv(&tag, value.as_bytes());
    }

    /// Bit string: one byte of unused-bit count followed by the bits
    pub fn encode_bit_string(&mut self, tag: BerTag, bytes: &[u8], num_bits: usize) {
        let used_bytes = num_bits.div_ceil(8);
        let unused_bits = (used_bytes * 8 - num_bits) as u8;
        let mut value = Vec::with_capacity(used_bytes + 1);
        value.push(unused_bits);
        value.extend_from_slice(&bytes[..used_bytes.min(bytes.len())]);
        value.resize(used_bytes + 1, 0);
        if let Some(last) = value.last_mut().filter(|_| used_bytes > 0) {
            *last &= 0xFF << unused_bits;
        }
        self.encode_tlv(&tag, &value);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

fn integer_bytes(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 7 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

fn unsigned_bytes(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(7);
    let mut result = Vec::with_capacity(9 - start);
    if bytes[start] & 0x80 != 0 {
        result.push(0);
    }
    result.extend_from_slice(&bytes[start..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_integer_minimal() {
        let mut encoder = BerEncoder::new();
        encoder.encode_integer(BerTag::INTEGER, 127);
        encoder.encode_integer(BerTag::INTEGER, 128);
        encoder.encode_integer(BerTag::INTEGER, -1);
        encoder.encode_integer(BerTag::INTEGER, -129);
        assert_eq!(
            encoder.as_bytes(),
            &[0x02, 0x01, 0x7F, 0x02, 0x02, 0x00, 0x80, 0x02, 0x01, 0xFF, 0x02, 0x02, 0xFF, 0x7F]
        );
    }

    #[test]
    fn test_encode_unsigned() {
        let mut encoder = BerEncoder::new();
        encoder.encode_unsigned(BerTag::context(6), 0);
        encoder.encode_unsigned(BerTag::context(6), 200);
        assert_eq!(encoder.as_bytes(), &[0x86, 0x01, 0x00, 0x86, 0x02, 0x00, 0xC8]);
    }

    #[test]
    fn test_encode_bit_string() {
        let mut encoder = BerEncoder::new();
        encoder.encode_bit_string(BerTag::context(4), &[0xFF, 0xFF], 10);
        assert_eq!(encoder.as_bytes(), &[0x84, 0x03, 0x06, 0xFF, 0xC0]);
    }

    #[test]
    fn test_encode_constructed() {
        let mut encoder = BerEncoder::new();
        encoder
            .encode_constructed(BerTag::context_constructed(2), |inner| {
                inner.encode_boolean(BerTag::context(3), true);
                Ok(())
            })
            .unwrap();
        assert_eq!(encoder.into_bytes(), vec![0xA2, 0x03, 0x83, 0x01, 0xFF]);
    }
}
