//! MMS `Data` encoding of [`Value`]

use crate::ber::decoder::{
    decode_boolean_value, decode_integer_value, decode_string_value, decode_unsigned_value,
};
use crate::ber::{BerDecoder, BerEncoder, BerTag, BerTagClass};
use iec61850_core::{BitString, Iec61850Error, Iec61850Result, Value};

const ARRAY: u32 = 1;
const STRUCTURE: u32 = 2;
const BOOLEAN: u32 = 3;
const BIT_STRING: u32 = 4;
const INTEGER: u32 = 5;
const UNSIGNED: u32 = 6;
const FLOATING_POINT: u32 = 7;
const OCTET_STRING: u32 = 9;
const VISIBLE_STRING: u32 = 10;
const BINARY_TIME: u32 = 12;
const MMS_STRING: u32 = 16;
const UTC_TIME: u32 = 17;

/// Encode a value as MMS `Data`
pub fn encode_data(encoder: &mut BerEncoder, value: &Value) -> Iec61850Result<()> {
    match value {
        Value::Array(elements) => {
            encoder.encode_constructed(BerTag::context_constructed(ARRAY), |inner| {
                elements.iter().try_for_each(|e| encode_data(inner, e))
            })?
        }
        Value::Structure(elements) => {
            encoder.encode_constructed(BerTag::context_constructed(STRUCTURE), |inner| {
                elements.iter().try_for_each(|e| encode_data(inner, e))
            })?
        }
        Value::Boolean(b) => encoder.encode_boolean(BerTag::context(BOOLEAN), *b),
        Value::BitString(bits) => {
            encoder.encode_bit_string(BerTag::context(BIT_STRING), bits.as_bytes(), bits.num_bits())
        }
        Value::Integer(i) => encoder.encode_integer(BerTag::context(INTEGER), *i),
        Value::Unsigned(u) => encoder.encode_unsigned(BerTag::context(UNSIGNED), *u),
        Value::FloatingPoint(bytes) => {
            if bytes.len() != 5 && bytes.len() != 9 {
                return Err(Iec61850Error::Encoding(format!(
                    "floating point value must have 5 or 9 bytes, has {}",
                    bytes.len()
                )));
            }
            encoder.encode_tlv(&BerTag::context(FLOATING_POINT), bytes)
        }
        Value::OctetString(bytes) => encoder.encode_tlv(&BerTag::context(OCTET_STRING), bytes),
        Value::VisibleString(s) => encoder.encode_string(BerTag::context(VISIBLE_STRING), s),
        Value::BinaryTime(bytes) => encoder.encode_tlv(&BerTag::context(BINARY_TIME), bytes),
        Value::MmsString(s) => encoder.encode_string(BerTag::context(MMS_STRING), s),
        Value::UtcTime(bytes) => encoder.encode_tlv(&BerTag::context(UTC_TIME), bytes),
    }
    Ok(())
}

/// Decode one MMS `Data` value
pub fn decode_data(decoder: &mut BerDecoder<'_>) -> Iec61850Result<Value> {
    let (tag, content) = decoder.decode_tlv()?;
    decode_data_content(tag, content)
}

/// Decode a `Data` value from an already read tag and content
pub fn decode_data_content(tag: BerTag, content: &[u8]) -> Iec61850Result<Value> {
    if tag.class() != BerTagClass::ContextSpecific {
        return Err(Iec61850Error::Decoding(format!(
            "unexpected data tag {:?}",
            tag
        )));
    }
    let value = match tag.number() {
        ARRAY => Value::Array(decode_elements(content)?),
        STRUCTURE => Value::Structure(decode_elements(content)?),
        BOOLEAN => Value::Boolean(decode_boolean_value(content)?),
        BIT_STRING => Value::BitString(decode_bit_string(content)?),
        INTEGER => Value::Integer(decode_integer_value(content)?),
        UNSIGNED => Value::Unsigned(decode_unsigned_value(content)?),
        FLOATING_POINT => Value::FloatingPoint(content.to_vec()),
        OCTET_STRING => Value::OctetString(content.to_vec()),
        VISIBLE_STRING => Value::VisibleString(decode_string_value(content)?),
        BINARY_TIME => Value::BinaryTime(content.to_vec()),
        MMS_STRING => Value::MmsString(decode_string_value(content)?),
        UTC_TIME => {
            let bytes: [u8; 8] = content.try_into().map_err(|_| {
                Iec61850Error::Decoding(format!("utc-time must have 8 bytes, has {}", content.len()))
            })?;
            Value::UtcTime(bytes)
        }
        other => {
            return Err(Iec61850Error::Decoding(format!(
                "unsupported data type tag [{}]",
                other
            )));
        }
    };
    Ok(value)
}

fn decode_elements(content: &[u8]) -> Iec61850Result<Vec<Value>> {
    let mut decoder = BerDecoder::new(content);
    let mut elements = Vec::new();
    while decoder.has_remaining() {
        elements.push(decode_data(&mut decoder)?);
    }
    Ok(elements)
}

fn decode_bit_string(content: &[u8]) -> Iec61850Result<BitString> {
    let (unused, bytes) = content
        .split_first()
        .ok_or_else(|| Iec61850Error::Decoding("empty bit string".to_string()))?;
    if *unused > 7 || (bytes.is_empty() && *unused != 0) {
        return Err(Iec61850Error::Decoding(format!(
            "invalid unused bit count {}",
            unused
        )));
    }
    BitString::new(bytes.to_vec(), bytes.len() * 8 - *unused as usize)
}
