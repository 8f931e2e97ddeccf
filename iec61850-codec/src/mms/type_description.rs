//! MMS `TypeDescription` encoding

use crate::ber::decoder::{decode_boolean_value, decode_integer_value, decode_unsigned_value, narrow};
use crate::ber::{BerDecoder, BerEncoder, BerTag};
use iec61850_core::{Iec61850Error, Iec61850Result, StructureComponent, TypeDescription};

pub fn encode_type_description(
    encoder: &mut BerEncoder,
    type_description: &TypeDescription,
) -> Iec61850Result<()> {
    match type_description {
        TypeDescription::Array {
            number_of_elements,
            element_type,
        } => encoder.encode_constructed(BerTag::context_constructed(1), |inner| {
            inner.encode_unsigned(BerTag::context(1), *number_of_elements as u64);
            inner.encode_constructed(BerTag::context_constructed(2), |spec| {
                encode_type_description(spec, element_type)
            })
        })?,
        TypeDescription::Structure(components) => {
            encoder.encode_constructed(BerTag::context_constructed(2), |inner| {
                inner.encode_constructed(BerTag::context_constructed(1), |list| {
                    for component in components {
                        list.encode_constructed(BerTag::SEQUENCE, |seq| {
                            seq.encode_string(BerTag::context(0), &component.name);
                            seq.encode_constructed(BerTag::context_constructed(1), |spec| {
                                encode_type_description(spec, &component.type_description)
                            })
                        })?;
                    }
                    Ok(())
                })
            })?
        }
        TypeDescription::Boolean => encoder.encode_null(BerTag::context(3)),
        TypeDescription::BitString(size) => encoder.encode_integer(BerTag::context(4), *size as i64),
        TypeDescription::Integer(width) => encoder.encode_unsigned(BerTag::context(5), *width as u64),
        TypeDescription::Unsigned(width) => {
            encoder.encode_unsigned(BerTag::context(6), *width as u64)
        }
        TypeDescription::FloatingPoint {
            format_width,
            exponent_width,
        } => encoder.encode_constructed(BerTag::context_constructed(7), |inner| {
            inner.encode_unsigned(BerTag::INTEGER, *format_width as u64);
            inner.encode_unsigned(BerTag::INTEGER, *exponent_width as u64);
            Ok(())
        })?,
        TypeDescription::OctetString(size) => {
            encoder.encode_integer(BerTag::context(9), *size as i64)
        }
        TypeDescription::VisibleString(size) => {
            encoder.encode_integer(BerTag::context(10), *size as i64)
        }
        TypeDescription::BinaryTime(with_date) => {
            encoder.encode_boolean(BerTag::context(12), *with_date)
        }
        TypeDescription::MmsString(size) => {
            encoder.encode_integer(BerTag::context(16), *size as i64)
        }
        TypeDescription::UtcTime => encoder.encode_null(BerTag::context(17)),
    }
    Ok(())
}

pub fn decode_type_description(decoder: &mut BerDecoder<'_>) -> Iec61850Result<TypeDescription> {
    let (tag, content) = decoder.decode_tlv()?;
    let type_description = match tag.number() {
        1 if tag.is_constructed() => {
            let mut inner = BerDecoder::new(content);
            inner.optional(BerTag::context(0))?;
            let number_of_elements = narrow(inner.decode_unsigned(BerTag::context(1))?)?;
            let mut spec = inner.expect_constructed(BerTag::context_constructed(2))?;
            TypeDescription::Array {
                number_of_elements,
                element_type: Box::new(decode_type_description(&mut spec)?),
            }
        }
        2 if tag.is_constructed() => {
            let mut inner = BerDecoder::new(content);
            inner.optional(BerTag::context(0))?;
            let mut list = inner.expect_constructed(BerTag::context_constructed(1))?;
            let mut components = Vec::new();
            while list.has_remaining() {
                let mut seq = list.expect_constructed(BerTag::SEQUENCE)?;
                let name = seq.decode_string(BerTag::context(0))?;
                let mut spec = seq.expect_constructed(BerTag::context_constructed(1))?;
                components.push(StructureComponent::new(
                    name,
                    decode_type_description(&mut spec)?,
                ));
            }
            TypeDescription::Structure(components)
        }
        3 => TypeDescription::Boolean,
        4 => TypeDescription::BitString(narrow(decode_integer_value(content)?)?),
        5 => TypeDescription::Integer(narrow(decode_unsigned_value(content)?)?),
        6 => TypeDescription::Unsigned(narrow(decode_unsigned_value(content)?)?),
        7 if tag.is_constructed() => {
            let mut inner = BerDecoder::new(content);
            let format_width = narrow(inner.decode_unsigned(BerTag::INTEGER)?)?;
            let exponent_width = narrow(inner.decode_unsigned(BerTag::INTEGER)?)?;
            TypeDescription::FloatingPoint {
                format_width,
                exponent_width,
            }
        }
        9 => TypeDescription::OctetString(narrow(decode_integer_value(content)?)?),
        10 => TypeDescription::VisibleString(narrow(decode_integer_value(content)?)?),
        12 => TypeDescription::BinaryTime(decode_boolean_value(content)?),
        16 => TypeDescription::MmsString(narrow(decode_integer_value(content)?)?),
        17 => TypeDescription::UtcTime,
        other => {
            return Err(Iec61850Error::Decoding(format!(
                "unsupported type description tag [{}]",
                other
            )));
        }
    };
    Ok(type_description)
}
