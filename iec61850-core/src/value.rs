//! The MMS `Data` value algebra

use crate::datatypes::BitString;
use serde::{Deserialize, Serialize};

/// A decoded MMS data value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Array(Vec<Value>),
    Structure(Vec<Value>),
    Boolean(bool),
    BitString(BitString),
    Integer(i64),
    Unsigned(u64),
    /// Exponent width byte followed by the IEEE 754 bytes, big endian
    FloatingPoint(Vec<u8>),
    OctetString(Vec<u8>),
    VisibleString(String),
    /// 4 or 6 bytes
    BinaryTime(Vec<u8>),
    MmsString(String),
    UtcTime([u8; 8]),
}

impl Value {
    pub fn float32(value: f32) -> Self {
        let mut bytes = Vec::with_capacity(5);
        bytes.push(8);
        bytes.extend_from_slice(&value.to_be_bytes());
        Value::FloatingPoint(bytes)
    }

    pub fn float64(value: f64) -> Self {
        let mut bytes = Vec::with_capacity(9);
        bytes.push(11);
        bytes.extend_from_slice(&value.to_be_bytes());
        Value::FloatingPoint(bytes)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer content of signed or unsigned values
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Unsigned(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::FloatingPoint(bytes) if bytes.len() == 5 => {
                Some(f32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]))
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::FloatingPoint(bytes) if bytes.len() == 9 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&bytes[1..]);
                Some(f64::from_be_bytes(raw))
            }
            Value::FloatingPoint(_) => self.as_f32().map(f64::from),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::VisibleString(s) | Value::MmsString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bit_string(&self) -> Option<&BitString> {
        match self {
            Value::BitString(bits) => Some(bits),
            _ => None,
        }
    }

    /// Elements of a structure or array
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Value::Structure(values) | Value::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Short name of the value kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Array(_) => "array",
            Value::Structure(_) => "structure",
            Value::Boolean(_) => "boolean",
            Value::BitString(_) => "bit-string",
            Value::Integer(_) => "integer",
            Value::Unsigned(_) => "unsigned",
            Value::FloatingPoint(_) => "floating-point",
            Value::OctetString(_) => "octet-string",
            Value::VisibleString(_) => "visible-string",
            Value::BinaryTime(_) => "binary-time",
            Value::MmsString(_) => "mms-string",
            Value::UtcTime(_) => "utc-time",
        }
    }
}
