//! Basic data attribute types

use iec61850_core::{
    BitString, EntryTime, OptFlds, ServiceError, Timestamp, TriggerConditions, TypeDescription,
    Value,
};
use serde::{Deserialize, Serialize};

/// Type of a basic data attribute, with the size limit of variable length types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BdaType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Int8U,
    Int16U,
    Int32U,
    Float32,
    Float64,
    OctetString(u32),
    VisibleString(u32),
    UnicodeString(u32),
    Timestamp,
    EntryTime,
    Quality,
    Check,
    DoubleBitPos,
    TapCommand,
    OptFlds,
    TriggerConditions,
    ReasonForInclusion,
    BitString(u32),
}

/// Reporting trigger flags fixed by static configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerFlags {
    pub dchg: bool,
    pub qchg: bool,
    pub dupd: bool,
}

impl TriggerFlags {
    pub const NONE: TriggerFlags = TriggerFlags {
        dchg: false,
        qchg: false,
        dupd: false,
    };

    pub const fn dchg() -> Self {
        Self {
            dchg: true,
            qchg: false,
            dupd: false,
        }
    }

    pub const fn qchg() -> Self {
        Self {
            dchg: false,
            qchg: true,
            dupd: false,
        }
    }

    pub const fn dupd() -> Self {
        Self {
            dchg: false,
            qchg: false,
            dupd: true,
        }
    }
}

impl BdaType {
    /// Number of bits of the bit string based types
    pub const fn max_bits(&self) -> Option<usize> {
        match self {
            BdaType::Quality => Some(13),
            BdaType::Check | BdaType::DoubleBitPos | BdaType::TapCommand => Some(2),
            BdaType::OptFlds => Some(OptFlds::NUM_BITS),
            BdaType::TriggerConditions => Some(TriggerConditions::NUM_BITS),
            BdaType::ReasonForInclusion => Some(7),
            BdaType::BitString(bits) => Some(*bits as usize),
            _ => None,
        }
    }

    /// Value a freshly constructed attribute of this type holds
    pub fn default_value(&self) -> Value {
        match self {
            BdaType::Boolean => Value::Boolean(false),
            BdaType::Int8 | BdaType::Int16 | BdaType::Int32 | BdaType::Int64 => Value::Integer(0),
            BdaType::Int8U | BdaType::Int16U | BdaType::Int32U => Value::Unsigned(0),
            BdaType::Float32 => Value::float32(0.0),
            BdaType::Float64 => Value::float64(0.0),
            BdaType::OctetString(_) => Value::OctetString(Vec::new()),
            BdaType::VisibleString(_) => Value::VisibleString(String::new()),
            BdaType::UnicodeString(_) => Value::MmsString(String::new()),
            BdaType::Timestamp => Value::UtcTime([0; 8]),
            BdaType::EntryTime => Value::BinaryTime(vec![0; 6]),
            BdaType::OptFlds => Value::BitString(OptFlds::default_value().into_bit_string()),
            BdaType::TriggerConditions => {
                Value::BitString(TriggerConditions::default_value().into_bit_string())
            }
            _ => Value::BitString(BitString::zeroed(self.max_bits().unwrap_or(0))),
        }
    }

    /// MMS type description of this type
    pub fn type_description(&self) -> TypeDescription {
        match self {
            BdaType::Boolean => TypeDescription::Boolean,
            BdaType::Int8 => TypeDescription::Integer(8),
            BdaType::Int16 => TypeDescription::Integer(16),
            BdaType::Int32 => TypeDescription::Integer(32),
            BdaType::Int64 => TypeDescription::Integer(64),
            BdaType::Int8U => TypeDescription::Unsigned(8),
            BdaType::Int16U => TypeDescription::Unsigned(16),
            BdaType::Int32U => TypeDescription::Unsigned(32),
            BdaType::Float32 => TypeDescription::FloatingPoint {
                format_width: 32,
                exponent_width: 8,
            },
            BdaType::Float64 => TypeDescription::FloatingPoint {
                format_width: 64,
                exponent_width: 11,
            },
            BdaType::OctetString(max) => TypeDescription::OctetString(-(*max as i32)),
            BdaType::VisibleString(max) => TypeDescription::VisibleString(-(*max as i32)),
            BdaType::UnicodeString(max) => TypeDescription::MmsString(-(*max as i32)),
            BdaType::Timestamp => TypeDescription::UtcTime,
            BdaType::EntryTime => TypeDescription::BinaryTime(true),
            _ => TypeDescription::BitString(-(self.max_bits().unwrap_or(0) as i32)),
        }
    }

    /// Check a decoded value against this type.
    ///
    /// Returns the value as it is stored: bit strings are widened to the
    /// type's full length.
    ///
    /// # Errors
    ///
    /// Returns `TypeConflict` if the value has the wrong shape or exceeds the
    /// declared size or range
    pub fn validate(&self, value: &Value) -> Result<Value, ServiceError> {
        let conflict = || {
            ServiceError::type_conflict(format!(
                "expected {:?}, got {} value",
                self,
                value.kind()
            ))
        };
        match (self, value) {
            (BdaType::Boolean, Value::Boolean(_)) => Ok(value.clone()),
            (BdaType::Int8, Value::Integer(i)) => in_range(*i, i8::MIN as i64, i8::MAX as i64, value),
            (BdaType::Int16, Value::Integer(i)) => {
                in_range(*i, i16::MIN as i64, i16::MAX as i64, value)
            }
            (BdaType::Int32, Value::Integer(i)) => {
                in_range(*i, i32::MIN as i64, i32::MAX as i64, value)
            }
            (BdaType::Int64, Value::Integer(_)) => Ok(value.clone()),
            (BdaType::Int8U, Value::Unsigned(u)) => in_range_unsigned(*u, u8::MAX as u64, value),
            (BdaType::Int16U, Value::Unsigned(u)) => in_range_unsigned(*u, u16::MAX as u64, value),
            (BdaType::Int32U, Value::Unsigned(u)) => in_range_unsigned(*u, u32::MAX as u64, value),
            (BdaType::Float32, Value::FloatingPoint(bytes)) if bytes.len() == 5 => Ok(value.clone()),
            (BdaType::Float64, Value::FloatingPoint(bytes)) if bytes.len() == 9 => Ok(value.clone()),
            (BdaType::OctetString(max), Value::OctetString(bytes)) if bytes.len() <= *max as usize => {
                Ok(value.clone())
            }
            (BdaType::VisibleString(max), Value::VisibleString(s))
            | (BdaType::UnicodeString(max), Value::MmsString(s))
                if s.len() <= *max as usize =>
            {
                Ok(value.clone())
            }
            (BdaType::Timestamp, Value::UtcTime(_)) => Ok(value.clone()),
            (BdaType::EntryTime, Value::BinaryTime(bytes)) if bytes.len() == 6 => Ok(value.clone()),
            (_, Value::BitString(bits)) => {
                let max = self.max_bits().ok_or_else(conflict)?;
                if bits.num_bits() > max {
                    return Err(ServiceError::type_conflict(format!(
                        "bit string of {} bits exceeds maximum of {}",
                        bits.num_bits(),
                        max
                    )));
                }
                let mut widened = BitString::zeroed(max);
                for (i, bit) in bits.iter().enumerate() {
                    if bit {
                        let _ = widened.set_bit(i, true);
                    }
                }
                Ok(Value::BitString(widened))
            }
            _ => Err(conflict()),
        }
    }

    /// Current time in the representation of this type, if it is a time type
    pub fn now(&self) -> Option<Value> {
        match self {
            BdaType::Timestamp => Some(Value::UtcTime(*Timestamp::now().as_bytes())),
            BdaType::EntryTime => Some(Value::BinaryTime(EntryTime::now().as_bytes().to_vec())),
            _ => None,
        }
    }
}

fn in_range(i: i64, min: i64, max: i64, value: &Value) -> Result<Value, ServiceError> {
    if i < min || i > max {
        return Err(ServiceError::type_conflict(format!(
            "integer {} out of range {}..={}",
            i, min, max
        )));
    }
    Ok(value.clone())
}

fn in_range_unsigned(u: u64, max: u64, value: &Value) -> Result<Value, ServiceError> {
    if u > max {
        return Err(ServiceError::type_conflict(format!(
            "unsigned {} exceeds {}",
            u, max
        )));
    }
    Ok(value.clone())
}
