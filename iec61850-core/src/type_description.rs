//! MMS type descriptions as returned by GetVariableAccessAttributes

use serde::{Deserialize, Serialize};

/// Named component of a structure type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureComponent {
    pub name: String,
    pub type_description: TypeDescription,
}

impl StructureComponent {
    pub fn new(name: impl Into<String>, type_description: TypeDescription) -> Self {
        Self {
            name: name.into(),
            type_description,
        }
    }
}

/// Type of an MMS variable.
///
/// String and bit string sizes are negative for variable length types
/// (`-255` is a variable length string of at most 255 characters).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDescription {
    Array {
        number_of_elements: u32,
        element_type: Box<TypeDescription>,
    },
    Structure(Vec<StructureComponent>),
    Boolean,
    BitString(i32),
    Integer(u8),
    Unsigned(u8),
    FloatingPoint {
        format_width: u8,
        exponent_width: u8,
    },
    OctetString(i32),
    VisibleString(i32),
    /// `true` when the time includes a date
    BinaryTime(bool),
    MmsString(i32),
    UtcTime,
}

impl TypeDescription {
    pub fn components(&self) -> Option<&[StructureComponent]> {
        match self {
            TypeDescription::Structure(components) => Some(components),
            _ => None,
        }
    }
}
