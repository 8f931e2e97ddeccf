//! MMS addressing of model nodes and data sets

use crate::error::{Iec61850Error, Iec61850Result};
use crate::fc::Fc;
use crate::object_reference::ObjectReference;
use serde::{Deserialize, Serialize};
use std::fmt;

/// MMS object name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectName {
    VmdSpecific(String),
    DomainSpecific { domain_id: String, item_id: String },
    AaSpecific(String),
}

impl ObjectName {
    pub fn domain_specific(domain_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        ObjectName::DomainSpecific {
            domain_id: domain_id.into(),
            item_id: item_id.into(),
        }
    }

    /// MMS name of a data set reference.
    ///
    /// `@name` maps to an association specific name, `LD/LN.DS` to domain `LD` item `LN$DS`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if the reference is neither non-persistent nor contains a `/`
    pub fn from_data_set_reference(reference: &str) -> Iec61850Result<Self> {
        if reference.starts_with('@') {
            return Ok(ObjectName::AaSpecific(reference.to_string()));
        }
        let (domain, item) = reference.split_once('/').ok_or_else(|| {
            Iec61850Error::InvalidData(format!("invalid data set reference: {}", reference))
        })?;
        Ok(ObjectName::domain_specific(domain, item.replace('.', "$")))
    }

    /// Inverse of [`ObjectName::from_data_set_reference`]
    pub fn to_data_set_reference(&self) -> String {
        match self {
            ObjectName::VmdSpecific(name) | ObjectName::AaSpecific(name) => name.clone(),
            ObjectName::DomainSpecific { domain_id, item_id } => {
                format!("{}/{}", domain_id, item_id.replace('$', "."))
            }
        }
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectName::VmdSpecific(name) | ObjectName::AaSpecific(name) => f.write_str(name),
            ObjectName::DomainSpecific { domain_id, item_id } => {
                write!(f, "{}/{}", domain_id, item_id)
            }
        }
    }
}

/// Alternate access into an array element, optionally narrowed to a component path `A$B`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlternateAccess {
    pub index: u32,
    pub component: Option<String>,
}

/// A variable specification: the name plus an optional alternate access
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableDef {
    pub name: ObjectName,
    pub alternate_access: Option<AlternateAccess>,
}

impl VariableDef {
    pub fn new(name: ObjectName) -> Self {
        Self {
            name,
            alternate_access: None,
        }
    }

    /// MMS variable definition of a functionally constrained node.
    ///
    /// The item id is `LN$FC$DO$DA...`. References through an array element stop
    /// the item id before the index and carry the index plus the remaining
    /// component path as alternate access.
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if the reference has no logical node part or a
    /// non-numeric array index
    pub fn from_reference(reference: &ObjectReference, fc: Fc) -> Iec61850Result<Self> {
        let ln = reference.get(1).ok_or_else(|| {
            Iec61850Error::InvalidData(format!("reference has no logical node: {}", reference))
        })?;
        let mut item_id = format!("{}${}", ln, fc);

        let Some(position) = reference.array_index_position() else {
            for segment in reference.iter().skip(2) {
                item_id.push('$');
                item_id.push_str(segment);
            }
            return Ok(Self::new(ObjectName::domain_specific(
                reference.ld_name(),
                item_id,
            )));
        };

        for segment in reference.iter().take(position).skip(2) {
            item_id.push('$');
            item_id.push_str(segment);
        }
        let index = reference
            .get(position)
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(|| {
                Iec61850Error::InvalidData(format!("invalid array index in {}", reference))
            })?;
        let component: Vec<&str> = reference.iter().skip(position + 1).collect();
        let component = (!component.is_empty()).then(|| component.join("$"));

        Ok(Self {
            name: ObjectName::domain_specific(reference.ld_name(), item_id),
            alternate_access: Some(AlternateAccess { index, component }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_def_from_reference() {
        let r = ObjectReference::new("LD0/MMXU1.TotW.mag.f").unwrap();
        let def = VariableDef::from_reference(&r, Fc::MX).unwrap();
        assert_eq!(
            def.name,
            ObjectName::domain_specific("LD0", "MMXU1$MX$TotW$mag$f")
        );
        assert!(def.alternate_access.is_none());
    }

    #[test]
    fn test_variable_def_array_access() {
        let r = ObjectReference::new("LD/LN.DO(3).a.b").unwrap();
        let def = VariableDef::from_reference(&r, Fc::ST).unwrap();
        assert_eq!(def.name, ObjectName::domain_specific("LD", "LN$ST$DO"));
        assert_eq!(
            def.alternate_access,
            Some(AlternateAccess {
                index: 3,
                component: Some("a$b".to_string())
            })
        );
    }

    #[test]
    fn test_data_set_names() {
        let name = ObjectName::from_data_set_reference("LD0/LLN0.Meas").unwrap();
        assert_eq!(name, ObjectName::domain_specific("LD0", "LLN0$Meas"));
        assert_eq!(name.to_data_set_reference(), "LD0/LLN0.Meas");
        assert_eq!(
            ObjectName::from_data_set_reference("@tmp").unwrap(),
            ObjectName::AaSpecific("@tmp".to_string())
        );
        assert!(ObjectName::from_data_set_reference("nothing").is_err());
    }
}
