//! Hierarchical object references (`LD/LN.DO(index).DA`)

use crate::error::{Iec61850Error, Iec61850Result};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

/// An immutable object reference.
///
/// The reference is split lazily into its segments: the logical device, the
/// logical node and every data object / attribute name. An array subscript
/// `(n)` becomes a segment of its own whose position is remembered.
#[derive(Clone)]
pub struct ObjectReference {
    reference: String,
    parsed: OnceLock<Parsed>,
}

#[derive(Clone, Debug)]
struct Parsed {
    segments: Vec<String>,
    array_index_position: Option<usize>,
}

impl ObjectReference {
    /// Create a reference
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if the reference is empty
    pub fn new(reference: impl Into<String>) -> Iec61850Result<Self> {
        let reference = reference.into();
        if reference.is_empty() {
            return Err(Iec61850Error::InvalidData(
                "object reference must not be empty".to_string(),
            ));
        }
        Ok(Self {
            reference,
            parsed: OnceLock::new(),
        })
    }

    /// Reference of a child node, `parent.child` or `parent(index)` for array elements
    pub fn child(&self, name: &str) -> Self {
        let reference = if name.starts_with('(') {
            format!("{}{}", self.reference, name)
        } else if self.size() == 1 && !self.reference.starts_with('@') && !self.reference.contains('/') {
            format!("{}/{}", self.reference, name)
        } else {
            format!("{}.{}", self.reference, name)
        };
        Self {
            reference,
            parsed: OnceLock::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.reference
    }

    fn parsed(&self) -> &Parsed {
        self.parsed.get_or_init(|| parse(&self.reference))
    }

    /// Last segment of the reference
    pub fn name(&self) -> &str {
        self.parsed()
            .segments
            .last()
            .map(String::as_str)
            .unwrap_or(&self.reference)
    }

    /// First segment: the logical device name
    pub fn ld_name(&self) -> &str {
        self.get(0).unwrap_or(&self.reference)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.parsed().segments.get(index).map(String::as_str)
    }

    pub fn size(&self) -> usize {
        self.parsed().segments.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.parsed().segments.iter().map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.parsed().segments
    }

    /// Position of the array index segment, if any
    pub fn array_index_position(&self) -> Option<usize> {
        self.parsed().array_index_position
    }

    pub fn is_logical_device_ref(&self) -> bool {
        self.size() == 1
    }

    pub fn is_logical_node_ref(&self) -> bool {
        self.size() == 2
    }

    /// Reference to a non-persistent (association specific) data set
    pub fn is_non_persistent(&self) -> bool {
        self.reference.starts_with('@')
    }
}

fn parse(reference: &str) -> Parsed {
    let mut segments = Vec::new();
    let mut array_index_position = None;

    let rest = match reference.split_once('/') {
        Some((ld, rest)) => {
            segments.push(ld.to_string());
            rest
        }
        None => reference,
    };

    for part in rest.split('.').filter(|p| !p.is_empty()) {
        match part.split_once('(') {
            Some((name, index)) => {
                if !name.is_empty() {
                    segments.push(name.to_string());
                }
                array_index_position = Some(segments.len());
                segments.push(index.trim_end_matches(')').to_string());
            }
            None => segments.push(part.to_string()),
        }
    }

    Parsed {
        segments,
        array_index_position,
    }
}

impl PartialEq for ObjectReference {
    fn eq(&self, other: &Self) -> bool {
        self.reference == other.reference
    }
}

impl Eq for ObjectReference {}

impl Hash for ObjectReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.reference.hash(state);
    }
}

impl fmt::Debug for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectReference").field(&self.reference).finish()
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference)
    }
}

impl TryFrom<&str> for ObjectReference {
    type Error = Iec61850Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segments() {
        let r = ObjectReference::new("LD0/LLN0.Mod.stVal").unwrap();
        assert_eq!(r.segments(), &["LD0", "LLN0", "Mod", "stVal"]);
        assert_eq!(r.ld_name(), "LD0");
        assert_eq!(r.name(), "stVal");
        assert_eq!(r.array_index_position(), None);
    }

    #[test]
    fn test_parse_array_index() {
        let r = ObjectReference::new("LD/LN.DO(3).da").unwrap();
        assert_eq!(r.segments(), &["LD", "LN", "DO", "3", "da"]);
        assert_eq!(r.array_index_position(), Some(3));
    }

    #[test]
    fn test_empty_reference_is_rejected() {
        assert!(ObjectReference::new("").is_err());
    }

    #[test]
    fn test_ref_kinds() {
        assert!(ObjectReference::new("LD0").unwrap().is_logical_device_ref());
        assert!(ObjectReference::new("LD0/LLN0").unwrap().is_logical_node_ref());
        assert!(ObjectReference::new("@ds").unwrap().is_non_persistent());
    }

    #[test]
    fn test_child() {
        let ld = ObjectReference::new("LD0").unwrap();
        let ln = ld.child("MMXU1");
        assert_eq!(ln.as_str(), "LD0/MMXU1");
        let element = ln.child("phsA").child("(2)");
        assert_eq!(element.as_str(), "LD0/MMXU1.phsA(2)");
        assert_eq!(element.array_index_position(), Some(3));
    }
}
