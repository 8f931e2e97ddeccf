//! Tree node kinds

use crate::bda::{BdaType, TriggerFlags};
use iec61850_core::{Fc, ObjectReference, ServiceError, Value};
use std::fmt;

/// Handle of a node inside a [`crate::ModelTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub const fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Value of a live leaf as last committed.
///
/// Only reachable through validating setters so the stored value always
/// matches the leaf's declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedValue(Value);

impl CommittedValue {
    pub(crate) fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn get(&self) -> &Value {
        &self.0
    }

    /// Replace the value, returning `true` if it differs from the previous one
    pub(crate) fn replace(&mut self, value: Value) -> bool {
        let changed = self.0 != value;
        self.0 = value;
        changed
    }
}

/// A leaf of the tree
#[derive(Debug, Clone)]
pub struct BasicDataAttribute {
    bda_type: BdaType,
    value: CommittedValue,
    triggers: TriggerFlags,
}

impl BasicDataAttribute {
    pub fn new(bda_type: BdaType, triggers: TriggerFlags) -> Self {
        Self {
            bda_type,
            value: CommittedValue::new(bda_type.default_value()),
            triggers,
        }
    }

    pub fn bda_type(&self) -> BdaType {
        self.bda_type
    }

    pub fn value(&self) -> &Value {
        self.value.get()
    }

    pub fn triggers(&self) -> TriggerFlags {
        self.triggers
    }

    /// Validate and store a value.
    ///
    /// # Returns
    ///
    /// `true` if the stored value changed
    ///
    /// # Errors
    ///
    /// Returns `TypeConflict` without touching the stored value if the value
    /// does not match the attribute type
    pub fn set_value(&mut self, value: &Value) -> Result<bool, ServiceError> {
        let value = self.bda_type.validate(value)?;
        Ok(self.value.replace(value))
    }
}

/// What a node is
#[derive(Debug, Clone)]
pub enum NodeKind {
    LogicalDevice,
    LogicalNode,
    /// Functionally constrained data object
    DataObject,
    /// Constructed data attribute
    Constructed,
    Array,
    Basic(BasicDataAttribute),
}

impl NodeKind {
    pub fn is_basic(&self) -> bool {
        matches!(self, NodeKind::Basic(_))
    }
}

/// A node of the model tree
#[derive(Debug, Clone)]
pub struct ModelNode {
    pub(crate) reference: ObjectReference,
    pub(crate) name: String,
    pub(crate) fc: Option<Fc>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
}

impl ModelNode {
    pub fn reference(&self) -> &ObjectReference {
        &self.reference
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Functional constraint, `None` for logical devices and nodes
    pub fn fc(&self) -> Option<Fc> {
        self.fc
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn basic(&self) -> Option<&BasicDataAttribute> {
        match &self.kind {
            NodeKind::Basic(bda) => Some(bda),
            _ => None,
        }
    }

    pub(crate) fn basic_mut(&mut self) -> Option<&mut BasicDataAttribute> {
        match &mut self.kind {
            NodeKind::Basic(bda) => Some(bda),
            _ => None,
        }
    }
}
