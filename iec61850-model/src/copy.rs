//! Detached copies of subtrees.
//!
//! A [`NodeCopy`] reuses the references and functional constraints of the
//! nodes it was taken from but owns fresh leaf storage. Its leaves are
//! [`ProposedValue`]s that know which live leaf they mirror, so a validated
//! copy can be committed onto the tree without replacing any live node.

use crate::bda::BdaType;
use crate::node::{NodeId, NodeKind};
use crate::tree::ModelTree;
use iec61850_core::{Fc, ObjectReference, ServiceError, Value};

/// Working value of a copied leaf
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedValue {
    mirror: NodeId,
    bda_type: BdaType,
    value: Value,
}

impl ProposedValue {
    /// Live leaf this value is committed onto
    pub fn mirror(&self) -> NodeId {
        self.mirror
    }

    pub fn bda_type(&self) -> BdaType {
        self.bda_type
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Validate and store a value
    ///
    /// # Errors
    ///
    /// Returns `TypeConflict` without modifying the value on a type mismatch
    pub fn set(&mut self, value: &Value) -> Result<(), ServiceError> {
        self.value = self.bda_type.validate(value)?;
        Ok(())
    }
}

/// Content of a copied node
#[derive(Debug, Clone, PartialEq)]
pub enum CopyContent {
    Children(Vec<NodeCopy>),
    Leaf(ProposedValue),
}

/// Detached copy of a subtree
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCopy {
    source: NodeId,
    reference: ObjectReference,
    fc: Option<Fc>,
    array: bool,
    content: CopyContent,
}

/// A leaf touched by a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafUpdate {
    pub node: NodeId,
    /// Whether the committed value differs from the previous one
    pub changed: bool,
}

impl NodeCopy {
    /// Node this copy was taken from
    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn reference(&self) -> &ObjectReference {
        &self.reference
    }

    pub fn name(&self) -> &str {
        self.reference.name()
    }

    pub fn fc(&self) -> Option<Fc> {
        self.fc
    }

    pub fn content(&self) -> &CopyContent {
        &self.content
    }

    pub fn children(&self) -> &[NodeCopy] {
        match &self.content {
            CopyContent::Children(children) => children,
            CopyContent::Leaf(_) => &[],
        }
    }

    /// Value of a copied leaf
    pub fn leaf_value(&self) -> Option<&Value> {
        match &self.content {
            CopyContent::Leaf(proposed) => Some(proposed.value()),
            CopyContent::Children(_) => None,
        }
    }

    pub fn child(&self, name: &str) -> Option<&NodeCopy> {
        self.children().iter().find(|c| c.name() == name)
    }

    /// Descendant addressed by a dotted path relative to this node
    pub fn find(&self, path: &str) -> Option<&NodeCopy> {
        path.split('.')
            .filter(|s| !s.is_empty())
            .try_fold(self, |node, name| node.child(name))
    }

    pub fn find_mut(&mut self, path: &str) -> Option<&mut NodeCopy> {
        let mut node = self;
        for name in path.split('.').filter(|s| !s.is_empty()) {
            let CopyContent::Children(children) = &mut node.content else {
                return None;
            };
            node = children.iter_mut().find(|c| c.reference.name() == name)?;
        }
        Some(node)
    }

    /// Proposed values of all leaves, in tree order
    pub fn leaves(&self) -> Vec<&ProposedValue> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a ProposedValue>) {
        match &self.content {
            CopyContent::Leaf(proposed) => leaves.push(proposed),
            CopyContent::Children(children) => {
                for child in children {
                    child.collect_leaves(leaves);
                }
            }
        }
    }

    /// Encoded value of the copy
    pub fn to_value(&self) -> Value {
        match &self.content {
            CopyContent::Leaf(proposed) => proposed.value.clone(),
            CopyContent::Children(children) => {
                let values = children.iter().map(NodeCopy::to_value).collect();
                if self.array {
                    Value::Array(values)
                } else {
                    Value::Structure(values)
                }
            }
        }
    }

    /// Set the copy from a decoded value.
    ///
    /// Either every leaf takes its new value or none does.
    ///
    /// # Errors
    ///
    /// Returns `TypeConflict` if the value does not match the shape or the
    /// leaf types of the copy
    pub fn set_from_value(&mut self, value: &Value) -> Result<(), ServiceError> {
        let mut decoded = self.clone();
        decoded.decode_in_place(value)?;
        *self = decoded;
        Ok(())
    }

    fn decode_in_place(&mut self, value: &Value) -> Result<(), ServiceError> {
        let reference = &self.reference;
        match (&mut self.content, value) {
            (CopyContent::Leaf(proposed), value) => proposed.set(value),
            (CopyContent::Children(children), Value::Array(elements)) if self.array => {
                decode_children(reference, children, elements)
            }
            (CopyContent::Children(children), Value::Structure(fields)) if !self.array => {
                decode_children(reference, children, fields)
            }
            (_, value) => Err(ServiceError::type_conflict(format!(
                "{} cannot take a {} value",
                reference,
                value.kind()
            ))),
        }
    }
}

fn decode_children(
    reference: &ObjectReference,
    children: &mut [NodeCopy],
    values: &[Value],
) -> Result<(), ServiceError> {
    if children.len() != values.len() {
        return Err(ServiceError::type_conflict(format!(
            "{} has {} components, got {}",
            reference,
            children.len(),
            values.len()
        )));
    }
    for (child, value) in children.iter_mut().zip(values) {
        child.decode_in_place(value)?;
    }
    Ok(())
}

impl ModelTree {
    /// Take a detached copy of a subtree
    pub fn copy(&self, id: NodeId) -> NodeCopy {
        let node = self.node(id);
        let content = match node.kind() {
            NodeKind::Basic(bda) => CopyContent::Leaf(ProposedValue {
                mirror: id,
                bda_type: bda.bda_type(),
                value: bda.value().clone(),
            }),
            _ => CopyContent::Children(node.children().iter().map(|c| self.copy(*c)).collect()),
        };
        NodeCopy {
            source: id,
            reference: node.reference().clone(),
            fc: node.fc(),
            array: matches!(node.kind(), NodeKind::Array),
            content,
        }
    }

    /// Reload the committed values of the tree into a copy
    pub fn refresh(&self, copy: &mut NodeCopy) {
        match &mut copy.content {
            CopyContent::Leaf(proposed) => {
                if let Some(value) = self.basic_value(proposed.mirror) {
                    proposed.value = value.clone();
                }
            }
            CopyContent::Children(children) => {
                for child in children {
                    self.refresh(child);
                }
            }
        }
    }

    /// Commit the proposed values of a copy onto their live leaves.
    ///
    /// All values are checked before the first leaf is mutated.
    ///
    /// # Returns
    ///
    /// Every committed leaf with a flag telling whether its value changed
    ///
    /// # Errors
    ///
    /// Returns `TypeConflict` if a proposed value does not fit its live leaf
    pub fn commit(&mut self, copy: &NodeCopy) -> Result<Vec<LeafUpdate>, ServiceError> {
        let leaves = copy.leaves();
        let mut validated = Vec::with_capacity(leaves.len());
        for proposed in leaves {
            let bda = self
                .get(proposed.mirror)
                .and_then(|node| node.basic())
                .ok_or_else(|| {
                    ServiceError::instance_not_available(format!(
                        "no live attribute for {}",
                        proposed.mirror
                    ))
                })?;
            validated.push((proposed.mirror, bda.bda_type().validate(&proposed.value)?));
        }

        let mut updates = Vec::with_capacity(validated.len());
        for (node, value) in validated {
            let changed = self.set_basic_value(node, &value)?;
            updates.push(LeafUpdate { node, changed });
        }
        Ok(updates)
    }
}
