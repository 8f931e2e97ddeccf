//! Arena owned model tree

use crate::bda::{BdaType, TriggerFlags};
use crate::node::{BasicDataAttribute, ModelNode, NodeId, NodeKind};
use iec61850_core::{Fc, Iec61850Error, Iec61850Result, ObjectReference, ServiceError, Value};

/// The model tree.
///
/// Nodes are stored in an arena and addressed by [`NodeId`]. A node's parent
/// is fixed when it is inserted; nodes are never removed.
#[derive(Debug, Clone, Default)]
pub struct ModelTree {
    nodes: Vec<ModelNode>,
    logical_devices: Vec<NodeId>,
}

impl ModelTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node of a handle issued by this tree.
    ///
    /// Handles are only created by this tree's insert methods, so indexing
    /// with one of them cannot fail.
    pub fn node(&self, id: NodeId) -> &ModelNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&ModelNode> {
        self.nodes.get(id.0)
    }

    pub fn logical_devices(&self) -> &[NodeId] {
        &self.logical_devices
    }

    pub fn logical_device(&self, name: &str) -> Option<NodeId> {
        self.logical_devices
            .iter()
            .copied()
            .find(|id| self.node(*id).name == name)
    }

    /// Add a logical device
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if a device with the same name exists
    pub fn add_logical_device(&mut self, name: &str) -> Iec61850Result<NodeId> {
        if self.logical_device(name).is_some() {
            return Err(Iec61850Error::InvalidData(format!(
                "duplicate logical device {}",
                name
            )));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(ModelNode {
            reference: ObjectReference::new(name)?,
            name: name.to_string(),
            fc: None,
            parent: None,
            children: Vec::new(),
            kind: NodeKind::LogicalDevice,
        });
        self.logical_devices.push(id);
        Ok(id)
    }

    /// Add a logical node below a logical device
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if `ld` is not a logical device or the name is taken
    pub fn add_logical_node(&mut self, ld: NodeId, name: &str) -> Iec61850Result<NodeId> {
        if !matches!(self.node(ld).kind, NodeKind::LogicalDevice) {
            return Err(Iec61850Error::InvalidData(format!(
                "{} is not a logical device",
                self.node(ld).reference
            )));
        }
        self.insert(ld, name, None, NodeKind::LogicalNode)
    }

    /// Add a data object below a logical node or another data object.
    ///
    /// Nested data objects must carry the functional constraint of their parent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` on a misplaced node, an fc mismatch or a duplicate name
    pub fn add_data_object(&mut self, parent: NodeId, name: &str, fc: Fc) -> Iec61850Result<NodeId> {
        match self.node(parent).kind {
            NodeKind::LogicalNode => {}
            NodeKind::DataObject if self.node(parent).fc == Some(fc) => {}
            _ => {
                return Err(Iec61850Error::InvalidData(format!(
                    "cannot add data object {} [{}] below {}",
                    name,
                    fc,
                    self.node(parent).reference
                )));
            }
        }
        self.insert(parent, name, Some(fc), NodeKind::DataObject)
    }

    /// Add an array below a logical node or a functionally constrained node
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` on a misplaced node or a duplicate name
    pub fn add_array(&mut self, parent: NodeId, name: &str, fc: Fc) -> Iec61850Result<NodeId> {
        let parent_fc = self.node(parent).fc;
        if parent_fc.is_some_and(|p| p != fc)
            || matches!(self.node(parent).kind, NodeKind::LogicalDevice | NodeKind::Basic(_))
        {
            return Err(Iec61850Error::InvalidData(format!(
                "cannot add array {} [{}] below {}",
                name,
                fc,
                self.node(parent).reference
            )));
        }
        self.insert(parent, name, Some(fc), NodeKind::Array)
    }

    /// Add a constructed attribute. Below an array the element index is used as name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if the parent has no functional constraint
    pub fn add_constructed(&mut self, parent: NodeId, name: &str) -> Iec61850Result<NodeId> {
        let fc = self.inherited_fc(parent, name)?;
        self.insert(parent, name, Some(fc), NodeKind::Constructed)
    }

    /// Add a basic attribute. Below an array the element index is used as name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if the parent has no functional constraint
    pub fn add_basic(
        &mut self,
        parent: NodeId,
        name: &str,
        bda_type: BdaType,
        triggers: TriggerFlags,
    ) -> Iec61850Result<NodeId> {
        let fc = self.inherited_fc(parent, name)?;
        self.insert(
            parent,
            name,
            Some(fc),
            NodeKind::Basic(BasicDataAttribute::new(bda_type, triggers)),
        )
    }

    fn inherited_fc(&self, parent: NodeId, name: &str) -> Iec61850Result<Fc> {
        let node = self.node(parent);
        match (&node.kind, node.fc) {
            (NodeKind::Basic(_), _) | (_, None) => Err(Iec61850Error::InvalidData(format!(
                "cannot add attribute {} below {}",
                name, node.reference
            ))),
            (_, Some(fc)) => Ok(fc),
        }
    }

    fn insert(
        &mut self,
        parent: NodeId,
        name: &str,
        fc: Option<Fc>,
        kind: NodeKind,
    ) -> Iec61850Result<NodeId> {
        let parent_node = self.node(parent);
        let (name, reference) = if matches!(parent_node.kind, NodeKind::Array) {
            let index = parent_node.children.len().to_string();
            let reference = parent_node.reference.child(&format!("({})", index));
            (index, reference)
        } else {
            if name.is_empty() {
                return Err(Iec61850Error::InvalidData(format!(
                    "empty child name below {}",
                    parent_node.reference
                )));
            }
            if self.child(parent, name, fc).is_some() {
                return Err(Iec61850Error::InvalidData(format!(
                    "duplicate child {} below {}",
                    name, parent_node.reference
                )));
            }
            (name.to_string(), parent_node.reference.child(name))
        };

        let id = NodeId(self.nodes.len());
        self.nodes.push(ModelNode {
            reference,
            name,
            fc,
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Child by name; below a logical node the functional constraint narrows
    /// the lookup when given
    pub fn child(&self, parent: NodeId, name: &str, fc: Option<Fc>) -> Option<NodeId> {
        self.node(parent).children.iter().copied().find(|id| {
            let child = self.node(*id);
            child.name == name && (fc.is_none() || child.fc.is_none() || child.fc == fc)
        })
    }

    /// Children of a logical node carrying the given functional constraint
    pub fn fc_children(&self, ln: NodeId, fc: Fc) -> Vec<NodeId> {
        self.node(ln)
            .children
            .iter()
            .copied()
            .filter(|id| self.node(*id).fc == Some(fc))
            .collect()
    }

    /// Resolve a reference, optionally constrained to a functional constraint
    pub fn find(&self, reference: &ObjectReference, fc: Option<Fc>) -> Option<NodeId> {
        let mut segments = reference.iter();
        let mut current = self.logical_device(segments.next()?)?;
        for segment in segments {
            current = self.child(current, segment, fc)?;
        }
        if fc.is_some() && self.node(current).fc.is_some() && self.node(current).fc != fc {
            return None;
        }
        Some(current)
    }

    /// The node and its ancestors, innermost first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |current| self.node(*current).parent)
    }

    /// Logical node a node belongs to
    pub fn logical_node_of(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .find(|a| matches!(self.node(*a).kind, NodeKind::LogicalNode))
    }

    /// Basic attributes below a node, in tree order
    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        self.collect_leaves(id, &mut leaves);
        leaves
    }

    fn collect_leaves(&self, id: NodeId, leaves: &mut Vec<NodeId>) {
        let node = self.node(id);
        if node.kind.is_basic() {
            leaves.push(id);
            return;
        }
        for child in &node.children {
            self.collect_leaves(*child, leaves);
        }
    }

    /// Encoded value of a node
    ///
    /// # Errors
    ///
    /// Returns `ParameterValueInconsistent` for logical devices and nodes
    pub fn value(&self, id: NodeId) -> Result<Value, ServiceError> {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Basic(bda) => Ok(bda.value().clone()),
            NodeKind::Array => Ok(Value::Array(self.child_values(id)?)),
            NodeKind::DataObject | NodeKind::Constructed => {
                Ok(Value::Structure(self.child_values(id)?))
            }
            NodeKind::LogicalDevice | NodeKind::LogicalNode => {
                Err(ServiceError::parameter_value_inconsistent(format!(
                    "{} has no value representation",
                    node.reference
                )))
            }
        }
    }

    fn child_values(&self, id: NodeId) -> Result<Vec<Value>, ServiceError> {
        self.node(id)
            .children
            .iter()
            .map(|child| self.value(*child))
            .collect()
    }

    /// Value of a basic attribute
    pub fn basic_value(&self, id: NodeId) -> Option<&Value> {
        self.node(id).basic().map(BasicDataAttribute::value)
    }

    /// Validate and store the value of a basic attribute.
    ///
    /// # Returns
    ///
    /// `true` if the stored value changed
    ///
    /// # Errors
    ///
    /// Returns `TypeConflict` if the node is not a basic attribute or the value
    /// does not match its type
    pub fn set_basic_value(&mut self, id: NodeId, value: &Value) -> Result<bool, ServiceError> {
        let reference = self.node(id).reference.clone();
        self.nodes[id.0]
            .basic_mut()
            .ok_or_else(|| {
                ServiceError::type_conflict(format!("{} is not a basic attribute", reference))
            })?
            .set_value(value)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// `LD0/MMXU1` with `TotW.mag.f` [MX], `TotW.q` [MX] and `Mod.ctlModel` [CF]
    pub(crate) fn sample_tree() -> ModelTree {
        let mut tree = ModelTree::new();
        let ld = tree.add_logical_device("LD0").unwrap();
        let ln = tree.add_logical_node(ld, "MMXU1").unwrap();
        let tot_w = tree.add_data_object(ln, "TotW", Fc::MX).unwrap();
        let mag = tree.add_constructed(tot_w, "mag").unwrap();
        tree.add_basic(mag, "f", BdaType::Float32, TriggerFlags::dchg())
            .unwrap();
        tree.add_basic(tot_w, "q", BdaType::Quality, TriggerFlags::qchg())
            .unwrap();
        let m = tree.add_data_object(ln, "Mod", Fc::CF).unwrap();
        tree.add_basic(m, "ctlModel", BdaType::Int8, TriggerFlags::dchg())
            .unwrap();
        tree
    }

    #[test]
    fn test_find_by_reference() {
        let tree = sample_tree();
        let r = ObjectReference::new("LD0/MMXU1.TotW.mag.f").unwrap();
        let id = tree.find(&r, Some(Fc::MX)).unwrap();
        assert_eq!(tree.node(id).reference(), &r);
        assert!(tree.find(&r, Some(Fc::ST)).is_none());
        assert!(tree.find(&r, None).is_some());
    }

    #[test]
    fn test_parent_and_leaves() {
        let tree = sample_tree();
        let tot_w = tree
            .find(&ObjectReference::new("LD0/MMXU1.TotW").unwrap(), Some(Fc::MX))
            .unwrap();
        let leaves = tree.leaves(tot_w);
        assert_eq!(leaves.len(), 2);
        assert_eq!(tree.ancestors(leaves[0]).nth(2), Some(tot_w));
        assert_eq!(
            tree.node(tree.logical_node_of(leaves[1]).unwrap()).name(),
            "MMXU1"
        );
    }

    #[test]
    fn test_duplicate_and_misplaced_nodes() {
        let mut tree = sample_tree();
        let ld = tree.logical_device("LD0").unwrap();
        assert!(tree.add_logical_device("LD0").is_err());
        assert!(tree.add_constructed(ld, "x").is_err());
        let ln = tree.child(ld, "MMXU1", None).unwrap();
        assert!(tree.add_data_object(ln, "TotW", Fc::MX).is_err());
        // same name, different fc is a different node
        assert!(tree.add_data_object(ln, "TotW", Fc::CF).is_ok());
    }

    #[test]
    fn test_array_elements() {
        let mut tree = sample_tree();
        let ld = tree.logical_device("LD0").unwrap();
        let ln = tree.child(ld, "MMXU1", None).unwrap();
        let harm = tree.add_data_object(ln, "Har", Fc::MX).unwrap();
        let array = tree.add_array(harm, "phsAHar", Fc::MX).unwrap();
        let first = tree.add_basic(array, "", BdaType::Int32, TriggerFlags::NONE).unwrap();
        let second = tree.add_basic(array, "", BdaType::Int32, TriggerFlags::NONE).unwrap();
        assert_eq!(tree.node(first).reference().as_str(), "LD0/MMXU1.Har.phsAHar(0)");
        let r = ObjectReference::new("LD0/MMXU1.Har.phsAHar(1)").unwrap();
        assert_eq!(tree.find(&r, Some(Fc::MX)), Some(second));
        assert_eq!(
            tree.value(array).unwrap(),
            Value::Array(vec![Value::Integer(0), Value::Integer(0)])
        );
    }

    #[test]
    fn test_value_of_structure() {
        let mut tree = sample_tree();
        let r = ObjectReference::new("LD0/MMXU1.TotW.mag.f").unwrap();
        let f = tree.find(&r, None).unwrap();
        assert!(tree.set_basic_value(f, &Value::float32(1.5)).unwrap());
        let tot_w = tree.node(f).parent().and_then(|p| tree.node(p).parent()).unwrap();
        let value = tree.value(tot_w).unwrap();
        let fields = value.elements().unwrap();
        assert_eq!(fields[0], Value::Structure(vec![Value::float32(1.5)]));
        let ld = tree.logical_device("LD0").unwrap();
        assert!(tree.value(ld).is_err());
    }
}
