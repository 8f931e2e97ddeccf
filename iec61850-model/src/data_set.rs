//! Data sets

use crate::node::NodeId;
use crate::tree::ModelTree;
use iec61850_core::{
    Iec61850Error, Iec61850Result, ObjectName, ServiceError, VariableDef,
};

/// Named, ordered list of functionally constrained nodes.
///
/// Persistent data sets are referenced as `LD/LN.name`, association specific
/// (non-persistent) ones as `@name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSet {
    reference: String,
    mms_name: ObjectName,
    members: Vec<NodeId>,
    deletable: bool,
}

impl DataSet {
    /// Create a data set. Members referring to the same node are kept once.
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if the reference is malformed
    pub fn new(
        reference: impl Into<String>,
        members: Vec<NodeId>,
        deletable: bool,
    ) -> Iec61850Result<Self> {
        let reference = reference.into();
        let mms_name = ObjectName::from_data_set_reference(&reference)?;
        if !reference.starts_with('@') && !reference.contains('.') {
            return Err(Iec61850Error::InvalidData(format!(
                "data set reference {} has no logical node",
                reference
            )));
        }
        let mut unique = Vec::with_capacity(members.len());
        for member in members {
            if !unique.contains(&member) {
                unique.push(member);
            }
        }
        Ok(Self {
            reference,
            mms_name,
            members: unique,
            deletable,
        })
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn mms_name(&self) -> &ObjectName {
        &self.mms_name
    }

    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_deletable(&self) -> bool {
        self.deletable
    }

    pub fn is_persistent(&self) -> bool {
        !self.reference.starts_with('@')
    }

    /// Logical device of a persistent set
    pub fn ld_name(&self) -> Option<&str> {
        match &self.mms_name {
            ObjectName::DomainSpecific { domain_id, .. } => Some(domain_id),
            _ => None,
        }
    }

    /// Position of a direct member
    pub fn member_index(&self, node: NodeId) -> Option<usize> {
        self.members.iter().position(|m| *m == node)
    }

    /// Position of the member that contains `node` (or is `node`)
    pub fn containing_member(&self, tree: &ModelTree, node: NodeId) -> Option<usize> {
        tree.ancestors(node).find_map(|a| self.member_index(a))
    }

    /// MMS variable definitions of the members
    ///
    /// # Errors
    ///
    /// Returns `ServerConstraint` if a member cannot be addressed by MMS
    pub fn variable_defs(&self, tree: &ModelTree) -> Result<Vec<VariableDef>, ServiceError> {
        self.members
            .iter()
            .map(|member| {
                let node = tree.node(*member);
                let fc = node.fc().ok_or_else(|| {
                    ServiceError::server_constraint(format!(
                        "data set member {} has no functional constraint",
                        node.reference()
                    ))
                })?;
                VariableDef::from_reference(node.reference(), fc)
                    .map_err(|e| ServiceError::server_constraint(e.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::sample_tree;
    use iec61850_core::{Fc, ObjectReference};

    #[test]
    fn test_members_are_unique() {
        let tree = sample_tree();
        let tot_w = tree
            .find(&ObjectReference::new("LD0/MMXU1.TotW").unwrap(), Some(Fc::MX))
            .unwrap();
        let ds = DataSet::new("LD0/MMXU1.ds", vec![tot_w, tot_w], true).unwrap();
        assert_eq!(ds.len(), 1);
        assert!(ds.is_persistent());
        assert_eq!(ds.ld_name(), Some("LD0"));
        assert_eq!(ds.mms_name(), &ObjectName::domain_specific("LD0", "MMXU1$ds"));
    }

    #[test]
    fn test_containing_member() {
        let tree = sample_tree();
        let tot_w = tree
            .find(&ObjectReference::new("LD0/MMXU1.TotW").unwrap(), Some(Fc::MX))
            .unwrap();
        let ds = DataSet::new("@tmp", vec![tot_w], true).unwrap();
        let f = tree.leaves(tot_w)[0];
        assert_eq!(ds.containing_member(&tree, f), Some(0));
        let ld = tree.logical_device("LD0").unwrap();
        assert_eq!(ds.containing_member(&tree, ld), None);
        assert!(!ds.is_persistent());
    }

    #[test]
    fn test_invalid_reference() {
        assert!(DataSet::new("LD0/ds", vec![], true).is_err());
        assert!(DataSet::new("nothing", vec![], true).is_err());
    }

    #[test]
    fn test_variable_defs() {
        let tree = sample_tree();
        let tot_w = tree
            .find(&ObjectReference::new("LD0/MMXU1.TotW").unwrap(), Some(Fc::MX))
            .unwrap();
        let ds = DataSet::new("LD0/MMXU1.ds", vec![tot_w], false).unwrap();
        let defs = ds.variable_defs(&tree).unwrap();
        assert_eq!(defs[0].name, ObjectName::domain_specific("LD0", "MMXU1$MX$TotW"));
    }
}
