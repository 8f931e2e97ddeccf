//! The server model: tree, data set registry and RCB registry

use crate::data_set::DataSet;
use crate::node::{NodeId, NodeKind};
use crate::rcb::{self, Rcb, RcbKind, RcbSettings};
use crate::tree::ModelTree;
use iec61850_core::{
    Fc, Iec61850Error, Iec61850Result, ObjectName, ObjectReference, ServiceError, VariableDef,
};
use std::fmt;

/// Identity of a server association, used for reservations and selections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssociationId(pub u64);

impl fmt::Display for AssociationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "association-{}", self.0)
    }
}

/// Root container of a device model.
///
/// Keeps the RCB registry consistent with the data set registry: every time a
/// data set is added or removed each RCB's data set is resolved again from its
/// `DatSet` attribute.
#[derive(Debug, Clone, Default)]
pub struct ServerModel {
    tree: ModelTree,
    data_sets: Vec<DataSet>,
    rcbs: Vec<Rcb>,
}

impl ServerModel {
    pub fn new(tree: ModelTree) -> Self {
        Self {
            tree,
            data_sets: Vec::new(),
            rcbs: Vec::new(),
        }
    }

    pub fn tree(&self) -> &ModelTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ModelTree {
        &mut self.tree
    }

    /// Deep copy of the whole model
    pub fn copy(&self) -> ServerModel {
        self.clone()
    }

    /// Node addressed by reference and functional constraint
    pub fn find_model_node(&self, reference: &ObjectReference, fc: Option<Fc>) -> Option<NodeId> {
        self.tree.find(reference, fc)
    }

    /// Node addressed by an MMS variable definition.
    ///
    /// The item id is `LN[$FC$DO$DA..]`; `LN$FC` alone addresses no single node.
    pub fn node_from_variable_def(&self, def: &VariableDef) -> Option<NodeId> {
        let ObjectName::DomainSpecific { domain_id, item_id } = &def.name else {
            return None;
        };
        let ld = self.tree.logical_device(domain_id)?;
        let mut parts = item_id.split('$');
        let ln = self.tree.child(ld, parts.next()?, None)?;
        let Some(fc) = parts.next() else {
            return Some(ln);
        };
        let fc = Fc::from_name(fc)?;
        let mut node = self.tree.child(ln, parts.next()?, Some(fc))?;
        for name in parts {
            node = self.tree.child(node, name, None)?;
        }

        if let Some(access) = &def.alternate_access {
            if !matches!(self.tree.node(node).kind(), NodeKind::Array) {
                return None;
            }
            node = *self.tree.node(node).children().get(access.index as usize)?;
            if let Some(component) = &access.component {
                for name in component.split('$') {
                    node = self.tree.child(node, name, None)?;
                }
            }
        }
        Some(node)
    }

    pub fn data_sets(&self) -> &[DataSet] {
        &self.data_sets
    }

    /// Persistent data set by reference (`LD/LN.DS`)
    pub fn data_set(&self, reference: &str) -> Option<&DataSet> {
        self.data_sets.iter().find(|ds| ds.reference() == reference)
    }

    /// Names (`LN$DS`) of the persistent data sets of a logical device
    pub fn data_set_names(&self, ld_name: &str) -> Vec<String> {
        self.data_sets
            .iter()
            .filter(|ds| ds.ld_name() == Some(ld_name))
            .filter_map(|ds| match ds.mms_name() {
                ObjectName::DomainSpecific { item_id, .. } => Some(item_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Register a persistent data set
    ///
    /// # Errors
    ///
    /// Returns `ParameterValueInappropriate` for a non-persistent set or a
    /// reference that exists already
    pub fn add_data_set(&mut self, data_set: DataSet) -> Result<(), ServiceError> {
        if !data_set.is_persistent() {
            return Err(ServiceError::parameter_value_inappropriate(format!(
                "{} is not a persistent data set",
                data_set.reference()
            )));
        }
        if self.data_set(data_set.reference()).is_some() {
            return Err(ServiceError::parameter_value_inappropriate(format!(
                "data set {} exists already",
                data_set.reference()
            )));
        }
        log::debug!("Adding data set {}", data_set.reference());
        self.data_sets.push(data_set);
        self.resolve_rcb_data_sets();
        Ok(())
    }

    /// Remove a deletable persistent data set
    ///
    /// # Returns
    ///
    /// The removed set, `None` if it does not exist or is not deletable
    pub fn remove_data_set(&mut self, reference: &str) -> Option<DataSet> {
        let position = self
            .data_sets
            .iter()
            .position(|ds| ds.reference() == reference && ds.is_deletable())?;
        let removed = self.data_sets.remove(position);
        log::debug!("Removed data set {}", reference);
        self.resolve_rcb_data_sets();
        Some(removed)
    }

    /// Whether some RCB reports the given data set
    pub fn is_data_set_in_use(&self, reference: &str) -> bool {
        self.rcbs
            .iter()
            .any(|rcb| rcb.data_set().is_some_and(|ds| ds.reference() == reference))
    }

    fn resolve_rcb_data_sets(&mut self) {
        for rcb in &mut self.rcbs {
            let reference = rcb.dat_set_reference(&self.tree);
            if reference.starts_with('@') {
                continue;
            }
            let data_set = self.data_sets.iter().find(|ds| ds.reference() == reference);
            rcb.set_data_set(data_set.cloned());
        }
    }

    /// Create and register a report control block below a logical node
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if the nodes cannot be added
    pub fn add_rcb(
        &mut self,
        ln: NodeId,
        name: &str,
        kind: RcbKind,
        settings: &RcbSettings,
    ) -> Iec61850Result<NodeId> {
        let node = rcb::build_rcb_nodes(&mut self.tree, ln, name, kind, settings)?;
        self.register_rcb(node, kind)?;
        Ok(node)
    }

    /// Register an existing data object as report control block
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if the node does not carry the RCB's functional constraint
    pub fn register_rcb(&mut self, node: NodeId, kind: RcbKind) -> Iec61850Result<()> {
        if self.tree.node(node).fc() != Some(kind.fc()) {
            return Err(Iec61850Error::InvalidData(format!(
                "{} is not a {:?} report control block",
                self.tree.node(node).reference(),
                kind
            )));
        }
        let mut rcb = Rcb::new(node, kind);
        let reference = rcb.dat_set_reference(&self.tree);
        rcb.set_data_set(self.data_set(&reference).cloned());
        self.rcbs.push(rcb);
        Ok(())
    }

    pub fn rcbs(&self) -> &[Rcb] {
        &self.rcbs
    }

    pub fn rcb(&self, node: NodeId) -> Option<&Rcb> {
        self.rcbs.iter().find(|rcb| rcb.node() == node)
    }

    pub fn rcb_mut(&mut self, node: NodeId) -> Option<&mut Rcb> {
        self.rcbs.iter_mut().find(|rcb| rcb.node() == node)
    }

    /// RCB by object reference, e.g. `LD0/LLN0.urcb01`
    pub fn rcb_by_reference(&self, reference: &str) -> Option<&Rcb> {
        self.rcbs
            .iter()
            .find(|rcb| self.tree.node(rcb.node()).reference().as_str() == reference)
    }

    /// The RCB a node belongs to, if any
    pub fn rcb_containing(&self, node: NodeId) -> Option<NodeId> {
        self.tree
            .ancestors(node)
            .find(|a| self.rcb(*a).is_some())
    }

    /// Split borrow of the tree and one RCB
    pub fn tree_and_rcb_mut(&mut self, node: NodeId) -> Option<(&mut ModelTree, &mut Rcb)> {
        let rcb = self.rcbs.iter_mut().find(|rcb| rcb.node() == node)?;
        Some((&mut self.tree, rcb))
    }
}
