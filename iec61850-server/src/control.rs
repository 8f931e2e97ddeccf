//! Select-before-operate state of controllable objects

use iec61850_core::{ErrorCode, Fc, ServiceError, Value};
use iec61850_model::{AssociationId, ModelTree, NodeId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

pub const CTL_MODEL: &str = "ctlModel";
pub const SBO_TIMEOUT: &str = "sboTimeout";
pub const SBO: &str = "SBO";
pub const OPER: &str = "Oper";
pub const CANCEL: &str = "Cancel";
pub const CTL_VAL: &str = "ctlVal";

/// Control models of `ctlModel`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlModel {
    StatusOnly,
    DirectNormal,
    SboNormal,
    DirectEnhanced,
    SboEnhanced,
}

impl ControlModel {
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::StatusOnly),
            1 => Some(Self::DirectNormal),
            2 => Some(Self::SboNormal),
            3 => Some(Self::DirectEnhanced),
            4 => Some(Self::SboEnhanced),
            _ => None,
        }
    }
}

/// Which association holds which controllable object.
///
/// Objects are identified by their data object with functional constraint CO.
#[derive(Debug, Default)]
pub struct SelectionTable {
    selected: Mutex<HashMap<NodeId, AssociationId>>,
}

impl SelectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select an object for an association.
    ///
    /// # Returns
    ///
    /// `false` if another association holds the object
    pub fn select(&self, control: NodeId, association: AssociationId) -> bool {
        let mut selected = self.selected.lock();
        match selected.get(&control) {
            Some(owner) if *owner != association => false,
            _ => {
                selected.insert(control, association);
                true
            }
        }
    }

    pub fn selected_by(&self, control: NodeId) -> Option<AssociationId> {
        self.selected.lock().get(&control).copied()
    }

    pub fn is_selected_by(&self, control: NodeId, association: AssociationId) -> bool {
        self.selected_by(control) == Some(association)
    }

    /// Release an object if `association` holds it
    pub fn deselect(&self, control: NodeId, association: AssociationId) -> bool {
        let mut selected = self.selected.lock();
        if selected.get(&control) == Some(&association) {
            selected.remove(&control);
            true
        } else {
            false
        }
    }

    /// Release everything an association holds
    ///
    /// # Returns
    ///
    /// The released objects
    pub fn release_all(&self, association: AssociationId) -> Vec<NodeId> {
        let mut released = Vec::new();
        self.selected.lock().retain(|control, owner| {
            if *owner == association {
                released.push(*control);
                false
            } else {
                true
            }
        });
        released
    }
}

/// The CO data object a control attribute (`SBO`, `Oper`, `Cancel` or below) belongs to
pub fn control_object(tree: &ModelTree, node: NodeId) -> Option<NodeId> {
    tree.ancestors(node)
        .find(|id| {
            let parent = tree.node(*id).parent();
            parent.is_some_and(|p| tree.node(p).fc().is_none())
        })
        .filter(|id| tree.node(*id).fc() == Some(Fc::CO))
}

/// Name of the control service attribute directly below the control object
pub fn control_service(tree: &ModelTree, control: NodeId, node: NodeId) -> Option<String> {
    tree.ancestors(node)
        .find(|id| tree.node(*id).parent() == Some(control))
        .map(|id| tree.node(id).name().to_string())
}

fn configuration_value(tree: &ModelTree, control: NodeId, name: &str) -> Option<i64> {
    let reference = tree.node(control).reference().child(name);
    let id = tree.find(&reference, Some(Fc::CF))?;
    tree.basic_value(id).and_then(Value::as_i64)
}

/// `ctlModel` of a control object
///
/// # Errors
///
/// Returns `InstanceNotAvailable` if the object has no readable `ctlModel`
pub fn control_model(tree: &ModelTree, control: NodeId) -> Result<Option<ControlModel>, ServiceError> {
    configuration_value(tree, control, CTL_MODEL)
        .map(ControlModel::from_value)
        .ok_or_else(|| {
            ServiceError::instance_not_available(format!(
                "{} has no {}",
                tree.node(control).reference(),
                CTL_MODEL
            ))
        })
}

/// `sboTimeout` of a control object; `None` when absent or zero
pub fn sbo_timeout(tree: &ModelTree, control: NodeId) -> Option<Duration> {
    configuration_value(tree, control, SBO_TIMEOUT)
        .and_then(|ms| u64::try_from(ms).ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

/// Error for control services the object does not support
pub fn unsupported_control(tree: &ModelTree, node: NodeId) -> ServiceError {
    ServiceError::new(
        ErrorCode::ClassNotSupported,
        format!("control service not supported by {}", tree.node(node).reference()),
    )
}
