//! Conversion between subtrees and MMS type descriptions
//!
//! Servers describe their logical nodes with [`ln_type_description`]; clients
//! rebuild the tree from the descriptions they retrieve with
//! [`ln_from_type_description`].

use crate::bda::{BdaType, TriggerFlags};
use crate::node::{NodeId, NodeKind};
use crate::rcb::RcbKind;
use crate::server_model::ServerModel;
use crate::tree::ModelTree;
use iec61850_core::{
    Fc, Iec61850Error, Iec61850Result, StructureComponent, TypeDescription,
};

/// Type description of any node below a logical node
pub fn node_type_description(tree: &ModelTree, id: NodeId) -> TypeDescription {
    let node = tree.node(id);
    match node.kind() {
        NodeKind::Basic(bda) => bda.bda_type().type_description(),
        NodeKind::Array => TypeDescription::Array {
            number_of_elements: node.children().len() as u32,
            element_type: Box::new(
                node.children()
                    .first()
                    .map(|first| node_type_description(tree, *first))
                    .unwrap_or(TypeDescription::Structure(Vec::new())),
            ),
        },
        _ => TypeDescription::Structure(
            node.children()
                .iter()
                .map(|child| {
                    StructureComponent::new(
                        tree.node(*child).name(),
                        node_type_description(tree, *child),
                    )
                })
                .collect(),
        ),
    }
}

/// Type description of the `LN$FC` group, `None` if the node has no child with that fc
pub fn fc_type_description(tree: &ModelTree, ln: NodeId, fc: Fc) -> Option<TypeDescription> {
    let children = tree.fc_children(ln, fc);
    if children.is_empty() {
        return None;
    }
    Some(TypeDescription::Structure(
        children
            .iter()
            .map(|child| {
                StructureComponent::new(tree.node(*child).name(), node_type_description(tree, *child))
            })
            .collect(),
    ))
}

/// Type description of a logical node: one component per functional
/// constraint, in MMS directory order
pub fn ln_type_description(tree: &ModelTree, ln: NodeId) -> TypeDescription {
    TypeDescription::Structure(
        Fc::MMS_DIRECTORY_ORDER
            .iter()
            .filter_map(|fc| {
                fc_type_description(tree, ln, *fc)
                    .map(|td| StructureComponent::new(fc.as_str(), td))
            })
            .collect(),
    )
}

/// Build a logical node from its type description.
///
/// Components for functional constraints this model does not know are
/// skipped. Data objects with fc RP or BR are registered as report control
/// blocks.
///
/// # Errors
///
/// Returns `InvalidData` if the description is not a structure of structures
/// or contains an unsupported basic type
pub fn ln_from_type_description(
    model: &mut ServerModel,
    ld: NodeId,
    name: &str,
    description: &TypeDescription,
) -> Iec61850Result<NodeId> {
    let fc_components = description.components().ok_or_else(|| {
        Iec61850Error::InvalidData(format!("definition of {} is not a structure", name))
    })?;
    let ln = model.tree_mut().add_logical_node(ld, name)?;

    for fc_component in fc_components {
        let Some(fc) = Fc::from_name(&fc_component.name) else {
            log::debug!("Skipping unsupported fc {} of {}", fc_component.name, name);
            continue;
        };
        let objects = fc_component.type_description.components().ok_or_else(|| {
            Iec61850Error::InvalidData(format!("{}${} is not a structure", name, fc))
        })?;
        for object in objects {
            let node =
                node_from_type_description(model.tree_mut(), ln, &object.name, fc, &object.type_description)?;
            if let Some(kind) = RcbKind::from_fc(fc) {
                model.register_rcb(node, kind)?;
            }
        }
    }
    Ok(ln)
}

/// Build a subtree from a type description.
///
/// Below a logical node a structure becomes a data object, elsewhere a
/// constructed attribute.
///
/// # Errors
///
/// Returns `InvalidData` for basic types without a model counterpart
pub fn node_from_type_description(
    tree: &mut ModelTree,
    parent: NodeId,
    name: &str,
    fc: Fc,
    description: &TypeDescription,
) -> Iec61850Result<NodeId> {
    match description {
        TypeDescription::Structure(components) => {
            let node = if matches!(tree.node(parent).kind(), NodeKind::LogicalNode) {
                tree.add_data_object(parent, name, fc)?
            } else {
                tree.add_constructed(parent, name)?
            };
            for component in components {
                node_from_type_description(
                    tree,
                    node,
                    &component.name,
                    fc,
                    &component.type_description,
                )?;
            }
            Ok(node)
        }
        TypeDescription::Array {
            number_of_elements,
            element_type,
        } => {
            let array = tree.add_array(parent, name, fc)?;
            for _ in 0..*number_of_elements {
                node_from_type_description(tree, array, "", fc, element_type)?;
            }
            Ok(array)
        }
        basic => {
            let bda_type = basic_type(name, fc, basic).ok_or_else(|| {
                Iec61850Error::InvalidData(format!(
                    "unsupported type {:?} for {} below {}",
                    basic,
                    name,
                    tree.node(parent).reference()
                ))
            })?;
            tree.add_basic(parent, name, bda_type, TriggerFlags::NONE)
        }
    }
}

fn basic_type(name: &str, fc: Fc, description: &TypeDescription) -> Option<BdaType> {
    let bda_type = match description {
        TypeDescription::Boolean => BdaType::Boolean,
        TypeDescription::BitString(size) => match size.unsigned_abs() {
            13 => BdaType::Quality,
            10 => BdaType::OptFlds,
            6 => BdaType::TriggerConditions,
            // ctlVal of a tap changer, Check otherwise
            2 if fc == Fc::CO && name.chars().nth(1) == Some('t') => BdaType::TapCommand,
            2 if fc == Fc::CO => BdaType::Check,
            2 => BdaType::DoubleBitPos,
            bits => BdaType::BitString(bits),
        },
        TypeDescription::Integer(8) => BdaType::Int8,
        TypeDescription::Integer(16) => BdaType::Int16,
        TypeDescription::Integer(32) => BdaType::Int32,
        TypeDescription::Integer(64) => BdaType::Int64,
        TypeDescription::Unsigned(8) => BdaType::Int8U,
        TypeDescription::Unsigned(16) => BdaType::Int16U,
        TypeDescription::Unsigned(32) => BdaType::Int32U,
        TypeDescription::FloatingPoint {
            format_width: 32, ..
        } => BdaType::Float32,
        TypeDescription::FloatingPoint {
            format_width: 64, ..
        } => BdaType::Float64,
        TypeDescription::OctetString(size) if size.unsigned_abs() <= 255 => {
            BdaType::OctetString(size.unsigned_abs())
        }
        TypeDescription::VisibleString(size) if size.unsigned_abs() <= 255 => {
            BdaType::VisibleString(size.unsigned_abs())
        }
        TypeDescription::MmsString(size) if size.unsigned_abs() <= 255 => {
            BdaType::UnicodeString(size.unsigned_abs())
        }
        TypeDescription::UtcTime => BdaType::Timestamp,
        TypeDescription::BinaryTime(_) => BdaType::EntryTime,
        _ => return None,
    };
    Some(bda_type)
}
