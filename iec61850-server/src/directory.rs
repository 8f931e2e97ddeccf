//! Directory and data definition services

use crate::association::ServerAssociation;
use iec61850_codec::{
    ConfirmedResponse, GetNameListRequest, GetNameListResponse, GetVariableAccessAttributesResponse,
    OBJECT_CLASS_DOMAIN, OBJECT_CLASS_NAMED_VARIABLE, OBJECT_CLASS_NAMED_VARIABLE_LIST, ObjectScope,
};
use iec61850_core::{Fc, ObjectName, ServiceError, VariableDef};
use iec61850_model::{
    ModelTree, NodeId, NodeKind, ServerModel, fc_type_description, ln_type_description,
    node_type_description,
};

/// Bytes of a PDU not available for identifiers
const PDU_OVERHEAD: u32 = 200;

/// MMS names of everything below a logical device: `LN`, `LN$FC` and
/// `LN$FC$DO$..` in FC directory order. Array elements are not listed.
pub fn logical_device_names(tree: &ModelTree, ld: NodeId) -> Vec<String> {
    let mut names = Vec::new();
    for ln in tree.node(ld).children() {
        let ln_name = tree.node(*ln).name();
        names.push(ln_name.to_string());
        for fc in Fc::MMS_DIRECTORY_ORDER {
            let children = tree.fc_children(*ln, fc);
            if children.is_empty() {
                continue;
            }
            let prefix = format!("{}${}", ln_name, fc);
            names.push(prefix.clone());
            for child in children {
                push_names(tree, child, &prefix, &mut names);
            }
        }
    }
    names
}

fn push_names(tree: &ModelTree, id: NodeId, prefix: &str, names: &mut Vec<String>) {
    let node = tree.node(id);
    let name = format!("{}${}", prefix, node.name());
    names.push(name.clone());
    if matches!(node.kind(), NodeKind::Array) {
        return;
    }
    for child in node.children() {
        push_names(tree, *child, &name, names);
    }
}

/// One page of identifiers after `continue_after`, limited by the PDU size
fn page(identifiers: Vec<String>, continue_after: Option<&str>, max_pdu_size: u32) -> GetNameListResponse {
    let start = continue_after
        .and_then(|after| identifiers.iter().position(|id| id == after))
        .map_or(0, |position| position + 1);
    let budget = max_pdu_size.saturating_sub(PDU_OVERHEAD) as usize;

    let mut used = 0;
    let mut page = Vec::new();
    let mut more_follows = false;
    for identifier in identifiers.into_iter().skip(start) {
        let size = identifier.len() + 2;
        if used + size > budget && !page.is_empty() {
            more_follows = true;
            break;
        }
        used += size;
        page.push(identifier);
    }
    GetNameListResponse {
        identifiers: page,
        more_follows,
    }
}

fn logical_device(model: &ServerModel, name: &str) -> Result<NodeId, ServiceError> {
    model
        .tree()
        .logical_device(name)
        .ok_or_else(|| ServiceError::instance_not_available(format!("unknown logical device {}", name)))
}

impl ServerAssociation {
    /// GetServerDirectory, GetLogicalDeviceDirectory and GetDataSetNames
    pub(crate) fn get_name_list(&self, request: &GetNameListRequest) -> Result<ConfirmedResponse, ServiceError> {
        let identifiers = {
            let model = self.shared.model.lock();
            let tree = model.tree();
            match (request.object_class, &request.object_scope) {
                (OBJECT_CLASS_DOMAIN, _) => tree
                    .logical_devices()
                    .iter()
                    .map(|ld| tree.node(*ld).name().to_string())
                    .collect(),
                (OBJECT_CLASS_NAMED_VARIABLE, ObjectScope::DomainSpecific(ld)) => {
                    logical_device_names(tree, logical_device(&model, ld)?)
                }
                (OBJECT_CLASS_NAMED_VARIABLE, _) => Vec::new(),
                (OBJECT_CLASS_NAMED_VARIABLE_LIST, ObjectScope::DomainSpecific(ld)) => {
                    logical_device(&model, ld)?;
                    model.data_set_names(ld)
                }
                (OBJECT_CLASS_NAMED_VARIABLE_LIST, ObjectScope::AaSpecific) => self
                    .data_sets
                    .iter()
                    .map(|ds| ds.reference().to_string())
                    .collect(),
                (OBJECT_CLASS_NAMED_VARIABLE_LIST, ObjectScope::VmdSpecific) => Vec::new(),
                (class, _) => {
                    return Err(ServiceError::parameter_value_inappropriate(format!(
                        "object class {} is not supported",
                        class
                    )));
                }
            }
        };
        Ok(ConfirmedResponse::GetNameList(page(
            identifiers,
            request.continue_after.as_deref(),
            self.max_pdu_size,
        )))
    }

    /// GetDataDefinition of `LN`, `LN$FC` or a deeper node
    pub(crate) fn get_data_definition(&self, name: &ObjectName) -> Result<ConfirmedResponse, ServiceError> {
        let ObjectName::DomainSpecific { domain_id, item_id } = name else {
            return Err(ServiceError::instance_not_available(format!(
                "{} is not a domain specific name",
                name
            )));
        };
        let model = self.shared.model.lock();
        let tree = model.tree();
        let ld = logical_device(&model, domain_id)?;
        let not_found = || ServiceError::instance_not_available(format!("unknown variable {}", name));

        let mut parts = item_id.split('$');
        let ln = parts
            .next()
            .and_then(|ln| tree.child(ld, ln, None))
            .ok_or_else(not_found)?;
        let type_description = match (parts.next(), parts.next()) {
            (None, _) => ln_type_description(tree, ln),
            (Some(fc), None) => {
                let fc = Fc::from_name(fc).ok_or_else(not_found)?;
                fc_type_description(tree, ln, fc).ok_or_else(not_found)?
            }
            _ => {
                let node = model
                    .node_from_variable_def(&VariableDef::new(name.clone()))
                    .ok_or_else(not_found)?;
                node_type_description(tree, node)
            }
        };
        Ok(ConfirmedResponse::GetVariableAccessAttributes(
            GetVariableAccessAttributesResponse {
                mms_deletable: false,
                type_description,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::tests::control_tree;

    #[test]
    fn test_logical_device_names_in_fc_order() {
        let tree = control_tree(1, 0);
        let ld = tree.logical_device("LD0").unwrap();
        let names = logical_device_names(&tree, ld);
        assert_eq!(
            &names[..6],
            &[
                "CSWI1",
                "CSWI1$ST",
                "CSWI1$ST$Pos",
                "CSWI1$ST$Pos$stVal",
                "CSWI1$CO",
                "CSWI1$CO$Pos",
            ]
        );
        assert_eq!(names[6], "CSWI1$CO$Pos$SBO");
        assert_eq!(names[7], "CSWI1$CO$Pos$Oper");
        assert_eq!(names[8], "CSWI1$CO$Pos$Oper$ctlVal");
        assert!(names.contains(&"CSWI1$CF$Pos$sboTimeout".to_string()));
    }

    #[test]
    fn test_paging_respects_pdu_size() {
        let identifiers: Vec<String> = (0..100).map(|i| format!("LN{:03}", i)).collect();
        let first = page(identifiers.clone(), None, 300);
        assert!(first.more_follows);
        // 7 bytes per identifier within 100 bytes
        assert_eq!(first.identifiers.len(), 14);

        let last = first.identifiers.last().cloned();
        let second = page(identifiers, last.as_deref(), 300);
        assert_eq!(second.identifiers[0], format!("LN{:03}", first.identifiers.len()));
    }
}
