//! Data set services: create, directory and delete

use crate::association::ServerAssociation;
use iec61850_codec::{
    ConfirmedResponse, DefineNamedVariableListRequest, DeleteNamedVariableListRequest,
    DeleteNamedVariableListResponse, NamedVariableListAttributes,
};
use iec61850_core::{ObjectName, ServiceError};
use iec61850_model::{DataSet, ServerModel};

impl ServerAssociation {
    /// Data set by MMS name: domain specific names address the model,
    /// association specific names this association's own sets
    ///
    /// # Errors
    ///
    /// Returns `InstanceNotAvailable` if no such set exists
    pub(crate) fn resolve_data_set(&self, model: &ServerModel, name: &ObjectName) -> Result<DataSet, ServiceError> {
        let found = match name {
            ObjectName::DomainSpecific { .. } => model.data_set(&name.to_data_set_reference()).cloned(),
            ObjectName::AaSpecific(_) => self.non_persistent_data_set(&non_persistent_reference(name)).cloned(),
            ObjectName::VmdSpecific(_) => None,
        };
        found.ok_or_else(|| ServiceError::instance_not_available(format!("unknown data set {}", name)))
    }

    pub(crate) fn non_persistent_data_set(&self, reference: &str) -> Option<&DataSet> {
        self.data_sets.iter().find(|ds| ds.reference() == reference)
    }

    pub(crate) fn define_data_set(
        &mut self,
        request: DefineNamedVariableListRequest,
    ) -> Result<ConfirmedResponse, ServiceError> {
        let mut model = self.shared.model.lock();
        let members = request
            .variables
            .iter()
            .map(|def| {
                model.node_from_variable_def(def).ok_or_else(|| {
                    ServiceError::instance_not_available(format!("unknown data set member {}", def.name))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let name = &request.variable_list_name;
        match name {
            ObjectName::DomainSpecific { domain_id, .. } => {
                if model.tree().logical_device(domain_id).is_none() {
                    return Err(ServiceError::instance_not_available(format!(
                        "unknown logical device {}",
                        domain_id
                    )));
                }
                let data_set = DataSet::new(name.to_data_set_reference(), members, true)
                    .map_err(|e| ServiceError::parameter_value_inappropriate(e.to_string()))?;
                model.add_data_set(data_set)?;
            }
            ObjectName::AaSpecific(_) => {
                let reference = non_persistent_reference(name);
                if self.non_persistent_data_set(&reference).is_some() {
                    return Err(ServiceError::parameter_value_inappropriate(format!(
                        "data set {} exists already",
                        reference
                    )));
                }
                let data_set = DataSet::new(reference, members, true)
                    .map_err(|e| ServiceError::parameter_value_inappropriate(e.to_string()))?;
                self.data_sets.push(data_set);
            }
            ObjectName::VmdSpecific(_) => {
                return Err(ServiceError::parameter_value_inappropriate(
                    "vmd specific data sets are not supported",
                ));
            }
        }
        log::debug!("{}: created data set {}", self.context.id(), name);
        Ok(ConfirmedResponse::DefineNamedVariableList)
    }

    pub(crate) fn data_set_directory(&self, name: &ObjectName) -> Result<ConfirmedResponse, ServiceError> {
        let model = self.shared.model.lock();
        let data_set = self.resolve_data_set(&model, name)?;
        Ok(ConfirmedResponse::GetNamedVariableListAttributes(
            NamedVariableListAttributes {
                mms_deletable: data_set.is_deletable(),
                variables: data_set.variable_defs(model.tree())?,
            },
        ))
    }

    /// Delete data sets. Persistent sets that are not deletable or used by an
    /// RCB count as matched but not deleted. `@` sets are always deleted.
    pub(crate) fn delete_data_sets(
        &mut self,
        request: &DeleteNamedVariableListRequest,
    ) -> Result<ConfirmedResponse, ServiceError> {
        let mut model = self.shared.model.lock();
        let mut number_matched = 0;
        let mut number_deleted = 0;
        for name in &request.names {
            match name {
                ObjectName::AaSpecific(_) => {
                    // no in-use check here: an RCB reporting the set keeps its own copy of the members
                    let reference = non_persistent_reference(name);
                    let before = self.data_sets.len();
                    self.data_sets.retain(|ds| ds.reference() != reference);
                    if self.data_sets.len() < before {
                        number_matched += 1;
                        number_deleted += 1;
                    }
                }
                ObjectName::DomainSpecific { .. } => {
                    let reference = name.to_data_set_reference();
                    if model.data_set(&reference).is_none() {
                        continue;
                    }
                    number_matched += 1;
                    if model.is_data_set_in_use(&reference) {
                        continue;
                    }
                    if model.remove_data_set(&reference).is_some() {
                        number_deleted += 1;
                    }
                }
                ObjectName::VmdSpecific(_) => {}
            }
        }
        Ok(ConfirmedResponse::DeleteNamedVariableList(
            DeleteNamedVariableListResponse {
                number_matched,
                number_deleted,
            },
        ))
    }
}

/// `@name` reference of an association specific name
pub(crate) fn non_persistent_reference(name: &ObjectName) -> String {
    let reference = name.to_data_set_reference();
    if reference.starts_with('@') {
        reference
    } else {
        format!("@{}", reference)
    }
}
