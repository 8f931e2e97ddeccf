//! ACSI services mapped onto confirmed MMS requests
//!
//! Every service keeps the client's copy of the server model current:
//! values read or successfully written are committed onto it, created and
//! deleted data sets are added or removed.

use crate::association::ClientAssociation;
use crate::error::{access_result, write_result};
use iec61850_codec::{
    AccessResult, ConfirmedRequest, ConfirmedResponse, DefineNamedVariableListRequest,
    DeleteNamedVariableListRequest, GetNameListRequest, OBJECT_CLASS_DOMAIN, OBJECT_CLASS_NAMED_VARIABLE,
    OBJECT_CLASS_NAMED_VARIABLE_LIST, ObjectScope, ReadRequest, VariableAccessSpecification, WriteRequest,
    WriteResult,
};
use iec61850_core::{
    Fc, Iec61850Error, Iec61850Result, ObjectName, ObjectReference, OptFlds, ServiceError, Timestamp,
    TriggerConditions, TypeDescription, Value, VariableDef,
};
use iec61850_model::rcb::{BUF_TM, DAT_SET, GI, INTG_PD, OPT_FLDS, PURGE_BUF, RESV, RESV_TMS, RPT_ENA, RPT_ID, TRG_OPS};
use iec61850_model::{DataSet, ModelTree, NodeCopy, NodeId, ServerModel, ln_from_type_description};

const SBO: &str = "SBO";
const OPER: &str = "Oper";
const CTL_VAL: &str = "ctlVal";
const CTL_NUM: &str = "ctlNum";
const T: &str = "T";

/// `scopeOfDelete` selecting the listed names
const DELETE_SPECIFIC: u8 = 0;

/// Report control block parameters to change; `None` keeps the server's value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RcbUpdate {
    pub rpt_id: Option<String>,
    /// Data set reference, `LD/LN.DS` or `@name`
    pub dat_set: Option<String>,
    pub opt_flds: Option<OptFlds>,
    pub buf_tm: Option<u32>,
    pub trg_ops: Option<TriggerConditions>,
    pub intg_pd: Option<u32>,
    pub purge_buf: Option<bool>,
}

impl RcbUpdate {
    /// Attribute writes in the order they are sent
    fn attributes(&self) -> Vec<(&'static str, Value)> {
        let mut attributes = Vec::new();
        if let Some(rpt_id) = &self.rpt_id {
            attributes.push((RPT_ID, Value::VisibleString(rpt_id.clone())));
        }
        if let Some(dat_set) = &self.dat_set {
            attributes.push((DAT_SET, Value::VisibleString(dat_set.replace('.', "$"))));
        }
        if let Some(opt_flds) = &self.opt_flds {
            attributes.push((OPT_FLDS, Value::BitString(opt_flds.bit_string().clone())));
        }
        if let Some(buf_tm) = self.buf_tm {
            attributes.push((BUF_TM, Value::Unsigned(u64::from(buf_tm))));
        }
        if let Some(trg_ops) = &self.trg_ops {
            attributes.push((TRG_OPS, Value::BitString(trg_ops.bit_string().clone())));
        }
        if let Some(intg_pd) = self.intg_pd {
            attributes.push((INTG_PD, Value::Unsigned(u64::from(intg_pd))));
        }
        if let Some(purge_buf) = self.purge_buf {
            attributes.push((PURGE_BUF, Value::Boolean(purge_buf)));
        }
        attributes
    }
}

fn not_in_model(reference: &str) -> Iec61850Error {
    ServiceError::instance_not_available(format!("{} is not in the model", reference)).into()
}

/// Per-member outcome of a data set service
pub type MemberResults = Vec<Result<(), ServiceError>>;

impl ClientAssociation {
    /// Names of one object class, following `moreFollows` continuation
    async fn name_list(&mut self, object_class: u8, object_scope: ObjectScope) -> Iec61850Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        let mut continue_after = None;
        loop {
            let request = ConfirmedRequest::GetNameList(GetNameListRequest {
                object_class,
                object_scope: object_scope.clone(),
                continue_after: continue_after.take(),
            });
            let ConfirmedResponse::GetNameList(response) = self.request(request).await? else {
                return Err(self.malformed("GetNameList"));
            };
            names.extend(response.identifiers);
            match names.last() {
                Some(last) if response.more_follows => continue_after = Some(last.clone()),
                _ => return Ok(names),
            }
        }
    }

    async fn data_definition(&mut self, name: ObjectName) -> Iec61850Result<TypeDescription> {
        match self.request(ConfirmedRequest::GetVariableAccessAttributes(name)).await? {
            ConfirmedResponse::GetVariableAccessAttributes(response) => Ok(response.type_description),
            _ => Err(self.malformed("GetVariableAccessAttributes")),
        }
    }

    async fn data_set_definition(&mut self, model: &ServerModel, name: ObjectName) -> Iec61850Result<DataSet> {
        let reference = name.to_data_set_reference();
        let request = ConfirmedRequest::GetNamedVariableListAttributes(name);
        let ConfirmedResponse::GetNamedVariableListAttributes(attributes) = self.request(request).await? else {
            return Err(self.malformed("GetNamedVariableListAttributes"));
        };
        let members = attributes
            .variables
            .iter()
            .map(|def| {
                model.node_from_variable_def(def).ok_or_else(|| {
                    ServiceError::communications_constraint(format!(
                        "member {} of {} is not in the model",
                        def.name, reference
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        DataSet::new(reference, members, attributes.mms_deletable)
    }

    /// Persistent data sets of one logical device
    async fn data_set_definitions(&mut self, model: &ServerModel, ld_name: &str) -> Iec61850Result<Vec<DataSet>> {
        let scope = ObjectScope::DomainSpecific(ld_name.to_string());
        let names = self.name_list(OBJECT_CLASS_NAMED_VARIABLE_LIST, scope).await?;
        let mut data_sets = Vec::with_capacity(names.len());
        for name in names {
            let name = ObjectName::domain_specific(ld_name, name);
            data_sets.push(self.data_set_definition(model, name).await?);
        }
        Ok(data_sets)
    }

    /// Build the server model from the server's directory: logical devices,
    /// logical node definitions and persistent data sets.
    ///
    /// The retrieved model replaces the association's model, and data sets
    /// created earlier on this association are forgotten.
    ///
    /// # Returns
    ///
    /// A copy of the retrieved model
    ///
    /// # Errors
    ///
    /// Returns the first failing service, or `InvalidData` when a definition
    /// cannot be turned into model nodes
    pub async fn retrieve_model(&mut self) -> Iec61850Result<ServerModel> {
        let mut model = ServerModel::new(ModelTree::new());
        let ld_names = self.name_list(OBJECT_CLASS_DOMAIN, ObjectScope::VmdSpecific).await?;
        for ld_name in &ld_names {
            let ld = model.tree_mut().add_logical_device(ld_name)?;
            let scope = ObjectScope::DomainSpecific(ld_name.clone());
            let names = self.name_list(OBJECT_CLASS_NAMED_VARIABLE, scope).await?;
            for ln_name in names.iter().filter(|name| !name.contains('$')) {
                let description = self
                    .data_definition(ObjectName::domain_specific(ld_name, ln_name))
                    .await?;
                ln_from_type_description(&mut model, ld, ln_name, &description)?;
            }
        }
        for ld_name in &ld_names {
            for data_set in self.data_set_definitions(&model, ld_name).await? {
                model.add_data_set(data_set)?;
            }
        }
        log::info!(
            "retrieved model with {} logical devices and {} data sets",
            ld_names.len(),
            model.data_sets().len()
        );

        let mut client = self.shared.model.lock();
        client.server = model.copy();
        client.data_sets.clear();
        Ok(model)
    }

    /// Refresh the persistent data sets: add new ones and drop the ones the
    /// server no longer lists
    pub async fn update_data_sets(&mut self) -> Iec61850Result<()> {
        let model = self.model();
        let tree = model.tree();
        let ld_names: Vec<String> = tree
            .logical_devices()
            .iter()
            .map(|ld| tree.node(*ld).name().to_string())
            .collect();
        let mut listed = Vec::new();
        for ld_name in &ld_names {
            listed.extend(self.data_set_definitions(&model, ld_name).await?);
        }

        let mut client = self.shared.model.lock();
        let stale: Vec<String> = client
            .server
            .data_sets()
            .iter()
            .filter(|known| !listed.iter().any(|ds| ds.reference() == known.reference()))
            .map(|known| known.reference().to_string())
            .collect();
        for reference in stale {
            if client.server.remove_data_set(&reference).is_none() {
                log::warn!("data set {} vanished from the server but is not deletable", reference);
            }
        }
        for data_set in listed {
            if client.server.data_set(data_set.reference()).is_none() {
                client.server.add_data_set(data_set)?;
            }
        }
        Ok(())
    }

    async fn read(&mut self, specification: VariableAccessSpecification) -> Iec61850Result<Vec<AccessResult>> {
        let request = ConfirmedRequest::Read(ReadRequest {
            specification_with_result: false,
            variable_access_specification: specification,
        });
        match self.request(request).await? {
            ConfirmedResponse::Read(response) => Ok(response.results),
            _ => Err(self.malformed("read")),
        }
    }

    async fn write(
        &mut self,
        specification: VariableAccessSpecification,
        data: Vec<Value>,
        expected: usize,
    ) -> Iec61850Result<Vec<WriteResult>> {
        let request = ConfirmedRequest::Write(WriteRequest {
            variable_access_specification: specification,
            data,
        });
        match self.request(request).await? {
            ConfirmedResponse::Write(results) if results.len() == expected => Ok(results),
            _ => Err(self.malformed("write")),
        }
    }

    /// Copy of a functionally constrained node and its MMS address
    fn addressed_copy(&self, reference: &ObjectReference, fc: Fc) -> Iec61850Result<(NodeCopy, VariableDef)> {
        let client = self.shared.model.lock();
        let node = client
            .server
            .find_model_node(reference, Some(fc))
            .ok_or_else(|| not_in_model(reference.as_str()))?;
        Ok((
            client.server.tree().copy(node),
            VariableDef::from_reference(reference, fc)?,
        ))
    }

    fn commit(&self, copy: &NodeCopy) -> Iec61850Result<()> {
        self.shared.model.lock().server.tree_mut().commit(copy)?;
        Ok(())
    }

    async fn read_node(&mut self, reference: &ObjectReference, fc: Fc) -> Iec61850Result<NodeCopy> {
        let (mut copy, def) = self.addressed_copy(reference, fc)?;
        let results = self
            .read(VariableAccessSpecification::ListOfVariable(vec![def]))
            .await?;
        let Some(result) = results.into_iter().next() else {
            return Err(self.malformed("read"));
        };
        copy.set_from_value(&access_result(result)?)?;
        self.commit(&copy)?;
        Ok(copy)
    }

    /// Read a functionally constrained node and update the model with it
    ///
    /// # Returns
    ///
    /// A copy of the node holding the values read
    ///
    /// # Errors
    ///
    /// Returns `InstanceNotAvailable` if the node is not in the model, and
    /// the server's access error otherwise
    pub async fn get_data_values(&mut self, reference: &str, fc: Fc) -> Iec61850Result<NodeCopy> {
        self.read_node(&ObjectReference::new(reference)?, fc).await
    }

    /// Write a functionally constrained node.
    ///
    /// The value is checked against the model before it is sent and
    /// committed onto the model once the server accepted it.
    pub async fn set_data_values(&mut self, reference: &str, fc: Fc, value: &Value) -> Iec61850Result<()> {
        let (mut copy, def) = self.addressed_copy(&ObjectReference::new(reference)?, fc)?;
        copy.set_from_value(value)?;
        let results = self
            .write(VariableAccessSpecification::ListOfVariable(vec![def]), vec![copy.to_value()], 1)
            .await?;
        for result in results {
            write_result(result)?;
        }
        self.commit(&copy)
    }

    /// Read every data object except controls (CO) and setting group
    /// edits (SE)
    pub async fn get_all_data_values(&mut self) -> Iec61850Result<()> {
        let targets: Vec<(ObjectReference, Fc)> = {
            let client = self.shared.model.lock();
            let tree = client.server.tree();
            let mut targets = Vec::new();
            for ld in tree.logical_devices() {
                for ln in tree.node(*ld).children() {
                    for object in tree.node(*ln).children() {
                        let object = tree.node(*object);
                        match object.fc() {
                            Some(Fc::CO | Fc::SE) | None => {}
                            Some(fc) => targets.push((object.reference().clone(), fc)),
                        }
                    }
                }
            }
            targets
        };
        for (reference, fc) in targets {
            self.read_node(&reference, fc).await?;
        }
        Ok(())
    }

    /// Member copies and MMS name of a known data set
    fn data_set_copies(&self, reference: &str) -> Iec61850Result<(ObjectName, Vec<NodeCopy>)> {
        let client = self.shared.model.lock();
        let data_set = client.data_set(reference).ok_or_else(|| not_in_model(reference))?;
        let tree = client.server.tree();
        Ok((
            data_set.mms_name().clone(),
            data_set.members().iter().map(|member| tree.copy(*member)).collect(),
        ))
    }

    /// Commit the members whose service succeeded
    fn commit_members(&self, copies: &[NodeCopy], results: &MemberResults) -> Iec61850Result<()> {
        let mut client = self.shared.model.lock();
        for (copy, result) in copies.iter().zip(results) {
            if result.is_ok() {
                client.server.tree_mut().commit(copy)?;
            }
        }
        Ok(())
    }

    /// Read all members of a data set
    ///
    /// # Returns
    ///
    /// One result per member, in data set order
    pub async fn get_data_set_values(&mut self, reference: &str) -> Iec61850Result<MemberResults> {
        let (name, mut copies) = self.data_set_copies(reference)?;
        let results = self
            .read(VariableAccessSpecification::VariableListName(name))
            .await?;
        if results.len() != copies.len() {
            return Err(self.malformed("read"));
        }
        let outcome: MemberResults = copies
            .iter_mut()
            .zip(results)
            .map(|(copy, result)| copy.set_from_value(&access_result(result)?))
            .collect();
        self.commit_members(&copies, &outcome)?;
        Ok(outcome)
    }

    /// Write all members of a data set
    ///
    /// # Arguments
    ///
    /// * `values` - one value per member, in data set order
    ///
    /// # Errors
    ///
    /// Returns `ParameterValueInconsistent` if the number of values does not
    /// match the data set and `TypeConflict` if a value does not fit its
    /// member
    pub async fn set_data_set_values(&mut self, reference: &str, values: &[Value]) -> Iec61850Result<MemberResults> {
        let (name, mut copies) = self.data_set_copies(reference)?;
        if values.len() != copies.len() {
            return Err(ServiceError::parameter_value_inconsistent(format!(
                "{} has {} members, got {} values",
                reference,
                copies.len(),
                values.len()
            ))
            .into());
        }
        for (copy, value) in copies.iter_mut().zip(values) {
            copy.set_from_value(value)?;
        }
        let data = copies.iter().map(NodeCopy::to_value).collect();
        let expected = copies.len();
        let results = self
            .write(VariableAccessSpecification::VariableListName(name), data, expected)
            .await?;
        let outcome: MemberResults = results.into_iter().map(write_result).collect();
        self.commit_members(&copies, &outcome)?;
        Ok(outcome)
    }

    /// Create a data set on the server.
    ///
    /// `@name` sets live as long as this association, others are added to
    /// the server model.
    ///
    /// # Arguments
    ///
    /// * `members` - references and functional constraints of the members
    pub async fn create_data_set(&mut self, reference: &str, members: &[(&str, Fc)]) -> Iec61850Result<()> {
        let (data_set, variables) = {
            let client = self.shared.model.lock();
            let mut nodes = Vec::with_capacity(members.len());
            for (member, fc) in members {
                let node = client
                    .server
                    .find_model_node(&ObjectReference::new(*member)?, Some(*fc))
                    .ok_or_else(|| not_in_model(member))?;
                nodes.push(node);
            }
            let data_set = DataSet::new(reference, nodes, true)?;
            let variables = data_set.variable_defs(client.server.tree())?;
            (data_set, variables)
        };

        let request = ConfirmedRequest::DefineNamedVariableList(DefineNamedVariableListRequest {
            variable_list_name: data_set.mms_name().clone(),
            variables,
        });
        let ConfirmedResponse::DefineNamedVariableList = self.request(request).await? else {
            return Err(self.malformed("DefineNamedVariableList"));
        };

        let mut client = self.shared.model.lock();
        if data_set.is_persistent() {
            client.server.add_data_set(data_set)?;
        } else {
            client.data_sets.push(data_set);
        }
        Ok(())
    }

    /// Delete a data set on the server
    ///
    /// # Returns
    ///
    /// Whether the server deleted it; sets that are not deletable or used by
    /// a report control block stay
    pub async fn delete_data_set(&mut self, reference: &str) -> Iec61850Result<bool> {
        let name = ObjectName::from_data_set_reference(reference)?;
        let request = ConfirmedRequest::DeleteNamedVariableList(DeleteNamedVariableListRequest {
            scope_of_delete: DELETE_SPECIFIC,
            names: vec![name],
        });
        let ConfirmedResponse::DeleteNamedVariableList(response) = self.request(request).await? else {
            return Err(self.malformed("DeleteNamedVariableList"));
        };
        let deleted = response.number_deleted == 1;
        if deleted {
            let mut client = self.shared.model.lock();
            client.data_sets.retain(|ds| ds.reference() != reference);
            client.server.remove_data_set(reference);
        }
        Ok(deleted)
    }

    /// Node and MMS address of an RCB attribute
    fn rcb_attribute(&self, rcb: &str, attribute: &str) -> Iec61850Result<(NodeId, VariableDef)> {
        let client = self.shared.model.lock();
        let descriptor = client.server.rcb_by_reference(rcb).ok_or_else(|| not_in_model(rcb))?;
        let tree = client.server.tree();
        let node = descriptor
            .attribute(tree, attribute)
            .ok_or_else(|| not_in_model(&format!("{}.{}", rcb, attribute)))?;
        let def = VariableDef::from_reference(tree.node(node).reference(), descriptor.kind().fc())?;
        Ok((node, def))
    }

    /// Write several attributes of one RCB in a single request
    async fn write_rcb_attributes(
        &mut self,
        rcb: &str,
        attributes: Vec<(&'static str, Value)>,
    ) -> Iec61850Result<MemberResults> {
        let mut nodes = Vec::with_capacity(attributes.len());
        let mut defs = Vec::with_capacity(attributes.len());
        let mut data = Vec::with_capacity(attributes.len());
        for (attribute, value) in attributes {
            let (node, def) = self.rcb_attribute(rcb, attribute)?;
            nodes.push(node);
            defs.push(def);
            data.push(value);
        }
        let expected = defs.len();
        let results = self
            .write(VariableAccessSpecification::ListOfVariable(defs), data.clone(), expected)
            .await?;

        let outcome: MemberResults = results.into_iter().map(write_result).collect();
        let mut client = self.shared.model.lock();
        for ((node, value), result) in nodes.iter().zip(&data).zip(&outcome) {
            if result.is_ok() {
                client.server.tree_mut().set_basic_value(*node, value)?;
            }
        }
        Ok(outcome)
    }

    async fn write_rcb_attribute(&mut self, rcb: &str, attribute: &'static str, value: Value) -> Iec61850Result<()> {
        let mut results = self.write_rcb_attributes(rcb, vec![(attribute, value)]).await?;
        match results.pop() {
            Some(result) => Ok(result?),
            None => Err(self.malformed("write")),
        }
    }

    /// Read all attributes of a report control block
    pub async fn get_rcb_values(&mut self, rcb: &str) -> Iec61850Result<NodeCopy> {
        let fc = {
            let client = self.shared.model.lock();
            client
                .server
                .rcb_by_reference(rcb)
                .map(|descriptor| descriptor.kind().fc())
                .ok_or_else(|| not_in_model(rcb))?
        };
        self.read_node(&ObjectReference::new(rcb)?, fc).await
    }

    /// Reserve an unbuffered report control block
    pub async fn reserve_urcb(&mut self, rcb: &str) -> Iec61850Result<()> {
        self.write_rcb_attribute(rcb, RESV, Value::Boolean(true)).await
    }

    /// Reserve a buffered report control block
    ///
    /// # Arguments
    ///
    /// * `resv_tms` - reservation time in seconds, -1 for a reservation by
    ///   configuration
    pub async fn reserve_brcb(&mut self, rcb: &str, resv_tms: i16) -> Iec61850Result<()> {
        self.write_rcb_attribute(rcb, RESV_TMS, Value::Integer(i64::from(resv_tms)))
            .await
    }

    pub async fn cancel_urcb_reservation(&mut self, rcb: &str) -> Iec61850Result<()> {
        self.write_rcb_attribute(rcb, RESV, Value::Boolean(false)).await
    }

    pub async fn enable_reporting(&mut self, rcb: &str) -> Iec61850Result<()> {
        self.write_rcb_attribute(rcb, RPT_ENA, Value::Boolean(true)).await
    }

    pub async fn disable_reporting(&mut self, rcb: &str) -> Iec61850Result<()> {
        self.write_rcb_attribute(rcb, RPT_ENA, Value::Boolean(false)).await
    }

    /// Request a general interrogation from an enabled report control block
    pub async fn start_gi(&mut self, rcb: &str) -> Iec61850Result<()> {
        self.write_rcb_attribute(rcb, GI, Value::Boolean(true)).await
    }

    /// Change selected parameters of a report control block in one request
    ///
    /// # Returns
    ///
    /// One result per parameter given, in the order RptID, DatSet, OptFlds,
    /// BufTm, TrgOps, IntgPd, PurgeBuf
    pub async fn set_rcb_values(&mut self, rcb: &str, update: &RcbUpdate) -> Iec61850Result<MemberResults> {
        let attributes = update.attributes();
        if attributes.is_empty() {
            return Ok(Vec::new());
        }
        self.write_rcb_attributes(rcb, attributes).await
    }

    /// Select a control object with select-before-operate by reading `SBO`
    ///
    /// # Returns
    ///
    /// Whether the server granted the selection
    pub async fn select(&mut self, control: &str) -> Iec61850Result<bool> {
        let reference = ObjectReference::new(control)?.child(SBO);
        let copy = self.read_node(&reference, Fc::CO).await?;
        Ok(copy
            .leaf_value()
            .and_then(Value::as_str)
            .is_some_and(|selected| !selected.is_empty()))
    }

    /// Operate a control object by writing `Oper` with the given control
    /// value, `ctlNum` 1 and `T` set to now
    pub async fn operate(&mut self, control: &str, ctl_val: &Value) -> Iec61850Result<()> {
        let reference = ObjectReference::new(control)?.child(OPER);
        let (mut copy, def) = self.addressed_copy(&reference, Fc::CO)?;
        copy.find_mut(CTL_VAL)
            .ok_or_else(|| not_in_model(&format!("{}.{}", reference, CTL_VAL)))?
            .set_from_value(ctl_val)?;
        if let Some(ctl_num) = copy.find_mut(CTL_NUM) {
            ctl_num.set_from_value(&Value::Unsigned(1))?;
        }
        if let Some(time) = copy.find_mut(T) {
            time.set_from_value(&Value::UtcTime(*Timestamp::now().as_bytes()))?;
        }

        let results = self
            .write(VariableAccessSpecification::ListOfVariable(vec![def]), vec![copy.to_value()], 1)
            .await?;
        for result in results {
            write_result(result)?;
        }
        self.commit(&copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::tests::connect;
    use iec61850_codec::{
        GetNameListResponse, GetVariableAccessAttributesResponse, NamedVariableListAttributes, ReadResponse,
    };
    use iec61850_core::{DataAccessError, ErrorCode, StructureComponent};
    use iec61850_model::TriggerFlags;
    use iec61850_model::BdaType;

    fn names(identifiers: &[&str], more_follows: bool) -> ConfirmedResponse {
        ConfirmedResponse::GetNameList(GetNameListResponse {
            identifiers: identifiers.iter().map(|s| s.to_string()).collect(),
            more_follows,
        })
    }

    fn component(name: &str, type_description: TypeDescription) -> StructureComponent {
        StructureComponent::new(name, type_description)
    }

    /// `GGIO1` with `ST.Ind1.stVal`
    fn ggio_definition() -> TypeDescription {
        let ind = TypeDescription::Structure(vec![component("stVal", TypeDescription::Boolean)]);
        let st = TypeDescription::Structure(vec![component("Ind1", ind)]);
        TypeDescription::Structure(vec![component("ST", st)])
    }

    fn control_model() -> ServerModel {
        let mut tree = ModelTree::new();
        let ld = tree.add_logical_device("LD0").unwrap();
        let ln = tree.add_logical_node(ld, "CSWI1").unwrap();
        let pos = tree.add_data_object(ln, "Pos", Fc::CO).unwrap();
        tree.add_basic(pos, SBO, BdaType::VisibleString(129), TriggerFlags::NONE)
            .unwrap();
        let oper = tree.add_constructed(pos, OPER).unwrap();
        tree.add_basic(oper, CTL_VAL, BdaType::Boolean, TriggerFlags::NONE)
            .unwrap();
        tree.add_basic(oper, CTL_NUM, BdaType::Int8U, TriggerFlags::NONE)
            .unwrap();
        tree.add_basic(oper, T, BdaType::Timestamp, TriggerFlags::NONE)
            .unwrap();
        ServerModel::new(tree)
    }

    #[tokio::test]
    async fn test_retrieve_model_follows_continuation() {
        let (mut association, mut peer) = connect(None).await;
        let server = tokio::spawn(async move {
            peer.respond(names(&["LD0"], false)).await;
            let first = peer.respond(names(&["GGIO1", "GGIO1$ST"], true)).await;
            let ConfirmedRequest::GetNameList(first) = first else {
                panic!("expected GetNameList");
            };
            assert_eq!(first.continue_after, None);
            let second = peer.respond(names(&["GGIO1$ST$Ind1"], false)).await;
            let ConfirmedRequest::GetNameList(second) = second else {
                panic!("expected GetNameList");
            };
            assert_eq!(second.continue_after.as_deref(), Some("GGIO1$ST"));

            let definition = ConfirmedResponse::GetVariableAccessAttributes(GetVariableAccessAttributesResponse {
                mms_deletable: false,
                type_description: ggio_definition(),
            });
            peer.respond(definition).await;
            peer.respond(names(&["GGIO1$events"], false)).await;
            let attributes = ConfirmedResponse::GetNamedVariableListAttributes(NamedVariableListAttributes {
                mms_deletable: false,
                variables: vec![VariableDef::new(ObjectName::domain_specific("LD0", "GGIO1$ST$Ind1"))],
            });
            peer.respond(attributes).await;
            peer
        });

        let model = association.retrieve_model().await.unwrap();
        let ind1 = model
            .find_model_node(&ObjectReference::new("LD0/GGIO1.Ind1").unwrap(), Some(Fc::ST))
            .unwrap();
        let data_set = model.data_set("LD0/GGIO1.events").unwrap();
        assert_eq!(data_set.members(), &[ind1]);
        assert!(!data_set.is_deletable());
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_data_set_values_report_member_failures() {
        let (mut association, mut peer) = connect(None).await;
        let mut model = ServerModel::new(ModelTree::new());
        let ld = model.tree_mut().add_logical_device("LD0").unwrap();
        ln_from_type_description(&mut model, ld, "GGIO1", &ggio_definition()).unwrap();
        let ind1 = model
            .find_model_node(&ObjectReference::new("LD0/GGIO1.Ind1").unwrap(), Some(Fc::ST))
            .unwrap();
        model
            .add_data_set(DataSet::new("LD0/GGIO1.events", vec![ind1], false).unwrap())
            .unwrap();
        association.set_model(model);

        let server = tokio::spawn(async move {
            let response = ConfirmedResponse::Read(ReadResponse {
                variable_access_specification: None,
                results: vec![AccessResult::Success(Value::Structure(vec![Value::Boolean(true)]))],
            });
            let request = peer.respond(response).await;
            let ConfirmedRequest::Read(request) = request else {
                panic!("expected read");
            };
            assert_eq!(
                request.variable_access_specification,
                VariableAccessSpecification::VariableListName(ObjectName::domain_specific("LD0", "GGIO1$events"))
            );
            let response = ConfirmedResponse::Write(vec![WriteResult::Failure(DataAccessError::ObjectAccessDenied)]);
            peer.respond(response).await;
            peer
        });

        let results = association.get_data_set_values("LD0/GGIO1.events").await.unwrap();
        assert_eq!(results, vec![Ok(())]);
        let value = association.model().tree().value(ind1).unwrap();
        assert_eq!(value, Value::Structure(vec![Value::Boolean(true)]));

        let values = [Value::Structure(vec![Value::Boolean(false)])];
        let results = association.set_data_set_values("LD0/GGIO1.events", &values).await.unwrap();
        assert_eq!(results[0].as_ref().unwrap_err().code(), ErrorCode::AccessViolation);
        // refused values are not committed
        let value = association.model().tree().value(ind1).unwrap();
        assert_eq!(value, Value::Structure(vec![Value::Boolean(true)]));
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_operate_writes_oper_with_control_number() {
        let (mut association, mut peer) = connect(None).await;
        association.set_model(control_model());
        let server = tokio::spawn(async move {
            let request = peer.respond(ConfirmedResponse::Write(vec![WriteResult::Success])).await;
            let ConfirmedRequest::Write(request) = request else {
                panic!("expected write");
            };
            let VariableAccessSpecification::ListOfVariable(defs) = &request.variable_access_specification else {
                panic!("expected a variable list");
            };
            assert_eq!(defs[0].name, ObjectName::domain_specific("LD0", "CSWI1$CO$Pos$Oper"));
            let Value::Structure(fields) = &request.data[0] else {
                panic!("expected a structure");
            };
            assert_eq!(fields[0], Value::Boolean(true));
            assert_eq!(fields[1], Value::Unsigned(1));
            assert!(matches!(fields[2], Value::UtcTime(_)));
            peer
        });
        association
            .operate("LD0/CSWI1.Pos", &Value::Boolean(true))
            .await
            .unwrap();
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_select_reads_sbo() {
        let (mut association, mut peer) = connect(None).await;
        association.set_model(control_model());
        let server = tokio::spawn(async move {
            for selected in ["LD0/CSWI1.Pos", ""] {
                let response = ConfirmedResponse::Read(ReadResponse {
                    variable_access_specification: None,
                    results: vec![AccessResult::Success(Value::VisibleString(selected.to_string()))],
                });
                peer.respond(response).await;
            }
            peer
        });
        assert!(association.select("LD0/CSWI1.Pos").await.unwrap());
        assert!(!association.select("LD0/CSWI1.Pos").await.unwrap());
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_node_fails_locally() {
        let (mut association, _peer) = connect(None).await;
        let error = association
            .get_data_values("LD0/GGIO1.Ind1", Fc::ST)
            .await
            .unwrap_err();
        assert_eq!(
            error.service_error().map(|e| e.code()),
            Some(ErrorCode::InstanceNotAvailable)
        );
        assert!(association.is_open());
    }

    #[test]
    fn test_rcb_update_order_and_encoding() {
        let update = RcbUpdate {
            dat_set: Some("LD0/LLN0.Events".to_string()),
            intg_pd: Some(1000),
            rpt_id: Some("events".to_string()),
            ..Default::default()
        };
        let attributes = update.attributes();
        let names: Vec<_> = attributes.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec![RPT_ID, DAT_SET, INTG_PD]);
        assert_eq!(attributes[1].1, Value::VisibleString("LD0/LLN0$Events".to_string()));
    }
}
