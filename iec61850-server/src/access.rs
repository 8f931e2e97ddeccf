//! Read and write services
//!
//! Writes are processed in three steps under the model lock: every variable
//! is decoded into a detached copy, the host application gets one batch of
//! all proposed leaf values, and the accepted copies are committed and
//! reported. Control and report control block attributes follow their own
//! access rules.

use crate::association::ServerAssociation;
use crate::control::{
    CANCEL, CTL_VAL, ControlModel, OPER, SBO, control_model, control_object, control_service,
    sbo_timeout, unsupported_control,
};
use crate::event::WriteValue;
use crate::scheduler::TimerKind;
use iec61850_codec::{
    AccessResult, ConfirmedResponse, ReadRequest, ReadResponse, VariableAccessSpecification,
    WriteRequest, WriteResult,
};
use iec61850_core::{DataAccessError, Fc, OptFlds, ServiceError, Value, VariableDef};
use iec61850_model::rcb::{
    BUF_TM, DAT_SET, GI, INTG_PD, OPT_FLDS, PURGE_BUF, RESV, RESV_TMS, RPT_ENA, RPT_ID, TRG_OPS,
};
use iec61850_model::{NodeCopy, NodeId, ServerModel};
use std::sync::Arc;

/// Value returned by a successful select
pub const SELECT_SUCCESS: &str = "success";

/// One variable of a write request after decoding
enum PreparedWrite {
    /// Finished without touching the tree through a copy
    Done(Result<(), ServiceError>),
    /// Decoded copy waiting for the host application
    Copy {
        copy: NodeCopy,
        /// Only leaves named `ctlVal` go to the host application
        operate: bool,
    },
}

impl ServerAssociation {
    pub(crate) fn read(&self, request: ReadRequest) -> Result<ConfirmedResponse, ServiceError> {
        let results = {
            let model = self.shared.model.lock();
            match &request.variable_access_specification {
                VariableAccessSpecification::ListOfVariable(defs) => defs
                    .iter()
                    .map(|def| self.read_variable(&model, def))
                    .collect(),
                VariableAccessSpecification::VariableListName(name) => {
                    let data_set = self.resolve_data_set(&model, name)?;
                    data_set
                        .members()
                        .iter()
                        .map(|member| match model.tree().value(*member) {
                            Ok(value) => AccessResult::Success(value),
                            Err(_) => AccessResult::Failure(DataAccessError::ObjectValueInvalid),
                        })
                        .collect()
                }
            }
        };
        Ok(ConfirmedResponse::Read(ReadResponse {
            variable_access_specification: request
                .specification_with_result
                .then_some(request.variable_access_specification),
            results,
        }))
    }

    fn read_variable(&self, model: &ServerModel, def: &VariableDef) -> AccessResult {
        let Some(node) = model.node_from_variable_def(def) else {
            return AccessResult::Failure(DataAccessError::ObjectNonExistent);
        };
        let tree = model.tree();
        if tree.node(node).fc() == Some(Fc::CO) && tree.node(node).name() == SBO {
            return match self.select(model, node) {
                Ok(value) => AccessResult::Success(value),
                Err(e) => AccessResult::Failure(e.to_data_access_error()),
            };
        }
        match tree.value(node) {
            Ok(value) => AccessResult::Success(value),
            Err(_) => AccessResult::Failure(DataAccessError::ObjectValueInvalid),
        }
    }

    /// Select the control object of an `SBO` attribute
    ///
    /// # Returns
    ///
    /// `"success"` when the caller holds the selection, `""` when another
    /// association does
    ///
    /// # Errors
    ///
    /// Returns `AccessViolation` unless the object uses select-before-operate
    fn select(&self, model: &ServerModel, node: NodeId) -> Result<Value, ServiceError> {
        let tree = model.tree();
        let control = control_object(tree, node).ok_or_else(|| unsupported_control(tree, node))?;
        if control_model(tree, control)? != Some(ControlModel::SboNormal) {
            return Err(ServiceError::access_violation(format!(
                "{} is not a select-before-operate control",
                tree.node(control).reference()
            )));
        }

        let id = self.context.id();
        if !self.shared.selections.select(control, id) {
            log::debug!("{}: {} is selected by another association", id, tree.node(control).reference());
            return Ok(Value::VisibleString(String::new()));
        }
        let scheduler = self.context.scheduler();
        match sbo_timeout(tree, control) {
            Some(timeout) => {
                let shared = Arc::downgrade(&self.shared);
                scheduler.schedule(control, TimerKind::SboTimeout, timeout, async move {
                    if let Some(shared) = shared.upgrade() {
                        if shared.selections.deselect(control, id) {
                            log::debug!("{}: selection of {} timed out", id, control);
                        }
                    }
                });
            }
            None => scheduler.cancel(control, TimerKind::SboTimeout),
        }
        log::debug!("{}: selected {}", id, tree.node(control).reference());
        Ok(Value::VisibleString(SELECT_SUCCESS.to_string()))
    }

    pub(crate) fn write(&self, request: WriteRequest) -> Result<ConfirmedResponse, ServiceError> {
        let mut model = self.shared.model.lock();

        let targets: Vec<Option<NodeId>> = match &request.variable_access_specification {
            VariableAccessSpecification::ListOfVariable(defs) => defs
                .iter()
                .map(|def| model.node_from_variable_def(def))
                .collect(),
            VariableAccessSpecification::VariableListName(name) => self
                .resolve_data_set(&model, name)?
                .members()
                .iter()
                .map(|member| Some(*member))
                .collect(),
        };
        if targets.len() != request.data.len() {
            return Err(ServiceError::parameter_value_inconsistent(format!(
                "{} variables but {} values",
                targets.len(),
                request.data.len()
            )));
        }

        let prepared: Vec<PreparedWrite> = targets
            .iter()
            .zip(&request.data)
            .map(|(target, value)| match target {
                Some(node) => self.prepare_write(&mut model, *node, value),
                None => PreparedWrite::Done(Err(ServiceError::instance_not_available(
                    "unknown variable",
                ))),
            })
            .collect();

        // one batch for the host application
        let mut batch = Vec::new();
        let mut ranges = Vec::with_capacity(prepared.len());
        for write in &prepared {
            let start = batch.len();
            if let PreparedWrite::Copy { copy, operate } = write {
                for leaf in copy.leaves() {
                    let node = model.tree().node(leaf.mirror());
                    if *operate && node.name() != CTL_VAL {
                        continue;
                    }
                    batch.push(WriteValue {
                        node: leaf.mirror(),
                        reference: node.reference().clone(),
                        fc: node.fc().unwrap_or(Fc::CO),
                        value: leaf.value().clone(),
                    });
                }
            }
            ranges.push(start..batch.len());
        }
        let verdicts = if batch.is_empty() {
            Vec::new()
        } else {
            self.shared.host_write(&batch)
        };

        let mut updates = Vec::new();
        let mut results = Vec::with_capacity(prepared.len());
        for (write, range) in prepared.into_iter().zip(ranges) {
            let result = match write {
                PreparedWrite::Done(result) => result,
                PreparedWrite::Copy { copy, .. } => {
                    match verdicts[range].iter().find_map(|v| v.as_ref().err()) {
                        Some(e) => Err(e.clone()),
                        None => model.tree_mut().commit(&copy).map(|committed| {
                            updates.extend(committed);
                        }),
                    }
                }
            };
            results.push(match result {
                Ok(()) => WriteResult::Success,
                Err(e) => {
                    log::debug!("{}: write rejected: {}", self.context.id(), e);
                    WriteResult::Failure(e.to_data_access_error())
                }
            });
        }
        self.shared.notify(&model, &updates);
        Ok(ConfirmedResponse::Write(results))
    }

    fn prepare_write(&self, model: &mut ServerModel, node: NodeId, value: &Value) -> PreparedWrite {
        let fc = model.tree().node(node).fc();
        match fc {
            None => PreparedWrite::Done(Err(ServiceError::access_violation(format!(
                "{} cannot be written",
                model.tree().node(node).reference()
            )))),
            Some(fc) if fc.is_read_only() => PreparedWrite::Done(Err(ServiceError::access_violation(
                format!("{} [{}] is read only", model.tree().node(node).reference(), fc),
            ))),
            Some(Fc::RP) | Some(Fc::BR) => PreparedWrite::Done(self.write_rcb(model, node, value)),
            Some(Fc::CO) => self.prepare_control(model, node, value),
            Some(_) => {
                let mut copy = model.tree().copy(node);
                match copy.set_from_value(value) {
                    Ok(()) => PreparedWrite::Copy {
                        copy,
                        operate: false,
                    },
                    Err(e) => PreparedWrite::Done(Err(e)),
                }
            }
        }
    }

    fn prepare_control(&self, model: &ServerModel, node: NodeId, value: &Value) -> PreparedWrite {
        let tree = model.tree();
        let Some(control) = control_object(tree, node) else {
            return PreparedWrite::Done(Err(unsupported_control(tree, node)));
        };
        let service = control_service(tree, control, node);
        let id = self.context.id();

        match service.as_deref() {
            Some(OPER) if tree.node(node).name() == OPER => {}
            Some(CANCEL) if tree.node(node).name() == CANCEL => {
                if self.shared.selections.deselect(control, id) {
                    self.context.scheduler().cancel(control, TimerKind::SboTimeout);
                    log::debug!("{}: cancelled {}", id, tree.node(control).reference());
                }
                return PreparedWrite::Done(Ok(()));
            }
            _ => return PreparedWrite::Done(Err(unsupported_control(tree, node))),
        }

        let permitted = match control_model(tree, control) {
            Ok(Some(ControlModel::DirectNormal)) => Ok(()),
            Ok(Some(ControlModel::SboNormal)) => {
                if self.shared.selections.is_selected_by(control, id) {
                    Ok(())
                } else {
                    Err(ServiceError::access_violation(format!(
                        "{} is not selected",
                        tree.node(control).reference()
                    )))
                }
            }
            Ok(_) => Err(unsupported_control(tree, node)),
            Err(e) => Err(e),
        };
        if let Err(e) = permitted {
            return PreparedWrite::Done(Err(e));
        }

        let mut copy = tree.copy(node);
        match copy.set_from_value(value) {
            Ok(()) => PreparedWrite::Copy {
                copy,
                operate: true,
            },
            Err(e) => PreparedWrite::Done(Err(e)),
        }
    }

    /// Write one attribute of a report control block
    fn write_rcb(&self, model: &mut ServerModel, node: NodeId, value: &Value) -> Result<(), ServiceError> {
        let rcb = model.rcb_containing(node).ok_or_else(|| {
            ServiceError::access_violation(format!(
                "{} is not part of a report control block",
                model.tree().node(node).reference()
            ))
        })?;
        let tree = model.tree();
        if rcb == node || tree.node(node).parent() != Some(rcb) {
            return Err(ServiceError::access_violation(format!(
                "{} cannot be written as a whole",
                tree.node(node).reference()
            )));
        }
        let bda_type = tree
            .node(node)
            .basic()
            .map(|bda| bda.bda_type())
            .ok_or_else(|| ServiceError::access_violation("not a report control attribute"))?;
        let value = bda_type.validate(value)?;
        let name = tree.node(node).name().to_string();

        let id = self.context.id();
        let descriptor = model
            .rcb(rcb)
            .ok_or_else(|| ServiceError::instance_not_available("report control block vanished"))?;
        let enabled = descriptor.is_enabled(tree);
        let accessible = descriptor.is_accessible_by(id);
        let buffered = descriptor.is_buffered();
        let reserved = descriptor.reserved_by() == Some(id);
        let gi_triggered = descriptor.trg_ops(tree).is_general_interrogation();
        let reference = tree.node(node).reference().to_string();
        let denied = |reason: &str| ServiceError::access_violation(format!("{}: {}", reference, reason));

        match name.as_str() {
            RPT_ENA => {
                if !accessible {
                    return Err(denied("reserved by another association"));
                }
                match (value.as_bool().unwrap_or(false), enabled) {
                    (true, false) => {
                        self.shared.enable_reporting(model, rcb, &self.context)?;
                        self.reserve(model, rcb)?;
                    }
                    (false, true) => self.shared.disable_reporting(model, rcb)?,
                    _ => {}
                }
                Ok(())
            }
            RESV if !buffered => {
                if !accessible {
                    return Err(denied("reserved by another association"));
                }
                if value.as_bool().unwrap_or(false) {
                    self.reserve(model, rcb)
                } else if enabled {
                    Err(denied("cannot release an enabled report control block"))
                } else {
                    self.release_rcb(model, rcb, &value)
                }
            }
            RESV_TMS if buffered => {
                if !accessible {
                    return Err(denied("reserved by another association"));
                }
                if value.as_i64().unwrap_or(0) > 0 {
                    self.reserve(model, rcb)?;
                    set_attribute(model, rcb, RESV_TMS, &value)
                } else if enabled {
                    Err(denied("cannot release an enabled report control block"))
                } else {
                    self.release_rcb(model, rcb, &value)
                }
            }
            DAT_SET => {
                if !accessible || enabled {
                    return Err(denied("not reserved by the caller or enabled"));
                }
                let reference = value.as_str().unwrap_or_default().replace('$', ".");
                let data_set = if reference.is_empty() {
                    None
                } else {
                    let found = model
                        .data_set(&reference)
                        .or_else(|| self.non_persistent_data_set(&reference))
                        .cloned();
                    Some(found.ok_or_else(|| denied("unknown data set"))?)
                };
                set_attribute(model, rcb, DAT_SET, &value)?;
                if let Some(descriptor) = model.rcb_mut(rcb) {
                    descriptor.set_data_set(data_set);
                }
                Ok(())
            }
            OPT_FLDS => {
                if !accessible || enabled {
                    return Err(denied("not reserved by the caller or enabled"));
                }
                if !buffered {
                    let requested = value
                        .as_bit_string()
                        .map(|bits| OptFlds::from_bit_string(bits.clone()))
                        .unwrap_or_default();
                    if requested.is_buffer_overflow()
                        || requested.is_configuration_revision()
                        || requested.is_data_reference()
                        || requested.is_entry_id()
                    {
                        return Err(ServiceError::parameter_value_inappropriate(
                            "option not supported by unbuffered reporting",
                        ));
                    }
                }
                set_attribute(model, rcb, OPT_FLDS, &value)
            }
            GI => {
                if !value.as_bool().unwrap_or(false) {
                    return Ok(());
                }
                if !(reserved && enabled && gi_triggered) {
                    return Err(denied("general interrogation not permitted"));
                }
                self.shared.start_gi(rcb);
                Ok(())
            }
            RPT_ID | BUF_TM | TRG_OPS | INTG_PD => {
                if !accessible || enabled {
                    return Err(denied("not reserved by the caller or enabled"));
                }
                set_attribute(model, rcb, &name, &value)
            }
            PURGE_BUF if buffered => {
                if enabled {
                    return Err(denied("cannot purge an enabled report control block"));
                }
                Ok(())
            }
            _ => Err(denied("read only")),
        }
    }

    fn reserve(&self, model: &mut ServerModel, rcb: NodeId) -> Result<(), ServiceError> {
        let (tree, descriptor) = model
            .tree_and_rcb_mut(rcb)
            .ok_or_else(|| ServiceError::instance_not_available("report control block vanished"))?;
        descriptor.reserve(self.context.id());
        if !descriptor.is_buffered() {
            descriptor.set(tree, RESV, &Value::Boolean(true))?;
        }
        Ok(())
    }

    fn release_rcb(&self, model: &mut ServerModel, rcb: NodeId, value: &Value) -> Result<(), ServiceError> {
        let (tree, descriptor) = model
            .tree_and_rcb_mut(rcb)
            .ok_or_else(|| ServiceError::instance_not_available("report control block vanished"))?;
        descriptor.release();
        let attribute = if descriptor.is_buffered() { RESV_TMS } else { RESV };
        descriptor.set(tree, attribute, value)?;
        Ok(())
    }
}

fn set_attribute(model: &mut ServerModel, rcb: NodeId, name: &str, value: &Value) -> Result<(), ServiceError> {
    let (tree, descriptor) = model
        .tree_and_rcb_mut(rcb)
        .ok_or_else(|| ServiceError::instance_not_available("report control block vanished"))?;
    descriptor.set(tree, name, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::context::AssociationContext;
    use crate::control::tests::control_tree;
    use crate::event::MockServerEventListener;
    use crate::report::tests::report_model;
    use crate::server::ServerShared;
    use iec61850_core::{ErrorCode, ObjectName, OptFlds};
    use iec61850_model::AssociationId;
    use std::time::Duration;

    fn shared(model: ServerModel) -> Arc<ServerShared> {
        Arc::new(ServerShared::new(model, ServerConfig::default()))
    }

    fn association(shared: &Arc<ServerShared>, id: u64) -> ServerAssociation {
        let (context, _) = AssociationContext::new(AssociationId(id), tokio::runtime::Handle::current());
        ServerAssociation::new(shared.clone(), context)
    }

    fn variable(item: &str) -> VariableAccessSpecification {
        VariableAccessSpecification::ListOfVariable(vec![VariableDef::new(
            ObjectName::domain_specific("LD0", item),
        )])
    }

    fn write(association: &ServerAssociation, item: &str, value: Value) -> WriteResult {
        let request = WriteRequest {
            variable_access_specification: variable(item),
            data: vec![value],
        };
        match association.write(request).unwrap() {
            ConfirmedResponse::Write(mut results) => results.remove(0),
            other => panic!("unexpected response {:?}", other),
        }
    }

    fn read(association: &ServerAssociation, item: &str) -> AccessResult {
        let request = ReadRequest {
            specification_with_result: false,
            variable_access_specification: variable(item),
        };
        match association.read(request).unwrap() {
            ConfirmedResponse::Read(mut response) => response.results.remove(0),
            other => panic!("unexpected response {:?}", other),
        }
    }

    fn oper(ctl_val: bool) -> Value {
        Value::Structure(vec![
            Value::Boolean(ctl_val),
            Value::Unsigned(1),
            Value::UtcTime([0; 8]),
            Value::Boolean(false),
        ])
    }

    const DENIED: WriteResult = WriteResult::Failure(DataAccessError::ObjectAccessDenied);

    #[tokio::test]
    async fn test_direct_operate_offers_ctl_val_only() {
        let shared = shared(ServerModel::new(control_tree(1, 0)));
        let mut listener = MockServerEventListener::new();
        listener
            .expect_write()
            .withf(|values| {
                values.len() == 1
                    && values[0].reference.as_str() == "LD0/CSWI1.Pos.Oper.ctlVal"
                    && values[0].value == Value::Boolean(true)
            })
            .times(1)
            .returning(|values| values.iter().map(|_| Ok(())).collect());
        shared.set_listener(Arc::new(listener));

        let client = association(&shared, 1);
        assert_eq!(write(&client, "CSWI1$CO$Pos$Oper", oper(true)), WriteResult::Success);
    }

    #[tokio::test]
    async fn test_sbo_operate_requires_selection() {
        let shared = shared(ServerModel::new(control_tree(2, 0)));
        let a = association(&shared, 1);
        let b = association(&shared, 2);

        assert_eq!(write(&a, "CSWI1$CO$Pos$Oper", oper(true)), DENIED);
        assert_eq!(
            read(&a, "CSWI1$CO$Pos$SBO"),
            AccessResult::Success(Value::VisibleString(SELECT_SUCCESS.to_string()))
        );
        assert_eq!(
            read(&b, "CSWI1$CO$Pos$SBO"),
            AccessResult::Success(Value::VisibleString(String::new()))
        );
        assert_eq!(write(&b, "CSWI1$CO$Pos$Oper", oper(true)), DENIED);
        assert_eq!(write(&a, "CSWI1$CO$Pos$Oper", oper(true)), WriteResult::Success);

        assert_eq!(write(&a, "CSWI1$CO$Pos$Cancel", oper(true)), WriteResult::Success);
        assert_eq!(write(&a, "CSWI1$CO$Pos$Oper", oper(false)), DENIED);
    }

    #[tokio::test]
    async fn test_select_refused_for_direct_control() {
        let shared = shared(ServerModel::new(control_tree(1, 0)));
        let client = association(&shared, 1);
        assert_eq!(
            read(&client, "CSWI1$CO$Pos$SBO"),
            AccessResult::Failure(DataAccessError::ObjectAccessDenied)
        );
    }

    #[tokio::test]
    async fn test_unsupported_control_model() {
        let shared = shared(ServerModel::new(control_tree(0, 0)));
        let client = association(&shared, 1);
        assert_eq!(
            write(&client, "CSWI1$CO$Pos$Oper", oper(true)),
            WriteResult::Failure(DataAccessError::ObjectAccessUnsupported)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_expires_after_sbo_timeout() {
        let shared = shared(ServerModel::new(control_tree(2, 100)));
        let a = association(&shared, 1);
        let b = association(&shared, 2);
        read(&a, "CSWI1$CO$Pos$SBO");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            read(&b, "CSWI1$CO$Pos$SBO"),
            AccessResult::Success(Value::VisibleString(String::new()))
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(write(&a, "CSWI1$CO$Pos$Oper", oper(true)), DENIED);
        assert_eq!(
            read(&b, "CSWI1$CO$Pos$SBO"),
            AccessResult::Success(Value::VisibleString(SELECT_SUCCESS.to_string()))
        );
    }

    #[tokio::test]
    async fn test_host_rejection_leaves_model_unchanged() {
        let shared = shared(ServerModel::new(control_tree(2, 0)));
        let mut listener = MockServerEventListener::new();
        listener
            .expect_write()
            .returning(|values| {
                values
                    .iter()
                    .map(|_| Err(ServiceError::access_violation("locked by host")))
                    .collect()
            });
        shared.set_listener(Arc::new(listener));

        let client = association(&shared, 1);
        assert_eq!(write(&client, "CSWI1$CF$Pos$sboTimeout", Value::Unsigned(500)), DENIED);
        assert_eq!(
            read(&client, "CSWI1$CF$Pos$sboTimeout"),
            AccessResult::Success(Value::Unsigned(0))
        );
    }

    #[tokio::test]
    async fn test_write_rules() {
        let (model, _, _) = report_model(OptFlds::new(), 0);
        let shared = shared(model);
        let client = association(&shared, 1);

        assert_eq!(write(&client, "GGIO1$ST$Ind1$stVal", Value::Boolean(true)), DENIED);
        assert_eq!(
            write(&client, "GGIO1$ST$Ind9", Value::Boolean(true)),
            WriteResult::Failure(DataAccessError::ObjectNonExistent)
        );

        let request = WriteRequest {
            variable_access_specification: variable("GGIO1$RP$urcb01$RptID"),
            data: Vec::new(),
        };
        assert_eq!(
            client.write(request).unwrap_err().code(),
            ErrorCode::ParameterValueInconsistent
        );
    }

    #[tokio::test]
    async fn test_urcb_reservation_is_exclusive() {
        let (model, urcb, _) = report_model(OptFlds::new(), 0);
        let shared = shared(model);
        let a = association(&shared, 1);
        let b = association(&shared, 2);

        assert_eq!(write(&a, "GGIO1$RP$urcb01$RptEna", Value::Boolean(true)), WriteResult::Success);
        assert!(shared.reports.is_enabled(urcb));
        assert_eq!(write(&b, "GGIO1$RP$urcb01$Resv", Value::Boolean(true)), DENIED);
        assert_eq!(write(&b, "GGIO1$RP$urcb01$RptEna", Value::Boolean(false)), DENIED);
        assert_eq!(
            write(&a, "GGIO1$RP$urcb01$RptID", Value::VisibleString("x".to_string())),
            DENIED
        );
        assert_eq!(write(&a, "GGIO1$RP$urcb01$Resv", Value::Boolean(false)), DENIED);

        assert_eq!(write(&a, "GGIO1$RP$urcb01$RptEna", Value::Boolean(false)), WriteResult::Success);
        assert_eq!(write(&a, "GGIO1$RP$urcb01$Resv", Value::Boolean(false)), WriteResult::Success);
        assert_eq!(write(&b, "GGIO1$RP$urcb01$Resv", Value::Boolean(true)), WriteResult::Success);
        assert_eq!(
            shared.model.lock().rcb(urcb).unwrap().reserved_by(),
            Some(AssociationId(2))
        );
    }

    #[tokio::test]
    async fn test_unbuffered_opt_flds_rejects_buffered_options() {
        let (model, _, _) = report_model(OptFlds::new(), 0);
        let shared = shared(model);
        let client = association(&shared, 1);

        let mut opt_flds = OptFlds::new();
        opt_flds.set_entry_id(true);
        assert_eq!(
            write(&client, "GGIO1$RP$urcb01$OptFlds", Value::BitString(opt_flds.into_bit_string())),
            WriteResult::Failure(DataAccessError::ObjectAccessUnsupported)
        );
        let mut opt_flds = OptFlds::new();
        opt_flds.set_sequence_number(true);
        assert_eq!(
            write(&client, "GGIO1$RP$urcb01$OptFlds", Value::BitString(opt_flds.into_bit_string())),
            WriteResult::Success
        );
    }

    #[tokio::test]
    async fn test_data_set_of_rcb() {
        let (model, urcb, _) = report_model(OptFlds::new(), 0);
        let shared = shared(model);
        let client = association(&shared, 1);

        assert_eq!(
            write(&client, "GGIO1$RP$urcb01$DatSet", Value::VisibleString("LD0/GGIO1$nope".to_string())),
            DENIED
        );
        assert_eq!(
            write(&client, "GGIO1$RP$urcb01$DatSet", Value::VisibleString(String::new())),
            WriteResult::Success
        );
        assert!(shared.model.lock().rcb(urcb).unwrap().data_set().is_none());
        assert_eq!(write(&client, "GGIO1$RP$urcb01$RptEna", Value::Boolean(true)), DENIED);
    }

    #[tokio::test]
    async fn test_gi_requires_enabled_rcb() {
        let (model, _, _) = report_model(OptFlds::new(), 0);
        let shared = shared(model);
        let client = association(&shared, 1);

        assert_eq!(write(&client, "GGIO1$BR$brcb01$GI", Value::Boolean(true)), DENIED);
        assert_eq!(
            write(&client, "GGIO1$BR$brcb01$ResvTms", Value::Integer(30)),
            WriteResult::Success
        );
        assert_eq!(write(&client, "GGIO1$BR$brcb01$RptEna", Value::Boolean(true)), WriteResult::Success);
        assert_eq!(write(&client, "GGIO1$BR$brcb01$GI", Value::Boolean(true)), WriteResult::Success);
        assert_eq!(write(&client, "GGIO1$BR$brcb01$EntryID", Value::OctetString(vec![0; 8])), DENIED);
    }
}
