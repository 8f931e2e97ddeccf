//! Report control block engine
//!
//! Enabling an RCB subscribes it to the leaves of its data set. Committed
//! leaf updates are matched against the subscriptions, merged into the
//! RCB's pending members and flushed as one report once the buffer time
//! expires. Integrity and general interrogation reports carry every member.

use crate::context::AssociationContext;
use crate::scheduler::TimerKind;
use crate::server::ServerShared;
use dashmap::DashMap;
use iec61850_codec::{AccessResult, InformationReport, MmsPdu, VariableAccessSpecification};
use iec61850_core::{
    BitString, EntryTime, ObjectName, ReasonForInclusion, ServiceError, TriggerConditions, Value,
};
use iec61850_model::rcb::{DAT_SET, ENTRY_ID, RPT_ENA, TIME_OF_ENTRY};
use iec61850_model::{LeafUpdate, ModelTree, NodeId, ServerModel};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Variable list name of information reports carrying RCB reports
pub const REPORT_LIST_NAME: &str = "RPT";

/// Integrity periods below this are ignored
pub const MIN_INTEGRITY_PERIOD_MS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Subscription {
    rcb: NodeId,
    dchg: bool,
    qchg: bool,
    /// Any write of the leaf triggers the RCB
    dupd: bool,
}

#[derive(Debug, Default)]
struct Pending {
    /// Data set member index to accumulated reasons
    members: BTreeMap<usize, ReasonForInclusion>,
    flush_scheduled: bool,
}

#[derive(Debug)]
struct RcbRuntime {
    owner: Arc<AssociationContext>,
    pending: Mutex<Pending>,
}

/// Subscriptions and pending changes of the enabled RCBs
#[derive(Debug, Default)]
pub struct ReportEngine {
    subscriptions: DashMap<NodeId, Vec<Subscription>>,
    runtimes: DashMap<NodeId, Arc<RcbRuntime>>,
}

impl ReportEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, rcb: NodeId) -> bool {
        self.runtimes.contains_key(&rcb)
    }

    fn runtime(&self, rcb: NodeId) -> Option<Arc<RcbRuntime>> {
        self.runtimes.get(&rcb).map(|runtime| runtime.clone())
    }

    fn subscribe(&self, tree: &ModelTree, rcb: NodeId, members: &[NodeId], trg_ops: &TriggerConditions) {
        for member in members {
            for leaf in tree.leaves(*member) {
                let Some(triggers) = tree.node(leaf).basic().map(|bda| bda.triggers()) else {
                    continue;
                };
                let subscription = Subscription {
                    rcb,
                    dchg: triggers.dchg && trg_ops.is_data_change(),
                    qchg: triggers.qchg && trg_ops.is_quality_change(),
                    dupd: triggers.dupd && trg_ops.is_data_update(),
                };
                if subscription.dchg || subscription.qchg || subscription.dupd {
                    self.subscriptions.entry(leaf).or_default().push(subscription);
                }
            }
        }
    }

    fn unsubscribe(&self, rcb: NodeId) {
        self.subscriptions.retain(|_, subscriptions| {
            subscriptions.retain(|s| s.rcb != rcb);
            !subscriptions.is_empty()
        });
    }
}

impl ServerShared {
    /// Enable an RCB on behalf of its owner.
    ///
    /// Sets `RptEna`, subscribes to the data set and starts the integrity
    /// timer when `TrgOps` asks for it and `IntgPd` is at least 10 ms.
    ///
    /// # Errors
    ///
    /// Returns `InstanceNotAvailable` for an unknown RCB and `AccessViolation`
    /// if no data set is configured
    pub(crate) fn enable_reporting(
        self: &Arc<Self>,
        model: &mut ServerModel,
        rcb: NodeId,
        owner: &Arc<AssociationContext>,
    ) -> Result<(), ServiceError> {
        let (tree, descriptor) = model.tree_and_rcb_mut(rcb).ok_or_else(|| {
            ServiceError::instance_not_available(format!("{} is not a report control block", rcb))
        })?;
        let data_set = descriptor.data_set().cloned().ok_or_else(|| {
            ServiceError::access_violation(format!(
                "{} has no data set",
                tree.node(rcb).reference()
            ))
        })?;
        descriptor.set(tree, RPT_ENA, &Value::Boolean(true))?;

        if self.reports.is_enabled(rcb) {
            return Ok(());
        }
        let trg_ops = descriptor.trg_ops(tree);
        self.reports.subscribe(tree, rcb, data_set.members(), &trg_ops);
        self.reports.runtimes.insert(
            rcb,
            Arc::new(RcbRuntime {
                owner: owner.clone(),
                pending: Mutex::new(Pending::default()),
            }),
        );

        let intg_pd = descriptor.intg_pd(tree);
        if trg_ops.is_integrity() && intg_pd >= MIN_INTEGRITY_PERIOD_MS {
            let shared = Arc::downgrade(self);
            owner.scheduler().schedule_periodic(
                rcb,
                TimerKind::Integrity,
                Duration::from_millis(intg_pd),
                move || {
                    let shared = shared.clone();
                    async move {
                        if let Some(shared) = shared.upgrade() {
                            shared.send_full_report(rcb, ReasonForInclusion::integrity());
                        }
                    }
                },
            );
        }
        log::debug!("{}: enabled {}", owner.id(), tree.node(rcb).reference());
        Ok(())
    }

    /// Disable an RCB: clear `RptEna`, drop its subscriptions and pending
    /// changes and cancel its timers
    pub(crate) fn disable_reporting(&self, model: &mut ServerModel, rcb: NodeId) -> Result<(), ServiceError> {
        let (tree, descriptor) = model.tree_and_rcb_mut(rcb).ok_or_else(|| {
            ServiceError::instance_not_available(format!("{} is not a report control block", rcb))
        })?;
        descriptor.set(tree, RPT_ENA, &Value::Boolean(false))?;
        self.reports.unsubscribe(rcb);
        if let Some((_, runtime)) = self.reports.runtimes.remove(&rcb) {
            runtime.owner.scheduler().cancel(rcb, TimerKind::Flush);
            runtime.owner.scheduler().cancel(rcb, TimerKind::Integrity);
            runtime.owner.scheduler().cancel(rcb, TimerKind::Gi);
            log::debug!("{}: disabled {}", runtime.owner.id(), tree.node(rcb).reference());
        }
        Ok(())
    }

    /// Schedule a general interrogation report of an enabled RCB
    pub(crate) fn start_gi(self: &Arc<Self>, rcb: NodeId) {
        let Some(runtime) = self.reports.runtime(rcb) else {
            return;
        };
        let shared = Arc::downgrade(self);
        runtime
            .owner
            .scheduler()
            .schedule(rcb, TimerKind::Gi, Duration::ZERO, async move {
                if let Some(shared) = shared.upgrade() {
                    shared.send_full_report(rcb, ReasonForInclusion::general_interrogation());
                }
            });
    }

    /// Match committed leaf updates against the subscriptions.
    ///
    /// Called with the model locked right after the commit.
    pub(crate) fn notify(self: &Arc<Self>, model: &ServerModel, updates: &[LeafUpdate]) {
        for update in updates {
            let Some(subscriptions) = self.reports.subscriptions.get(&update.node).map(|s| s.clone()) else {
                continue;
            };
            for subscription in subscriptions {
                let mut reason = ReasonForInclusion::new();
                if update.changed {
                    reason.set_data_change(subscription.dchg);
                    reason.set_quality_change(subscription.qchg);
                }
                reason.set_data_update(subscription.dupd);
                if reason.bit_string().count_ones() == 0 {
                    continue;
                }
                self.add_pending(model, subscription.rcb, update.node, &reason);
            }
        }
    }

    fn add_pending(self: &Arc<Self>, model: &ServerModel, rcb: NodeId, leaf: NodeId, reason: &ReasonForInclusion) {
        let (Some(runtime), Some(descriptor)) = (self.reports.runtime(rcb), model.rcb(rcb)) else {
            return;
        };
        let Some(member) = descriptor
            .data_set()
            .and_then(|ds| ds.containing_member(model.tree(), leaf))
        else {
            return;
        };

        let mut pending = runtime.pending.lock();
        pending
            .members
            .entry(member)
            .and_modify(|existing| existing.merge(reason))
            .or_insert_with(|| reason.clone());
        if pending.flush_scheduled {
            return;
        }

        let buf_tm = Duration::from_millis(descriptor.buf_tm(model.tree()));
        let shared: Weak<ServerShared> = Arc::downgrade(self);
        pending.flush_scheduled = runtime
            .owner
            .scheduler()
            .schedule(rcb, TimerKind::Flush, buf_tm, async move {
                if let Some(shared) = shared.upgrade() {
                    shared.flush(rcb);
                }
            });
    }

    /// Send the pending members of an RCB as one report
    fn flush(&self, rcb: NodeId) {
        let (owner, report) = {
            let mut model = self.model.lock();
            let Some(runtime) = self.reports.runtime(rcb) else {
                return;
            };
            let members = {
                let mut pending = runtime.pending.lock();
                pending.flush_scheduled = false;
                std::mem::take(&mut pending.members)
            };
            if members.is_empty() {
                return;
            }
            let included: Vec<_> = members.into_iter().collect();
            match build_report(&mut model, rcb, &included) {
                Ok(report) => (runtime.owner.clone(), report),
                Err(e) => {
                    log::warn!("report of {} dropped: {}", rcb, e);
                    return;
                }
            }
        };
        owner.queue(&MmsPdu::InformationReport(report));
    }

    /// Send every data set member of an enabled RCB
    fn send_full_report(&self, rcb: NodeId, reason: ReasonForInclusion) {
        let (owner, report) = {
            let mut model = self.model.lock();
            let Some(runtime) = self.reports.runtime(rcb) else {
                return;
            };
            let Some(len) = model.rcb(rcb).and_then(|d| d.data_set()).map(|ds| ds.len()) else {
                return;
            };
            let included: Vec<_> = (0..len).map(|i| (i, reason.clone())).collect();
            match build_report(&mut model, rcb, &included) {
                Ok(report) => (runtime.owner.clone(), report),
                Err(e) => {
                    log::warn!("report of {} dropped: {}", rcb, e);
                    return;
                }
            }
        };
        owner.queue(&MmsPdu::InformationReport(report));
    }
}

/// Build the report of an RCB for the given members and advance its
/// sequence number.
///
/// # Arguments
///
/// * `included` - data set member indices with their reasons, ascending
///
/// # Errors
///
/// Returns `InstanceNotAvailable` if the RCB or its data set is gone
pub fn build_report(
    model: &mut ServerModel,
    rcb: NodeId,
    included: &[(usize, ReasonForInclusion)],
) -> Result<InformationReport, ServiceError> {
    let (tree, descriptor) = model.tree_and_rcb_mut(rcb).ok_or_else(|| {
        ServiceError::instance_not_available(format!("{} is not a report control block", rcb))
    })?;
    let data_set = descriptor.data_set().cloned().ok_or_else(|| {
        ServiceError::instance_not_available(format!("{} has no data set", tree.node(rcb).reference()))
    })?;

    let mut opt_flds = descriptor.opt_flds(tree);
    opt_flds.set_segmentation(false);
    if !descriptor.is_buffered() {
        opt_flds.set_buffer_overflow(false);
        opt_flds.set_entry_id(false);
    }

    let mut rpt_id = descriptor.rpt_id(tree);
    if rpt_id.is_empty() {
        rpt_id = tree.node(rcb).reference().to_string();
    }

    let entry_time = EntryTime::now();
    let mut entry_id = None;
    if descriptor.is_buffered() {
        let previous = match descriptor.value(tree, ENTRY_ID) {
            Some(Value::OctetString(bytes)) if bytes.len() == 8 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                u64::from_be_bytes(raw)
            }
            _ => 0,
        };
        let next = previous.wrapping_add(1).to_be_bytes().to_vec();
        descriptor.set(tree, ENTRY_ID, &Value::OctetString(next.clone()))?;
        descriptor.set(tree, TIME_OF_ENTRY, &Value::BinaryTime(entry_time.as_bytes().to_vec()))?;
        entry_id = Some(next);
    }

    let mut values = vec![
        Value::VisibleString(rpt_id),
        Value::BitString(opt_flds.bit_string().clone()),
    ];
    if opt_flds.is_sequence_number() {
        values.push(Value::Unsigned(descriptor.sq_num(tree)));
    }
    if opt_flds.is_report_timestamp() {
        values.push(Value::BinaryTime(entry_time.as_bytes().to_vec()));
    }
    if opt_flds.is_data_set_name() {
        values.push(descriptor.value(tree, DAT_SET).cloned().unwrap_or(Value::VisibleString(String::new())));
    }
    if opt_flds.is_buffer_overflow() {
        values.push(Value::Boolean(false));
    }
    if let (true, Some(entry_id)) = (opt_flds.is_entry_id(), entry_id) {
        values.push(Value::OctetString(entry_id));
    }
    if opt_flds.is_configuration_revision() {
        values.push(Value::Unsigned(descriptor.conf_rev(tree)));
    }

    let mut inclusion = BitString::zeroed(data_set.len());
    for (index, _) in included {
        inclusion
            .set_bit(*index, true)
            .map_err(|e| ServiceError::server_constraint(e.to_string()))?;
    }
    values.push(Value::BitString(inclusion));

    if opt_flds.is_data_reference() {
        let defs = data_set.variable_defs(tree)?;
        for (index, _) in included {
            if let Some(def) = defs.get(*index) {
                values.push(Value::VisibleString(def.name.to_string()));
            }
        }
    }
    for (index, _) in included {
        let member = data_set.members().get(*index).copied().ok_or_else(|| {
            ServiceError::server_constraint(format!("data set has no member {}", index))
        })?;
        values.push(tree.value(member)?);
    }
    if opt_flds.is_reason_for_inclusion() {
        for (_, reason) in included {
            values.push(Value::BitString(reason.bit_string().clone()));
        }
    }

    descriptor.increment_sq_num(tree)?;

    Ok(InformationReport {
        variable_access_specification: VariableAccessSpecification::VariableListName(
            ObjectName::VmdSpecific(REPORT_LIST_NAME.to_string()),
        ),
        results: values.into_iter().map(AccessResult::Success).collect(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use iec61850_codec::decode_pdu;
    use iec61850_core::{Fc, ObjectReference, OptFlds};
    use iec61850_model::rcb::{INTG_PD, SQ_NUM};
    use iec61850_model::{AssociationId, BdaType, DataSet, RcbKind, RcbSettings, TriggerFlags};
    use tokio::runtime::Handle;
    use tokio::sync::mpsc;

    pub(crate) const DATA_SET: &str = "LD0/GGIO1.events";

    /// `LD0/GGIO1` with `Ind1` and `Ind2` in data set `events`, reported by
    /// `urcb01` and `brcb01`
    pub(crate) fn report_model(opt_flds: OptFlds, buf_tm: u32) -> (ServerModel, NodeId, NodeId) {
        let mut tree = ModelTree::new();
        let ld = tree.add_logical_device("LD0").unwrap();
        let ln = tree.add_logical_node(ld, "GGIO1").unwrap();
        let mut members = Vec::new();
        for name in ["Ind1", "Ind2"] {
            let ind = tree.add_data_object(ln, name, Fc::ST).unwrap();
            tree.add_basic(ind, "stVal", BdaType::Boolean, TriggerFlags::dchg())
                .unwrap();
            tree.add_basic(ind, "q", BdaType::Quality, TriggerFlags::qchg())
                .unwrap();
            members.push(ind);
        }

        let mut model = ServerModel::new(tree);
        model
            .add_data_set(DataSet::new(DATA_SET, members, false).unwrap())
            .unwrap();
        let mut trg_ops = TriggerConditions::new();
        trg_ops.set_data_change(true);
        trg_ops.set_quality_change(true);
        trg_ops.set_integrity(true);
        trg_ops.set_general_interrogation(true);
        let settings = RcbSettings::new(DATA_SET)
            .with_opt_flds(opt_flds)
            .with_buf_tm(buf_tm)
            .with_trg_ops(trg_ops);
        let urcb = model
            .add_rcb(ln, "urcb01", RcbKind::Unbuffered, &settings)
            .unwrap();
        let brcb = model
            .add_rcb(ln, "brcb01", RcbKind::Buffered, &settings.with_rpt_id("events"))
            .unwrap();
        (model, urcb, brcb)
    }

    pub(crate) fn leaf(model: &ServerModel, reference: &str) -> NodeId {
        model
            .find_model_node(&ObjectReference::new(reference).unwrap(), Some(Fc::ST))
            .unwrap()
    }

    fn values(report: &InformationReport) -> Vec<Value> {
        report
            .results
            .iter()
            .map(|result| match result {
                AccessResult::Success(value) => value.clone(),
                AccessResult::Failure(e) => panic!("unexpected failure {:?}", e),
            })
            .collect()
    }

    #[test]
    fn test_unbuffered_report_layout() {
        let mut opt_flds = OptFlds::new();
        opt_flds.set_sequence_number(true);
        opt_flds.set_data_set_name(true);
        opt_flds.set_reason_for_inclusion(true);
        opt_flds.set_entry_id(true);
        let (mut model, urcb, _) = report_model(opt_flds, 0);

        let mut reason = ReasonForInclusion::new();
        reason.set_data_change(true);
        let report = build_report(&mut model, urcb, &[(1, reason.clone())]).unwrap();

        assert_eq!(
            report.variable_access_specification,
            VariableAccessSpecification::VariableListName(ObjectName::VmdSpecific("RPT".to_string()))
        );
        let values = values(&report);
        assert_eq!(values[0], Value::VisibleString("LD0/GGIO1.urcb01".to_string()));
        let sent = OptFlds::from_bit_string(values[1].as_bit_string().unwrap().clone());
        assert!(!sent.is_entry_id());
        assert_eq!(values[2], Value::Unsigned(0));
        assert_eq!(values[3], Value::VisibleString("LD0/GGIO1$events".to_string()));
        let inclusion = values[4].as_bit_string().unwrap();
        assert_eq!(inclusion.iter().collect::<Vec<_>>(), vec![false, true]);
        assert_eq!(
            values[5],
            Value::Structure(vec![
                Value::Boolean(false),
                Value::BitString(BitString::zeroed(13)),
            ])
        );
        assert_eq!(values[6], Value::BitString(reason.bit_string().clone()));
        assert_eq!(values.len(), 7);

        let descriptor = model.rcb(urcb).unwrap();
        assert_eq!(descriptor.sq_num(model.tree()), 1);
    }

    #[test]
    fn test_buffered_report_advances_entry_id() {
        let mut opt_flds = OptFlds::new();
        opt_flds.set_entry_id(true);
        let (mut model, _, brcb) = report_model(opt_flds, 0);
        let gi = ReasonForInclusion::general_interrogation();

        build_report(&mut model, brcb, &[(0, gi.clone()), (1, gi.clone())]).unwrap();
        let report = build_report(&mut model, brcb, &[(0, gi)]).unwrap();
        let values = values(&report);

        assert_eq!(values[0], Value::VisibleString("events".to_string()));
        let expected = 2u64.to_be_bytes().to_vec();
        assert_eq!(values[2], Value::OctetString(expected.clone()));
        let descriptor = model.rcb(brcb).unwrap();
        assert_eq!(
            descriptor.value(model.tree(), ENTRY_ID),
            Some(&Value::OctetString(expected))
        );
    }

    #[test]
    fn test_report_requires_data_set() {
        let (mut model, urcb, _) = report_model(OptFlds::new(), 0);
        model.rcb_mut(urcb).unwrap().set_data_set(None);
        let error = build_report(&mut model, urcb, &[]).unwrap_err();
        assert_eq!(error.code(), iec61850_core::ErrorCode::InstanceNotAvailable);
    }

    #[test]
    fn test_sq_num_wraps_at_attribute_width() {
        let (mut model, urcb, brcb) = report_model(OptFlds::new(), 0);
        let gi = ReasonForInclusion::general_interrogation();
        let set_sq_num = |model: &mut ServerModel, rcb: NodeId, sq_num: u64| {
            let (tree, descriptor) = model.tree_and_rcb_mut(rcb).unwrap();
            descriptor.set(tree, SQ_NUM, &Value::Unsigned(sq_num)).unwrap();
        };
        let sq_num = |model: &ServerModel, rcb: NodeId| model.rcb(rcb).unwrap().sq_num(model.tree());

        set_sq_num(&mut model, urcb, 255);
        build_report(&mut model, urcb, &[(0, gi.clone())]).unwrap();
        assert_eq!(sq_num(&model, urcb), 0);

        set_sq_num(&mut model, brcb, 255);
        build_report(&mut model, brcb, &[(0, gi.clone())]).unwrap();
        assert_eq!(sq_num(&model, brcb), 256);
        set_sq_num(&mut model, brcb, 65535);
        build_report(&mut model, brcb, &[(0, gi)]).unwrap();
        assert_eq!(sq_num(&model, brcb), 0);
    }

    /// A server holding `report_model` with `urcb01` enabled by association 1
    fn enabled_urcb(
        buf_tm: u32,
        intg_pd: u64,
    ) -> (Arc<ServerShared>, NodeId, Arc<AssociationContext>, mpsc::UnboundedReceiver<Vec<u8>>) {
        let mut opt_flds = OptFlds::new();
        opt_flds.set_reason_for_inclusion(true);
        let (mut model, urcb, _) = report_model(opt_flds, buf_tm);
        let (tree, descriptor) = model.tree_and_rcb_mut(urcb).unwrap();
        descriptor.set(tree, INTG_PD, &Value::Unsigned(intg_pd)).unwrap();

        let shared = Arc::new(ServerShared::new(model, ServerConfig::default()));
        let (context, outgoing) = AssociationContext::new(AssociationId(1), Handle::current());
        shared
            .enable_reporting(&mut shared.model.lock(), urcb, &context)
            .unwrap();
        (shared, urcb, context, outgoing)
    }

    /// Inclusion bits and reasons of every report queued so far
    fn queued(outgoing: &mut mpsc::UnboundedReceiver<Vec<u8>>) -> Vec<(Vec<bool>, Vec<ReasonForInclusion>)> {
        let mut reports = Vec::new();
        while let Ok(bytes) = outgoing.try_recv() {
            let report = match decode_pdu(&bytes).unwrap() {
                MmsPdu::InformationReport(report) => report,
                other => panic!("unexpected PDU {:?}", other),
            };
            let values = values(&report);
            let inclusion: Vec<bool> = values[2].as_bit_string().unwrap().iter().collect();
            let included = inclusion.iter().filter(|bit| **bit).count();
            let reasons = values[values.len() - included..]
                .iter()
                .map(|value| ReasonForInclusion::from_bit_string(value.as_bit_string().unwrap().clone()))
                .collect();
            reports.push((inclusion, reasons));
        }
        reports
    }

    #[tokio::test(start_paused = true)]
    async fn test_integrity_timer_sends_full_reports() {
        let (_shared, _urcb, _context, mut outgoing) = enabled_urcb(0, 100);

        tokio::time::sleep(Duration::from_millis(250)).await;
        let reports = queued(&mut outgoing);
        assert_eq!(reports.len(), 2);
        for (inclusion, reasons) in reports {
            assert_eq!(inclusion, vec![true, true]);
            assert!(reasons.iter().all(ReasonForInclusion::is_integrity));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_integrity_period_is_ignored() {
        let (_shared, urcb, context, mut outgoing) = enabled_urcb(0, MIN_INTEGRITY_PERIOD_MS - 1);

        assert!(!context.scheduler().is_scheduled(urcb, TimerKind::Integrity));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(queued(&mut outgoing).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_integrity_report_keeps_pending_changes() {
        let (shared, urcb, _context, mut outgoing) = enabled_urcb(250, 100);
        {
            let model = shared.model.lock();
            let st_val = leaf(&model, "LD0/GGIO1.Ind1.stVal");
            shared.notify(&model, &[LeafUpdate { node: st_val, changed: true }]);
        }

        tokio::time::sleep(Duration::from_millis(220)).await;
        let reports = queued(&mut outgoing);
        assert_eq!(reports.len(), 2);
        let runtime = shared.reports.runtime(urcb).unwrap();
        assert!(runtime.pending.lock().members.contains_key(&0));

        tokio::time::sleep(Duration::from_millis(60)).await;
        let reports = queued(&mut outgoing);
        assert_eq!(reports.len(), 1);
        let (inclusion, reasons) = &reports[0];
        assert_eq!(inclusion, &vec![true, false]);
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].is_data_change());
        assert!(runtime.pending.lock().members.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_quality_and_update_reasons() {
        let (shared, urcb, _context, mut outgoing) = enabled_urcb(50, 0);
        {
            let model = shared.model.lock();
            let q = leaf(&model, "LD0/GGIO1.Ind2.q");
            let st_val = leaf(&model, "LD0/GGIO1.Ind1.stVal");
            shared.notify(&model, &[LeafUpdate { node: q, changed: true }]);
            shared.notify(&model, &[LeafUpdate { node: st_val, changed: false }]);
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        let reports = queued(&mut outgoing);
        assert_eq!(reports.len(), 1);
        let (inclusion, reasons) = &reports[0];
        assert_eq!(inclusion, &vec![false, true]);
        assert!(reasons[0].is_quality_change());
        assert!(!reasons[0].is_data_change());
        assert!(shared.reports.is_enabled(urcb));
    }
}
