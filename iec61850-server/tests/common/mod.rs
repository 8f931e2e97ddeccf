//! Shared fixtures for the client/server tests
#![allow(dead_code)]

use iec61850_client::{ClientAssociation, ClientEventListener, ClientSap, Report};
use iec61850_core::{BitString, Fc, Iec61850Error, ObjectReference, OptFlds, TriggerConditions, Value};
use iec61850_model::{BdaType, DataSet, ModelTree, NodeId, RcbKind, RcbSettings, ServerModel, TriggerFlags};
use iec61850_server::ServerSap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const DATA_SET: &str = "LD0/GGIO1.events";
pub const URCB: &str = "LD0/GGIO1.urcb01";
pub const DIRECT: &str = "LD0/CSWI1.Pos";
pub const SBO: &str = "LD0/CSWI2.Pos";
pub const SBO_TIMEOUT_MS: u64 = 100;

/// Forwards client callbacks into channels
pub struct ChannelListener {
    reports: mpsc::UnboundedSender<Report>,
    closed: mpsc::UnboundedSender<Iec61850Error>,
}

impl ClientEventListener for ChannelListener {
    fn new_report(&self, report: Report) {
        let _ = self.reports.send(report);
    }

    fn association_closed(&self, error: Iec61850Error) {
        let _ = self.closed.send(error);
    }
}

pub struct Events {
    pub reports: mpsc::UnboundedReceiver<Report>,
    pub closed: mpsc::UnboundedReceiver<Iec61850Error>,
}

impl Events {
    pub async fn next_report(&mut self, within: Duration) -> Option<Report> {
        tokio::time::timeout(within, self.reports.recv()).await.ok().flatten()
    }
}

fn control(tree: &mut ModelTree, ld: NodeId, ln_name: &str, ctl_model: i64) {
    let ln = tree.add_logical_node(ld, ln_name).unwrap();
    let pos = tree.add_data_object(ln, "Pos", Fc::CO).unwrap();
    tree.add_basic(pos, "SBO", BdaType::VisibleString(129), TriggerFlags::NONE)
        .unwrap();
    for name in ["Oper", "Cancel"] {
        let service = tree.add_constructed(pos, name).unwrap();
        tree.add_basic(service, "ctlVal", BdaType::Boolean, TriggerFlags::NONE)
            .unwrap();
        tree.add_basic(service, "ctlNum", BdaType::Int8U, TriggerFlags::NONE)
            .unwrap();
        tree.add_basic(service, "T", BdaType::Timestamp, TriggerFlags::NONE)
            .unwrap();
        tree.add_basic(service, "Test", BdaType::Boolean, TriggerFlags::NONE)
            .unwrap();
    }
    let cf = tree.add_data_object(ln, "Pos", Fc::CF).unwrap();
    let model = tree
        .add_basic(cf, "ctlModel", BdaType::Int8, TriggerFlags::dchg())
        .unwrap();
    tree.set_basic_value(model, &Value::Integer(ctl_model)).unwrap();
    let timeout = tree
        .add_basic(cf, "sboTimeout", BdaType::Int32U, TriggerFlags::dchg())
        .unwrap();
    tree.set_basic_value(timeout, &Value::Unsigned(SBO_TIMEOUT_MS))
        .unwrap();
}

/// `LD0/GGIO1` with two indications in `events` reported by `urcb01`
/// (BufTm 100, data change and GI), a direct control `CSWI1.Pos` and a
/// select-before-operate control `CSWI2.Pos`
pub fn model() -> ServerModel {
    let mut tree = ModelTree::new();
    let ld = tree.add_logical_device("LD0").unwrap();
    let ggio = tree.add_logical_node(ld, "GGIO1").unwrap();
    let mut members = Vec::new();
    for name in ["Ind1", "Ind2"] {
        let ind = tree.add_data_object(ggio, name, Fc::ST).unwrap();
        let st_val_triggers = TriggerFlags {
            dupd: true,
            ..TriggerFlags::dchg()
        };
        tree.add_basic(ind, "stVal", BdaType::Boolean, st_val_triggers)
            .unwrap();
        tree.add_basic(ind, "q", BdaType::Quality, TriggerFlags::qchg())
            .unwrap();
        members.push(ind);
    }
    control(&mut tree, ld, "CSWI1", 1);
    control(&mut tree, ld, "CSWI2", 2);

    let mut model = ServerModel::new(tree);
    model
        .add_data_set(DataSet::new(DATA_SET, members, false).unwrap())
        .unwrap();
    let mut opt_flds = OptFlds::new();
    opt_flds.set_sequence_number(true);
    opt_flds.set_data_set_name(true);
    opt_flds.set_reason_for_inclusion(true);
    let mut trg_ops = TriggerConditions::new();
    trg_ops.set_data_change(true);
    trg_ops.set_general_interrogation(true);
    let settings = RcbSettings::new(DATA_SET)
        .with_rpt_id("events")
        .with_opt_flds(opt_flds)
        .with_buf_tm(100)
        .with_trg_ops(trg_ops);
    model
        .add_rcb(ggio, "urcb01", RcbKind::Unbuffered, &settings)
        .unwrap();
    model
}

/// Run a new association on `server` over an in-memory stream
pub async fn associate(server: &ServerSap) -> (ClientAssociation, Events) {
    let (client_end, server_end) = tokio::io::duplex(64 * 1024);
    server
        .serve_connection(server_end)
        .expect("server accepts the association");
    let (reports, report_rx) = mpsc::unbounded_channel();
    let (closed, closed_rx) = mpsc::unbounded_channel();
    let listener = Arc::new(ChannelListener { reports, closed });
    let association = ClientSap::new()
        .associate_stream(client_end, Some(listener))
        .await
        .unwrap();
    let events = Events {
        reports: report_rx,
        closed: closed_rx,
    };
    (association, events)
}

/// Commit one attribute as the host application
pub fn set_leaf(server: &ServerSap, reference: &str, fc: Fc, value: Value) {
    let model = server.model_copy();
    let reference = ObjectReference::new(reference).unwrap();
    let node = model.find_model_node(&reference, Some(fc)).unwrap();
    let mut copy = model.tree().copy(node);
    copy.set_from_value(&value).unwrap();
    server.set_values(&[copy]).unwrap();
}

/// Set `stVal` of a `GGIO1` indication as the host application
pub fn set_indication(server: &ServerSap, name: &str, value: bool) {
    let reference = format!("LD0/GGIO1.{}.stVal", name);
    set_leaf(server, &reference, Fc::ST, Value::Boolean(value));
}

/// Set bit `bit` of the quality of a `GGIO1` indication
pub fn set_quality_bit(server: &ServerSap, name: &str, bit: usize) {
    let mut quality = BitString::zeroed(13);
    quality.set_bit(bit, true).unwrap();
    let reference = format!("LD0/GGIO1.{}.q", name);
    set_leaf(server, &reference, Fc::ST, Value::BitString(quality));
}

pub fn service_code(error: Iec61850Error) -> iec61850_core::ErrorCode {
    match error {
        Iec61850Error::Service(e) => e.code(),
        other => panic!("expected a service error, got {:?}", other),
    }
}
