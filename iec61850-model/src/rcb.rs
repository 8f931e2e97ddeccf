//! Report control block descriptors
//!
//! The configuration of an RCB lives in its attribute leaves in the tree. The
//! descriptor adds what is not part of the tree: the reservation owner and the
//! data set the RCB currently reports.

use crate::bda::{BdaType, TriggerFlags};
use crate::data_set::DataSet;
use crate::node::NodeId;
use crate::server_model::AssociationId;
use crate::tree::ModelTree;
use iec61850_core::{
    Fc, Iec61850Result, OptFlds, ServiceError, TriggerConditions, Value,
};
use serde::{Deserialize, Serialize};

pub const RPT_ID: &str = "RptID";
pub const RPT_ENA: &str = "RptEna";
pub const RESV: &str = "Resv";
pub const DAT_SET: &str = "DatSet";
pub const CONF_REV: &str = "ConfRev";
pub const OPT_FLDS: &str = "OptFlds";
pub const BUF_TM: &str = "BufTm";
pub const SQ_NUM: &str = "SqNum";
pub const TRG_OPS: &str = "TrgOps";
pub const INTG_PD: &str = "IntgPd";
pub const GI: &str = "GI";
pub const PURGE_BUF: &str = "PurgeBuf";
pub const ENTRY_ID: &str = "EntryID";
pub const TIME_OF_ENTRY: &str = "TimeOfEntry";
pub const RESV_TMS: &str = "ResvTms";
pub const OWNER: &str = "Owner";

/// Unbuffered or buffered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RcbKind {
    Unbuffered,
    Buffered,
}

impl RcbKind {
    pub const fn fc(&self) -> Fc {
        match self {
            RcbKind::Unbuffered => Fc::RP,
            RcbKind::Buffered => Fc::BR,
        }
    }

    pub fn from_fc(fc: Fc) -> Option<Self> {
        match fc {
            Fc::RP => Some(RcbKind::Unbuffered),
            Fc::BR => Some(RcbKind::Buffered),
            _ => None,
        }
    }
}

/// Initial configuration of a report control block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RcbSettings {
    pub rpt_id: String,
    /// Data set reference, `LD/LN.DS`
    pub dat_set: String,
    pub conf_rev: u32,
    pub opt_flds: OptFlds,
    pub buf_tm: u32,
    pub trg_ops: TriggerConditions,
    pub intg_pd: u32,
}

impl Default for RcbSettings {
    fn default() -> Self {
        Self {
            rpt_id: String::new(),
            dat_set: String::new(),
            conf_rev: 1,
            opt_flds: OptFlds::default_value(),
            buf_tm: 0,
            trg_ops: TriggerConditions::default_value(),
            intg_pd: 0,
        }
    }
}

impl RcbSettings {
    pub fn new(dat_set: impl Into<String>) -> Self {
        Self {
            dat_set: dat_set.into(),
            ..Default::default()
        }
    }

    pub fn with_rpt_id(mut self, rpt_id: impl Into<String>) -> Self {
        self.rpt_id = rpt_id.into();
        self
    }

    pub fn with_opt_flds(mut self, opt_flds: OptFlds) -> Self {
        self.opt_flds = opt_flds;
        self
    }

    pub fn with_buf_tm(mut self, buf_tm: u32) -> Self {
        self.buf_tm = buf_tm;
        self
    }

    pub fn with_trg_ops(mut self, trg_ops: TriggerConditions) -> Self {
        self.trg_ops = trg_ops;
        self
    }

    pub fn with_intg_pd(mut self, intg_pd: u32) -> Self {
        self.intg_pd = intg_pd;
        self
    }
}

/// Build the attribute nodes of an RCB below a logical node
pub(crate) fn build_rcb_nodes(
    tree: &mut ModelTree,
    ln: NodeId,
    name: &str,
    kind: RcbKind,
    settings: &RcbSettings,
) -> Iec61850Result<NodeId> {
    let rcb = tree.add_data_object(ln, name, kind.fc())?;
    let none = TriggerFlags::NONE;
    let add = |tree: &mut ModelTree, name: &str, bda_type: BdaType, value: Value| {
        let id = tree.add_basic(rcb, name, bda_type, none)?;
        tree.set_basic_value(id, &value)
            .map_err(iec61850_core::Iec61850Error::Service)?;
        Ok::<_, iec61850_core::Iec61850Error>(id)
    };

    let dat_set = settings.dat_set.replace('.', "$");
    add(tree, RPT_ID, BdaType::VisibleString(129), Value::VisibleString(settings.rpt_id.clone()))?;
    add(tree, RPT_ENA, BdaType::Boolean, Value::Boolean(false))?;
    if kind == RcbKind::Unbuffered {
        add(tree, RESV, BdaType::Boolean, Value::Boolean(false))?;
    }
    add(tree, DAT_SET, BdaType::VisibleString(129), Value::VisibleString(dat_set))?;
    add(tree, CONF_REV, BdaType::Int32U, Value::Unsigned(settings.conf_rev.into()))?;
    add(
        tree,
        OPT_FLDS,
        BdaType::OptFlds,
        Value::BitString(settings.opt_flds.bit_string().clone()),
    )?;
    add(tree, BUF_TM, BdaType::Int32U, Value::Unsigned(settings.buf_tm.into()))?;
    let sq_num_type = match kind {
        RcbKind::Unbuffered => BdaType::Int8U,
        RcbKind::Buffered => BdaType::Int16U,
    };
    add(tree, SQ_NUM, sq_num_type, Value::Unsigned(0))?;
    add(
        tree,
        TRG_OPS,
        BdaType::TriggerConditions,
        Value::BitString(settings.trg_ops.bit_string().clone()),
    )?;
    add(tree, INTG_PD, BdaType::Int32U, Value::Unsigned(settings.intg_pd.into()))?;
    add(tree, GI, BdaType::Boolean, Value::Boolean(false))?;
    if kind == RcbKind::Buffered {
        add(tree, PURGE_BUF, BdaType::Boolean, Value::Boolean(false))?;
        add(tree, ENTRY_ID, BdaType::OctetString(8), Value::OctetString(vec![0; 8]))?;
        add(tree, TIME_OF_ENTRY, BdaType::EntryTime, Value::BinaryTime(vec![0; 6]))?;
        add(tree, RESV_TMS, BdaType::Int16, Value::Integer(0))?;
    }
    add(tree, OWNER, BdaType::OctetString(64), Value::OctetString(Vec::new()))?;
    Ok(rcb)
}

/// Runtime descriptor of a report control block
#[derive(Debug, Clone, PartialEq)]
pub struct Rcb {
    node: NodeId,
    kind: RcbKind,
    reserved_by: Option<AssociationId>,
    data_set: Option<DataSet>,
}

impl Rcb {
    pub fn new(node: NodeId, kind: RcbKind) -> Self {
        Self {
            node,
            kind,
            reserved_by: None,
            data_set: None,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn kind(&self) -> RcbKind {
        self.kind
    }

    pub fn is_buffered(&self) -> bool {
        self.kind == RcbKind::Buffered
    }

    pub fn reserved_by(&self) -> Option<AssociationId> {
        self.reserved_by
    }

    /// Whether `association` may change the configuration: it holds the
    /// reservation or nobody does
    pub fn is_accessible_by(&self, association: AssociationId) -> bool {
        self.reserved_by.is_none_or(|owner| owner == association)
    }

    pub fn reserve(&mut self, association: AssociationId) {
        self.reserved_by = Some(association);
    }

    pub fn release(&mut self) {
        self.reserved_by = None;
    }

    /// Data set currently resolved from `DatSet`
    pub fn data_set(&self) -> Option<&DataSet> {
        self.data_set.as_ref()
    }

    pub fn set_data_set(&mut self, data_set: Option<DataSet>) {
        self.data_set = data_set;
    }

    /// Attribute node by name
    pub fn attribute(&self, tree: &ModelTree, name: &str) -> Option<NodeId> {
        tree.child(self.node, name, None)
    }

    pub fn value<'a>(&self, tree: &'a ModelTree, name: &str) -> Option<&'a Value> {
        self.attribute(tree, name).and_then(|id| tree.basic_value(id))
    }

    /// Store an attribute value
    ///
    /// # Errors
    ///
    /// Returns `InstanceNotAvailable` for an unknown attribute and
    /// `TypeConflict` for a value of the wrong type
    pub fn set(&self, tree: &mut ModelTree, name: &str, value: &Value) -> Result<bool, ServiceError> {
        let id = self.attribute(tree, name).ok_or_else(|| {
            ServiceError::instance_not_available(format!(
                "{} has no attribute {}",
                tree.node(self.node).reference(),
                name
            ))
        })?;
        tree.set_basic_value(id, value)
    }

    fn bool_value(&self, tree: &ModelTree, name: &str) -> bool {
        self.value(tree, name).and_then(Value::as_bool).unwrap_or(false)
    }

    fn unsigned_value(&self, tree: &ModelTree, name: &str) -> u64 {
        match self.value(tree, name) {
            Some(Value::Unsigned(u)) => *u,
            Some(Value::Integer(i)) => u64::try_from(*i).unwrap_or(0),
            _ => 0,
        }
    }

    pub fn is_enabled(&self, tree: &ModelTree) -> bool {
        self.bool_value(tree, RPT_ENA)
    }

    pub fn rpt_id(&self, tree: &ModelTree) -> String {
        self.value(tree, RPT_ID)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// `DatSet` with the MMS separator turned back into an object reference
    pub fn dat_set_reference(&self, tree: &ModelTree) -> String {
        self.value(tree, DAT_SET)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .replace('$', ".")
    }

    pub fn conf_rev(&self, tree: &ModelTree) -> u64 {
        self.unsigned_value(tree, CONF_REV)
    }

    pub fn opt_flds(&self, tree: &ModelTree) -> OptFlds {
        self.value(tree, OPT_FLDS)
            .and_then(Value::as_bit_string)
            .map(|bits| OptFlds::from_bit_string(bits.clone()))
            .unwrap_or_default()
    }

    pub fn trg_ops(&self, tree: &ModelTree) -> TriggerConditions {
        self.value(tree, TRG_OPS)
            .and_then(Value::as_bit_string)
            .map(|bits| TriggerConditions::from_bit_string(bits.clone()))
            .unwrap_or_default()
    }

    pub fn buf_tm(&self, tree: &ModelTree) -> u64 {
        self.unsigned_value(tree, BUF_TM)
    }

    pub fn intg_pd(&self, tree: &ModelTree) -> u64 {
        self.unsigned_value(tree, INTG_PD)
    }

    pub fn sq_num(&self, tree: &ModelTree) -> u64 {
        self.unsigned_value(tree, SQ_NUM)
    }

    /// Increment `SqNum`, wrapping at the width of the attribute
    pub fn increment_sq_num(&self, tree: &mut ModelTree) -> Result<(), ServiceError> {
        let modulus = match self.kind {
            RcbKind::Unbuffered => 1 << 8,
            RcbKind::Buffered => 1 << 16,
        };
        let next = (self.sq_num(tree) + 1) % modulus;
        self.set(tree, SQ_NUM, &Value::Unsigned(next)).map(|_| ())
    }

    pub fn resv_tms(&self, tree: &ModelTree) -> i64 {
        self.value(tree, RESV_TMS).and_then(Value::as_i64).unwrap_or(0)
    }
}
