//! Decoding of reports received as information reports

use iec61850_codec::{AccessResult, InformationReport, VariableAccessSpecification};
use iec61850_core::{BitString, EntryTime, ObjectName, OptFlds, ReasonForInclusion, ServiceError, Value};
use iec61850_model::{DataSet, NodeCopy, ServerModel};

/// Variable list name of information reports carrying RCB reports
pub const REPORT_LIST_NAME: &str = "RPT";

/// A report sent by a report control block
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub rpt_id: String,
    pub sq_num: Option<u64>,
    pub sub_sq_num: Option<u64>,
    pub more_segments_follow: bool,
    /// Object reference of the reported data set
    pub data_set_ref: String,
    pub buffer_overflow: Option<bool>,
    pub conf_rev: Option<u64>,
    pub time_of_entry: Option<EntryTime>,
    pub entry_id: Option<Vec<u8>>,
    /// One bit per data set member, set for the members carried in `values`
    pub inclusion: BitString,
    /// Copies of the included members holding the reported values
    pub values: Vec<NodeCopy>,
    pub reason_codes: Option<Vec<ReasonForInclusion>>,
}

impl Report {
    /// Reported copy of the data set member at `index`
    pub fn member(&self, index: usize) -> Option<&NodeCopy> {
        if !self.inclusion.bit(index) {
            return None;
        }
        let position = self.inclusion.iter().take(index).filter(|bit| *bit).count();
        self.values.get(position)
    }
}

/// Whether an information report carries an RCB report
pub fn is_rcb_report(report: &InformationReport) -> bool {
    matches!(
        &report.variable_access_specification,
        VariableAccessSpecification::VariableListName(ObjectName::VmdSpecific(name)) if name == REPORT_LIST_NAME
    )
}

fn malformed(field: &str) -> ServiceError {
    ServiceError::communications_constraint(format!("report without valid {}", field))
}

struct Fields(std::vec::IntoIter<AccessResult>);

impl Fields {
    fn next(&mut self, field: &str) -> Result<Value, ServiceError> {
        match self.0.next() {
            Some(AccessResult::Success(value)) => Ok(value),
            _ => Err(malformed(field)),
        }
    }

    fn visible_string(&mut self, field: &str) -> Result<String, ServiceError> {
        match self.next(field)? {
            Value::VisibleString(s) => Ok(s),
            _ => Err(malformed(field)),
        }
    }

    fn bit_string(&mut self, field: &str) -> Result<BitString, ServiceError> {
        match self.next(field)? {
            Value::BitString(bits) => Ok(bits),
            _ => Err(malformed(field)),
        }
    }

    fn unsigned(&mut self, field: &str) -> Result<u64, ServiceError> {
        match self.next(field)? {
            Value::Unsigned(u) => Ok(u),
            Value::Integer(i) => u64::try_from(i).map_err(|_| malformed(field)),
            _ => Err(malformed(field)),
        }
    }

    fn boolean(&mut self, field: &str) -> Result<bool, ServiceError> {
        self.next(field)?.as_bool().ok_or_else(|| malformed(field))
    }
}

/// Data set reported under `rpt_id`: the RCB whose `RptID`, or reference
/// when `RptID` is empty, matches
fn data_set_of_report_id(model: &ServerModel, rpt_id: &str) -> Option<String> {
    let tree = model.tree();
    model
        .rcbs()
        .iter()
        .find(|rcb| rcb.rpt_id(tree) == rpt_id || tree.node(rcb.node()).reference().as_str() == rpt_id)
        .map(|rcb| rcb.dat_set_reference(tree))
}

/// Decode a report against the client's copy of the server model.
///
/// # Arguments
///
/// * `local_data_sets` - the association's own `@` data sets
///
/// # Errors
///
/// Returns `FailedDueToCommunicationsConstraint` when a field is missing or
/// of the wrong type, or the reported data set is unknown
pub fn decode_report(
    model: &ServerModel,
    local_data_sets: &[DataSet],
    report: InformationReport,
) -> Result<Report, ServiceError> {
    let mut fields = Fields(report.results.into_iter());

    let rpt_id = fields.visible_string("RptID")?;
    let opt_flds = OptFlds::from_bit_string(fields.bit_string("OptFlds")?);

    let sq_num = opt_flds
        .is_sequence_number()
        .then(|| fields.unsigned("SqNum"))
        .transpose()?;
    let time_of_entry = if opt_flds.is_report_timestamp() {
        match fields.next("TimeOfEntry")? {
            Value::BinaryTime(bytes) => {
                let bytes: [u8; 6] = bytes.try_into().map_err(|_| malformed("TimeOfEntry"))?;
                Some(EntryTime::from_bytes(bytes))
            }
            _ => return Err(malformed("TimeOfEntry")),
        }
    } else {
        None
    };

    let data_set_ref = if opt_flds.is_data_set_name() {
        Some(fields.visible_string("DatSet")?)
    } else {
        data_set_of_report_id(model, &rpt_id)
    }
    .ok_or_else(|| malformed("RptID"))?
    .replace('$', ".");
    let data_set = model
        .data_set(&data_set_ref)
        .or_else(|| local_data_sets.iter().find(|ds| ds.reference() == data_set_ref))
        .ok_or_else(|| {
            ServiceError::communications_constraint(format!("report of unknown data set {}", data_set_ref))
        })?;

    let buffer_overflow = opt_flds
        .is_buffer_overflow()
        .then(|| fields.boolean("BufOvfl"))
        .transpose()?;
    let entry_id = if opt_flds.is_entry_id() {
        match fields.next("EntryID")? {
            Value::OctetString(bytes) => Some(bytes),
            _ => return Err(malformed("EntryID")),
        }
    } else {
        None
    };
    let conf_rev = opt_flds
        .is_configuration_revision()
        .then(|| fields.unsigned("ConfRev"))
        .transpose()?;
    let (sub_sq_num, more_segments_follow) = if opt_flds.is_segmentation() {
        (Some(fields.unsigned("SubSqNum")?), fields.boolean("MoreSegmentsFollow")?)
    } else {
        (None, false)
    };

    let inclusion = fields.bit_string("inclusion bit string")?;
    if inclusion.num_bits() != data_set.len() {
        return Err(malformed("inclusion bit string"));
    }
    let included: Vec<usize> = (0..data_set.len()).filter(|i| inclusion.bit(*i)).collect();

    if opt_flds.is_data_reference() {
        for _ in &included {
            fields.next("data reference")?;
        }
    }

    let tree = model.tree();
    let mut values = Vec::with_capacity(included.len());
    for index in &included {
        let value = fields.next("member value")?;
        let mut copy = tree.copy(data_set.members()[*index]);
        copy.set_from_value(&value)
            .map_err(|e| ServiceError::communications_constraint(format!("member {}: {}", index, e)))?;
        values.push(copy);
    }

    let reason_codes = if opt_flds.is_reason_for_inclusion() {
        let mut reasons = Vec::with_capacity(included.len());
        for _ in &included {
            reasons.push(ReasonForInclusion::from_bit_string(fields.bit_string("reason code")?));
        }
        Some(reasons)
    } else {
        None
    };

    Ok(Report {
        rpt_id,
        sq_num,
        sub_sq_num,
        more_segments_follow,
        data_set_ref,
        buffer_overflow,
        conf_rev,
        time_of_entry,
        entry_id,
        inclusion,
        values,
        reason_codes,
    })
}
