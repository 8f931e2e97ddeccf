//! Mapping of peer error PDUs onto service errors

use iec61850_codec::{
    ACCESS_OBJECT_ACCESS_DENIED, ACCESS_OBJECT_NON_EXISTENT, AccessResult, ErrorClass, FILE_NON_EXISTENT,
    RejectPdu, RejectReason, ServiceErrorPdu, WriteResult,
};
use iec61850_core::{ErrorCode, ServiceError, Value};

/// Reject reason `invalid-pdu` of the pdu-error class
const REJECT_INVALID_PDU: i64 = 1;

/// Service error for a confirmed-error PDU
pub fn confirmed_error(error: &ServiceErrorPdu) -> ServiceError {
    let description = error
        .additional_description
        .clone()
        .unwrap_or_else(|| format!("{:?} error {}", error.class, error.code));
    match (error.class, error.code) {
        (ErrorClass::Access, ACCESS_OBJECT_ACCESS_DENIED) => ServiceError::access_violation(description),
        (ErrorClass::Access, ACCESS_OBJECT_NON_EXISTENT) => {
            ServiceError::instance_not_available(description)
        }
        (ErrorClass::File, FILE_NON_EXISTENT) => ServiceError::new(ErrorCode::FileNoneExistent, description),
        _ => ServiceError::unknown(description),
    }
}

/// Service error for a reject PDU answering a request
pub fn reject_error(reject: &RejectPdu) -> ServiceError {
    match reject.reason {
        RejectReason::PduError(REJECT_INVALID_PDU) => {
            ServiceError::parameter_value_inconsistent("request rejected as invalid PDU")
        }
        ref reason => ServiceError::unknown(format!("request rejected: {:?}", reason)),
    }
}

/// Value of a read result
pub fn access_result(result: AccessResult) -> Result<Value, ServiceError> {
    match result {
        AccessResult::Success(value) => Ok(value),
        AccessResult::Failure(e) => Err(e.into()),
    }
}

pub fn write_result(result: WriteResult) -> Result<(), ServiceError> {
    match result {
        WriteResult::Success => Ok(()),
        WriteResult::Failure(e) => Err(e.into()),
    }
}
