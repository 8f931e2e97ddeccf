//! Error taxonomy for IEC 61850 operations
//!
//! Two layers of errors exist:
//! - [`ServiceError`]: an ACSI service failure with one of the standard error codes.
//!   Service errors are reported back to the peer and never tear down an association.
//! - [`Iec61850Error`]: the crate-wide error which additionally covers transport,
//!   framing and codec failures. Those are fatal for the association they occur on.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// ACSI service error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ErrorCode {
    NoError = 0,
    InstanceNotAvailable = 1,
    InstanceInUse = 2,
    AccessViolation = 3,
    AccessNotAllowedInCurrentState = 4,
    ParameterValueInappropriate = 5,
    ParameterValueInconsistent = 6,
    ClassNotSupported = 7,
    InstanceLockedByOtherClient = 8,
    ControlMustBeSelected = 9,
    TypeConflict = 10,
    FailedDueToCommunicationsConstraint = 11,
    FailedDueToServerConstraint = 12,
    ApplicationUnreachable = 13,
    ConnectionLost = 14,
    MemoryUnavailable = 15,
    ProcessorResourceUnavailable = 16,
    FileNoneExistent = 17,
    Fatal = 20,
    Timeout = 22,
    Unknown = 23,
}

impl ErrorCode {
    /// Numeric value of the code
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Look up a code by its numeric value
    pub fn from_code(code: u8) -> Option<Self> {
        let code = match code {
            0 => Self::NoError,
            1 => Self::InstanceNotAvailable,
            2 => Self::InstanceInUse,
            3 => Self::AccessViolation,
            4 => Self::AccessNotAllowedInCurrentState,
            5 => Self::ParameterValueInappropriate,
            6 => Self::ParameterValueInconsistent,
            7 => Self::ClassNotSupported,
            8 => Self::InstanceLockedByOtherClient,
            9 => Self::ControlMustBeSelected,
            10 => Self::TypeConflict,
            11 => Self::FailedDueToCommunicationsConstraint,
            12 => Self::FailedDueToServerConstraint,
            13 => Self::ApplicationUnreachable,
            14 => Self::ConnectionLost,
            15 => Self::MemoryUnavailable,
            16 => Self::ProcessorResourceUnavailable,
            17 => Self::FileNoneExistent,
            20 => Self::Fatal,
            22 => Self::Timeout,
            23 => Self::Unknown,
            _ => return None,
        };
        Some(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoError => "no error",
            Self::InstanceNotAvailable => "instance not available",
            Self::InstanceInUse => "instance in use",
            Self::AccessViolation => "access violation",
            Self::AccessNotAllowedInCurrentState => "access not allowed in current state",
            Self::ParameterValueInappropriate => "parameter value inappropriate",
            Self::ParameterValueInconsistent => "parameter value inconsistent",
            Self::ClassNotSupported => "class not supported",
            Self::InstanceLockedByOtherClient => "instance locked by other client",
            Self::ControlMustBeSelected => "control must be selected",
            Self::TypeConflict => "type conflict",
            Self::FailedDueToCommunicationsConstraint => "failed due to communications constraint",
            Self::FailedDueToServerConstraint => "failed due to server constraint",
            Self::ApplicationUnreachable => "application unreachable",
            Self::ConnectionLost => "connection lost",
            Self::MemoryUnavailable => "memory unavailable",
            Self::ProcessorResourceUnavailable => "processor resource unavailable",
            Self::FileNoneExistent => "file non existent",
            Self::Fatal => "fatal",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// An ACSI service error: a standard error code plus a human readable message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ServiceError {
    code: ErrorCode,
    message: String,
}

impl ServiceError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Decoded value shape does not match the attribute type
    pub fn type_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TypeConflict, message)
    }

    /// Referenced object, data set or control block does not exist
    pub fn instance_not_available(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InstanceNotAvailable, message)
    }

    /// Authorization failure: wrong FC, not reserved, not selected, RCB busy
    pub fn access_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AccessViolation, message)
    }

    pub fn parameter_value_inconsistent(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParameterValueInconsistent, message)
    }

    pub fn parameter_value_inappropriate(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParameterValueInappropriate, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, message)
    }

    /// Malformed or unexpected peer PDU
    pub fn communications_constraint(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::FailedDueToCommunicationsConstraint, message)
    }

    pub fn server_constraint(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::FailedDueToServerConstraint, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unknown, message)
    }

    /// Map this error onto the MMS DataAccessError sent in read/write results
    pub fn to_data_access_error(&self) -> DataAccessError {
        match self.code {
            ErrorCode::FailedDueToServerConstraint => DataAccessError::HardwareFault,
            ErrorCode::InstanceLockedByOtherClient => DataAccessError::TemporarilyUnavailable,
            ErrorCode::AccessViolation => DataAccessError::ObjectAccessDenied,
            ErrorCode::TypeConflict => DataAccessError::TypeInconsistent,
            ErrorCode::InstanceNotAvailable => DataAccessError::ObjectNonExistent,
            ErrorCode::ParameterValueInconsistent => DataAccessError::ObjectValueInvalid,
            _ => DataAccessError::ObjectAccessUnsupported,
        }
    }
}

impl From<DataAccessError> for ServiceError {
    fn from(error: DataAccessError) -> Self {
        let code = match error {
            DataAccessError::HardwareFault => ErrorCode::FailedDueToServerConstraint,
            DataAccessError::TemporarilyUnavailable => ErrorCode::InstanceLockedByOtherClient,
            DataAccessError::ObjectAccessDenied => ErrorCode::AccessViolation,
            DataAccessError::InvalidAddress | DataAccessError::ObjectValueInvalid => {
                ErrorCode::ParameterValueInconsistent
            }
            DataAccessError::TypeInconsistent => ErrorCode::TypeConflict,
            DataAccessError::ObjectNonExistent => ErrorCode::InstanceNotAvailable,
            _ => ErrorCode::FailedDueToCommunicationsConstraint,
        };
        ServiceError::new(code, format!("MMS DataAccessError: {}", error))
    }
}

/// MMS DataAccessError values carried by failed read and write results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataAccessError {
    ObjectInvalidated = 0,
    HardwareFault = 1,
    TemporarilyUnavailable = 2,
    ObjectAccessDenied = 3,
    ObjectUndefined = 4,
    InvalidAddress = 5,
    TypeUnsupported = 6,
    TypeInconsistent = 7,
    ObjectAttributeInconsistent = 8,
    ObjectAccessUnsupported = 9,
    ObjectNonExistent = 10,
    ObjectValueInvalid = 11,
}

impl DataAccessError {
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Unknown values collapse to `ObjectAccessUnsupported`
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::ObjectInvalidated,
            1 => Self::HardwareFault,
            2 => Self::TemporarilyUnavailable,
            3 => Self::ObjectAccessDenied,
            4 => Self::ObjectUndefined,
            5 => Self::InvalidAddress,
            6 => Self::TypeUnsupported,
            7 => Self::TypeInconsistent,
            8 => Self::ObjectAttributeInconsistent,
            10 => Self::ObjectNonExistent,
            11 => Self::ObjectValueInvalid,
            _ => Self::ObjectAccessUnsupported,
        }
    }
}

impl fmt::Display for DataAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ObjectInvalidated => "object-invalidated",
            Self::HardwareFault => "hardware-fault",
            Self::TemporarilyUnavailable => "temporarily-unavailable",
            Self::ObjectAccessDenied => "object-access-denied",
            Self::ObjectUndefined => "object-undefined",
            Self::InvalidAddress => "invalid-address",
            Self::TypeUnsupported => "type-unsupported",
            Self::TypeInconsistent => "type-inconsistent",
            Self::ObjectAttributeInconsistent => "object-attribute-inconsistent",
            Self::ObjectAccessUnsupported => "object-access-unsupported",
            Self::ObjectNonExistent => "object-non-existent",
            Self::ObjectValueInvalid => "object-value-invalid",
        };
        f.write_str(name)
    }
}

/// Main error type for IEC 61850 operations
#[derive(Error, Debug)]
pub enum Iec61850Error {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("Frame invalid: {0}")]
    FrameInvalid(String),

    #[error("Association closed: {0}")]
    AssociationClosed(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Timeout")]
    Timeout,
}

impl Iec61850Error {
    /// The service error carried by this error, if any
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::Service(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the association this error occurred on is no longer usable
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Service(_) | Self::InvalidData(_))
    }
}

/// Result type alias for IEC 61850 operations
pub type Iec61850Result<T> = Result<T, Iec61850Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_to_data_access_error() {
        assert_eq!(
            ServiceError::access_violation("x").to_data_access_error(),
            DataAccessError::ObjectAccessDenied
        );
        assert_eq!(
            ServiceError::type_conflict("x").to_data_access_error().code(),
            7
        );
        assert_eq!(
            ServiceError::instance_not_available("x").to_data_access_error().code(),
            10
        );
        assert_eq!(
            ServiceError::parameter_value_inconsistent("x").to_data_access_error().code(),
            11
        );
        assert_eq!(
            ServiceError::server_constraint("x").to_data_access_error().code(),
            1
        );
        assert_eq!(ServiceError::timeout("x").to_data_access_error().code(), 9);
    }

    #[test]
    fn test_data_access_error_to_service_error() {
        let e = ServiceError::from(DataAccessError::from_code(3));
        assert_eq!(e.code(), ErrorCode::AccessViolation);
        let e = ServiceError::from(DataAccessError::from_code(5));
        assert_eq!(e.code(), ErrorCode::ParameterValueInconsistent);
        let e = ServiceError::from(DataAccessError::from_code(42));
        assert_eq!(e.code(), ErrorCode::FailedDueToCommunicationsConstraint);
    }

    #[test]
    fn test_error_code_round_trip() {
        for raw in 0..=23u8 {
            if let Some(code) = ErrorCode::from_code(raw) {
                assert_eq!(code.code(), raw);
            }
        }
        assert!(ErrorCode::from_code(18).is_none());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(!Iec61850Error::from(ServiceError::timeout("t")).is_fatal());
        assert!(Iec61850Error::FrameInvalid("bad".into()).is_fatal());
    }
}
