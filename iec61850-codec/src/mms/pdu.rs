//! MMS PDU model

use iec61850_core::{
    BitString, DataAccessError, ObjectName, TypeDescription, Value, VariableDef,
};

/// GetNameList object class: named variables
pub const OBJECT_CLASS_NAMED_VARIABLE: u8 = 0;
/// GetNameList object class: named variable lists (data sets)
pub const OBJECT_CLASS_NAMED_VARIABLE_LIST: u8 = 2;
/// GetNameList object class: domains (logical devices)
pub const OBJECT_CLASS_DOMAIN: u8 = 9;

/// A complete MMS PDU
#[derive(Debug, Clone, PartialEq)]
pub enum MmsPdu {
    ConfirmedRequest {
        invoke_id: u32,
        request: ConfirmedRequest,
    },
    ConfirmedResponse {
        invoke_id: u32,
        response: ConfirmedResponse,
    },
    ConfirmedError {
        invoke_id: u32,
        error: ServiceErrorPdu,
    },
    InformationReport(InformationReport),
    Reject(RejectPdu),
    InitiateRequest(InitiateParameters),
    InitiateResponse(InitiateParameters),
    InitiateError(ServiceErrorPdu),
    ConcludeRequest,
    ConcludeResponse,
}

impl MmsPdu {
    /// Invoke id of confirmed PDUs and rejects that carry one
    pub fn invoke_id(&self) -> Option<u32> {
        match self {
            MmsPdu::ConfirmedRequest { invoke_id, .. }
            | MmsPdu::ConfirmedResponse { invoke_id, .. }
            | MmsPdu::ConfirmedError { invoke_id, .. } => Some(*invoke_id),
            MmsPdu::Reject(reject) => reject.original_invoke_id,
            _ => None,
        }
    }
}

/// Initiate request/response parameters
#[derive(Debug, Clone, PartialEq)]
pub struct InitiateParameters {
    pub local_detail: Option<u32>,
    pub max_serv_outstanding_calling: u16,
    pub max_serv_outstanding_called: u16,
    pub data_structure_nesting_level: Option<u8>,
    pub version_number: u16,
    pub parameter_cbb: BitString,
    pub services_supported: BitString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectScope {
    VmdSpecific,
    DomainSpecific(String),
    AaSpecific,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetNameListRequest {
    pub object_class: u8,
    pub object_scope: ObjectScope,
    pub continue_after: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetNameListResponse {
    pub identifiers: Vec<String>,
    pub more_follows: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VariableAccessSpecification {
    ListOfVariable(Vec<VariableDef>),
    VariableListName(ObjectName),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccessResult {
    Success(Value),
    Failure(DataAccessError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadRequest {
    pub specification_with_result: bool,
    pub variable_access_specification: VariableAccessSpecification,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadResponse {
    pub variable_access_specification: Option<VariableAccessSpecification>,
    pub results: Vec<AccessResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub variable_access_specification: VariableAccessSpecification,
    pub data: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteResult {
    Success,
    Failure(DataAccessError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetVariableAccessAttributesResponse {
    pub mms_deletable: bool,
    pub type_description: TypeDescription,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefineNamedVariableListRequest {
    pub variable_list_name: ObjectName,
    pub variables: Vec<VariableDef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedVariableListAttributes {
    pub mms_deletable: bool,
    pub variables: Vec<VariableDef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteNamedVariableListRequest {
    /// 0 specific, 1 aa-specific, 2 domain, 3 vmd
    pub scope_of_delete: u8,
    pub names: Vec<ObjectName>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteNamedVariableListResponse {
    pub number_matched: u32,
    pub number_deleted: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttributes {
    pub size_of_file: u32,
    /// GeneralizedTime, `YYYYMMDDhhmmss.fffZ`
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOpenRequest {
    pub file_name: String,
    pub initial_position: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOpenResponse {
    pub frsm_id: i32,
    pub attributes: FileAttributes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReadResponse {
    pub data: Vec<u8>,
    pub more_follows: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDirectoryRequest {
    pub file_specification: Option<String>,
    pub continue_after: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub file_name: String,
    pub attributes: FileAttributes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDirectoryResponse {
    pub entries: Vec<DirectoryEntry>,
    pub more_follows: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmedRequest {
    GetNameList(GetNameListRequest),
    Read(ReadRequest),
    Write(WriteRequest),
    GetVariableAccessAttributes(ObjectName),
    DefineNamedVariableList(DefineNamedVariableListRequest),
    GetNamedVariableListAttributes(ObjectName),
    DeleteNamedVariableList(DeleteNamedVariableListRequest),
    FileOpen(FileOpenRequest),
    FileRead(i32),
    FileClose(i32),
    FileDirectory(FileDirectoryRequest),
    FileDelete(String),
}

impl ConfirmedRequest {
    pub fn name(&self) -> &'static str {
        match self {
            ConfirmedRequest::GetNameList(_) => "getNameList",
            ConfirmedRequest::Read(_) => "read",
            ConfirmedRequest::Write(_) => "write",
            ConfirmedRequest::GetVariableAccessAttributes(_) => "getVariableAccessAttributes",
            ConfirmedRequest::DefineNamedVariableList(_) => "defineNamedVariableList",
            ConfirmedRequest::GetNamedVariableListAttributes(_) => {
                "getNamedVariableListAttributes"
            }
            ConfirmedRequest::DeleteNamedVariableList(_) => "deleteNamedVariableList",
            ConfirmedRequest::FileOpen(_) => "fileOpen",
            ConfirmedRequest::FileRead(_) => "fileRead",
            ConfirmedRequest::FileClose(_) => "fileClose",
            ConfirmedRequest::FileDirectory(_) => "fileDirectory",
            ConfirmedRequest::FileDelete(_) => "fileDelete",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmedResponse {
    GetNameList(GetNameListResponse),
    Read(ReadResponse),
    Write(Vec<WriteResult>),
    GetVariableAccessAttributes(GetVariableAccessAttributesResponse),
    DefineNamedVariableList,
    GetNamedVariableListAttributes(NamedVariableListAttributes),
    DeleteNamedVariableList(DeleteNamedVariableListResponse),
    FileOpen(FileOpenResponse),
    FileRead(FileReadResponse),
    FileClose,
    FileDirectory(FileDirectoryResponse),
    FileDelete,
}

/// MMS service error classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorClass {
    VmdState = 0,
    ApplicationReference = 1,
    Definition = 2,
    Resource = 3,
    Service = 4,
    ServicePreempt = 5,
    TimeResolution = 6,
    Access = 7,
    Initiate = 8,
    Conclude = 9,
    Cancel = 10,
    File = 11,
    Others = 12,
}

impl ErrorClass {
    pub fn from_tag(tag: u32) -> Option<Self> {
        let class = match tag {
            0 => Self::VmdState,
            1 => Self::ApplicationReference,
            2 => Self::Definition,
            3 => Self::Resource,
            4 => Self::Service,
            5 => Self::ServicePreempt,
            6 => Self::TimeResolution,
            7 => Self::Access,
            8 => Self::Initiate,
            9 => Self::Conclude,
            10 => Self::Cancel,
            11 => Self::File,
            12 => Self::Others,
            _ => return None,
        };
        Some(class)
    }
}

/// Access class code: object non-existent
pub const ACCESS_OBJECT_NON_EXISTENT: i64 = 2;
/// Access class code: object access denied
pub const ACCESS_OBJECT_ACCESS_DENIED: i64 = 3;
/// File class code: file non-existent
pub const FILE_NON_EXISTENT: i64 = 7;

/// Service error carried by confirmed-error and initiate-error PDUs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceErrorPdu {
    pub class: ErrorClass,
    pub code: i64,
    pub additional_description: Option<String>,
}

impl ServiceErrorPdu {
    pub fn new(class: ErrorClass, code: i64, additional_description: Option<String>) -> Self {
        Self {
            class,
            code,
            additional_description,
        }
    }
}

/// Reject reason, tagged by the kind of PDU that was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    ConfirmedRequestPdu(i64),
    ConfirmedResponsePdu(i64),
    ConfirmedErrorPdu(i64),
    UnconfirmedPdu(i64),
    /// 0 unknown-pdu-type, 1 invalid-pdu, 2 illegal-acse-mapping
    PduError(i64),
    Other { tag: u32, code: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectPdu {
    pub original_invoke_id: Option<u32>,
    pub reason: RejectReason,
}

/// Unsolicited information report
#[derive(Debug, Clone, PartialEq)]
pub struct InformationReport {
    pub variable_access_specification: VariableAccessSpecification,
    pub results: Vec<AccessResult>,
}
