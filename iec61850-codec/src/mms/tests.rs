use super::*;
use crate::mms::pdu::*;
use iec61850_core::{
    AlternateAccess, BitString, DataAccessError, ObjectName, TypeDescription, Value, VariableDef,
};

fn round_trip(pdu: MmsPdu) {
    let bytes = encode_pdu(&pdu).unwrap();
    assert_eq!(decode_pdu(&bytes).unwrap(), pdu);
}

#[test]
fn test_read_request_with_alternate_access() {
    round_trip(MmsPdu::ConfirmedRequest {
        invoke_id: 7,
        request: ConfirmedRequest::Read(ReadRequest {
            specification_with_result: false,
            variable_access_specification: VariableAccessSpecification::ListOfVariable(vec![
                VariableDef::new(ObjectName::domain_specific("LD0", "MMXU1$MX$TotW")),
                VariableDef {
                    name: ObjectName::domain_specific("LD0", "GGIO1$ST$Arr"),
                    alternate_access: Some(AlternateAccess {
                        index: 2,
                        component: Some("mag$f".to_string()),
                    }),
                },
            ]),
        }),
    });
}

#[test]
fn test_confirmed_request_bytes() {
    let pdu = MmsPdu::ConfirmedRequest {
        invoke_id: 1,
        request: ConfirmedRequest::GetNameList(GetNameListRequest {
            object_class: OBJECT_CLASS_DOMAIN,
            object_scope: ObjectScope::VmdSpecific,
            continue_after: None,
        }),
    };
    let bytes = encode_pdu(&pdu).unwrap();
    assert_eq!(
        bytes,
        vec![0xA0, 0x0E, 0x02, 0x01, 0x01, 0xA1, 0x09, 0xA0, 0x03, 0x80, 0x01, 0x09, 0xA1, 0x02, 0x80, 0x00]
    );
}

#[test]
fn test_information_report() {
    round_trip(MmsPdu::InformationReport(InformationReport {
        variable_access_specification: VariableAccessSpecification::VariableListName(
            ObjectName::VmdSpecific("RPT".to_string()),
        ),
        results: vec![
            AccessResult::Success(Value::VisibleString("rpt1".to_string())),
            AccessResult::Success(Value::BitString(BitString::from_bits(&[
                false, true, false, false, true, false, false, false, false, false,
            ]))),
            AccessResult::Success(Value::float32(3.5)),
        ],
    }));
}

#[test]
fn test_write_response_and_errors() {
    round_trip(MmsPdu::ConfirmedResponse {
        invoke_id: 300,
        response: ConfirmedResponse::Write(vec![
            WriteResult::Success,
            WriteResult::Failure(DataAccessError::ObjectAccessDenied),
        ]),
    });
    round_trip(MmsPdu::ConfirmedError {
        invoke_id: 3,
        error: ServiceErrorPdu::new(ErrorClass::Access, 3, Some("denied".to_string())),
    });
    round_trip(MmsPdu::Reject(RejectPdu {
        original_invoke_id: Some(9),
        reason: RejectReason::PduError(1),
    }));
}

#[test]
fn test_initiate_and_conclude() {
    round_trip(MmsPdu::InitiateRequest(InitiateParameters {
        local_detail: Some(65000),
        max_serv_outstanding_calling: 5,
        max_serv_outstanding_called: 5,
        data_structure_nesting_level: Some(10),
        version_number: 1,
        parameter_cbb: BitString::new(vec![0xF1, 0x00], 11).unwrap(),
        services_supported: BitString::new(vec![0xEE, 0x1C, 0, 0, 0x04, 0x08, 0, 0, 0x79, 0xEF, 0x18], 85)
            .unwrap(),
    }));
    assert_eq!(encode_pdu(&MmsPdu::ConcludeRequest).unwrap(), vec![0x8B, 0x00]);
    round_trip(MmsPdu::ConcludeResponse);
}

#[test]
fn test_type_description_response() {
    round_trip(MmsPdu::ConfirmedResponse {
        invoke_id: 4,
        response: ConfirmedResponse::GetVariableAccessAttributes(
            GetVariableAccessAttributesResponse {
                mms_deletable: false,
                type_description: TypeDescription::VisibleString(-255),
            },
        ),
    });
}

#[test]
fn test_file_services() {
    round_trip(MmsPdu::ConfirmedRequest {
        invoke_id: 11,
        request: ConfirmedRequest::FileOpen(FileOpenRequest {
            file_name: "COMTRADE/rec1.cfg".to_string(),
            initial_position: 0,
        }),
    });
    round_trip(MmsPdu::ConfirmedResponse {
        invoke_id: 12,
        response: ConfirmedResponse::FileDirectory(FileDirectoryResponse {
            entries: vec![DirectoryEntry {
                file_name: "a.txt".to_string(),
                attributes: FileAttributes {
                    size_of_file: 42,
                    last_modified: Some("20240101120000.000Z".to_string()),
                },
            }],
            more_follows: false,
        }),
    });
    round_trip(MmsPdu::ConfirmedResponse {
        invoke_id: 13,
        response: ConfirmedResponse::FileRead(FileReadResponse {
            data: vec![1, 2, 3],
            more_follows: true,
        }),
    });
}

#[test]
fn test_truncated_pdu_is_rejected() {
    let bytes = encode_pdu(&MmsPdu::ConcludeResponse).unwrap();
    assert!(decode_pdu(&bytes[..1]).is_err());
    assert!(decode_pdu(&[0x30, 0x00]).is_err());
}

#[test]
fn test_out_of_range_integers_are_rejected() {
    // invoke id 2^32
    let bytes = [0xA0, 0x07, 0x02, 0x05, 0x01, 0x00, 0x00, 0x00, 0x00];
    let error = decode_pdu(&bytes).unwrap_err();
    assert!(matches!(error, iec61850_core::Iec61850Error::Decoding(_)));
}
