//! MMS PDU decoder

use super::data::{decode_data, decode_data_content};
use super::pdu::*;
use super::type_description::decode_type_description;
use crate::ber::decoder::{decode_integer_value, decode_string_value, decode_unsigned_value, narrow};
use crate::ber::{BerDecoder, BerTag, BerTagClass};
use iec61850_core::{
    AlternateAccess, BitString, DataAccessError, Iec61850Error, Iec61850Result, ObjectName,
    VariableDef,
};

/// Decode one PDU from its BER representation
///
/// # Errors
///
/// Returns `Decoding` on malformed input or unsupported services
pub fn decode_pdu(bytes: &[u8]) -> Iec61850Result<MmsPdu> {
    let mut decoder = BerDecoder::new(bytes);
    let (tag, content) = decoder.decode_tlv()?;
    if tag.class() != BerTagClass::ContextSpecific {
        return Err(Iec61850Error::Decoding(format!("unexpected PDU tag {:?}", tag)));
    }
    let mut seq = BerDecoder::new(content);

    let pdu = match tag.number() {
        0 => {
            let invoke_id = narrow(seq.decode_unsigned(BerTag::INTEGER)?)?;
            MmsPdu::ConfirmedRequest {
                invoke_id,
                request: decode_confirmed_request(&mut seq)?,
            }
        }
        1 => {
            let invoke_id = narrow(seq.decode_unsigned(BerTag::INTEGER)?)?;
            MmsPdu::ConfirmedResponse {
                invoke_id,
                response: decode_confirmed_response(&mut seq)?,
            }
        }
        2 => {
            let invoke_id = narrow(seq.decode_unsigned(BerTag::context(0))?)?;
            seq.optional(BerTag::context(1))?;
            let mut error = seq.expect_constructed(BerTag::context_constructed(2))?;
            MmsPdu::ConfirmedError {
                invoke_id,
                error: decode_service_error(&mut error)?,
            }
        }
        3 => {
            let mut info = seq.expect_constructed(BerTag::context_constructed(0))?;
            let variable_access_specification = decode_variable_access_specification(&mut info)?;
            let mut list = info.expect_constructed(BerTag::context_constructed(0))?;
            MmsPdu::InformationReport(InformationReport {
                variable_access_specification,
                results: decode_access_results(&mut list)?,
            })
        }
        4 => {
            let original_invoke_id = seq
                .optional(BerTag::context(0))?
                .map(decode_unsigned_value)
                .transpose()?
                .map(narrow)
                .transpose()?;
            let (reason_tag, reason_content) = seq.decode_tlv()?;
            let code = decode_integer_value(reason_content)?;
            let reason = match reason_tag.number() {
                1 => RejectReason::ConfirmedRequestPdu(code),
                2 => RejectReason::ConfirmedResponsePdu(code),
                3 => RejectReason::ConfirmedErrorPdu(code),
                4 => RejectReason::UnconfirmedPdu(code),
                5 => RejectReason::PduError(code),
                tag => RejectReason::Other { tag, code },
            };
            MmsPdu::Reject(RejectPdu {
                original_invoke_id,
                reason,
            })
        }
        8 => MmsPdu::InitiateRequest(decode_initiate(&mut seq)?),
        9 => MmsPdu::InitiateResponse(decode_initiate(&mut seq)?),
        10 => MmsPdu::InitiateError(decode_service_error(&mut seq)?),
        11 => MmsPdu::ConcludeRequest,
        12 => MmsPdu::ConcludeResponse,
        other => {
            return Err(Iec61850Error::Decoding(format!(
                "unsupported PDU type [{}]",
                other
            )));
        }
    };
    Ok(pdu)
}

fn decode_initiate(seq: &mut BerDecoder<'_>) -> Iec61850Result<InitiateParameters> {
    let local_detail = seq
        .optional(BerTag::context(0))?
        .map(decode_unsigned_value)
        .transpose()?
        .map(narrow)
        .transpose()?;
    let max_serv_outstanding_calling = narrow(seq.decode_unsigned(BerTag::context(1))?)?;
    let max_serv_outstanding_called = narrow(seq.decode_unsigned(BerTag::context(2))?)?;
    let data_structure_nesting_level = seq
        .optional(BerTag::context(3))?
        .map(decode_unsigned_value)
        .transpose()?
        .map(narrow)
        .transpose()?;
    let mut detail = seq.expect_constructed(BerTag::context_constructed(4))?;
    let version_number = narrow(detail.decode_unsigned(BerTag::context(0))?)?;
    let parameter_cbb = decode_bit_string(detail.expect(BerTag::context(1))?)?;
    let services_supported = decode_bit_string(detail.expect(BerTag::context(2))?)?;
    Ok(InitiateParameters {
        local_detail,
        max_serv_outstanding_calling,
        max_serv_outstanding_called,
        data_structure_nesting_level,
        version_number,
        parameter_cbb,
        services_supported,
    })
}

fn decode_bit_string(content: &[u8]) -> Iec61850Result<BitString> {
    match decode_data_content(BerTag::context(4), content)? {
        iec61850_core::Value::BitString(bits) => Ok(bits),
        _ => Err(Iec61850Error::Decoding("expected bit string".to_string())),
    }
}

fn decode_service_error(seq: &mut BerDecoder<'_>) -> Iec61850Result<ServiceErrorPdu> {
    let mut class = seq.expect_constructed(BerTag::context_constructed(0))?;
    let (class_tag, code) = class.decode_tlv()?;
    let class = ErrorClass::from_tag(class_tag.number()).ok_or_else(|| {
        Iec61850Error::Decoding(format!("unknown error class [{}]", class_tag.number()))
    })?;
    let code = decode_integer_value(code)?;
    seq.optional(BerTag::context(1))?;
    let additional_description = seq
        .optional(BerTag::context(2))?
        .map(decode_string_value)
        .transpose()?;
    Ok(ServiceErrorPdu {
        class,
        code,
        additional_description,
    })
}

pub(crate) fn decode_object_name(decoder: &mut BerDecoder<'_>) -> Iec61850Result<ObjectName> {
    let (tag, content) = decoder.decode_tlv()?;
    match tag.number() {
        0 => Ok(ObjectName::VmdSpecific(decode_string_value(content)?)),
        1 => {
            let mut seq = BerDecoder::new(content);
            let domain_id = seq.decode_string(BerTag::VISIBLE_STRING)?;
            let item_id = seq.decode_string(BerTag::VISIBLE_STRING)?;
            Ok(ObjectName::DomainSpecific { domain_id, item_id })
        }
        2 => Ok(ObjectName::AaSpecific(decode_string_value(content)?)),
        other => Err(Iec61850Error::Decoding(format!(
            "unknown object name choice [{}]",
            other
        ))),
    }
}

fn decode_variable_def(decoder: &mut BerDecoder<'_>) -> Iec61850Result<VariableDef> {
    let mut seq = decoder.expect_constructed(BerTag::SEQUENCE)?;
    let mut spec = seq.expect_constructed(BerTag::context_constructed(0))?;
    let name = decode_object_name(&mut spec)?;
    let alternate_access = match seq.optional(BerTag::context_constructed(5))? {
        Some(content) => Some(decode_alternate_access(content)?),
        None => None,
    };
    Ok(VariableDef {
        name,
        alternate_access,
    })
}

fn decode_alternate_access(content: &[u8]) -> Iec61850Result<AlternateAccess> {
    let mut alt = BerDecoder::new(content);
    let (tag, value) = alt.decode_tlv()?;
    match (tag.number(), tag.is_constructed()) {
        (2, false) => Ok(AlternateAccess {
            index: narrow(decode_unsigned_value(value)?)?,
            component: None,
        }),
        (0, true) => {
            let mut select = BerDecoder::new(value);
            let index = narrow(select.decode_unsigned(BerTag::context(1))?)?;
            let mut nested = select.expect_constructed(BerTag::SEQUENCE)?;
            let component = nested.decode_string(BerTag::context(1))?;
            Ok(AlternateAccess {
                index,
                component: Some(component),
            })
        }
        _ => Err(Iec61850Error::Decoding(format!(
            "unsupported alternate access {:?}",
            tag
        ))),
    }
}

fn decode_variable_defs(decoder: &mut BerDecoder<'_>) -> Iec61850Result<Vec<VariableDef>> {
    let mut defs = Vec::new();
    while decoder.has_remaining() {
        defs.push(decode_variable_def(decoder)?);
    }
    Ok(defs)
}

fn decode_variable_access_specification(
    decoder: &mut BerDecoder<'_>,
) -> Iec61850Result<VariableAccessSpecification> {
    let (tag, content) = decoder.decode_tlv()?;
    let mut inner = BerDecoder::new(content);
    match tag.number() {
        0 => Ok(VariableAccessSpecification::ListOfVariable(
            decode_variable_defs(&mut inner)?,
        )),
        1 => Ok(VariableAccessSpecification::VariableListName(
            decode_object_name(&mut inner)?,
        )),
        other => Err(Iec61850Error::Decoding(format!(
            "unknown variable access specification [{}]",
            other
        ))),
    }
}

fn decode_access_results(decoder: &mut BerDecoder<'_>) -> Iec61850Result<Vec<AccessResult>> {
    let mut results = Vec::new();
    while decoder.has_remaining() {
        let (tag, content) = decoder.decode_tlv()?;
        if tag == BerTag::context(0) {
            results.push(AccessResult::Failure(DataAccessError::from_code(
                decode_integer_value(content)?,
            )));
        } else {
            results.push(AccessResult::Success(decode_data_content(tag, content)?));
        }
    }
    Ok(results)
}

fn decode_file_name(content: &[u8]) -> Iec61850Result<String> {
    let mut seq = BerDecoder::new(content);
    let mut parts = Vec::new();
    while seq.has_remaining() {
        parts.push(seq.decode_string(BerTag::GRAPHIC_STRING)?);
    }
    Ok(parts.concat())
}

fn decode_file_attributes(content: &[u8]) -> Iec61850Result<FileAttributes> {
    let mut seq = BerDecoder::new(content);
    let size_of_file = narrow(seq.decode_unsigned(BerTag::context(0))?)?;
    let last_modified = seq
        .optional(BerTag::context(1))?
        .map(decode_string_value)
        .transpose()?;
    Ok(FileAttributes {
        size_of_file,
        last_modified,
    })
}

fn decode_confirmed_request(seq: &mut BerDecoder<'_>) -> Iec61850Result<ConfirmedRequest> {
    let (tag, content) = seq.decode_tlv()?;
    let mut s = BerDecoder::new(content);
    let request = match tag.number() {
        1 => {
            let mut class = s.expect_constructed(BerTag::context_constructed(0))?;
            let object_class = narrow(class.decode_integer(BerTag::context(0))?)?;
            let mut scope = s.expect_constructed(BerTag::context_constructed(1))?;
            let (scope_tag, scope_content) = scope.decode_tlv()?;
            let object_scope = match scope_tag.number() {
                0 => ObjectScope::VmdSpecific,
                1 => ObjectScope::DomainSpecific(decode_string_value(scope_content)?),
                _ => ObjectScope::AaSpecific,
            };
            let continue_after = s
                .optional(BerTag::context(2))?
                .map(decode_string_value)
                .transpose()?;
            ConfirmedRequest::GetNameList(GetNameListRequest {
                object_class,
                object_scope,
                continue_after,
            })
        }
        4 => {
            let specification_with_result = s
                .optional(BerTag::context(0))?
                .map(|v| v.first().is_some_and(|b| *b != 0))
                .unwrap_or(false);
            let mut vas = s.expect_constructed(BerTag::context_constructed(1))?;
            ConfirmedRequest::Read(ReadRequest {
                specification_with_result,
                variable_access_specification: decode_variable_access_specification(&mut vas)?,
            })
        }
        5 => {
            let variable_access_specification = decode_variable_access_specification(&mut s)?;
            let mut list = s.expect_constructed(BerTag::context_constructed(0))?;
            let mut data = Vec::new();
            while list.has_remaining() {
                data.push(decode_data(&mut list)?);
            }
            ConfirmedRequest::Write(WriteRequest {
                variable_access_specification,
                data,
            })
        }
        6 => {
            let mut name = s.expect_constructed(BerTag::context_constructed(0))?;
            ConfirmedRequest::GetVariableAccessAttributes(decode_object_name(&mut name)?)
        }
        11 => {
            let variable_list_name = decode_object_name(&mut s)?;
            let mut list = s.expect_constructed(BerTag::context_constructed(0))?;
            ConfirmedRequest::DefineNamedVariableList(DefineNamedVariableListRequest {
                variable_list_name,
                variables: decode_variable_defs(&mut list)?,
            })
        }
        12 => ConfirmedRequest::GetNamedVariableListAttributes(decode_object_name(&mut s)?),
        13 => {
            let scope_of_delete = s
                .optional(BerTag::context(0))?
                .map(decode_integer_value)
                .transpose()?
                .map(narrow)
                .transpose()?
                .unwrap_or(0);
            let mut names = Vec::new();
            if let Some(content) = s.optional(BerTag::context_constructed(1))? {
                let mut list = BerDecoder::new(content);
                while list.has_remaining() {
                    names.push(decode_object_name(&mut list)?);
                }
            }
            ConfirmedRequest::DeleteNamedVariableList(DeleteNamedVariableListRequest {
                scope_of_delete,
                names,
            })
        }
        72 => {
            let file_name = decode_file_name(s.expect(BerTag::context_constructed(0))?)?;
            let initial_position = narrow(s.decode_unsigned(BerTag::context(1))?)?;
            ConfirmedRequest::FileOpen(FileOpenRequest {
                file_name,
                initial_position,
            })
        }
        73 => ConfirmedRequest::FileRead(narrow(decode_integer_value(content)?)?),
        74 => ConfirmedRequest::FileClose(narrow(decode_integer_value(content)?)?),
        76 => ConfirmedRequest::FileDelete(decode_file_name(content)?),
        77 => {
            let file_specification = s
                .optional(BerTag::context_constructed(0))?
                .map(decode_file_name)
                .transpose()?;
            let continue_after = s
                .optional(BerTag::context_constructed(1))?
                .map(decode_file_name)
                .transpose()?;
            ConfirmedRequest::FileDirectory(FileDirectoryRequest {
                file_specification,
                continue_after,
            })
        }
        other => {
            return Err(Iec61850Error::Decoding(format!(
                "unsupported confirmed service request [{}]",
                other
            )));
        }
    };
    Ok(request)
}

fn decode_confirmed_response(seq: &mut BerDecoder<'_>) -> Iec61850Result<ConfirmedResponse> {
    let (tag, content) = seq.decode_tlv()?;
    let mut s = BerDecoder::new(content);
    let response = match tag.number() {
        1 => {
            let mut list = s.expect_constructed(BerTag::context_constructed(0))?;
            let mut identifiers = Vec::new();
            while list.has_remaining() {
                identifiers.push(list.decode_string(BerTag::VISIBLE_STRING)?);
            }
            let more_follows = match s.optional(BerTag::context(1))? {
                Some(v) => v.first().is_some_and(|b| *b != 0),
                None => true,
            };
            ConfirmedResponse::GetNameList(GetNameListResponse {
                identifiers,
                more_follows,
            })
        }
        4 => {
            let variable_access_specification =
                match s.optional(BerTag::context_constructed(0))? {
                    Some(content) => Some(decode_variable_access_specification(
                        &mut BerDecoder::new(content),
                    )?),
                    None => None,
                };
            let mut list = s.expect_constructed(BerTag::context_constructed(1))?;
            ConfirmedResponse::Read(ReadResponse {
                variable_access_specification,
                results: decode_access_results(&mut list)?,
            })
        }
        5 => {
            let mut results = Vec::new();
            while s.has_remaining() {
                let (result_tag, result) = s.decode_tlv()?;
                if result_tag.number() == 0 {
                    results.push(WriteResult::Failure(DataAccessError::from_code(
                        decode_integer_value(result)?,
                    )));
                } else {
                    results.push(WriteResult::Success);
                }
            }
            ConfirmedResponse::Write(results)
        }
        6 => {
            let mms_deletable = s.decode_boolean(BerTag::context(0))?;
            s.optional(BerTag::context_constructed(1))?;
            let mut td = s.expect_constructed(BerTag::context_constructed(2))?;
            ConfirmedResponse::GetVariableAccessAttributes(GetVariableAccessAttributesResponse {
                mms_deletable,
                type_description: decode_type_description(&mut td)?,
            })
        }
        11 => ConfirmedResponse::DefineNamedVariableList,
        12 => {
            let mms_deletable = s.decode_boolean(BerTag::context(0))?;
            let mut list = s.expect_constructed(BerTag::context_constructed(1))?;
            ConfirmedResponse::GetNamedVariableListAttributes(NamedVariableListAttributes {
                mms_deletable,
                variables: decode_variable_defs(&mut list)?,
            })
        }
        13 => {
            let number_matched = narrow(s.decode_unsigned(BerTag::context(0))?)?;
            let number_deleted = narrow(s.decode_unsigned(BerTag::context(1))?)?;
            ConfirmedResponse::DeleteNamedVariableList(DeleteNamedVariableListResponse {
                number_matched,
                number_deleted,
            })
        }
        72 => {
            let frsm_id = narrow(s.decode_integer(BerTag::context(0))?)?;
            let attributes = decode_file_attributes(s.expect(BerTag::context_constructed(1))?)?;
            ConfirmedResponse::FileOpen(FileOpenResponse {
                frsm_id,
                attributes,
            })
        }
        73 => {
            let data = s.expect(BerTag::context(0))?.to_vec();
            let more_follows = match s.optional(BerTag::context(1))? {
                Some(v) => v.first().is_some_and(|b| *b != 0),
                None => true,
            };
            ConfirmedResponse::FileRead(FileReadResponse { data, more_follows })
        }
        74 => ConfirmedResponse::FileClose,
        76 => ConfirmedResponse::FileDelete,
        77 => {
            let mut entries = Vec::new();
            if let Some(content) = s.optional(BerTag::context_constructed(0))? {
                let mut list = BerDecoder::new(content);
                while list.has_remaining() {
                    let mut entry = list.expect_constructed(BerTag::SEQUENCE)?;
                    let file_name = decode_file_name(entry.expect(BerTag::context_constructed(0))?)?;
                    let attributes =
                        decode_file_attributes(entry.expect(BerTag::context_constructed(1))?)?;
                    entries.push(DirectoryEntry {
                        file_name,
                        attributes,
                    });
                }
            }
            let more_follows = s
                .optional(BerTag::context(1))?
                .is_some_and(|v| v.first().is_some_and(|b| *b != 0));
            ConfirmedResponse::FileDirectory(FileDirectoryResponse {
                entries,
                more_follows,
            })
        }
        other => {
            return Err(Iec61850Error::Decoding(format!(
                "unsupported confirmed service response [{}]",
                other
            )));
        }
    };
    Ok(response)
}
