//! MMS PDU encoder

use super::data::encode_data;
use super::pdu::*;
use super::type_description::encode_type_description;
use crate::ber::{BerEncoder, BerTag};
use iec61850_core::{Iec61850Result, ObjectName, VariableDef};

/// Encode a PDU into its BER representation
///
/// # Errors
///
/// Returns `Encoding` if a carried value cannot be represented
pub fn encode_pdu(pdu: &MmsPdu) -> Iec61850Result<Vec<u8>> {
    let mut encoder = BerEncoder::with_capacity(256);
    match pdu {
        MmsPdu::ConfirmedRequest { invoke_id, request } => {
            encoder.encode_constructed(BerTag::context_constructed(0), |seq| {
                seq.encode_unsigned(BerTag::INTEGER, *invoke_id as u64);
                encode_confirmed_request(seq, request)
            })?
        }
        MmsPdu::ConfirmedResponse {
            invoke_id,
            response,
        } => encoder.encode_constructed(BerTag::context_constructed(1), |seq| {
            seq.encode_unsigned(BerTag::INTEGER, *invoke_id as u64);
            encode_confirmed_response(seq, response)
        })?,
        MmsPdu::ConfirmedError { invoke_id, error } => {
            encoder.encode_constructed(BerTag::context_constructed(2), |seq| {
                seq.encode_unsigned(BerTag::context(0), *invoke_id as u64);
                seq.encode_constructed(BerTag::context_constructed(2), |e| {
                    encode_service_error(e, error)
                })
            })?
        }
        MmsPdu::InformationReport(report) => {
            encoder.encode_constructed(BerTag::context_constructed(3), |seq| {
                seq.encode_constructed(BerTag::context_constructed(0), |info| {
                    encode_variable_access_specification(info, &report.variable_access_specification)?;
                    info.encode_constructed(BerTag::context_constructed(0), |list| {
                        encode_access_results(list, &report.results)
                    })
                })
            })?
        }
        MmsPdu::Reject(reject) => encoder.encode_constructed(BerTag::context_constructed(4), |seq| {
            if let Some(invoke_id) = reject.original_invoke_id {
                seq.encode_unsigned(BerTag::context(0), invoke_id as u64);
            }
            let (tag, code) = match reject.reason {
                RejectReason::ConfirmedRequestPdu(code) => (1, code),
                RejectReason::ConfirmedResponsePdu(code) => (2, code),
                RejectReason::ConfirmedErrorPdu(code) => (3, code),
                RejectReason::UnconfirmedPdu(code) => (4, code),
                RejectReason::PduError(code) => (5, code),
                RejectReason::Other { tag, code } => (tag, code),
            };
            seq.encode_integer(BerTag::context(tag), code);
            Ok(())
        })?,
        MmsPdu::InitiateRequest(params) => encoder
            .encode_constructed(BerTag::context_constructed(8), |seq| {
                encode_initiate(seq, params)
            })?,
        MmsPdu::InitiateResponse(params) => encoder
            .encode_constructed(BerTag::context_constructed(9), |seq| {
                encode_initiate(seq, params)
            })?,
        MmsPdu::InitiateError(error) => encoder
            .encode_constructed(BerTag::context_constructed(10), |seq| {
                encode_service_error(seq, error)
            })?,
        MmsPdu::ConcludeRequest => encoder.encode_null(BerTag::context(11)),
        MmsPdu::ConcludeResponse => encoder.encode_null(BerTag::context(12)),
    }
    Ok(encoder.into_bytes())
}

fn encode_initiate(seq: &mut BerEncoder, params: &InitiateParameters) -> Iec61850Result<()> {
    if let Some(local_detail) = params.local_detail {
        seq.encode_unsigned(BerTag::context(0), local_detail as u64);
    }
    seq.encode_unsigned(BerTag::context(1), params.max_serv_outstanding_calling as u64);
    seq.encode_unsigned(BerTag::context(2), params.max_serv_outstanding_called as u64);
    if let Some(level) = params.data_structure_nesting_level {
        seq.encode_unsigned(BerTag::context(3), level as u64);
    }
    seq.encode_constructed(BerTag::context_constructed(4), |detail| {
        detail.encode_unsigned(BerTag::context(0), params.version_number as u64);
        detail.encode_bit_string(
            BerTag::context(1),
            params.parameter_cbb.as_bytes(),
            params.parameter_cbb.num_bits(),
        );
        detail.encode_bit_string(
            BerTag::context(2),
            params.services_supported.as_bytes(),
            params.services_supported.num_bits(),
        );
        Ok(())
    })
}

fn encode_service_error(seq: &mut BerEncoder, error: &ServiceErrorPdu) -> Iec61850Result<()> {
    seq.encode_constructed(BerTag::context_constructed(0), |class| {
        class.encode_integer(BerTag::context(error.class as u32), error.code);
        Ok(())
    })?;
    if let Some(description) = &error.additional_description {
        seq.encode_string(BerTag::context(2), description);
    }
    Ok(())
}

pub(crate) fn encode_object_name(encoder: &mut BerEncoder, name: &ObjectName) -> Iec61850Result<()> {
    match name {
        ObjectName::VmdSpecific(id) => encoder.encode_string(BerTag::context(0), id),
        ObjectName::DomainSpecific { domain_id, item_id } => {
            encoder.encode_constructed(BerTag::context_constructed(1), |seq| {
                seq.encode_string(BerTag::VISIBLE_STRING, domain_id);
                seq.encode_string(BerTag::VISIBLE_STRING, item_id);
                Ok(())
            })?
        }
        ObjectName::AaSpecific(id) => encoder.encode_string(BerTag::context(2), id),
    }
    Ok(())
}

fn encode_variable_def(encoder: &mut BerEncoder, def: &VariableDef) -> Iec61850Result<()> {
    encoder.encode_constructed(BerTag::SEQUENCE, |seq| {
        seq.encode_constructed(BerTag::context_constructed(0), |spec| {
            encode_object_name(spec, &def.name)
        })?;
        if let Some(access) = &def.alternate_access {
            seq.encode_constructed(BerTag::context_constructed(5), |alt| match &access.component {
                None => {
                    alt.encode_unsigned(BerTag::context(2), access.index as u64);
                    Ok(())
                }
                Some(component) => {
                    alt.encode_constructed(BerTag::context_constructed(0), |select| {
                        select.encode_unsigned(BerTag::context(1), access.index as u64);
                        select.encode_constructed(BerTag::SEQUENCE, |nested| {
                            nested.encode_string(BerTag::context(1), component);
                            Ok(())
                        })
                    })
                }
            })?;
        }
        Ok(())
    })
}

fn encode_variable_defs(encoder: &mut BerEncoder, defs: &[VariableDef]) -> Iec61850Result<()> {
    defs.iter().try_for_each(|def| encode_variable_def(encoder, def))
}

fn encode_variable_access_specification(
    encoder: &mut BerEncoder,
    spec: &VariableAccessSpecification,
) -> Iec61850Result<()> {
    match spec {
        VariableAccessSpecification::ListOfVariable(defs) => encoder
            .encode_constructed(BerTag::context_constructed(0), |list| {
                encode_variable_defs(list, defs)
            }),
        VariableAccessSpecification::VariableListName(name) => encoder
            .encode_constructed(BerTag::context_constructed(1), |n| encode_object_name(n, name)),
    }
}

fn encode_access_results(encoder: &mut BerEncoder, results: &[AccessResult]) -> Iec61850Result<()> {
    for result in results {
        match result {
            AccessResult::Success(value) => encode_data(encoder, value)?,
            AccessResult::Failure(error) => {
                encoder.encode_integer(BerTag::context(0), error.code() as i64)
            }
        }
    }
    Ok(())
}

fn encode_file_name(encoder: &mut BerEncoder, tag: BerTag, name: &str) -> Iec61850Result<()> {
    encoder.encode_constructed(tag, |seq| {
        seq.encode_string(BerTag::GRAPHIC_STRING, name);
        Ok(())
    })
}

fn encode_file_attributes(encoder: &mut BerEncoder, attributes: &FileAttributes) -> Iec61850Result<()> {
    encoder.encode_constructed(BerTag::context_constructed(1), |seq| {
        seq.encode_unsigned(BerTag::context(0), attributes.size_of_file as u64);
        if let Some(time) = &attributes.last_modified {
            seq.encode_string(BerTag::context(1), time);
        }
        Ok(())
    })
}

fn encode_confirmed_request(seq: &mut BerEncoder, request: &ConfirmedRequest) -> Iec61850Result<()> {
    match request {
        ConfirmedRequest::GetNameList(req) => {
            seq.encode_constructed(BerTag::context_constructed(1), |s| {
                s.encode_constructed(BerTag::context_constructed(0), |class| {
                    class.encode_integer(BerTag::context(0), req.object_class as i64);
                    Ok(())
                })?;
                s.encode_constructed(BerTag::context_constructed(1), |scope| {
                    match &req.object_scope {
                        ObjectScope::VmdSpecific => scope.encode_null(BerTag::context(0)),
                        ObjectScope::DomainSpecific(domain) => {
                            scope.encode_string(BerTag::context(1), domain)
                        }
                        ObjectScope::AaSpecific => scope.encode_null(BerTag::context(2)),
                    }
                    Ok(())
                })?;
                if let Some(after) = &req.continue_after {
                    s.encode_string(BerTag::context(2), after);
                }
                Ok(())
            })
        }
        ConfirmedRequest::Read(req) => seq.encode_constructed(BerTag::context_constructed(4), |s| {
            if req.specification_with_result {
                s.encode_boolean(BerTag::context(0), true);
            }
            s.encode_constructed(BerTag::context_constructed(1), |vas| {
                encode_variable_access_specification(vas, &req.variable_access_specification)
            })
        }),
        ConfirmedRequest::Write(req) => seq.encode_constructed(BerTag::context_constructed(5), |s| {
            encode_variable_access_specification(s, &req.variable_access_specification)?;
            s.encode_constructed(BerTag::context_constructed(0), |list| {
                req.data.iter().try_for_each(|value| encode_data(list, value))
            })
        }),
        ConfirmedRequest::GetVariableAccessAttributes(name) => {
            seq.encode_constructed(BerTag::context_constructed(6), |s| {
                s.encode_constructed(BerTag::context_constructed(0), |n| encode_object_name(n, name))
            })
        }
        ConfirmedRequest::DefineNamedVariableList(req) => {
            seq.encode_constructed(BerTag::context_constructed(11), |s| {
                encode_object_name(s, &req.variable_list_name)?;
                s.encode_constructed(BerTag::context_constructed(0), |list| {
                    encode_variable_defs(list, &req.variables)
                })
            })
        }
        ConfirmedRequest::GetNamedVariableListAttributes(name) => seq
            .encode_constructed(BerTag::context_constructed(12), |s| encode_object_name(s, name)),
        ConfirmedRequest::DeleteNamedVariableList(req) => {
            seq.encode_constructed(BerTag::context_constructed(13), |s| {
                s.encode_integer(BerTag::context(0), req.scope_of_delete as i64);
                s.encode_constructed(BerTag::context_constructed(1), |list| {
                    req.names.iter().try_for_each(|n| encode_object_name(list, n))
                })
            })
        }
        ConfirmedRequest::FileOpen(req) => seq.encode_constructed(BerTag::context_constructed(72), |s| {
            encode_file_name(s, BerTag::context_constructed(0), &req.file_name)?;
            s.encode_unsigned(BerTag::context(1), req.initial_position as u64);
            Ok(())
        }),
        ConfirmedRequest::FileRead(frsm_id) => {
            seq.encode_integer(BerTag::context(73), *frsm_id as i64);
            Ok(())
        }
        ConfirmedRequest::FileClose(frsm_id) => {
            seq.encode_integer(BerTag::context(74), *frsm_id as i64);
            Ok(())
        }
        ConfirmedRequest::FileDirectory(req) => {
            seq.encode_constructed(BerTag::context_constructed(77), |s| {
                if let Some(spec) = &req.file_specification {
                    encode_file_name(s, BerTag::context_constructed(0), spec)?;
                }
                if let Some(after) = &req.continue_after {
                    encode_file_name(s, BerTag::context_constructed(1), after)?;
                }
                Ok(())
            })
        }
        ConfirmedRequest::FileDelete(name) => {
            encode_file_name(seq, BerTag::context_constructed(76), name)
        }
    }
}

fn encode_confirmed_response(
    seq: &mut BerEncoder,
    response: &ConfirmedResponse,
) -> Iec61850Result<()> {
    match response {
        ConfirmedResponse::GetNameList(res) => {
            seq.encode_constructed(BerTag::context_constructed(1), |s| {
                s.encode_constructed(BerTag::context_constructed(0), |list| {
                    for id in &res.identifiers {
                        list.encode_string(BerTag::VISIBLE_STRING, id);
                    }
                    Ok(())
                })?;
                s.encode_boolean(BerTag::context(1), res.more_follows);
                Ok(())
            })
        }
        ConfirmedResponse::Read(res) => seq.encode_constructed(BerTag::context_constructed(4), |s| {
            if let Some(spec) = &res.variable_access_specification {
                s.encode_constructed(BerTag::context_constructed(0), |vas| {
                    encode_variable_access_specification(vas, spec)
                })?;
            }
            s.encode_constructed(BerTag::context_constructed(1), |list| {
                encode_access_results(list, &res.results)
            })
        }),
        ConfirmedResponse::Write(results) => {
            seq.encode_constructed(BerTag::context_constructed(5), |s| {
                for result in results {
                    match result {
                        WriteResult::Success => s.encode_null(BerTag::context(1)),
                        WriteResult::Failure(error) => {
                            s.encode_integer(BerTag::context(0), error.code() as i64)
                        }
                    }
                }
                Ok(())
            })
        }
        ConfirmedResponse::GetVariableAccessAttributes(res) => {
            seq.encode_constructed(BerTag::context_constructed(6), |s| {
                s.encode_boolean(BerTag::context(0), res.mms_deletable);
                s.encode_constructed(BerTag::context_constructed(2), |td| {
                    encode_type_description(td, &res.type_description)
                })
            })
        }
        ConfirmedResponse::DefineNamedVariableList => {
            seq.encode_null(BerTag::context(11));
            Ok(())
        }
        ConfirmedResponse::GetNamedVariableListAttributes(res) => {
            seq.encode_constructed(BerTag::context_constructed(12), |s| {
                s.encode_boolean(BerTag::context(0), res.mms_deletable);
                s.encode_constructed(BerTag::context_constructed(1), |list| {
                    encode_variable_defs(list, &res.variables)
                })
            })
        }
        ConfirmedResponse::DeleteNamedVariableList(res) => {
            seq.encode_constructed(BerTag::context_constructed(13), |s| {
                s.encode_unsigned(BerTag::context(0), res.number_matched as u64);
                s.encode_unsigned(BerTag::context(1), res.number_deleted as u64);
                Ok(())
            })
        }
        ConfirmedResponse::FileOpen(res) => {
            seq.encode_constructed(BerTag::context_constructed(72), |s| {
                s.encode_integer(BerTag::context(0), res.frsm_id as i64);
                encode_file_attributes(s, &res.attributes)
            })
        }
        ConfirmedResponse::FileRead(res) => {
            seq.encode_constructed(BerTag::context_constructed(73), |s| {
                s.encode_tlv(&BerTag::context(0), &res.data);
                s.encode_boolean(BerTag::context(1), res.more_follows);
                Ok(())
            })
        }
        ConfirmedResponse::FileClose => {
            seq.encode_null(BerTag::context(74));
            Ok(())
        }
        ConfirmedResponse::FileDirectory(res) => {
            seq.encode_constructed(BerTag::context_constructed(77), |s| {
                s.encode_constructed(BerTag::context_constructed(0), |list| {
                    for entry in &res.entries {
                        list.encode_constructed(BerTag::SEQUENCE, |e| {
                            encode_file_name(e, BerTag::context_constructed(0), &entry.file_name)?;
                            encode_file_attributes(e, &entry.attributes)
                        })?;
                    }
                    Ok(())
                })?;
                s.encode_boolean(BerTag::context(1), res.more_follows);
                Ok(())
            })
        }
        ConfirmedResponse::FileDelete => {
            seq.encode_null(BerTag::context(76));
            Ok(())
        }
    }
}
