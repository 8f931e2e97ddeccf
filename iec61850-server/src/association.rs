//! Server side of one association
//!
//! After the initiate exchange the association runs a strict request/response
//! loop: decode one confirmed request, dispatch it, queue exactly one
//! response. Service errors become confirmed-error PDUs; only transport and
//! decode failures end the association.

use crate::config::MINIMUM_MMS_PDU_SIZE;
use crate::context::{AssociationContext, run_writer};
use crate::files::FileStates;
use crate::server::ServerShared;
use iec61850_codec::{
    ConfirmedRequest, ConfirmedResponse, ErrorClass, FILE_NON_EXISTENT, InitiateParameters, MmsPdu,
    RejectPdu, RejectReason, ServiceErrorPdu, ACCESS_OBJECT_ACCESS_DENIED, ACCESS_OBJECT_NON_EXISTENT,
    decode_pdu,
};
use iec61850_core::{ErrorCode, Iec61850Error, Iec61850Result, ServiceError, Value};
use iec61850_model::rcb::{RESV, RESV_TMS};
use iec61850_model::{DataSet, RcbKind};
use iec61850_transport::{PduReader, split};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};

/// Reject reason `invalid-pdu` of the pdu-error class
const REJECT_INVALID_PDU: i64 = 1;
/// Reject reason `unrecognized-service` of the confirmed-request class
const REJECT_UNRECOGNIZED_SERVICE: i64 = 1;

/// Per-connection request dispatcher and bookkeeping
pub(crate) struct ServerAssociation {
    pub(crate) shared: Arc<ServerShared>,
    pub(crate) context: Arc<AssociationContext>,
    pub(crate) max_pdu_size: u32,
    /// Data sets named `@...`, visible to this association only
    pub(crate) data_sets: Vec<DataSet>,
    pub(crate) files: FileStates,
}

/// Run an association until the peer leaves, an I/O failure occurs or the
/// server stops, then release everything it held
pub(crate) async fn run<S>(
    shared: Arc<ServerShared>,
    context: Arc<AssociationContext>,
    outgoing: mpsc::UnboundedReceiver<Vec<u8>>,
    stream: S,
) where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let id = context.id();
    let (reader, writer) = split(stream, &shared.config.tcp);
    let writer_task = tokio::spawn(run_writer(context.clone(), outgoing, Box::new(writer)));

    let mut association = ServerAssociation::new(shared.clone(), context.clone());
    match association.serve(Box::new(reader)).await {
        Ok(()) => log::info!("{} closed", id),
        Err(e) => log::error!("{} closed: {}", id, e),
    }
    association.release();
    context.close();
    if let Err(e) = writer_task.await {
        log::debug!("{}: writer task ended abnormally: {}", id, e);
    }
    shared.remove_association(id);
}

impl ServerAssociation {
    pub(crate) fn new(shared: Arc<ServerShared>, context: Arc<AssociationContext>) -> Self {
        let max_pdu_size = shared.config.max_mms_pdu_size;
        let files = FileStates::new(shared.config.file_root.clone());
        Self {
            shared,
            context,
            max_pdu_size,
            data_sets: Vec::new(),
            files,
        }
    }

    async fn receive(
        reader: &mut Box<dyn PduReader>,
        closed: &mut watch::Receiver<bool>,
    ) -> Iec61850Result<Option<MmsPdu>> {
        let bytes = tokio::select! {
            received = reader.receive_pdu() => received?,
            () = async { let _ = closed.wait_for(|closed| *closed).await; } => None,
        };
        bytes.map(|bytes| decode_pdu(&bytes)).transpose()
    }

    async fn serve(&mut self, mut reader: Box<dyn PduReader>) -> Iec61850Result<()> {
        let mut closed = self.context.closed();

        let Some(first) = Self::receive(&mut reader, &mut closed).await? else {
            return Ok(());
        };
        let MmsPdu::InitiateRequest(proposed) = first else {
            self.context.queue(&MmsPdu::InitiateError(ServiceErrorPdu::new(
                ErrorClass::Initiate,
                0,
                Some("expected initiate request".to_string()),
            )));
            return Err(Iec61850Error::AssociationClosed(
                "first PDU is not an initiate request".to_string(),
            ));
        };
        let accepted = self.negotiate(&proposed);
        log::debug!("{}: negotiated max PDU size {}", self.context.id(), self.max_pdu_size);
        self.context.queue(&MmsPdu::InitiateResponse(accepted));

        while let Some(pdu) = Self::receive(&mut reader, &mut closed).await? {
            match pdu {
                MmsPdu::ConfirmedRequest { invoke_id, request } => {
                    let name = request.name();
                    log::debug!("{}: {} request {}", self.context.id(), name, invoke_id);
                    let response = match self.handle(request).await {
                        Ok(response) => MmsPdu::ConfirmedResponse { invoke_id, response },
                        Err(e) => {
                            log::warn!("{}: {} failed: {}", self.context.id(), name, e);
                            MmsPdu::ConfirmedError {
                                invoke_id,
                                error: service_error_pdu(&e),
                            }
                        }
                    };
                    if !self.context.queue(&response) {
                        break;
                    }
                }
                MmsPdu::ConcludeRequest => {
                    log::debug!("{}: conclude", self.context.id());
                    self.context.queue(&MmsPdu::ConcludeResponse);
                    break;
                }
                other => {
                    log::warn!("{}: unexpected PDU {:?}", self.context.id(), other);
                    let reason = if other.invoke_id().is_some() {
                        RejectReason::ConfirmedRequestPdu(REJECT_UNRECOGNIZED_SERVICE)
                    } else {
                        RejectReason::PduError(REJECT_INVALID_PDU)
                    };
                    self.context.queue(&MmsPdu::Reject(RejectPdu {
                        original_invoke_id: other.invoke_id(),
                        reason,
                    }));
                }
            }
        }
        Ok(())
    }

    /// Accept the smaller of the proposed and the own limits
    fn negotiate(&mut self, proposed: &InitiateParameters) -> InitiateParameters {
        let config = &self.shared.config;
        let proposed_size = proposed.local_detail.unwrap_or(config.max_mms_pdu_size);
        self.max_pdu_size = proposed_size
            .min(config.max_mms_pdu_size)
            .max(MINIMUM_MMS_PDU_SIZE);

        let smaller = |proposed: u16, own: u16| if proposed > 0 { proposed.min(own) } else { own };
        InitiateParameters {
            local_detail: Some(self.max_pdu_size),
            max_serv_outstanding_calling: smaller(
                proposed.max_serv_outstanding_calling,
                config.proposed_max_serv_outstanding_calling,
            ),
            max_serv_outstanding_called: smaller(
                proposed.max_serv_outstanding_called,
                config.proposed_max_serv_outstanding_called,
            ),
            data_structure_nesting_level: Some(
                proposed
                    .data_structure_nesting_level
                    .map_or(config.proposed_data_structure_nesting_level, |level| {
                        level.min(config.proposed_data_structure_nesting_level)
                    }),
            ),
            version_number: 1,
            parameter_cbb: config.parameter_cbb.clone(),
            services_supported: config.services_supported_called.clone(),
        }
    }

    async fn handle(&mut self, request: ConfirmedRequest) -> Result<ConfirmedResponse, ServiceError> {
        match request {
            ConfirmedRequest::GetNameList(request) => self.get_name_list(&request),
            ConfirmedRequest::GetVariableAccessAttributes(name) => self.get_data_definition(&name),
            ConfirmedRequest::Read(request) => self.read(request),
            ConfirmedRequest::Write(request) => self.write(request),
            ConfirmedRequest::DefineNamedVariableList(request) => self.define_data_set(request),
            ConfirmedRequest::GetNamedVariableListAttributes(name) => self.data_set_directory(&name),
            ConfirmedRequest::DeleteNamedVariableList(request) => self.delete_data_sets(&request),
            ConfirmedRequest::FileOpen(request) => self.file_open(request).await,
            ConfirmedRequest::FileRead(frsm_id) => self.file_read(frsm_id).await,
            ConfirmedRequest::FileClose(frsm_id) => self.file_close(frsm_id),
            ConfirmedRequest::FileDirectory(request) => self.file_directory(request).await,
            ConfirmedRequest::FileDelete(name) => self.file_delete(&name).await,
        }
    }

    /// Deselect every control object and disable and release every RCB this
    /// association holds
    pub(crate) fn release(&mut self) {
        let id = self.context.id();
        for control in self.shared.selections.release_all(id) {
            self.context.scheduler().cancel(control, crate::scheduler::TimerKind::SboTimeout);
        }

        let mut model = self.shared.model.lock();
        let reserved: Vec<_> = model
            .rcbs()
            .iter()
            .filter(|rcb| rcb.reserved_by() == Some(id))
            .map(|rcb| (rcb.node(), rcb.kind()))
            .collect();
        for (rcb, kind) in reserved {
            if let Err(e) = self.shared.disable_reporting(&mut model, rcb) {
                log::warn!("{}: disabling {} failed: {}", id, rcb, e);
            }
            let Some((tree, descriptor)) = model.tree_and_rcb_mut(rcb) else {
                continue;
            };
            descriptor.release();
            let released = match kind {
                RcbKind::Unbuffered => descriptor.set(tree, RESV, &Value::Boolean(false)),
                RcbKind::Buffered => descriptor.set(tree, RESV_TMS, &Value::Integer(0)),
            };
            if let Err(e) = released {
                log::warn!("{}: releasing {} failed: {}", id, rcb, e);
            }
        }
        drop(model);
        self.context.scheduler().shutdown();
        self.files.close_all();
    }
}

/// Confirmed-error PDU for a service error
pub(crate) fn service_error_pdu(error: &ServiceError) -> ServiceErrorPdu {
    let (class, code) = match error.code() {
        ErrorCode::InstanceNotAvailable => (ErrorClass::Access, ACCESS_OBJECT_NON_EXISTENT),
        ErrorCode::AccessViolation => (ErrorClass::Access, ACCESS_OBJECT_ACCESS_DENIED),
        ErrorCode::FileNoneExistent => (ErrorClass::File, FILE_NON_EXISTENT),
        // object-undefined
        ErrorCode::InstanceInUse => (ErrorClass::Definition, 1),
        // file-busy
        ErrorCode::InstanceLockedByOtherClient => (ErrorClass::File, 2),
        // type-inconsistent
        ErrorCode::TypeConflict => (ErrorClass::Definition, 4),
        code => (ErrorClass::Others, i64::from(code.code())),
    };
    ServiceErrorPdu::new(class, code, Some(error.message().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_pdu() {
        let pdu = service_error_pdu(&ServiceError::access_violation("denied"));
        assert_eq!(pdu.class, ErrorClass::Access);
        assert_eq!(pdu.code, ACCESS_OBJECT_ACCESS_DENIED);
        assert_eq!(pdu.additional_description.as_deref(), Some("denied"));

        let pdu = service_error_pdu(&ServiceError::new(ErrorCode::FileNoneExistent, "x"));
        assert_eq!((pdu.class, pdu.code), (ErrorClass::File, FILE_NON_EXISTENT));

        let pdu = service_error_pdu(&ServiceError::parameter_value_inappropriate("x"));
        assert_eq!((pdu.class, pdu.code), (ErrorClass::Others, 5));
    }
}
