//! Client side of one association
//!
//! A receiver task owns the read half of the connection. It delivers the
//! answer to the single outstanding request to the waiting caller, hands
//! reports to the listener and discards everything else. When the
//! connection ends it wakes the waiting caller and notifies the listener.

use crate::config::{ClientConfig, MINIMUM_MMS_PDU_SIZE};
use crate::error::{confirmed_error, reject_error};
use crate::event::ClientEventListener;
use crate::report::{decode_report, is_rcb_report};
use iec61850_codec::{
    ConfirmedRequest, ConfirmedResponse, InformationReport, InitiateParameters, MmsPdu, decode_pdu,
    encode_pdu,
};
use iec61850_core::{Iec61850Error, Iec61850Result, ServiceError};
use iec61850_model::{DataSet, ModelTree, ServerModel};
use iec61850_transport::{PduReader, PduWriter};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

/// Invoke ids cycle through `0..=MAX_INVOKE_ID`
const MAX_INVOKE_ID: u32 = i32::MAX as u32;

/// The client's view of the server
#[derive(Debug)]
pub(crate) struct ClientModel {
    pub(crate) server: ServerModel,
    /// Data sets named `@...`, created on this association
    pub(crate) data_sets: Vec<DataSet>,
}

impl ClientModel {
    pub(crate) fn data_set(&self, reference: &str) -> Option<&DataSet> {
        self.server
            .data_set(reference)
            .or_else(|| self.data_sets.iter().find(|ds| ds.reference() == reference))
    }
}

/// Answer the outstanding request waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expected {
    Invoke(u32),
    Initiate,
    Conclude,
}

impl Expected {
    fn matches(&self, pdu: &MmsPdu) -> bool {
        match (self, pdu) {
            (
                Expected::Invoke(id),
                MmsPdu::ConfirmedResponse { .. } | MmsPdu::ConfirmedError { .. } | MmsPdu::Reject(_),
            ) => pdu.invoke_id() == Some(*id),
            (Expected::Initiate, MmsPdu::InitiateResponse(_) | MmsPdu::InitiateError(_)) => true,
            (Expected::Conclude, MmsPdu::ConcludeResponse) => true,
            (Expected::Initiate | Expected::Conclude, MmsPdu::Reject(reject)) => {
                reject.original_invoke_id.is_none()
            }
            _ => false,
        }
    }
}

struct Pending {
    expected: Expected,
    reply: oneshot::Sender<MmsPdu>,
}

/// State shared between the caller side and the receiver task
pub(crate) struct Shared {
    writer: tokio::sync::Mutex<Box<dyn PduWriter>>,
    pending: Mutex<Option<Pending>>,
    closed: watch::Sender<bool>,
    closed_notified: AtomicBool,
    listener: Option<Arc<dyn ClientEventListener>>,
    pub(crate) model: Mutex<ClientModel>,
}

impl Shared {
    fn close(&self) {
        self.closed.send_replace(true);
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    fn notify_closed(&self, error: Iec61850Error) {
        if self.closed_notified.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(listener) = &self.listener {
            listener.association_closed(error);
        }
    }

    fn dispatch(&self, pdu: MmsPdu) {
        if let MmsPdu::InformationReport(report) = pdu {
            self.deliver_report(report);
            return;
        }
        let mut pending = self.pending.lock();
        match pending.take() {
            Some(waiting) if waiting.expected.matches(&pdu) => {
                if waiting.reply.send(pdu).is_err() {
                    log::debug!("caller stopped waiting for {:?}", waiting.expected);
                }
            }
            other => {
                *pending = other;
                log::debug!("discarding unexpected PDU: {:?}", pdu);
            }
        }
    }

    fn deliver_report(&self, report: InformationReport) {
        let Some(listener) = self.listener.clone() else {
            return;
        };
        if !is_rcb_report(&report) {
            log::debug!("discarding information report that is not an RCB report");
            return;
        }
        let decoded = {
            let model = self.model.lock();
            decode_report(&model.server, &model.data_sets, report)
        };
        match decoded {
            Ok(report) => {
                tokio::task::spawn_blocking(move || listener.new_report(report));
            }
            Err(e) => log::warn!("discarding report: {}", e),
        }
    }
}

async fn receive_loop(shared: Arc<Shared>, mut reader: Box<dyn PduReader>) {
    let mut closed = shared.closed.subscribe();
    let error = loop {
        let received = tokio::select! {
            received = reader.receive_pdu() => received,
            () = async { let _ = closed.wait_for(|closed| *closed).await; } => {
                break Iec61850Error::AssociationClosed("association closed locally".to_string());
            }
        };
        let bytes = match received {
            Ok(Some(bytes)) => bytes,
            Ok(None) => break Iec61850Error::AssociationClosed("connection closed by server".to_string()),
            Err(e) => break e,
        };
        match decode_pdu(&bytes) {
            Ok(pdu) => shared.dispatch(pdu),
            Err(e) => log::warn!("discarding undecodable PDU: {}", e),
        }
    };
    log::info!("association ended: {}", error);
    shared.close();
    // dropping the reply sender wakes a waiting caller
    shared.pending.lock().take();
    shared.notify_closed(error);
}

/// An association with a server.
///
/// Requests are strictly sequential: every service takes `&mut self` and
/// waits for its answer before the next request can be sent.
pub struct ClientAssociation {
    pub(crate) shared: Arc<Shared>,
    invoke_id: u32,
    response_timeout_ms: u64,
    max_pdu_size: u32,
    receiver: Option<JoinHandle<()>>,
}

impl ClientAssociation {
    /// Start the receiver and run the initiate exchange
    ///
    /// # Errors
    ///
    /// Returns `AssociationClosed` if the server refuses the association or
    /// answers with unacceptable parameters, and transport errors otherwise
    pub(crate) async fn associate(
        reader: Box<dyn PduReader>,
        writer: Box<dyn PduWriter>,
        config: &ClientConfig,
        listener: Option<Arc<dyn ClientEventListener>>,
    ) -> Iec61850Result<Self> {
        let (closed, _) = watch::channel(false);
        let shared = Arc::new(Shared {
            writer: tokio::sync::Mutex::new(writer),
            pending: Mutex::new(None),
            closed,
            closed_notified: AtomicBool::new(false),
            listener,
            model: Mutex::new(ClientModel {
                server: ServerModel::new(ModelTree::new()),
                data_sets: Vec::new(),
            }),
        });
        let receiver = tokio::spawn(receive_loop(shared.clone(), reader));

        let mut association = Self {
            shared,
            invoke_id: 0,
            response_timeout_ms: config.response_timeout_ms,
            max_pdu_size: config.proposed_max_mms_pdu_size,
            receiver: Some(receiver),
        };
        if let Err(e) = association.initiate(config).await {
            association.close().await;
            return Err(e);
        }
        Ok(association)
    }

    async fn initiate(&mut self, config: &ClientConfig) -> Iec61850Result<()> {
        let proposed = InitiateParameters {
            local_detail: Some(config.proposed_max_mms_pdu_size),
            max_serv_outstanding_calling: config.proposed_max_serv_outstanding_calling,
            max_serv_outstanding_called: config.proposed_max_serv_outstanding_called,
            data_structure_nesting_level: Some(config.proposed_data_structure_nesting_level),
            version_number: 1,
            parameter_cbb: config.parameter_cbb.clone(),
            services_supported: config.services_supported_calling.clone(),
        };
        match self
            .exchange(Expected::Initiate, &MmsPdu::InitiateRequest(proposed))
            .await?
        {
            MmsPdu::InitiateResponse(accepted) => self.accept(config, &accepted),
            MmsPdu::InitiateError(error) => Err(Iec61850Error::AssociationClosed(format!(
                "initiate refused: {}",
                confirmed_error(&error)
            ))),
            other => Err(Iec61850Error::AssociationClosed(format!(
                "unexpected answer to initiate: {:?}",
                other
            ))),
        }
    }

    /// Validate the parameters the server accepted
    fn accept(&mut self, config: &ClientConfig, accepted: &InitiateParameters) -> Iec61850Result<()> {
        let refuse = |reason: String| Err(Iec61850Error::AssociationClosed(reason));

        let max_pdu_size = accepted.local_detail.unwrap_or(config.proposed_max_mms_pdu_size);
        if !(MINIMUM_MMS_PDU_SIZE..=config.proposed_max_mms_pdu_size).contains(&max_pdu_size) {
            return refuse(format!("negotiated max PDU size {} out of range", max_pdu_size));
        }
        if accepted.max_serv_outstanding_calling == 0
            || accepted.max_serv_outstanding_calling > config.proposed_max_serv_outstanding_calling
            || accepted.max_serv_outstanding_called == 0
            || accepted.max_serv_outstanding_called > config.proposed_max_serv_outstanding_called
        {
            return refuse("negotiated outstanding service calls out of range".to_string());
        }
        if accepted
            .data_structure_nesting_level
            .is_some_and(|level| level > config.proposed_data_structure_nesting_level)
        {
            return refuse("negotiated data structure nesting level too large".to_string());
        }
        if accepted.version_number != 1 {
            return refuse(format!("unsupported MMS version {}", accepted.version_number));
        }
        self.max_pdu_size = max_pdu_size;
        log::debug!("associated, max PDU size {}", max_pdu_size);
        Ok(())
    }

    fn next_invoke_id(&mut self) -> u32 {
        let id = self.invoke_id;
        self.invoke_id = if id >= MAX_INVOKE_ID { 0 } else { id + 1 };
        id
    }

    /// Send one PDU and wait for the answer the receiver matches to it
    async fn exchange(&mut self, expected: Expected, pdu: &MmsPdu) -> Iec61850Result<MmsPdu> {
        if self.shared.is_closed() {
            return Err(Iec61850Error::AssociationClosed("association is closed".to_string()));
        }
        let bytes = match encode_pdu(pdu) {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail(e)),
        };

        let (reply, answer) = oneshot::channel();
        {
            let mut pending = self.shared.pending.lock();
            if let Some(outstanding) = pending.as_ref() {
                let error = Iec61850Error::AssociationClosed(format!(
                    "request {:?} still outstanding",
                    outstanding.expected
                ));
                drop(pending);
                return Err(self.fail(error));
            }
            *pending = Some(Pending { expected, reply });
        }

        let sent = self.shared.writer.lock().await.send_pdu(&bytes).await;
        if let Err(e) = sent {
            self.shared.pending.lock().take();
            return Err(self.fail(e));
        }

        let answer = match self.response_timeout() {
            Some(timeout) => match tokio::time::timeout(timeout, answer).await {
                Ok(answer) => answer,
                Err(_) => {
                    self.shared.pending.lock().take();
                    return Err(ServiceError::timeout(format!(
                        "no answer to {:?} within {} ms",
                        expected, self.response_timeout_ms
                    ))
                    .into());
                }
            },
            None => answer.await,
        };
        answer.map_err(|_| {
            Iec61850Error::AssociationClosed("connection closed while waiting for an answer".to_string())
        })
    }

    /// Mark the association unusable after a fatal failure
    fn fail(&self, error: Iec61850Error) -> Iec61850Error {
        log::error!("closing association: {}", error);
        self.shared.close();
        error
    }

    /// Fatal error for a response that does not answer the request
    pub(crate) fn malformed(&self, service: &str) -> Iec61850Error {
        self.fail(Iec61850Error::Decoding(format!("malformed {} response", service)))
    }

    /// Send a confirmed request and wait for its response
    ///
    /// # Errors
    ///
    /// Returns `Service` for confirmed errors, rejects and timeouts; the
    /// association stays usable. Other errors are fatal.
    pub async fn request(&mut self, request: ConfirmedRequest) -> Iec61850Result<ConfirmedResponse> {
        let invoke_id = self.next_invoke_id();
        let service = request.name();
        let pdu = MmsPdu::ConfirmedRequest { invoke_id, request };
        match self.exchange(Expected::Invoke(invoke_id), &pdu).await? {
            MmsPdu::ConfirmedResponse { response, .. } => Ok(response),
            MmsPdu::ConfirmedError { error, .. } => Err(confirmed_error(&error).into()),
            MmsPdu::Reject(reject) => Err(reject_error(&reject).into()),
            _ => Err(self.malformed(service)),
        }
    }

    /// Release the association with a conclude exchange, then close it
    ///
    /// # Errors
    ///
    /// Returns the failure of the conclude exchange; the association is
    /// closed in any case
    pub async fn disconnect(&mut self) -> Iec61850Result<()> {
        let concluded = match self.exchange(Expected::Conclude, &MmsPdu::ConcludeRequest).await {
            Ok(MmsPdu::ConcludeResponse) => Ok(()),
            Ok(other) => Err(Iec61850Error::AssociationClosed(format!(
                "unexpected answer to conclude: {:?}",
                other
            ))),
            Err(e) => Err(e),
        };
        self.close().await;
        concluded
    }

    /// Close the connection without a conclude exchange
    pub async fn close(&mut self) {
        self.shared.close();
        if let Err(e) = self.shared.writer.lock().await.close().await {
            log::debug!("closing connection: {}", e);
        }
        if let Some(receiver) = self.receiver.take() {
            if let Err(e) = receiver.await {
                log::debug!("receiver task ended abnormally: {}", e);
            }
        }
    }

    pub fn is_open(&self) -> bool {
        !self.shared.is_closed()
    }

    /// Response timeout in milliseconds, 0 meaning no timeout
    pub fn response_timeout_ms(&self) -> u64 {
        self.response_timeout_ms
    }

    pub fn set_response_timeout_ms(&mut self, timeout_ms: u64) {
        self.response_timeout_ms = timeout_ms;
    }

    fn response_timeout(&self) -> Option<Duration> {
        (self.response_timeout_ms > 0).then(|| Duration::from_millis(self.response_timeout_ms))
    }

    /// Max MMS PDU size negotiated during initiate
    pub fn max_pdu_size(&self) -> u32 {
        self.max_pdu_size
    }

    /// Copy of the server model as currently known to the client
    pub fn model(&self) -> ServerModel {
        self.shared.model.lock().server.copy()
    }

    /// Use a model obtained out of band instead of retrieving it
    pub fn set_model(&self, model: ServerModel) {
        self.shared.model.lock().server = model;
    }
}

impl Drop for ClientAssociation {
    fn drop(&mut self) {
        self.shared.close();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::event::MockClientEventListener;
    use iec61850_codec::{GetNameListResponse, RejectPdu, RejectReason};
    use iec61850_core::{BitString, ErrorCode};
    use iec61850_transport::{TcpSettings, TpktReader, TpktWriter, split};
    use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

    /// Server end of a test connection speaking raw PDUs
    pub(crate) struct Peer {
        reader: TpktReader<ReadHalf<DuplexStream>>,
        pub(crate) writer: TpktWriter<WriteHalf<DuplexStream>>,
    }

    impl Peer {
        pub(crate) async fn receive(&mut self) -> MmsPdu {
            let bytes = self.reader.receive_pdu().await.unwrap().unwrap();
            decode_pdu(&bytes).unwrap()
        }

        pub(crate) async fn send(&mut self, pdu: &MmsPdu) {
            self.writer.send_pdu(&encode_pdu(pdu).unwrap()).await.unwrap();
        }

        /// Answer the next confirmed request
        pub(crate) async fn respond(&mut self, response: ConfirmedResponse) -> ConfirmedRequest {
            let MmsPdu::ConfirmedRequest { invoke_id, request } = self.receive().await else {
                panic!("expected a confirmed request");
            };
            self.send(&MmsPdu::ConfirmedResponse { invoke_id, response }).await;
            request
        }
    }

    fn accepted() -> InitiateParameters {
        InitiateParameters {
            local_detail: Some(1000),
            max_serv_outstanding_calling: 5,
            max_serv_outstanding_called: 5,
            data_structure_nesting_level: Some(10),
            version_number: 1,
            parameter_cbb: BitString::zeroed(11),
            services_supported: BitString::zeroed(85),
        }
    }

    /// Associate over an in-memory stream with a peer that accepts
    pub(crate) async fn connect(
        listener: Option<Arc<dyn ClientEventListener>>,
    ) -> (ClientAssociation, Peer) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (client_reader, client_writer) = split(client, &TcpSettings::default());
        let (reader, writer) = split(server, &TcpSettings::default());
        let mut peer = Peer { reader, writer };
        let accept = async {
            let MmsPdu::InitiateRequest(_) = peer.receive().await else {
                panic!("expected initiate");
            };
            peer.send(&MmsPdu::InitiateResponse(accepted())).await;
        };
        let config = ClientConfig::default();
        let associate = ClientAssociation::associate(
            Box::new(client_reader),
            Box::new(client_writer),
            &config,
            listener,
        );
        let (association, ()) = tokio::join!(associate, accept);
        (association.unwrap(), peer)
    }

    fn name_list() -> ConfirmedRequest {
        ConfirmedRequest::GetNameList(iec61850_codec::GetNameListRequest {
            object_class: iec61850_codec::OBJECT_CLASS_DOMAIN,
            object_scope: iec61850_codec::ObjectScope::VmdSpecific,
            continue_after: None,
        })
    }

    #[tokio::test]
    async fn test_initiate_negotiates_pdu_size() {
        let (association, _peer) = connect(None).await;
        assert!(association.is_open());
        assert_eq!(association.max_pdu_size(), 1000);
    }

    #[tokio::test]
    async fn test_initiate_with_oversized_pdu_is_refused() {
        let (client, server) = tokio::io::duplex(4096);
        let (reader, writer) = split(server, &TcpSettings::default());
        let mut peer = Peer { reader, writer };
        let refuse = async {
            peer.receive().await;
            let mut parameters = accepted();
            parameters.local_detail = Some(70000);
            peer.send(&MmsPdu::InitiateResponse(parameters)).await;
        };
        let (client_reader, client_writer) = split(client, &TcpSettings::default());
        let config = ClientConfig::default();
        let associate =
            ClientAssociation::associate(Box::new(client_reader), Box::new(client_writer), &config, None);
        let (association, ()) = tokio::join!(associate, refuse);
        assert!(matches!(association, Err(Iec61850Error::AssociationClosed(_))));
    }

    #[tokio::test]
    async fn test_invoke_ids_increase_and_wrap() {
        let (mut association, mut peer) = connect(None).await;
        association.invoke_id = MAX_INVOKE_ID;
        let server = tokio::spawn(async move {
            let mut ids = Vec::new();
            for _ in 0..2 {
                let MmsPdu::ConfirmedRequest { invoke_id, .. } = peer.receive().await else {
                    panic!("expected a confirmed request");
                };
                ids.push(invoke_id);
                let response = ConfirmedResponse::GetNameList(GetNameListResponse {
                    identifiers: vec!["LD0".to_string()],
                    more_follows: false,
                });
                peer.send(&MmsPdu::ConfirmedResponse { invoke_id, response }).await;
            }
            ids
        });
        association.request(name_list()).await.unwrap();
        association.request(name_list()).await.unwrap();
        assert_eq!(server.await.unwrap(), vec![MAX_INVOKE_ID, 0]);
    }

    #[tokio::test]
    async fn test_unmatched_answers_are_discarded() {
        let (mut association, mut peer) = connect(None).await;
        let server = tokio::spawn(async move {
            let MmsPdu::ConfirmedRequest { invoke_id, .. } = peer.receive().await else {
                panic!("expected a confirmed request");
            };
            let stale = ConfirmedResponse::GetNameList(GetNameListResponse {
                identifiers: vec!["stale".to_string()],
                more_follows: false,
            });
            peer.send(&MmsPdu::ConfirmedResponse { invoke_id: invoke_id + 7, response: stale }).await;
            peer.send(&MmsPdu::Reject(RejectPdu {
                original_invoke_id: Some(invoke_id),
                reason: RejectReason::PduError(1),
            }))
            .await;
            peer
        });
        let error = association.request(name_list()).await.unwrap_err();
        assert_eq!(
            error.service_error().map(|e| e.code()),
            Some(ErrorCode::ParameterValueInconsistent)
        );
        assert!(association.is_open());
        drop(server.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_timeout_keeps_association_usable() {
        let (mut association, mut peer) = connect(None).await;
        association.set_response_timeout_ms(500);
        let error = association.request(name_list()).await.unwrap_err();
        assert_eq!(error.service_error().map(|e| e.code()), Some(ErrorCode::Timeout));
        assert!(association.is_open());

        // the late answer to the first request must not satisfy the second
        let MmsPdu::ConfirmedRequest { invoke_id, .. } = peer.receive().await else {
            panic!("expected a confirmed request");
        };
        let late = ConfirmedResponse::GetNameList(GetNameListResponse {
            identifiers: vec!["late".to_string()],
            more_follows: false,
        });
        peer.send(&MmsPdu::ConfirmedResponse { invoke_id, response: late }).await;
        let server = tokio::spawn(async move {
            let response = ConfirmedResponse::GetNameList(GetNameListResponse {
                identifiers: vec!["fresh".to_string()],
                more_follows: false,
            });
            peer.respond(response).await;
            peer
        });
        let ConfirmedResponse::GetNameList(list) = association.request(name_list()).await.unwrap() else {
            panic!("expected a name list");
        };
        assert_eq!(list.identifiers, vec!["fresh".to_string()]);
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_connection_loss_wakes_caller_and_notifies_once() {
        let mut listener = MockClientEventListener::new();
        listener
            .expect_association_closed()
            .times(1)
            .returning(|_| ());
        let (mut association, mut peer) = connect(Some(Arc::new(listener))).await;

        let server = tokio::spawn(async move {
            peer.receive().await;
            drop(peer);
        });
        let error = association.request(name_list()).await.unwrap_err();
        assert!(error.is_fatal());
        server.await.unwrap();
        association.close().await;
        assert!(!association.is_open());
    }
}
