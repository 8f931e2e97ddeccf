//! Per-association state shared with timer tasks

use crate::scheduler::Scheduler;
use iec61850_codec::{MmsPdu, encode_pdu};
use iec61850_model::AssociationId;
use iec61850_transport::PduWriter;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};

/// Handle of one association.
///
/// Everything sent to the peer goes through an outgoing queue drained by a
/// single writer task, so responses and reports produced by timers never
/// interleave on the wire.
#[derive(Debug)]
pub struct AssociationContext {
    id: AssociationId,
    scheduler: Scheduler,
    outgoing: mpsc::UnboundedSender<Vec<u8>>,
    closed: watch::Sender<bool>,
}

impl AssociationContext {
    /// Create the context of an association whose timers run on `runtime`
    pub fn new(id: AssociationId, runtime: Handle) -> (Arc<Self>, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (outgoing, receiver) = mpsc::unbounded_channel();
        let (closed, _) = watch::channel(false);
        let context = Arc::new(Self {
            id,
            scheduler: Scheduler::new(runtime),
            outgoing,
            closed,
        });
        (context, receiver)
    }

    pub fn id(&self) -> AssociationId {
        self.id
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Encode a PDU and queue it for sending
    ///
    /// # Returns
    ///
    /// `false` if the PDU could not be encoded or the association is closed
    pub fn queue(&self, pdu: &MmsPdu) -> bool {
        if self.is_closed() {
            return false;
        }
        match encode_pdu(pdu) {
            Ok(bytes) => self.outgoing.send(bytes).is_ok(),
            Err(e) => {
                log::error!("{}: failed to encode PDU: {}", self.id, e);
                false
            }
        }
    }

    /// Mark the association closed; the request loop and the writer stop
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    pub fn closed(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }
}

/// Drain the outgoing queue into the writer until the association closes.
///
/// PDUs queued before the close are still sent.
pub async fn run_writer(
    context: Arc<AssociationContext>,
    mut outgoing: mpsc::UnboundedReceiver<Vec<u8>>,
    mut writer: Box<dyn PduWriter>,
) {
    let mut closed = context.closed();
    loop {
        tokio::select! {
            biased;
            pdu = outgoing.recv() => {
                let Some(pdu) = pdu else { break };
                if let Err(e) = writer.send_pdu(&pdu).await {
                    log::error!("{}: send failed: {}", context.id(), e);
                    context.close();
                    return;
                }
            }
            () = async { let _ = closed.wait_for(|closed| *closed).await; } => {
                while let Ok(pdu) = outgoing.try_recv() {
                    if writer.send_pdu(&pdu).await.is_err() {
                        break;
                    }
                }
                break;
            }
        }
    }
    if let Err(e) = writer.close().await {
        log::debug!("{}: closing writer: {}", context.id(), e);
    }
}
