//! PDU stream traits

use async_trait::async_trait;
use bytes::Bytes;
use iec61850_core::Iec61850Result;

/// Receiving half of an association transport
#[async_trait]
pub trait PduReader: Send {
    /// Receive the next PDU
    ///
    /// # Returns
    ///
    /// `Ok(Some(pdu))` for a complete PDU, `Ok(None)` once the peer closed the stream
    ///
    /// # Errors
    ///
    /// Returns `FrameInvalid` for malformed framing and `Connection` for I/O failures
    async fn receive_pdu(&mut self) -> Iec61850Result<Option<Bytes>>;
}

/// Sending half of an association transport
#[async_trait]
pub trait PduWriter: Send {
    /// Send one PDU
    async fn send_pdu(&mut self, pdu: &[u8]) -> Iec61850Result<()>;

    /// Close the sending side; the peer's reader observes end of stream
    async fn close(&mut self) -> Iec61850Result<()>;
}

#[async_trait]
impl<T: PduReader + ?Sized> PduReader for Box<T> {
    async fn receive_pdu(&mut self) -> Iec61850Result<Option<Bytes>> {
        (**self).receive_pdu().await
    }
}

#[async_trait]
impl<T: PduWriter + ?Sized> PduWriter for Box<T> {
    async fn send_pdu(&mut self, pdu: &[u8]) -> Iec61850Result<()> {
        (**self).send_pdu(pdu).await
    }

    async fn close(&mut self) -> Iec61850Result<()> {
        (**self).close().await
    }
}
