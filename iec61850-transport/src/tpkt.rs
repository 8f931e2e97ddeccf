//! RFC 1006 TPKT framing
//!
//! ```text
//! +---------+----------+-----------+-----------+---------
//! | version | reserved | length hi | length lo | payload
//! |  0x03   |   0x00   |     total length incl. header
//! +---------+----------+-----------+-----------+---------
//! ```

use crate::stream::{PduReader, PduWriter};
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use iec61850_core::{Iec61850Error, Iec61850Result};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const TPKT_HEADER_LEN: usize = 4;
pub const TPKT_MAX_FRAME_SIZE: usize = 65535;

const TPKT_VERSION: u8 = 0x03;

/// Reads TPKT framed PDUs from a byte stream
#[derive(Debug)]
pub struct TpktReader<R> {
    inner: R,
    fragment_timeout: Option<Duration>,
    max_frame_size: usize,
}

impl<R: AsyncRead + Unpin + Send> TpktReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            fragment_timeout: None,
            max_frame_size: TPKT_MAX_FRAME_SIZE,
        }
    }

    /// Time allowed for the rest of a frame once its header has arrived
    pub fn with_fragment_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fragment_timeout = timeout;
        self
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size.min(TPKT_MAX_FRAME_SIZE);
        self
    }

    async fn read_body(&mut self, buf: &mut [u8]) -> Iec61850Result<()> {
        match self.fragment_timeout {
            Some(timeout) => {
                tokio::time::timeout(timeout, self.inner.read_exact(buf))
                    .await
                    .map_err(|_| Iec61850Error::Timeout)??;
            }
            None => {
                self.inner.read_exact(buf).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> PduReader for TpktReader<R> {
    async fn receive_pdu(&mut self) -> Iec61850Result<Option<Bytes>> {
        let mut header = [0u8; TPKT_HEADER_LEN];
        let first = self.inner.read(&mut header[..1]).await?;
        if first == 0 {
            return Ok(None);
        }
        self.read_body(&mut header[1..]).await?;

        if header[0] != TPKT_VERSION || header[1] != 0 {
            return Err(Iec61850Error::FrameInvalid(format!(
                "invalid TPKT header {:02X?}",
                header
            )));
        }
        let length = u16::from_be_bytes([header[2], header[3]]) as usize;
        if length < TPKT_HEADER_LEN || length > self.max_frame_size {
            return Err(Iec61850Error::FrameInvalid(format!(
                "invalid TPKT length {}",
                length
            )));
        }

        let mut body = BytesMut::zeroed(length - TPKT_HEADER_LEN);
        self.read_body(&mut body).await?;
        Ok(Some(body.freeze()))
    }
}

/// Writes TPKT framed PDUs to a byte stream
#[derive(Debug)]
pub struct TpktWriter<W> {
    inner: W,
    write_timeout: Option<Duration>,
}

impl<W: AsyncWrite + Unpin + Send> TpktWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            write_timeout: None,
        }
    }

    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    async fn write_frame(&mut self, frame: &[u8]) -> Iec61850Result<()> {
        self.inner.write_all(frame).await?;
        self.inner.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> PduWriter for TpktWriter<W> {
    async fn send_pdu(&mut self, pdu: &[u8]) -> Iec61850Result<()> {
        let length = pdu.len() + TPKT_HEADER_LEN;
        if length > TPKT_MAX_FRAME_SIZE {
            return Err(Iec61850Error::Encoding(format!(
                "PDU of {} bytes does not fit into a TPKT frame",
                pdu.len()
            )));
        }
        let mut frame = BytesMut::with_capacity(length);
        frame.put_u8(TPKT_VERSION);
        frame.put_u8(0);
        frame.put_u16(length as u16);
        frame.put_slice(pdu);

        match self.write_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.write_frame(&frame))
                .await
                .map_err(|_| Iec61850Error::Timeout)?,
            None => self.write_frame(&frame).await,
        }
    }

    async fn close(&mut self) -> Iec61850Result<()> {
        self.inner.shutdown().await?;
        Ok(())
    }
}
