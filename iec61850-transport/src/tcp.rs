//! TCP transport

use crate::tpkt::{TPKT_MAX_FRAME_SIZE, TpktReader, TpktWriter};
use iec61850_core::{Iec61850Error, Iec61850Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::TcpStream;

/// TCP transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpSettings {
    /// Timeout for establishing the connection, `None` waits forever
    pub connect_timeout: Option<Duration>,
    /// Time allowed for the remainder of a frame once its header arrived
    pub fragment_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub max_frame_size: usize,
}

impl Default for TcpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(30)),
            fragment_timeout: Some(Duration::from_secs(10)),
            write_timeout: None,
            max_frame_size: TPKT_MAX_FRAME_SIZE,
        }
    }
}

impl TcpSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_fragment_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fragment_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }
}

/// Split a connected byte stream into a TPKT reader and writer
pub fn split<S>(stream: S, settings: &TcpSettings) -> (TpktReader<ReadHalf<S>>, TpktWriter<WriteHalf<S>>)
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    let (read, write) = tokio::io::split(stream);
    let reader = TpktReader::new(read)
        .with_fragment_timeout(settings.fragment_timeout)
        .with_max_frame_size(settings.max_frame_size);
    let writer = TpktWriter::new(write).with_write_timeout(settings.write_timeout);
    (reader, writer)
}

/// Connect to a server
///
/// # Errors
///
/// Returns `Timeout` if the connect timeout elapses and `Connection` on I/O failures
pub async fn connect(
    address: SocketAddr,
    settings: &TcpSettings,
) -> Iec61850Result<(TpktReader<ReadHalf<TcpStream>>, TpktWriter<WriteHalf<TcpStream>>)> {
    let stream = match settings.connect_timeout {
        Some(timeout) => tokio::time::timeout(timeout, TcpStream::connect(address))
            .await
            .map_err(|_| Iec61850Error::Timeout)??,
        None => TcpStream::connect(address).await?,
    };
    stream.set_nodelay(true)?;
    log::debug!("connected to {}", address);
    Ok(split(stream, settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{PduReader, PduWriter};
    use tokio::net::TcpListener;

    #[test]
    fn test_tcp_settings() {
        let settings = TcpSettings::new().with_write_timeout(Some(Duration::from_secs(1)));
        assert_eq!(settings.max_frame_size, TPKT_MAX_FRAME_SIZE);
        assert_eq!(settings.write_timeout, Some(Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_connect_and_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let settings = TcpSettings::default();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (mut reader, mut writer) = split(stream, &TcpSettings::default());
            let pdu = reader.receive_pdu().await.unwrap().unwrap();
            writer.send_pdu(&pdu).await.unwrap();
        });

        let (mut reader, mut writer) = connect(address, &settings).await.unwrap();
        writer.send_pdu(b"ping").await.unwrap();
        let echoed = reader.receive_pdu().await.unwrap().unwrap();
        assert_eq!(&echoed[..], b"ping");
        server.await.unwrap();
    }
}
