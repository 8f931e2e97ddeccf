//! Client service access point

use crate::association::ClientAssociation;
use crate::config::ClientConfig;
use crate::event::ClientEventListener;
use iec61850_core::Iec61850Result;
use iec61850_transport::{connect, split};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

/// Creates associations to servers with a common configuration
#[derive(Debug, Clone, Default)]
pub struct ClientSap {
    config: ClientConfig,
}

impl ClientSap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ClientConfig {
        &mut self.config
    }

    /// Connect to a server and run the initiate exchange
    ///
    /// # Arguments
    ///
    /// * `address` - server address, usually port 102
    /// * `listener` - receiver of reports and of the end of the association
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if the connect timeout elapses, `Connection` on I/O
    /// failures and `AssociationClosed` if the server refuses the association
    pub async fn associate(
        &self,
        address: SocketAddr,
        listener: Option<Arc<dyn ClientEventListener>>,
    ) -> Iec61850Result<ClientAssociation> {
        let (reader, writer) = connect(address, &self.config.tcp).await?;
        log::info!("Connected to {}", address);
        ClientAssociation::associate(Box::new(reader), Box::new(writer), &self.config, listener).await
    }

    /// Run the initiate exchange over an already connected byte stream
    ///
    /// # Errors
    ///
    /// Returns `AssociationClosed` if the server refuses the association and
    /// transport errors otherwise
    pub async fn associate_stream<S>(
        &self,
        stream: S,
        listener: Option<Arc<dyn ClientEventListener>>,
    ) -> Iec61850Result<ClientAssociation>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (reader, writer) = split(stream, &self.config.tcp);
        ClientAssociation::associate(Box::new(reader), Box::new(writer), &self.config, listener).await
    }
}
