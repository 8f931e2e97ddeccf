//! Server access point
//!
//! [`ServerSap`] owns the device model and accepts associations. Each
//! accepted connection runs its own request loop on a separate task.

use crate::association;
use crate::config::ServerConfig;
use crate::context::AssociationContext;
use crate::control::SelectionTable;
use crate::event::{ServerEventListener, WriteValue};
use crate::report::ReportEngine;
use iec61850_core::{Iec61850Error, Iec61850Result, ServiceError};
use iec61850_model::{AssociationId, NodeCopy, ServerModel};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// State shared by the listener, the associations and their timers
pub(crate) struct ServerShared {
    pub(crate) config: ServerConfig,
    /// Single lock over tree, data sets and RCB registry
    pub(crate) model: Mutex<ServerModel>,
    pub(crate) reports: ReportEngine,
    pub(crate) selections: SelectionTable,
    listener: RwLock<Option<Arc<dyn ServerEventListener>>>,
    associations: Mutex<HashMap<AssociationId, Arc<AssociationContext>>>,
    next_association_id: AtomicU64,
    stopped: watch::Sender<bool>,
}

impl ServerShared {
    pub(crate) fn new(model: ServerModel, config: ServerConfig) -> Self {
        let (stopped, _) = watch::channel(false);
        Self {
            config,
            model: Mutex::new(model),
            reports: ReportEngine::new(),
            selections: SelectionTable::new(),
            listener: RwLock::new(None),
            associations: Mutex::new(HashMap::new()),
            next_association_id: AtomicU64::new(1),
            stopped,
        }
    }

    pub(crate) fn set_listener(&self, listener: Arc<dyn ServerEventListener>) {
        *self.listener.write() = Some(listener);
    }

    /// Offer proposed values to the host application
    ///
    /// # Returns
    ///
    /// One result per value; everything is accepted without a listener
    pub(crate) fn host_write(&self, values: &[WriteValue]) -> Vec<Result<(), ServiceError>> {
        let listener = self.listener.read().clone();
        let accepted = || values.iter().map(|_| Ok(())).collect();
        let Some(listener) = listener else {
            return accepted();
        };
        let results = listener.write(values);
        if results.len() == values.len() {
            results
        } else {
            accepted()
        }
    }

    pub(crate) fn remove_association(&self, id: AssociationId) {
        self.associations.lock().remove(&id);
    }
}

/// IEC 61850 server access point
///
/// # Usage Example
/// ```rust,no_run
/// use iec61850_server::{ServerConfig, ServerSap};
/// use iec61850_model::ServerModel;
///
/// # async fn run(model: ServerModel) -> iec61850_core::Iec61850Result<()> {
/// let server = ServerSap::with_config(model, ServerConfig::new().with_port(10102));
/// server.start().await?;
/// # Ok(())
/// # }
/// ```
pub struct ServerSap {
    shared: Arc<ServerShared>,
}

impl ServerSap {
    /// Create a server with the default configuration
    pub fn new(model: ServerModel) -> Self {
        Self::with_config(model, ServerConfig::default())
    }

    pub fn with_config(model: ServerModel, config: ServerConfig) -> Self {
        Self {
            shared: Arc::new(ServerShared::new(model, config)),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    /// Install the host application callbacks
    pub fn set_listener(&self, listener: Arc<dyn ServerEventListener>) {
        self.shared.set_listener(listener);
    }

    /// Bind the configured address and accept connections until [`ServerSap::stop`]
    ///
    /// # Errors
    ///
    /// Returns `Connection` if binding fails
    pub async fn start(&self) -> Iec61850Result<()> {
        let address = self.shared.config.socket_address();
        let listener = TcpListener::bind(address).await.map_err(|e| {
            Iec61850Error::Connection(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", address, e),
            ))
        })?;
        self.serve(listener).await
    }

    /// Accept connections from a bound listener until [`ServerSap::stop`]
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the local address cannot be read
    pub async fn serve(&self, listener: TcpListener) -> Iec61850Result<()> {
        log::info!("IEC 61850 server listening on {}", listener.local_addr()?);
        let mut stopped = self.shared.stopped.subscribe();
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            log::debug!("set_nodelay for {}: {}", peer, e);
                        }
                        if self.serve_connection(stream).is_some() {
                            log::info!("Accepted connection from {}", peer);
                        } else {
                            log::warn!("Refused connection from {}", peer);
                        }
                    }
                    Err(e) => log::error!("Error accepting connection: {}", e),
                },
                () = async { let _ = stopped.wait_for(|stopped| *stopped).await; } => break,
            }
        }

        log::info!("IEC 61850 server stopped listening");
        let listener = self.shared.listener.read().clone();
        if let Some(listener) = listener {
            listener.server_stopped_listening();
        }
        Ok(())
    }

    /// Run an association over an already connected byte stream
    ///
    /// # Returns
    ///
    /// The association task, `None` if the server is stopped, the
    /// association limit is reached or no tokio runtime is current
    pub fn serve_connection<S>(&self, stream: S) -> Option<JoinHandle<()>>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        if *self.shared.stopped.borrow() {
            return None;
        }
        let runtime = Handle::try_current().ok()?;
        let (context, outgoing) = {
            let mut associations = self.shared.associations.lock();
            if associations.len() >= self.shared.config.max_associations {
                return None;
            }
            let id = AssociationId(self.shared.next_association_id.fetch_add(1, Ordering::Relaxed));
            let (context, outgoing) = AssociationContext::new(id, runtime.clone());
            associations.insert(id, context.clone());
            (context, outgoing)
        };
        Some(runtime.spawn(association::run(
            self.shared.clone(),
            context,
            outgoing,
            stream,
        )))
    }

    /// Stop listening and close every association
    pub fn stop(&self) {
        self.shared.stopped.send_replace(true);
        let associations: Vec<_> = self.shared.associations.lock().values().cloned().collect();
        for context in associations {
            context.close();
        }
    }

    pub fn association_count(&self) -> usize {
        self.shared.associations.lock().len()
    }

    /// Deep copy of the current model
    pub fn model_copy(&self) -> ServerModel {
        self.shared.model.lock().copy()
    }

    /// Commit values set by the host application and report them like a
    /// client write. The host write callback is not involved.
    ///
    /// # Errors
    ///
    /// Returns `TypeConflict` or `InstanceNotAvailable` from the first copy
    /// that does not fit the model; earlier copies stay committed
    pub fn set_values(&self, values: &[NodeCopy]) -> Result<(), ServiceError> {
        let mut model = self.shared.model.lock();
        let mut updates = Vec::new();
        let mut result = Ok(());
        for copy in values {
            match model.tree_mut().commit(copy) {
                Ok(committed) => updates.extend(committed),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        self.shared.notify(&model, &updates);
        result
    }
}

impl Drop for ServerSap {
    fn drop(&mut self) {
        self.stop();
    }
}
