//! Callbacks into the host application

use iec61850_core::{Fc, ObjectReference, ServiceError, Value};
use iec61850_model::NodeId;

/// A basic attribute a client wants to write
#[derive(Debug, Clone, PartialEq)]
pub struct WriteValue {
    pub node: NodeId,
    pub reference: ObjectReference,
    pub fc: Fc,
    pub value: Value,
}

/// Host application hooks.
///
/// `write` is called once per write request with every attribute the request
/// would change, before anything is committed. It runs while the model is
/// locked and must not block.
#[cfg_attr(test, mockall::automock)]
pub trait ServerEventListener: Send + Sync {
    /// Accept or refuse proposed values.
    ///
    /// # Returns
    ///
    /// One result per value. A list of another length accepts everything.
    fn write(&self, values: &[WriteValue]) -> Vec<Result<(), ServiceError>>;

    /// The server stopped accepting connections
    fn server_stopped_listening(&self);
}
