//! Rust implementation of IEC 61850 over MMS
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `iec61850-core`: object references, values, functional constraints and errors
//! - `iec61850-codec`: MMS PDU encoding and decoding
//! - `iec61850-transport`: TPKT/COTP framing over TCP
//! - `iec61850-model`: the server model tree, data sets and report control blocks
//! - `iec61850-server`: associations, reporting and control
//! - `iec61850-client`: associations, services and report reception
//!
//! # Usage
//!
//! ```no_run
//! use iec61850::client::ClientSap;
//! use iec61850::Fc;
//!
//! # async fn run() -> iec61850::Iec61850Result<()> {
//! let sap = ClientSap::new();
//! let mut association = sap.associate(([127, 0, 0, 1], 102).into(), None).await?;
//! association.retrieve_model().await?;
//! let pos = association.get_data_values("LD0/CSWI1.Pos.stVal", Fc::ST).await?;
//! println!("{:?}", pos.leaf_value());
//! association.disconnect().await?;
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use iec61850_core::datatypes::*;
pub use iec61850_core::{
    DataAccessError, ErrorCode, Fc, Iec61850Error, Iec61850Result, ObjectName, ObjectReference, ServiceError,
    TypeDescription, Value, VariableDef,
};

// Re-export the object model
pub mod model {
    pub use iec61850_model::*;
}

// Re-export the MMS codec
pub mod codec {
    pub use iec61850_codec::*;
}

// Re-export the transport layer
pub mod transport {
    pub use iec61850_transport::*;
}

// Re-export client API
pub mod client {
    pub use iec61850_client::*;
}

// Re-export server API
pub mod server {
    pub use iec61850_server::*;
}
