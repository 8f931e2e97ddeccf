//! IEC 61850 MMS client
//!
//! A [`ClientSap`] opens associations to servers. A [`ClientAssociation`]
//! sends one confirmed request at a time and keeps a copy of the server
//! model that services read from and write into. Reports arrive on a
//! background receiver and are handed to a [`ClientEventListener`].
//!
//! # Modules
//!
//! - `config`: client configuration
//! - `association`: request/response correlation and the receiver task
//! - `services`: data access, data set, reporting and control services
//! - `files`: file services
//! - `report`: decoding of received reports
//! - `event`: callbacks into the application
//! - `error`: mapping of peer error PDUs
//! - `sap`: the client access point

pub mod association;
pub mod config;
pub mod error;
pub mod event;
pub mod files;
pub mod report;
pub mod sap;
pub mod services;

pub use association::ClientAssociation;
pub use config::ClientConfig;
pub use event::ClientEventListener;
pub use report::Report;
pub use sap::ClientSap;
pub use services::{MemberResults, RcbUpdate};

#[cfg(test)]
pub use event::MockClientEventListener;
