//! IEC 61850 MMS server
//!
//! This crate serves a [`iec61850_model::ServerModel`] to MMS clients. Every
//! accepted connection becomes an association with its own request loop;
//! all associations share one locked model.
//!
//! # Modules
//!
//! - `config`: server configuration
//! - `event`: callbacks into the host application
//! - `server`: the server access point and association bookkeeping
//! - `scheduler`: per-association one-shot and periodic timers
//!
//! Request handling is split over crate private modules: association
//! setup and dispatch, directory services, data access, data sets,
//! control, reporting and file services.

pub mod config;
pub mod event;
pub mod scheduler;
pub mod server;

mod access;
mod association;
mod context;
mod control;
mod data_sets;
mod directory;
mod files;
mod report;

pub use config::ServerConfig;
pub use event::{ServerEventListener, WriteValue};
pub use report::build_report;
pub use server::ServerSap;

#[cfg(test)]
pub use event::MockServerEventListener;
