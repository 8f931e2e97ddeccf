//! Core types and utilities for the IEC 61850 MMS mapping
//!
//! This crate provides the types shared by every layer of the stack:
//! error taxonomy, object references, functional constraints, the MMS
//! `Value` algebra, type descriptions and MMS variable addressing.

pub mod error;
pub mod fc;
pub mod object_reference;
pub mod value;
pub mod type_description;
pub mod variable;
pub mod datatypes;

pub use error::{DataAccessError, ErrorCode, Iec61850Error, Iec61850Result, ServiceError};
pub use fc::Fc;
pub use object_reference::ObjectReference;
pub use value::Value;
pub use type_description::{StructureComponent, TypeDescription};
pub use variable::{AlternateAccess, ObjectName, VariableDef};
pub use datatypes::*;
