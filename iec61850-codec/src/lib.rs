//! BER and MMS encoding for the IEC 61850 MMS mapping
//!
//! # Modules
//!
//! - `ber`: BER tag/length primitives, encoder and decoder
//! - `mms`: MMS `Data` values, type descriptions and the PDUs exchanged by
//!   client and server associations

pub mod ber;
pub mod mms;

pub use ber::{BerDecoder, BerEncoder, BerLength, BerTag, BerTagClass};
pub use mms::pdu::*;
pub use mms::{decode_pdu, encode_pdu};
