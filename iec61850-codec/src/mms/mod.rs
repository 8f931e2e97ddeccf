//! MMS encoding
//!
//! [`encode_pdu`] and [`decode_pdu`] convert between the [`pdu::MmsPdu`] model and
//! the BER bytes carried inside one transport frame.

pub mod data;
mod decode;
mod encode;
pub mod pdu;
pub mod type_description;

pub use data::{decode_data, encode_data};
pub use decode::decode_pdu;
pub use encode::encode_pdu;
pub use type_description::{decode_type_description, encode_type_description};

#[cfg(test)]
mod tests;
