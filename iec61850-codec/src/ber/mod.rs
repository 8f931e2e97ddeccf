//! BER (Basic Encoding Rules) encoder and decoder
//!
//! Every value is a TLV triplet:
//!
//! ```text
//! [Tag] [Length] [Value]
//! ```
//!
//! MMS uses context specific tags almost everywhere, so the encoder and
//! decoder work on caller supplied tags and nested constructed values rather
//! than on a fixed set of universal types. Only definite lengths are supported.

pub mod decoder;
pub mod encoder;
pub mod types;

pub use decoder::BerDecoder;
pub use encoder::BerEncoder;
pub use types::{BerLength, BerTag, BerTagClass};
