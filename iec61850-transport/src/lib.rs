//! Transport layer for the IEC 61850 MMS mapping
//!
//! An association exchanges opaque PDU buffers through a [`PduReader`] and a
//! [`PduWriter`]. The provided implementation frames every PDU with an RFC 1006
//! TPKT header and works over any tokio byte stream: a `TcpStream` in
//! production or an in-memory `DuplexStream` in tests.

pub mod stream;
pub mod tcp;
pub mod tpkt;

pub use stream::{PduReader, PduWriter};
pub use tcp::{TcpSettings, connect, split};
pub use tpkt::{TPKT_HEADER_LEN, TPKT_MAX_FRAME_SIZE, TpktReader, TpktWriter};
