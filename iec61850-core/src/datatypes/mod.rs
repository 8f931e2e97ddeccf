//! Data types carried by IEC 61850 basic data attributes
//!
//! Bit-string based composite types share [`BitString`] storage and only add
//! named accessors for the individual bits.

pub mod bit_string;
pub mod check;
pub mod opt_flds;
pub mod quality;
pub mod reason_for_inclusion;
pub mod time;
pub mod trigger_conditions;

pub use bit_string::BitString;
pub use check::{Check, DoubleBitPos, DoubleBitPosValue, TapCommand, TapCommandValue};
pub use opt_flds::OptFlds;
pub use quality::{Quality, Validity};
pub use reason_for_inclusion::ReasonForInclusion;
pub use time::{EntryTime, Timestamp};
pub use trigger_conditions::TriggerConditions;
