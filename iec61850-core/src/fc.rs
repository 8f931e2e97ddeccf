//! Functional constraints

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Iec61850Error;

/// Functional constraint partitioning the attributes of a logical node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Fc {
    /// Status information
    ST,
    /// Measurands
    MX,
    /// Setpoint
    SP,
    /// Substitution
    SV,
    /// Configuration
    CF,
    /// Description
    DC,
    /// Setting group
    SG,
    /// Setting group editable
    SE,
    /// Service response / service tracking
    SR,
    /// Operate received
    OR,
    /// Blocking
    BL,
    /// Extended definition
    EX,
    /// Control
    CO,
    /// Unbuffered report
    RP,
    /// Buffered report
    BR,
}

impl Fc {
    /// Order in which FCs appear in MMS directory listings and LN type descriptions
    pub const MMS_DIRECTORY_ORDER: [Fc; 15] = [
        Fc::MX,
        Fc::ST,
        Fc::CO,
        Fc::CF,
        Fc::DC,
        Fc::SP,
        Fc::SG,
        Fc::RP,
        Fc::BR,
        Fc::SV,
        Fc::SE,
        Fc::EX,
        Fc::SR,
        Fc::OR,
        Fc::BL,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Fc::ST => "ST",
            Fc::MX => "MX",
            Fc::SP => "SP",
            Fc::SV => "SV",
            Fc::CF => "CF",
            Fc::DC => "DC",
            Fc::SG => "SG",
            Fc::SE => "SE",
            Fc::SR => "SR",
            Fc::OR => "OR",
            Fc::BL => "BL",
            Fc::EX => "EX",
            Fc::CO => "CO",
            Fc::RP => "RP",
            Fc::BR => "BR",
        }
    }

    /// Parse an FC, `None` for unknown names
    pub fn from_name(name: &str) -> Option<Self> {
        let fc = match name {
            "ST" => Fc::ST,
            "MX" => Fc::MX,
            "SP" => Fc::SP,
            "SV" => Fc::SV,
            "CF" => Fc::CF,
            "DC" => Fc::DC,
            "SG" => Fc::SG,
            "SE" => Fc::SE,
            "SR" => Fc::SR,
            "OR" => Fc::OR,
            "BL" => Fc::BL,
            "EX" => Fc::EX,
            "CO" => Fc::CO,
            "RP" => Fc::RP,
            "BR" => Fc::BR,
            _ => return None,
        };
        Some(fc)
    }

    /// Report control block FCs
    pub const fn is_report(&self) -> bool {
        matches!(self, Fc::RP | Fc::BR)
    }

    /// FCs that clients may never write
    pub const fn is_read_only(&self) -> bool {
        matches!(self, Fc::ST | Fc::MX | Fc::OR | Fc::EX)
    }
}

impl FromStr for Fc {
    type Err = Iec61850Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Fc::from_name(s).ok_or_else(|| Iec61850Error::InvalidData(format!("unknown FC: {}", s)))
    }
}

impl fmt::Display for Fc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
