//! Server configuration

use iec61850_core::BitString;
use iec61850_transport::TcpSettings;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Smallest MMS PDU size an association may negotiate
pub const MINIMUM_MMS_PDU_SIZE: u32 = 64;
/// Largest MMS PDU size this server accepts
pub const MAXIMUM_MMS_PDU_SIZE: u32 = 65000;

const SERVICES_SUPPORTED_CALLED: [u8; 11] = [
    0xee, 0x1c, 0x00, 0x00, 0x04, 0x08, 0x00, 0x00, 0x79, 0xef, 0x18,
];
const PARAMETER_CBB: [u8; 2] = [0xfb, 0x00];

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    /// Connections beyond this number are refused
    pub max_associations: usize,
    /// Clamped to `64..=65000`
    pub max_mms_pdu_size: u32,
    pub proposed_max_serv_outstanding_calling: u16,
    pub proposed_max_serv_outstanding_called: u16,
    pub proposed_data_structure_nesting_level: u8,
    pub services_supported_called: BitString,
    pub parameter_cbb: BitString,
    /// Root directory of the file services; `None` disables them
    pub file_root: Option<PathBuf>,
    /// Framing and socket settings, including the message fragment timeout
    pub tcp: TcpSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 102,
            max_associations: 100,
            max_mms_pdu_size: MAXIMUM_MMS_PDU_SIZE,
            proposed_max_serv_outstanding_calling: 5,
            proposed_max_serv_outstanding_called: 5,
            proposed_data_structure_nesting_level: 10,
            services_supported_called: BitString::new(SERVICES_SUPPORTED_CALLED.to_vec(), 85)
                .unwrap_or_else(|_| BitString::zeroed(85)),
            parameter_cbb: BitString::new(PARAMETER_CBB.to_vec(), 11)
                .unwrap_or_else(|_| BitString::zeroed(11)),
            file_root: None,
            tcp: TcpSettings::default(),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn socket_address(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn with_bind_address(mut self, address: IpAddr) -> Self {
        self.bind_address = address;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_max_associations(mut self, max_associations: usize) -> Self {
        self.max_associations = max_associations;
        self
    }

    /// Set the maximum MMS PDU size, clamped to the supported range
    pub fn with_max_mms_pdu_size(mut self, size: u32) -> Self {
        self.max_mms_pdu_size = size.clamp(MINIMUM_MMS_PDU_SIZE, MAXIMUM_MMS_PDU_SIZE);
        self
    }

    pub fn with_proposed_max_serv_outstanding_calling(mut self, value: u16) -> Self {
        self.proposed_max_serv_outstanding_calling = value;
        self
    }

    pub fn with_proposed_max_serv_outstanding_called(mut self, value: u16) -> Self {
        self.proposed_max_serv_outstanding_called = value;
        self
    }

    pub fn with_proposed_data_structure_nesting_level(mut self, value: u8) -> Self {
        self.proposed_data_structure_nesting_level = value;
        self
    }

    pub fn with_file_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.file_root = Some(root.into());
        self
    }

    pub fn with_tcp_settings(mut self, tcp: TcpSettings) -> Self {
        self.tcp = tcp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 102);
        assert_eq!(config.max_associations, 100);
        assert_eq!(config.services_supported_called.num_bits(), 85);
        assert_eq!(config.socket_address().port(), 102);
    }

    #[test]
    fn test_pdu_size_is_clamped() {
        assert_eq!(ServerConfig::new().with_max_mms_pdu_size(10).max_mms_pdu_size, 64);
        assert_eq!(
            ServerConfig::new().with_max_mms_pdu_size(100_000).max_mms_pdu_size,
            65000
        );
    }
}
