//! Client configuration

use iec61850_core::BitString;
use iec61850_transport::TcpSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest MMS PDU size a server may answer with
pub const MINIMUM_MMS_PDU_SIZE: u32 = 64;

const SERVICES_SUPPORTED_CALLING: [u8; 11] = [
    0xee, 0x1c, 0x00, 0x00, 0x04, 0x08, 0x00, 0x00, 0x79, 0xef, 0x18,
];
const PARAMETER_CBB: [u8; 2] = [0xfb, 0x00];

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub proposed_max_mms_pdu_size: u32,
    pub proposed_max_serv_outstanding_calling: u16,
    pub proposed_max_serv_outstanding_called: u16,
    pub proposed_data_structure_nesting_level: u8,
    pub services_supported_calling: BitString,
    pub parameter_cbb: BitString,
    /// Wait for a confirmed response in milliseconds; 0 waits forever
    pub response_timeout_ms: u64,
    /// Framing and socket settings, including the message fragment timeout
    pub tcp: TcpSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            proposed_max_mms_pdu_size: 65000,
            proposed_max_serv_outstanding_calling: 5,
            proposed_max_serv_outstanding_called: 5,
            proposed_data_structure_nesting_level: 10,
            services_supported_calling: BitString::new(SERVICES_SUPPORTED_CALLING.to_vec(), 85)
                .unwrap_or_else(|_| BitString::zeroed(85)),
            parameter_cbb: BitString::new(PARAMETER_CBB.to_vec(), 11)
                .unwrap_or_else(|_| BitString::zeroed(11)),
            response_timeout_ms: 20_000,
            tcp: TcpSettings::default()
                .with_connect_timeout(Some(Duration::from_secs(20)))
                .with_fragment_timeout(Some(Duration::from_secs(10))),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Response timeout, `None` when waiting forever
    pub fn response_timeout(&self) -> Option<Duration> {
        (self.response_timeout_ms > 0).then(|| Duration::from_millis(self.response_timeout_ms))
    }

    /// Set the proposed maximum MMS PDU size; values below 64 are raised to 64
    pub fn with_max_mms_pdu_size(mut self, size: u32) -> Self {
        self.proposed_max_mms_pdu_size = size.max(MINIMUM_MMS_PDU_SIZE);
        self
    }

    pub fn with_max_serv_outstanding_calling(mut self, value: u16) -> Self {
        self.proposed_max_serv_outstanding_calling = value;
        self
    }

    pub fn with_max_serv_outstanding_called(mut self, value: u16) -> Self {
        self.proposed_max_serv_outstanding_called = value;
        self
    }

    pub fn with_data_structure_nesting_level(mut self, value: u8) -> Self {
        self.proposed_data_structure_nesting_level = value;
        self
    }

    pub fn with_services_supported_calling(mut self, services: BitString) -> Self {
        self.services_supported_calling = services;
        self
    }

    pub fn with_response_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.response_timeout_ms = timeout_ms;
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
        let config = ClientConfig::new();
        assert_eq!(config.proposed_max_mms_pdu_size, 65000);
        assert_eq!(config.response_timeout(), Some(Duration::from_secs(20)));
        assert_eq!(config.services_supported_calling.num_bits(), 85);
    }

    #[test]
    fn test_zero_timeout_waits_forever() {
        let config = ClientConfig::new().with_response_timeout_ms(0).with_max_mms_pdu_size(10);
        assert_eq!(config.response_timeout(), None);
        assert_eq!(config.proposed_max_mms_pdu_size, MINIMUM_MMS_PDU_SIZE);
    }
}
