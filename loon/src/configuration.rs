use serde::Serialize;

use crate::peer_connection::certificate::RTCCertificate;

/// RTCIceServer describes one STUN or TURN server entry.
#[derive(Default, Debug, Clone, Serialize)]
pub struct RTCIceServer {
    pub urls: Vec<String>,
    pub username: String,
    pub credential: String,
}

/// ICE transport policy: `Relay` skips host and srflx gathering
/// entirely.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum RTCIceTransportPolicy {
    #[serde(rename = "all")]
    All,
    #[serde(rename = "relay")]
    Relay,
}

impl Default for RTCIceTransportPolicy {
    fn default() -> Self {
        RTCIceTransportPolicy::All
    }
}

/// Bundle policy controls how media sections map onto transports
/// (W3C bundlePolicy plus the legacy `Disable` escape hatch some
/// embedded peers need).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum RTCBundlePolicy {
    #[serde(rename = "balanced")]
    Balanced,
    #[serde(rename = "max-compat")]
    MaxCompat,
    #[serde(rename = "max-bundle")]
    MaxBundle,
    /// One transport per m-line, always; ICE credentials are shared so
    /// pre-BUNDLE devices still converge.
    #[serde(rename = "disable")]
    Disable,
}

impl Default for RTCBundlePolicy {
    fn default() -> Self {
        RTCBundlePolicy::Balanced
    }
}

/// RTCConfiguration parameterizes a peer connection.
#[derive(Default)]
pub struct RTCConfiguration {
    pub ice_servers: Vec<RTCIceServer>,
    pub ice_transport_policy: RTCIceTransportPolicy,
    pub bundle_policy: RTCBundlePolicy,
    /// Pre-seeded certificates; a self-signed ECDSA P-256 one is
    /// generated when empty.
    pub certificates: Vec<RTCCertificate>,

    /// Connectivity-check pacing in milliseconds (0 selects 5).
    pub ice_pacing_interval_ms: u64,
    /// STUN transaction timeout in milliseconds (0 selects 1500).
    pub stun_timeout_ms: u64,
    /// Overall DTLS handshake deadline in milliseconds (0 selects 30000).
    pub dtls_handshake_timeout_ms: u64,
    /// Initial DTLS flight retransmit interval in ms (0 selects 500).
    pub dtls_flight_timeout_ms: u64,
    /// Loopback host candidates (useful for same-host testing).
    pub include_loopback_candidates: bool,
}

impl RTCConfiguration {
    pub(crate) fn ice_pacing_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(if self.ice_pacing_interval_ms == 0 {
            5
        } else {
            self.ice_pacing_interval_ms
        })
    }

    pub(crate) fn stun_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(if self.stun_timeout_ms == 0 {
            1500
        } else {
            self.stun_timeout_ms
        })
    }

    pub(crate) fn dtls_handshake_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(if self.dtls_handshake_timeout_ms == 0 {
            30_000
        } else {
            self.dtls_handshake_timeout_ms
        })
    }

    pub(crate) fn dtls_flight_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(if self.dtls_flight_timeout_ms == 0 {
            500
        } else {
            self.dtls_flight_timeout_ms
        })
    }
}
