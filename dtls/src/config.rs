use std::time::Duration;

use crate::cipher_suite::{default_cipher_suites, CipherSuiteId};
use crate::crypto::Certificate;
use crate::extension::extension_use_srtp::SrtpProtectionProfile;

/// How the server treats client certificates. WebRTC endpoints demand
/// mutual authentication.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClientAuthType {
    NoClientCert,
    RequireAnyClientCert,
}

impl Default for ClientAuthType {
    fn default() -> Self {
        ClientAuthType::RequireAnyClientCert
    }
}

/// Config is used to configure a DTLS client or server.
pub struct Config {
    pub certificates: Vec<Certificate>,
    pub cipher_suites: Vec<CipherSuiteId>,
    /// SRTP profiles offered/accepted via use_srtp; empty disables
    /// DTLS-SRTP negotiation.
    pub srtp_protection_profiles: Vec<SrtpProtectionProfile>,
    pub client_auth: ClientAuthType,
    /// Per-flight retransmission interval; doubles on every timeout.
    pub flight_interval: Duration,
    /// Overall handshake deadline.
    pub handshake_timeout: Duration,
    /// When set, the peer certificate is surfaced but not verified here;
    /// the caller checks the fingerprint against the signalled one.
    pub insecure_skip_verify: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            certificates: vec![],
            cipher_suites: default_cipher_suites(),
            srtp_protection_profiles: vec![
                SrtpProtectionProfile::Srtp_Aead_Aes_128_Gcm,
                SrtpProtectionProfile::Srtp_Aes128_Cm_Hmac_Sha1_80,
            ],
            client_auth: ClientAuthType::RequireAnyClientCert,
            flight_interval: Duration::from_millis(500),
            handshake_timeout: Duration::from_secs(30),
            insecure_skip_verify: true,
        }
    }
}
