use util::replay_detector::SlidingWindowDetector;

use crate::cipher_suite::CipherSuite;
use crate::error::*;
use crate::extension::extension_use_srtp::SrtpProtectionProfile;
use crate::handshake::handshake_random::HandshakeRandom;
use crate::prf::prf_exporter;
use crate::record_layer::MAX_SEQUENCE_NUMBER;

const DEFAULT_REPLAY_PROTECTION_WINDOW: u64 = 64;

/// State holds the negotiated connection parameters.
pub struct State {
    pub is_client: bool,
    pub local_epoch: u16,
    pub remote_epoch: u16,
    /// Outbound record sequence numbers, one counter per epoch.
    pub local_sequence_number: Vec<u64>,
    pub local_random: HandshakeRandom,
    pub remote_random: HandshakeRandom,
    pub cipher_suite: Option<Box<dyn CipherSuite>>,
    pub master_secret: Vec<u8>,
    pub extended_master_secret: bool,
    pub srtp_protection_profile: SrtpProtectionProfile,
    /// Peer's certificate chain (leaf first), raw DER.
    pub peer_certificates: Vec<Vec<u8>>,
    /// Anti-replay windows, one per epoch.
    pub replay_detector: Vec<SlidingWindowDetector>,
}

impl Default for State {
    fn default() -> Self {
        State {
            is_client: false,
            local_epoch: 0,
            remote_epoch: 0,
            local_sequence_number: vec![0, 0],
            local_random: HandshakeRandom::default(),
            remote_random: HandshakeRandom::default(),
            cipher_suite: None,
            master_secret: vec![],
            extended_master_secret: false,
            srtp_protection_profile: SrtpProtectionProfile::Unsupported,
            peer_certificates: vec![],
            replay_detector: vec![
                SlidingWindowDetector::new(DEFAULT_REPLAY_PROTECTION_WINDOW, MAX_SEQUENCE_NUMBER),
                SlidingWindowDetector::new(DEFAULT_REPLAY_PROTECTION_WINDOW, MAX_SEQUENCE_NUMBER),
            ],
        }
    }
}

impl State {
    /// export_keying_material returns length bytes of exported material
    /// per RFC 5705. Contexts are not supported.
    pub fn export_keying_material(&self, label: &str, length: usize) -> Result<Vec<u8>> {
        if self.master_secret.is_empty() {
            return Err(Error::ErrHandshakeInProgress);
        }
        let Some(cipher_suite) = &self.cipher_suite else {
            return Err(Error::ErrCipherSuiteNotInit);
        };

        let (client_random, server_random) = if self.is_client {
            (
                self.local_random.marshal_fixed(),
                self.remote_random.marshal_fixed(),
            )
        } else {
            (
                self.remote_random.marshal_fixed(),
                self.local_random.marshal_fixed(),
            )
        };

        prf_exporter(
            &self.master_secret,
            label,
            &client_random,
            &server_random,
            length,
            cipher_suite.hash_func(),
        )
    }
}
