pub mod cipher_suite_aes_gcm;
pub mod cipher_suite_chacha20_poly1305;

use std::fmt;

use cipher_suite_aes_gcm::CipherSuiteAesGcm;
use cipher_suite_chacha20_poly1305::CipherSuiteChaCha20Poly1305;

use crate::crypto::signature_hash_algorithm::SignatureAlgorithm;
use crate::error::*;
use crate::prf::CipherSuiteHash;
use crate::record_layer::RecordLayerHeader;

/// CipherSuiteId is the 16-bit IANA identifier of a TLS cipher suite.
///
/// https://www.iana.org/assignments/tls-parameters/tls-parameters.xhtml
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CipherSuiteId {
    Tls_Ecdhe_Ecdsa_With_Aes_128_Gcm_Sha256 = 0xc02b,
    Tls_Ecdhe_Rsa_With_Aes_128_Gcm_Sha256 = 0xc02f,
    Tls_Ecdhe_Ecdsa_With_Aes_256_Gcm_Sha384 = 0xc02c,
    Tls_Ecdhe_Ecdsa_With_Chacha20_Poly1305_Sha256 = 0xcca9,
    Tls_Ecdhe_Rsa_With_Chacha20_Poly1305_Sha256 = 0xcca8,
    Unsupported = 0x0000,
}

impl From<u16> for CipherSuiteId {
    fn from(val: u16) -> Self {
        match val {
            0xc02b => CipherSuiteId::Tls_Ecdhe_Ecdsa_With_Aes_128_Gcm_Sha256,
            0xc02f => CipherSuiteId::Tls_Ecdhe_Rsa_With_Aes_128_Gcm_Sha256,
            0xc02c => CipherSuiteId::Tls_Ecdhe_Ecdsa_With_Aes_256_Gcm_Sha384,
            0xcca9 => CipherSuiteId::Tls_Ecdhe_Ecdsa_With_Chacha20_Poly1305_Sha256,
            0xcca8 => CipherSuiteId::Tls_Ecdhe_Rsa_With_Chacha20_Poly1305_Sha256,
            _ => CipherSuiteId::Unsupported,
        }
    }
}

impl fmt::Display for CipherSuiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherSuiteId::Tls_Ecdhe_Ecdsa_With_Aes_128_Gcm_Sha256 => {
                write!(f, "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256")
            }
            CipherSuiteId::Tls_Ecdhe_Rsa_With_Aes_128_Gcm_Sha256 => {
                write!(f, "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256")
            }
            CipherSuiteId::Tls_Ecdhe_Ecdsa_With_Aes_256_Gcm_Sha384 => {
                write!(f, "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384")
            }
            CipherSuiteId::Tls_Ecdhe_Ecdsa_With_Chacha20_Poly1305_Sha256 => {
                write!(f, "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256")
            }
            CipherSuiteId::Tls_Ecdhe_Rsa_With_Chacha20_Poly1305_Sha256 => {
                write!(f, "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256")
            }
            CipherSuiteId::Unsupported => write!(f, "Unsupported CipherSuiteID"),
        }
    }
}

/// CipherSuite is one initialized record-protection algorithm.
pub trait CipherSuite: Send + Sync {
    fn id(&self) -> CipherSuiteId;
    /// Which authentication the peer certificate must carry.
    fn certificate_type(&self) -> SignatureAlgorithm;
    /// The PRF hash family this suite pins.
    fn hash_func(&self) -> CipherSuiteHash;
    fn is_initialized(&self) -> bool;
    fn init(
        &mut self,
        master_secret: &[u8],
        client_random: &[u8],
        server_random: &[u8],
        is_client: bool,
    ) -> Result<()>;
    fn encrypt(&self, pkt: &RecordLayerHeader, raw: &[u8]) -> Result<Vec<u8>>;
    fn decrypt(&self, input: &[u8]) -> Result<Vec<u8>>;
}

/// cipher_suite_for_id constructs the (uninitialized) suite for an id.
pub fn cipher_suite_for_id(id: CipherSuiteId) -> Result<Box<dyn CipherSuite>> {
    match id {
        CipherSuiteId::Tls_Ecdhe_Ecdsa_With_Aes_128_Gcm_Sha256
        | CipherSuiteId::Tls_Ecdhe_Rsa_With_Aes_128_Gcm_Sha256
        | CipherSuiteId::Tls_Ecdhe_Ecdsa_With_Aes_256_Gcm_Sha384 => {
            Ok(Box::new(CipherSuiteAesGcm::new(id)))
        }
        CipherSuiteId::Tls_Ecdhe_Ecdsa_With_Chacha20_Poly1305_Sha256
        | CipherSuiteId::Tls_Ecdhe_Rsa_With_Chacha20_Poly1305_Sha256 => {
            Ok(Box::new(CipherSuiteChaCha20Poly1305::new(id)))
        }
        CipherSuiteId::Unsupported => Err(Error::ErrInvalidCipherSuite),
    }
}

/// The suites offered in our ClientHello, most preferred first.
pub fn default_cipher_suites() -> Vec<CipherSuiteId> {
    vec![
        CipherSuiteId::Tls_Ecdhe_Ecdsa_With_Aes_128_Gcm_Sha256,
        CipherSuiteId::Tls_Ecdhe_Ecdsa_With_Chacha20_Poly1305_Sha256,
        CipherSuiteId::Tls_Ecdhe_Ecdsa_With_Aes_256_Gcm_Sha384,
        CipherSuiteId::Tls_Ecdhe_Rsa_With_Aes_128_Gcm_Sha256,
        CipherSuiteId::Tls_Ecdhe_Rsa_With_Chacha20_Poly1305_Sha256,
    ]
}
