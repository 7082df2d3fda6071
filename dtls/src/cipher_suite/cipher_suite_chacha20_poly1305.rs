use super::{CipherSuite, CipherSuiteId};
use crate::crypto::crypto_chacha20::CryptoChaCha20;
use crate::crypto::signature_hash_algorithm::SignatureAlgorithm;
use crate::error::*;
use crate::prf::{prf_encryption_keys, CipherSuiteHash};
use crate::record_layer::RecordLayerHeader;

const CHACHA20_KEY_LENGTH: usize = 32;
const CHACHA20_IV_LENGTH: usize = 12;

/// The ECDHE ChaCha20-Poly1305 suites (RFC 7905).
pub struct CipherSuiteChaCha20Poly1305 {
    id: CipherSuiteId,
    cipher: Option<CryptoChaCha20>,
}

impl CipherSuiteChaCha20Poly1305 {
    pub fn new(id: CipherSuiteId) -> Self {
        CipherSuiteChaCha20Poly1305 { id, cipher: None }
    }
}

impl CipherSuite for CipherSuiteChaCha20Poly1305 {
    fn id(&self) -> CipherSuiteId {
        self.id
    }

    fn certificate_type(&self) -> SignatureAlgorithm {
        match self.id {
            CipherSuiteId::Tls_Ecdhe_Rsa_With_Chacha20_Poly1305_Sha256 => SignatureAlgorithm::Rsa,
            _ => SignatureAlgorithm::Ecdsa,
        }
    }

    fn hash_func(&self) -> CipherSuiteHash {
        CipherSuiteHash::Sha256
    }

    fn is_initialized(&self) -> bool {
        self.cipher.is_some()
    }

    fn init(
        &mut self,
        master_secret: &[u8],
        client_random: &[u8],
        server_random: &[u8],
        is_client: bool,
    ) -> Result<()> {
        let keys = prf_encryption_keys(
            master_secret,
            client_random,
            server_random,
            CHACHA20_KEY_LENGTH,
            CHACHA20_IV_LENGTH,
            self.hash_func(),
        )?;

        self.cipher = Some(if is_client {
            CryptoChaCha20::new(
                &keys.client_write_key,
                &keys.client_write_iv,
                &keys.server_write_key,
                &keys.server_write_iv,
            )?
        } else {
            CryptoChaCha20::new(
                &keys.server_write_key,
                &keys.server_write_iv,
                &keys.client_write_key,
                &keys.client_write_iv,
            )?
        });

        Ok(())
    }

    fn encrypt(&self, pkt: &RecordLayerHeader, raw: &[u8]) -> Result<Vec<u8>> {
        match &self.cipher {
            Some(cipher) => cipher.encrypt(pkt, raw),
            None => Err(Error::ErrCipherSuiteNotInit),
        }
    }

    fn decrypt(&self, input: &[u8]) -> Result<Vec<u8>> {
        match &self.cipher {
            Some(cipher) => cipher.decrypt(input),
            None => Err(Error::ErrCipherSuiteNotInit),
        }
    }
}
