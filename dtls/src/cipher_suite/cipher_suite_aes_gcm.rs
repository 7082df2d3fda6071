use super::{CipherSuite, CipherSuiteId};
use crate::crypto::crypto_gcm::CryptoGcm;
use crate::crypto::signature_hash_algorithm::SignatureAlgorithm;
use crate::error::*;
use crate::prf::{prf_encryption_keys, CipherSuiteHash};
use crate::record_layer::RecordLayerHeader;

const PRF_GCM_IV_LENGTH: usize = 4;

/// The ECDHE AES-GCM suites: key size and PRF hash vary with the id,
/// the record protection is shared.
pub struct CipherSuiteAesGcm {
    id: CipherSuiteId,
    gcm: Option<CryptoGcm>,
}

impl CipherSuiteAesGcm {
    pub fn new(id: CipherSuiteId) -> Self {
        CipherSuiteAesGcm { id, gcm: None }
    }

    fn key_len(&self) -> usize {
        match self.id {
            CipherSuiteId::Tls_Ecdhe_Ecdsa_With_Aes_256_Gcm_Sha384 => 32,
            _ => 16,
        }
    }
}

impl CipherSuite for CipherSuiteAesGcm {
    fn id(&self) -> CipherSuiteId {
        self.id
    }

    fn certificate_type(&self) -> SignatureAlgorithm {
        match self.id {
            CipherSuiteId::Tls_Ecdhe_Rsa_With_Aes_128_Gcm_Sha256 => SignatureAlgorithm::Rsa,
            _ => SignatureAlgorithm::Ecdsa,
        }
    }

    fn hash_func(&self) -> CipherSuiteHash {
        match self.id {
            CipherSuiteId::Tls_Ecdhe_Ecdsa_With_Aes_256_Gcm_Sha384 => CipherSuiteHash::Sha384,
            _ => CipherSuiteHash::Sha256,
        }
    }

    fn is_initialized(&self) -> bool {
        self.gcm.is_some()
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
            self.key_len(),
            PRF_GCM_IV_LENGTH,
            self.hash_func(),
        )?;

        self.gcm = Some(if is_client {
            CryptoGcm::new(
                &keys.client_write_key,
                &keys.client_write_iv,
                &keys.server_write_key,
                &keys.server_write_iv,
            )?
        } else {
            CryptoGcm::new(
                &keys.server_write_key,
                &keys.server_write_iv,
                &keys.client_write_key,
                &keys.client_write_iv,
            )?
        });

        Ok(())
    }

    fn encrypt(&self, pkt: &RecordLayerHeader, raw: &[u8]) -> Result<Vec<u8>> {
        match &self.gcm {
            Some(gcm) => gcm.encrypt(pkt, raw),
            None => Err(Error::ErrCipherSuiteNotInit),
        }
    }

    fn decrypt(&self, input: &[u8]) -> Result<Vec<u8>> {
        match &self.gcm {
            Some(gcm) => gcm.decrypt(input),
            None => Err(Error::ErrCipherSuiteNotInit),
        }
    }
}
