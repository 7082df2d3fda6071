use aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use rand::Rng;

use crate::error::*;
use crate::record_layer::*;

pub const GCM_TAG_LENGTH: usize = 16;
pub const GCM_NONCE_LENGTH: usize = 12;
const GCM_EXPLICIT_NONCE_LENGTH: usize = 8;

enum AesGcmVariant {
    Gcm128(Box<Aes128Gcm>),
    Gcm256(Box<Aes256Gcm>),
}

impl AesGcmVariant {
    fn new(key: &[u8]) -> Result<Self> {
        match key.len() {
            16 => Ok(AesGcmVariant::Gcm128(Box::new(
                Aes128Gcm::new_from_slice(key).map_err(|e| Error::Other(e.to_string()))?,
            ))),
            32 => Ok(AesGcmVariant::Gcm256(Box::new(
                Aes256Gcm::new_from_slice(key).map_err(|e| Error::Other(e.to_string()))?,
            ))),
            _ => Err(Error::ErrInvalidCipherSuite),
        }
    }

    fn seal(&self, nonce: &[u8], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let payload = Payload { msg, aad };
        match self {
            AesGcmVariant::Gcm128(c) => c.encrypt(Nonce::from_slice(nonce), payload),
            AesGcmVariant::Gcm256(c) => c.encrypt(Nonce::from_slice(nonce), payload),
        }
        .map_err(|_| Error::Other("AES-GCM seal failed".to_owned()))
    }

    fn open(&self, nonce: &[u8], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let payload = Payload { msg, aad };
        match self {
            AesGcmVariant::Gcm128(c) => c.decrypt(Nonce::from_slice(nonce), payload),
            AesGcmVariant::Gcm256(c) => c.decrypt(Nonce::from_slice(nonce), payload),
        }
        .map_err(|_| Error::ErrDecryptFailed)
    }
}

/// CryptoGcm is the record protection for the AES-GCM suites
/// (RFC 5288): an 8-byte explicit nonce rides in front of each
/// ciphertext.
pub struct CryptoGcm {
    local_gcm: AesGcmVariant,
    remote_gcm: AesGcmVariant,
    local_write_iv: Vec<u8>,
    remote_write_iv: Vec<u8>,
}

impl CryptoGcm {
    pub fn new(
        local_key: &[u8],
        local_write_iv: &[u8],
        remote_key: &[u8],
        remote_write_iv: &[u8],
    ) -> Result<Self> {
        Ok(CryptoGcm {
            local_gcm: AesGcmVariant::new(local_key)?,
            remote_gcm: AesGcmVariant::new(remote_key)?,
            local_write_iv: local_write_iv.to_vec(),
            remote_write_iv: remote_write_iv.to_vec(),
        })
    }

    pub fn encrypt(&self, pkt: &RecordLayerHeader, raw: &[u8]) -> Result<Vec<u8>> {
        let payload = &raw[RECORD_LAYER_HEADER_SIZE..];

        let mut nonce = [0u8; GCM_NONCE_LENGTH];
        nonce[..4].copy_from_slice(&self.local_write_iv[..4]);
        rand::thread_rng().fill(&mut nonce[4..]);

        let additional_data = generate_aead_additional_data(
            pkt.epoch,
            pkt.sequence_number,
            pkt.content_type,
            pkt.protocol_version,
            payload.len(),
        );

        let encrypted = self.local_gcm.seal(&nonce, payload, &additional_data)?;

        let mut out = raw[..RECORD_LAYER_HEADER_SIZE].to_vec();
        out.extend_from_slice(&nonce[4..]);
        out.extend_from_slice(&encrypted);

        // record length now includes the explicit nonce
        let body_len = (out.len() - RECORD_LAYER_HEADER_SIZE) as u16;
        out[RECORD_LAYER_HEADER_SIZE - 2..RECORD_LAYER_HEADER_SIZE]
            .copy_from_slice(&body_len.to_be_bytes());
        Ok(out)
    }

    pub fn decrypt(&self, input: &[u8]) -> Result<Vec<u8>> {
        if input.len() <= RECORD_LAYER_HEADER_SIZE + GCM_EXPLICIT_NONCE_LENGTH + GCM_TAG_LENGTH {
            return Err(Error::ErrInvalidPacketLength);
        }
        let header = RecordLayerHeader::unmarshal(input)?;

        let mut nonce = [0u8; GCM_NONCE_LENGTH];
        nonce[..4].copy_from_slice(&self.remote_write_iv[..4]);
        nonce[4..].copy_from_slice(
            &input[RECORD_LAYER_HEADER_SIZE..RECORD_LAYER_HEADER_SIZE + GCM_EXPLICIT_NONCE_LENGTH],
        );
        let ciphertext = &input[RECORD_LAYER_HEADER_SIZE + GCM_EXPLICIT_NONCE_LENGTH..];

        let plaintext_len = ciphertext.len() - GCM_TAG_LENGTH;
        let additional_data = generate_aead_additional_data(
            header.epoch,
            header.sequence_number,
            header.content_type,
            header.protocol_version,
            plaintext_len,
        );

        let plaintext = self.remote_gcm.open(&nonce, ciphertext, &additional_data)?;

        let mut out = input[..RECORD_LAYER_HEADER_SIZE].to_vec();
        out.extend_from_slice(&plaintext);
        let body_len = plaintext.len() as u16;
        out[RECORD_LAYER_HEADER_SIZE - 2..RECORD_LAYER_HEADER_SIZE]
            .copy_from_slice(&body_len.to_be_bytes());
        Ok(out)
    }
}
