use aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};

use crate::error::*;
use crate::record_layer::*;

pub const CHACHA20_TAG_LENGTH: usize = 16;
const CHACHA20_NONCE_LENGTH: usize = 12;

/// CryptoChaCha20 is the record protection for the ChaCha20-Poly1305
/// suites (RFC 7905): the nonce is implicit, derived by XORing the
/// write IV with the record's epoch+sequence.
pub struct CryptoChaCha20 {
    local_cipher: ChaCha20Poly1305,
    remote_cipher: ChaCha20Poly1305,
    local_write_iv: Vec<u8>,
    remote_write_iv: Vec<u8>,
}

impl CryptoChaCha20 {
    pub fn new(
        local_key: &[u8],
        local_write_iv: &[u8],
        remote_key: &[u8],
        remote_write_iv: &[u8],
    ) -> Result<Self> {
        Ok(CryptoChaCha20 {
            local_cipher: ChaCha20Poly1305::new_from_slice(local_key)
                .map_err(|e| Error::Other(e.to_string()))?,
            remote_cipher: ChaCha20Poly1305::new_from_slice(remote_key)
                .map_err(|e| Error::Other(e.to_string()))?,
            local_write_iv: local_write_iv.to_vec(),
            remote_write_iv: remote_write_iv.to_vec(),
        })
    }

    fn nonce(write_iv: &[u8], epoch: u16, sequence_number: u64) -> [u8; CHACHA20_NONCE_LENGTH] {
        let mut nonce = [0u8; CHACHA20_NONCE_LENGTH];
        nonce[4..].copy_from_slice(&epoch_sequence_bytes(epoch, sequence_number));
        for (i, iv) in write_iv.iter().enumerate() {
            nonce[i] ^= iv;
        }
        nonce
    }

    pub fn encrypt(&self, pkt: &RecordLayerHeader, raw: &[u8]) -> Result<Vec<u8>> {
        let payload = &raw[RECORD_LAYER_HEADER_SIZE..];
        let nonce = Self::nonce(&self.local_write_iv, pkt.epoch, pkt.sequence_number);

        let additional_data = generate_aead_additional_data(
            pkt.epoch,
            pkt.sequence_number,
            pkt.content_type,
            pkt.protocol_version,
            payload.len(),
        );

        let encrypted = self
            .local_cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: payload,
                    aad: &additional_data,
                },
            )
            .map_err(|_| Error::Other("ChaCha20 seal failed".to_owned()))?;

        let mut out = raw[..RECORD_LAYER_HEADER_SIZE].to_vec();
        out.extend_from_slice(&encrypted);
        let body_len = (out.len() - RECORD_LAYER_HEADER_SIZE) as u16;
        out[RECORD_LAYER_HEADER_SIZE - 2..RECORD_LAYER_HEADER_SIZE]
            .copy_from_slice(&body_len.to_be_bytes());
        Ok(out)
    }

    pub fn decrypt(&self, input: &[u8]) -> Result<Vec<u8>> {
        if input.len() <= RECORD_LAYER_HEADER_SIZE + CHACHA20_TAG_LENGTH {
            return Err(Error::ErrInvalidPacketLength);
        }
        let header = RecordLayerHeader::unmarshal(input)?;
        let nonce = Self::nonce(&self.remote_write_iv, header.epoch, header.sequence_number);
        let ciphertext = &input[RECORD_LAYER_HEADER_SIZE..];

        let plaintext_len = ciphertext.len() - CHACHA20_TAG_LENGTH;
        let additional_data = generate_aead_additional_data(
            header.epoch,
            header.sequence_number,
            header.content_type,
            header.protocol_version,
            plaintext_len,
        );

        let plaintext = self
            .remote_cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: ciphertext,
                    aad: &additional_data,
                },
            )
            .map_err(|_| Error::ErrDecryptFailed)?;

        let mut out = input[..RECORD_LAYER_HEADER_SIZE].to_vec();
        out.extend_from_slice(&plaintext);
        let body_len = plaintext.len() as u16;
        out[RECORD_LAYER_HEADER_SIZE - 2..RECORD_LAYER_HEADER_SIZE]
            .copy_from_slice(&body_len.to_be_bytes());
        Ok(out)
    }
}
