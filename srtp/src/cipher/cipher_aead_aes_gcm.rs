use aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Nonce};
use bytes::{BufMut, Bytes, BytesMut};
use util::marshal::MarshalSize;

use super::Cipher;
use crate::error::{Error, Result};
use crate::key_derivation::*;
use crate::protection_profile::ProtectionProfile;

pub(crate) const CIPHER_AEAD_AES_GCM_AUTH_TAG_LEN: usize = 16;
const SRTCP_INDEX_SIZE: usize = 4;
const RTCP_ENCRYPTION_FLAG: u8 = 0x80;

/// AEAD AES-128-GCM transform, RFC 7714.
pub(crate) struct CipherAeadAesGcm {
    profile: ProtectionProfile,

    srtp_cipher: Aes128Gcm,
    srtp_session_salt: Vec<u8>,

    srtcp_cipher: Aes128Gcm,
    srtcp_session_salt: Vec<u8>,
}

impl CipherAeadAesGcm {
    pub(crate) fn new(master_key: &[u8], master_salt: &[u8]) -> Result<Self> {
        let profile = ProtectionProfile::AeadAes128Gcm;

        let srtp_session_key = aes_cm_key_derivation(
            LABEL_SRTP_ENCRYPTION,
            master_key,
            master_salt,
            0,
            profile.key_len(),
        )?;
        let srtp_session_salt = aes_cm_key_derivation(
            LABEL_SRTP_SALT,
            master_key,
            master_salt,
            0,
            profile.salt_len(),
        )?;

        let srtcp_session_key = aes_cm_key_derivation(
            LABEL_SRTCP_ENCRYPTION,
            master_key,
            master_salt,
            0,
            profile.key_len(),
        )?;
        let srtcp_session_salt = aes_cm_key_derivation(
            LABEL_SRTCP_SALT,
            master_key,
            master_salt,
            0,
            profile.salt_len(),
        )?;

        let srtp_cipher = Aes128Gcm::new_from_slice(&srtp_session_key)
            .map_err(|e| Error::Other(e.to_string()))?;
        let srtcp_cipher = Aes128Gcm::new_from_slice(&srtcp_session_key)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(CipherAeadAesGcm {
            profile,
            srtp_cipher,
            srtp_session_salt,
            srtcp_cipher,
            srtcp_session_salt,
        })
    }

    /// RFC 7714 Section 8.1: IV = (salt) XOR (0x0000 || ssrc || roc || seq).
    pub(crate) fn rtp_initialization_vector(
        &self,
        header: &rtp::header::Header,
        roc: u32,
    ) -> [u8; 12] {
        let mut iv = [0u8; 12];
        iv[2..6].copy_from_slice(&header.ssrc.to_be_bytes());
        iv[6..10].copy_from_slice(&roc.to_be_bytes());
        iv[10..12].copy_from_slice(&header.sequence_number.to_be_bytes());

        for (i, s) in self.srtp_session_salt.iter().enumerate() {
            iv[i] ^= *s;
        }
        iv
    }

    /// RFC 7714 Section 9.1: IV = (salt) XOR
    /// (0x0000 || ssrc || 0x0000 || 31-bit index).
    pub(crate) fn rtcp_initialization_vector(&self, srtcp_index: usize, ssrc: u32) -> [u8; 12] {
        let mut iv = [0u8; 12];
        iv[2..6].copy_from_slice(&ssrc.to_be_bytes());
        iv[8..12].copy_from_slice(&(srtcp_index as u32).to_be_bytes());

        for (i, s) in self.srtcp_session_salt.iter().enumerate() {
            iv[i] ^= *s;
        }
        iv
    }

    /// RFC 7714 Section 17: the RTCP AAD is the 8-byte prefix plus the
    /// E-bit-carrying index word.
    pub(crate) fn rtcp_additional_authenticated_data(
        &self,
        rtcp_packet: &[u8],
        srtcp_index: usize,
    ) -> [u8; 12] {
        let mut aad = [0u8; 12];
        aad[..8].copy_from_slice(&rtcp_packet[..8]);
        aad[8..12].copy_from_slice(&(srtcp_index as u32).to_be_bytes());
        aad[8] |= RTCP_ENCRYPTION_FLAG;
        aad
    }
}

impl Cipher for CipherAeadAesGcm {
    fn rtp_auth_tag_len(&self) -> usize {
        0
    }

    fn rtcp_auth_tag_len(&self) -> usize {
        0
    }

    fn aead_auth_tag_len(&self) -> usize {
        CIPHER_AEAD_AES_GCM_AUTH_TAG_LEN
    }

    fn get_rtcp_index(&self, input: &[u8]) -> usize {
        let tail_offset = input.len() - SRTCP_INDEX_SIZE;
        let index = u32::from_be_bytes([
            input[tail_offset],
            input[tail_offset + 1],
            input[tail_offset + 2],
            input[tail_offset + 3],
        ]);
        (index & 0x7FFF_FFFF) as usize
    }

    fn encrypt_rtp(
        &mut self,
        plaintext: &[u8],
        header: &rtp::header::Header,
        roc: u32,
    ) -> Result<Bytes> {
        let header_len = header.marshal_size();
        let iv = self.rtp_initialization_vector(header, roc);

        let ciphertext = self
            .srtp_cipher
            .encrypt(
                Nonce::from_slice(&iv),
                Payload {
                    msg: &plaintext[header_len..],
                    aad: &plaintext[..header_len],
                },
            )
            .map_err(|_| Error::ErrFailedToVerifyAuthTag)?;

        let mut writer = BytesMut::with_capacity(header_len + ciphertext.len());
        writer.extend_from_slice(&plaintext[..header_len]);
        writer.extend_from_slice(&ciphertext);
        Ok(writer.freeze())
    }

    fn decrypt_rtp(
        &mut self,
        encrypted: &[u8],
        header: &rtp::header::Header,
        roc: u32,
    ) -> Result<Bytes> {
        let header_len = header.marshal_size();
        if encrypted.len() < header_len + self.aead_auth_tag_len() {
            return Err(Error::ErrFailedToVerifyAuthTag);
        }

        let iv = self.rtp_initialization_vector(header, roc);

        let plaintext = self
            .srtp_cipher
            .decrypt(
                Nonce::from_slice(&iv),
                Payload {
                    msg: &encrypted[header_len..],
                    aad: &encrypted[..header_len],
                },
            )
            .map_err(|_| Error::ErrFailedToVerifyAuthTag)?;

        let mut writer = BytesMut::with_capacity(header_len + plaintext.len());
        writer.extend_from_slice(&encrypted[..header_len]);
        writer.extend_from_slice(&plaintext);
        Ok(writer.freeze())
    }

    fn encrypt_rtcp(&mut self, plaintext: &[u8], srtcp_index: usize, ssrc: u32) -> Result<Bytes> {
        if plaintext.len() < 8 {
            return Err(Error::ErrTooShortRtcp);
        }

        let iv = self.rtcp_initialization_vector(srtcp_index, ssrc);
        let aad = self.rtcp_additional_authenticated_data(plaintext, srtcp_index);

        let ciphertext = self
            .srtcp_cipher
            .encrypt(
                Nonce::from_slice(&iv),
                Payload {
                    msg: &plaintext[8..],
                    aad: &aad,
                },
            )
            .map_err(|_| Error::ErrFailedToVerifyAuthTag)?;

        let mut writer = BytesMut::with_capacity(8 + ciphertext.len() + SRTCP_INDEX_SIZE);
        writer.extend_from_slice(&plaintext[..8]);
        writer.extend_from_slice(&ciphertext);
        writer.put_u32((RTCP_ENCRYPTION_FLAG as u32) << 24 | srtcp_index as u32);
        Ok(writer.freeze())
    }

    fn decrypt_rtcp(&mut self, encrypted: &[u8], srtcp_index: usize, ssrc: u32) -> Result<Bytes> {
        if encrypted.len() < 8 + SRTCP_INDEX_SIZE + self.aead_auth_tag_len() {
            return Err(Error::ErrTooShortRtcp);
        }

        let tail_offset = encrypted.len() - SRTCP_INDEX_SIZE;
        let iv = self.rtcp_initialization_vector(srtcp_index, ssrc);
        let mut aad = [0u8; 12];
        aad[..8].copy_from_slice(&encrypted[..8]);
        aad[8..12].copy_from_slice(&encrypted[tail_offset..]);

        let plaintext = self
            .srtcp_cipher
            .decrypt(
                Nonce::from_slice(&iv),
                Payload {
                    msg: &encrypted[8..tail_offset],
                    aad: &aad,
                },
            )
            .map_err(|_| Error::ErrFailedToVerifyAuthTag)?;

        let mut writer = BytesMut::with_capacity(8 + plaintext.len());
        writer.extend_from_slice(&encrypted[..8]);
        writer.extend_from_slice(&plaintext);
        Ok(writer.freeze())
    }
}
