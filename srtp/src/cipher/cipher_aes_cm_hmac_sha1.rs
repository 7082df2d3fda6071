use aes::Aes128;
use bytes::{BufMut, Bytes, BytesMut};
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use util::marshal::MarshalSize;

use super::Cipher;
use crate::error::{Error, Result};
use crate::key_derivation::*;
use crate::protection_profile::ProtectionProfile;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type HmacSha1 = Hmac<Sha1>;

pub(crate) const CIPHER_AES_CM_HMAC_SHA1_AUTH_TAG_LEN: usize = 10;
const SRTCP_INDEX_SIZE: usize = 4;

/// AES-128-CM transform with HMAC-SHA1 80-bit tags, RFC 3711.
pub(crate) struct CipherAesCmHmacSha1 {
    profile: ProtectionProfile,

    srtp_session_key: Vec<u8>,
    srtp_session_salt: Vec<u8>,
    srtp_session_auth: HmacSha1,

    srtcp_session_key: Vec<u8>,
    srtcp_session_salt: Vec<u8>,
    srtcp_session_auth: HmacSha1,
}

impl CipherAesCmHmacSha1 {
    pub(crate) fn new(master_key: &[u8], master_salt: &[u8]) -> Result<Self> {
        let profile = ProtectionProfile::Aes128CmHmacSha1_80;

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
        let srtp_session_auth_tag = aes_cm_key_derivation(
            LABEL_SRTP_AUTHENTICATION_TAG,
            master_key,
            master_salt,
            0,
            profile.auth_key_len(),
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
        let srtcp_session_auth_tag = aes_cm_key_derivation(
            LABEL_SRTCP_AUTHENTICATION_TAG,
            master_key,
            master_salt,
            0,
            profile.auth_key_len(),
        )?;

        let srtp_session_auth = HmacSha1::new_from_slice(&srtp_session_auth_tag)
            .map_err(|e| Error::Other(e.to_string()))?;
        let srtcp_session_auth = HmacSha1::new_from_slice(&srtcp_session_auth_tag)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(CipherAesCmHmacSha1 {
            profile,
            srtp_session_key,
            srtp_session_salt,
            srtp_session_auth,
            srtcp_session_key,
            srtcp_session_salt,
            srtcp_session_auth,
        })
    }

    /// https://tools.ietf.org/html/rfc3711#section-4.2
    ///
    /// The full 160-bit HMAC-SHA1 output is truncated to the leftmost 80
    /// bits. The ROC is appended to the authenticated portion for SRTP.
    fn generate_srtp_auth_tag(&mut self, buf: &[u8], roc: u32) -> Vec<u8> {
        self.srtp_session_auth.update(buf);
        self.srtp_session_auth.update(&roc.to_be_bytes());
        let digest = self.srtp_session_auth.finalize_reset().into_bytes();
        digest[..CIPHER_AES_CM_HMAC_SHA1_AUTH_TAG_LEN].to_vec()
    }

    fn generate_srtcp_auth_tag(&mut self, buf: &[u8]) -> Vec<u8> {
        self.srtcp_session_auth.update(buf);
        let digest = self.srtcp_session_auth.finalize_reset().into_bytes();
        digest[..CIPHER_AES_CM_HMAC_SHA1_AUTH_TAG_LEN].to_vec()
    }
}

impl Cipher for CipherAesCmHmacSha1 {
    fn rtp_auth_tag_len(&self) -> usize {
        CIPHER_AES_CM_HMAC_SHA1_AUTH_TAG_LEN
    }

    fn rtcp_auth_tag_len(&self) -> usize {
        CIPHER_AES_CM_HMAC_SHA1_AUTH_TAG_LEN
    }

    fn aead_auth_tag_len(&self) -> usize {
        0
    }

    fn get_rtcp_index(&self, input: &[u8]) -> usize {
        let tail_offset = input.len() - (CIPHER_AES_CM_HMAC_SHA1_AUTH_TAG_LEN + SRTCP_INDEX_SIZE);
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
        let mut writer = BytesMut::with_capacity(plaintext.len() + self.rtp_auth_tag_len());

        // copy header unencrypted, encrypt the payload in counter mode
        writer.extend_from_slice(plaintext);
        let counter = generate_counter(
            header.sequence_number,
            roc,
            header.ssrc,
            &self.srtp_session_salt,
        );
        let mut stream = Aes128Ctr::new_from_slices(&self.srtp_session_key, &counter)
            .map_err(|e| Error::Other(e.to_string()))?;
        stream.apply_keystream(&mut writer[header_len..]);

        // append the auth tag over the whole packet plus the ROC
        let auth_tag = self.generate_srtp_auth_tag(&writer, roc);
        writer.extend_from_slice(&auth_tag);

        Ok(writer.freeze())
    }

    fn decrypt_rtp(
        &mut self,
        encrypted: &[u8],
        header: &rtp::header::Header,
        roc: u32,
    ) -> Result<Bytes> {
        if encrypted.len() < self.rtp_auth_tag_len() {
            return Err(Error::ErrFailedToVerifyAuthTag);
        }

        let cipher_text_len = encrypted.len() - self.rtp_auth_tag_len();
        let cipher_text = &encrypted[..cipher_text_len];
        let actual_tag = &encrypted[cipher_text_len..];

        let expected_tag = self.generate_srtp_auth_tag(cipher_text, roc);
        if expected_tag[..].ct_eq(actual_tag).unwrap_u8() != 1 {
            return Err(Error::ErrFailedToVerifyAuthTag);
        }

        let header_len = header.marshal_size();
        let mut writer = BytesMut::with_capacity(cipher_text_len);
        writer.extend_from_slice(cipher_text);

        let counter = generate_counter(
            header.sequence_number,
            roc,
            header.ssrc,
            &self.srtp_session_salt,
        );
        let mut stream = Aes128Ctr::new_from_slices(&self.srtp_session_key, &counter)
            .map_err(|e| Error::Other(e.to_string()))?;
        stream.apply_keystream(&mut writer[header_len..]);

        Ok(writer.freeze())
    }

    fn encrypt_rtcp(&mut self, plaintext: &[u8], srtcp_index: usize, ssrc: u32) -> Result<Bytes> {
        let mut writer = BytesMut::with_capacity(
            plaintext.len() + SRTCP_INDEX_SIZE + self.rtcp_auth_tag_len(),
        );
        writer.extend_from_slice(plaintext);

        // encrypt everything after the first 8 bytes (header + sender ssrc)
        let counter = generate_counter(
            (srtcp_index & 0xFFFF) as u16,
            (srtcp_index >> 16) as u32,
            ssrc,
            &self.srtcp_session_salt,
        );
        let mut stream = Aes128Ctr::new_from_slices(&self.srtcp_session_key, &counter)
            .map_err(|e| Error::Other(e.to_string()))?;
        stream.apply_keystream(&mut writer[8..]);

        // append the E-bit | SRTCP index, then the auth tag over all of it
        writer.put_u32(0x8000_0000 | srtcp_index as u32);

        let auth_tag = self.generate_srtcp_auth_tag(&writer);
        writer.extend_from_slice(&auth_tag);

        Ok(writer.freeze())
    }

    fn decrypt_rtcp(&mut self, encrypted: &[u8], srtcp_index: usize, ssrc: u32) -> Result<Bytes> {
        if encrypted.len() < self.rtcp_auth_tag_len() + SRTCP_INDEX_SIZE + 8 {
            return Err(Error::ErrTooShortRtcp);
        }

        let tail_offset = encrypted.len() - (self.rtcp_auth_tag_len() + SRTCP_INDEX_SIZE);
        let cipher_text = &encrypted[..tail_offset];
        let index_and_tag = &encrypted[tail_offset..];
        let is_encrypted = index_and_tag[0] & 0x80 != 0;

        let actual_tag = &encrypted[encrypted.len() - self.rtcp_auth_tag_len()..];
        let expected_tag =
            self.generate_srtcp_auth_tag(&encrypted[..encrypted.len() - self.rtcp_auth_tag_len()]);
        if expected_tag[..].ct_eq(actual_tag).unwrap_u8() != 1 {
            return Err(Error::ErrFailedToVerifyAuthTag);
        }

        let mut writer = BytesMut::with_capacity(tail_offset);
        writer.extend_from_slice(cipher_text);

        if is_encrypted {
            let counter = generate_counter(
                (srtcp_index & 0xFFFF) as u16,
                (srtcp_index >> 16) as u32,
                ssrc,
                &self.srtcp_session_salt,
            );
            let mut stream = Aes128Ctr::new_from_slices(&self.srtcp_session_key, &counter)
                .map_err(|e| Error::Other(e.to_string()))?;
            stream.apply_keystream(&mut writer[8..]);
        }

        Ok(writer.freeze())
    }
}
