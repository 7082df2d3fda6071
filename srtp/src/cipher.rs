pub mod cipher_aead_aes_gcm;
pub mod cipher_aes_cm_hmac_sha1;

use bytes::Bytes;

use crate::error::Result;

/// Cipher represents a implementation of one of the SRTP protection
/// profiles: it encrypts/decrypts RTP and RTCP packets given the packet
/// index state tracked by the Context.
pub trait Cipher {
    /// Authenticated tag length appended to RTP packets.
    fn rtp_auth_tag_len(&self) -> usize;

    /// Authenticated tag length appended to RTCP packets.
    fn rtcp_auth_tag_len(&self) -> usize;

    /// AEAD tag length (zero for HMAC profiles).
    fn aead_auth_tag_len(&self) -> usize;

    /// Extracts the 31-bit SRTCP index from the tail of an encrypted
    /// RTCP packet.
    fn get_rtcp_index(&self, input: &[u8]) -> usize;

    /// encrypt_rtp takes a plaintext RTP packet (marshalled) and returns
    /// the protected packet.
    fn encrypt_rtp(
        &mut self,
        plaintext: &[u8],
        header: &rtp::header::Header,
        roc: u32,
    ) -> Result<Bytes>;

    /// decrypt_rtp takes a protected RTP packet and returns the
    /// plaintext packet.
    fn decrypt_rtp(
        &mut self,
        encrypted: &[u8],
        header: &rtp::header::Header,
        roc: u32,
    ) -> Result<Bytes>;

    /// encrypt_rtcp takes a plaintext RTCP packet and returns the
    /// protected packet carrying the given index and E-bit.
    fn encrypt_rtcp(&mut self, plaintext: &[u8], srtcp_index: usize, ssrc: u32) -> Result<Bytes>;

    /// decrypt_rtcp takes a protected RTCP packet and returns the
    /// plaintext packet.
    fn decrypt_rtcp(&mut self, encrypted: &[u8], srtcp_index: usize, ssrc: u32) -> Result<Bytes>;
}
