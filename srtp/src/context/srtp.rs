use bytes::Bytes;
use util::marshal::Unmarshal;

use super::Context;
use crate::error::{Error, Result};

impl Context {
    /// decrypt_rtp_with_header decrypts an SRTP packet whose header has
    /// already been parsed.
    pub fn decrypt_rtp_with_header(
        &mut self,
        encrypted: &[u8],
        header: &rtp::header::Header,
    ) -> Result<Bytes> {
        let (roc, index) = {
            let state = self.get_srtp_ssrc_state(header.ssrc);
            let roc = state.next_rollover_count(header.sequence_number);
            let index = ((roc as u64) << 16) | header.sequence_number as u64;
            if !state.replay_detector.check(index) {
                return Err(Error::ErrSrtpSsrcDuplicated(
                    header.ssrc,
                    header.sequence_number,
                ));
            }
            (roc, index)
        };

        let decrypted = self.cipher.decrypt_rtp(encrypted, header, roc)?;

        // authentication passed: commit the window and ROC
        let state = self.get_srtp_ssrc_state(header.ssrc);
        state.replay_detector.commit(index);
        state.update_rollover_count(header.sequence_number, roc);

        Ok(decrypted)
    }

    /// decrypt_rtp decrypts a full SRTP packet, returning the plaintext
    /// RTP packet bytes.
    pub fn decrypt_rtp(&mut self, encrypted: &[u8]) -> Result<Bytes> {
        let mut buf = encrypted;
        let header = rtp::header::Header::unmarshal(&mut buf)?;
        self.decrypt_rtp_with_header(encrypted, &header)
    }

    /// encrypt_rtp_with_header protects a marshalled RTP packet whose
    /// header has already been parsed.
    pub fn encrypt_rtp_with_header(
        &mut self,
        plaintext: &[u8],
        header: &rtp::header::Header,
    ) -> Result<Bytes> {
        let roc = {
            let state = self.get_srtp_ssrc_state(header.ssrc);
            state.next_rollover_count(header.sequence_number)
        };

        let encrypted = self.cipher.encrypt_rtp(plaintext, header, roc)?;

        let state = self.get_srtp_ssrc_state(header.ssrc);
        state.update_rollover_count(header.sequence_number, roc);

        Ok(encrypted)
    }

    /// encrypt_rtp protects a marshalled RTP packet.
    pub fn encrypt_rtp(&mut self, plaintext: &[u8]) -> Result<Bytes> {
        let mut buf = plaintext;
        let header = rtp::header::Header::unmarshal(&mut buf)?;
        self.encrypt_rtp_with_header(plaintext, &header)
    }
}
