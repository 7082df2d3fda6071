use bytes::Bytes;

use super::{Context, MAX_SRTCP_INDEX};
use crate::error::{Error, Result};

impl Context {
    /// decrypt_rtcp decrypts an SRTCP packet, returning the plaintext
    /// RTCP compound packet bytes.
    pub fn decrypt_rtcp(&mut self, encrypted: &[u8]) -> Result<Bytes> {
        if encrypted.len() < 8 {
            return Err(Error::ErrTooShortRtcp);
        }

        let ssrc = u32::from_be_bytes([encrypted[4], encrypted[5], encrypted[6], encrypted[7]]);
        let index = self.cipher.get_rtcp_index(encrypted);

        {
            let state = self.get_srtcp_ssrc_state(ssrc);
            if !state.replay_detector.check(index as u64) {
                return Err(Error::ErrSrtcpSsrcDuplicated(ssrc, index));
            }
        }

        let decrypted = self.cipher.decrypt_rtcp(encrypted, index, ssrc)?;

        let state = self.get_srtcp_ssrc_state(ssrc);
        state.replay_detector.commit(index as u64);

        Ok(decrypted)
    }

    /// encrypt_rtcp protects a marshalled RTCP compound packet, stamping
    /// the next 31-bit index for the sender SSRC.
    pub fn encrypt_rtcp(&mut self, plaintext: &[u8]) -> Result<Bytes> {
        if plaintext.len() < 8 {
            return Err(Error::ErrTooShortRtcp);
        }

        let ssrc = u32::from_be_bytes([plaintext[4], plaintext[5], plaintext[6], plaintext[7]]);

        let index = {
            let state = self.get_srtcp_ssrc_state(ssrc);
            state.srtcp_index += 1;
            if state.srtcp_index > MAX_SRTCP_INDEX {
                state.srtcp_index = 0;
            }
            state.srtcp_index
        };

        self.cipher.encrypt_rtcp(plaintext, index, ssrc)
    }
}
