#[cfg(test)]
mod context_test;

pub mod srtcp;
pub mod srtp;

use std::collections::HashMap;

use util::replay_detector::SlidingWindowDetector;

use crate::cipher::cipher_aead_aes_gcm::CipherAeadAesGcm;
use crate::cipher::cipher_aes_cm_hmac_sha1::CipherAesCmHmacSha1;
use crate::cipher::Cipher;
use crate::error::{Error, Result};
use crate::protection_profile::ProtectionProfile;

pub const DEFAULT_REPLAY_PROTECTION_WINDOW: u64 = 64;

pub(crate) const MAX_ROC: u32 = u32::MAX;
pub(crate) const SEQ_NUM_MEDIAN: u16 = 1 << 15;
pub(crate) const MAX_SRTCP_INDEX: usize = 0x7FFF_FFFF;

pub(crate) struct SrtpSsrcState {
    pub(crate) ssrc: u32,
    /// 48-bit extended packet index: ROC << 16 | highest seq seen.
    pub(crate) index: u64,
    pub(crate) has_processed: bool,
    pub(crate) replay_detector: SlidingWindowDetector,
}

impl SrtpSsrcState {
    /// Guesses the rollover count a packet with this sequence number
    /// belongs to, per RFC 3711 Appendix A.
    pub(crate) fn next_rollover_count(&self, sequence_number: u16) -> u32 {
        if !self.has_processed {
            return 0;
        }

        let local_roc = (self.index >> 16) as u32;
        let s_l = (self.index & 0xFFFF) as u16;

        if s_l < SEQ_NUM_MEDIAN {
            if sequence_number as i64 - s_l as i64 > SEQ_NUM_MEDIAN as i64 {
                local_roc.wrapping_sub(1)
            } else {
                local_roc
            }
        } else if s_l as i64 - SEQ_NUM_MEDIAN as i64 > sequence_number as i64 {
            local_roc.wrapping_add(1)
        } else {
            local_roc
        }
    }

    /// Commits a successfully authenticated packet into the index.
    pub(crate) fn update_rollover_count(&mut self, sequence_number: u16, roc: u32) {
        let guessed = ((roc as u64) << 16) | sequence_number as u64;
        if !self.has_processed {
            self.index = guessed;
            self.has_processed = true;
        } else if guessed > self.index {
            self.index = guessed;
        }
    }
}

pub(crate) struct SrtcpSsrcState {
    pub(crate) srtcp_index: usize,
    pub(crate) replay_detector: SlidingWindowDetector,
}

/// Context represents one direction of an SRTP session, holding the
/// per-SSRC rollover counters and replay windows along with the
/// profile's cipher.
///
/// Note that an SRTP session requires a Context for each direction.
pub struct Context {
    pub(crate) cipher: Box<dyn Cipher + Send>,

    pub(crate) srtp_ssrc_states: HashMap<u32, SrtpSsrcState>,
    pub(crate) srtcp_ssrc_states: HashMap<u32, SrtcpSsrcState>,

    pub(crate) srtp_replay_window: u64,
    pub(crate) srtcp_replay_window: u64,
}

impl Context {
    /// new creates a Context for the given direction's master key+salt.
    pub fn new(
        master_key: &[u8],
        master_salt: &[u8],
        profile: ProtectionProfile,
        srtp_replay_window: Option<u64>,
        srtcp_replay_window: Option<u64>,
    ) -> Result<Self> {
        if master_key.len() != profile.key_len() {
            return Err(Error::ErrShortSrtpMasterKey);
        }
        if master_salt.len() != profile.salt_len() {
            return Err(Error::ErrShortSrtpMasterSalt);
        }

        let cipher: Box<dyn Cipher + Send> = match profile {
            ProtectionProfile::Aes128CmHmacSha1_80 => {
                Box::new(CipherAesCmHmacSha1::new(master_key, master_salt)?)
            }
            ProtectionProfile::AeadAes128Gcm => {
                Box::new(CipherAeadAesGcm::new(master_key, master_salt)?)
            }
        };

        Ok(Context {
            cipher,
            srtp_ssrc_states: HashMap::new(),
            srtcp_ssrc_states: HashMap::new(),
            srtp_replay_window: srtp_replay_window
                .unwrap_or(DEFAULT_REPLAY_PROTECTION_WINDOW),
            srtcp_replay_window: srtcp_replay_window
                .unwrap_or(DEFAULT_REPLAY_PROTECTION_WINDOW),
        })
    }

    pub(crate) fn get_srtp_ssrc_state(&mut self, ssrc: u32) -> &mut SrtpSsrcState {
        let window = self.srtp_replay_window;
        self.srtp_ssrc_states
            .entry(ssrc)
            .or_insert_with(|| SrtpSsrcState {
                ssrc,
                index: 0,
                has_processed: false,
                replay_detector: SlidingWindowDetector::new(window, (1u64 << 48) - 1),
            })
    }

    pub(crate) fn get_srtcp_ssrc_state(&mut self, ssrc: u32) -> &mut SrtcpSsrcState {
        let window = self.srtcp_replay_window;
        self.srtcp_ssrc_states
            .entry(ssrc)
            .or_insert_with(|| SrtcpSsrcState {
                srtcp_index: 0,
                replay_detector: SlidingWindowDetector::new(window, MAX_SRTCP_INDEX as u64),
            })
    }

    /// roc returns the rollover counter tracked for an SSRC, if any.
    pub fn roc(&self, ssrc: u32) -> Option<u32> {
        self.srtp_ssrc_states
            .get(&ssrc)
            .map(|s| (s.index >> 16) as u32)
    }

    /// set_roc seeds the rollover counter for an SSRC.
    pub fn set_roc(&mut self, ssrc: u32, roc: u32) {
        let state = self.get_srtp_ssrc_state(ssrc);
        state.index = (roc as u64) << 16;
        state.has_processed = true;
    }
}
