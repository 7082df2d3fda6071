use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;

pub const RANDOM_BYTES_LENGTH: usize = 28;
pub const HANDSHAKE_RANDOM_LENGTH: usize = RANDOM_BYTES_LENGTH + 4;

/// HandshakeRandom mixes wall time and 28 random bytes, sent in the
/// hello messages and mixed into the key schedule.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HandshakeRandom {
    pub gmt_unix_time: SystemTime,
    pub random_bytes: [u8; RANDOM_BYTES_LENGTH],
}

impl Default for HandshakeRandom {
    fn default() -> Self {
        HandshakeRandom {
            gmt_unix_time: UNIX_EPOCH,
            random_bytes: [0u8; RANDOM_BYTES_LENGTH],
        }
    }
}

impl HandshakeRandom {
    pub fn generate() -> Self {
        let mut random = HandshakeRandom {
            gmt_unix_time: SystemTime::now(),
            ..Default::default()
        };
        rand::thread_rng().fill(&mut random.random_bytes);
        random
    }

    pub fn marshal_fixed(&self) -> [u8; HANDSHAKE_RANDOM_LENGTH] {
        let mut out = [0u8; HANDSHAKE_RANDOM_LENGTH];
        let secs = self
            .gmt_unix_time
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as u32;
        out[..4].copy_from_slice(&secs.to_be_bytes());
        out[4..].copy_from_slice(&self.random_bytes);
        out
    }

    pub fn unmarshal_fixed(raw: &[u8; HANDSHAKE_RANDOM_LENGTH]) -> Self {
        let secs = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let mut random_bytes = [0u8; RANDOM_BYTES_LENGTH];
        random_bytes.copy_from_slice(&raw[4..]);
        HandshakeRandom {
            gmt_unix_time: UNIX_EPOCH + Duration::from_secs(secs as u64),
            random_bytes,
        }
    }
}
