use crate::error::*;

pub const VERIFY_DATA_LENGTH: usize = 12;

/// Finished carries verify_data: PRF(master_secret, finished_label,
/// Hash(handshake_messages))[0..12]. It is the first encrypted message
/// of either side.
///
/// https://tools.ietf.org/html/rfc5246#section-7.4.9
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct HandshakeMessageFinished {
    pub verify_data: Vec<u8>,
}

impl HandshakeMessageFinished {
    pub fn marshal(&self) -> Result<Vec<u8>> {
        Ok(self.verify_data.clone())
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        if raw.len() < VERIFY_DATA_LENGTH {
            return Err(Error::ErrBufferTooSmall);
        }
        Ok(HandshakeMessageFinished {
            verify_data: raw.to_vec(),
        })
    }
}
