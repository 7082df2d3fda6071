use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::error::*;

/// ClientKeyExchange carries the client's ephemeral ECDH public key.
///
/// https://tools.ietf.org/html/rfc5246#section-7.4.7
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct HandshakeMessageClientKeyExchange {
    pub public_key: Vec<u8>,
}

impl HandshakeMessageClientKeyExchange {
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut out = vec![];
        out.write_u8(self.public_key.len() as u8)?;
        out.extend_from_slice(&self.public_key);
        Ok(out)
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        let mut reader = raw;
        let public_key_len = reader.read_u8()? as usize;
        if reader.len() < public_key_len {
            return Err(Error::ErrBufferTooSmall);
        }
        Ok(HandshakeMessageClientKeyExchange {
            public_key: reader[..public_key_len].to_vec(),
        })
    }
}
