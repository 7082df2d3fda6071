use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::error::*;
use crate::record_layer::ProtocolVersion;

/// HelloVerifyRequest carries the stateless cookie the client must echo
/// in its second ClientHello.
///
/// https://tools.ietf.org/html/rfc6347#section-4.2.1
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct HandshakeMessageHelloVerifyRequest {
    pub version: ProtocolVersion,
    pub cookie: Vec<u8>,
}

impl HandshakeMessageHelloVerifyRequest {
    pub fn marshal(&self) -> Result<Vec<u8>> {
        if self.cookie.len() > 255 {
            return Err(Error::ErrInvalidPacketLength);
        }
        let mut out = vec![];
        out.write_u8(self.version.major)?;
        out.write_u8(self.version.minor)?;
        out.write_u8(self.cookie.len() as u8)?;
        out.extend_from_slice(&self.cookie);
        Ok(out)
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        let mut reader = raw;
        let major = reader.read_u8()?;
        let minor = reader.read_u8()?;
        let cookie_len = reader.read_u8()? as usize;
        if reader.len() < cookie_len {
            return Err(Error::ErrBufferTooSmall);
        }
        Ok(HandshakeMessageHelloVerifyRequest {
            version: ProtocolVersion { major, minor },
            cookie: reader[..cookie_len].to_vec(),
        })
    }
}
