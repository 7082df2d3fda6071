use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::handshake_random::*;
use crate::cipher_suite::CipherSuiteId;
use crate::error::*;
use crate::extension::Extension;
use crate::record_layer::{ProtocolVersion, PROTOCOL_VERSION1_2};

/// ServerHello answers the (cookied) ClientHello with the selected
/// suite and extensions.
///
/// https://tools.ietf.org/html/rfc5246#section-7.4.1.3
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeMessageServerHello {
    pub version: ProtocolVersion,
    pub random: HandshakeRandom,
    pub cipher_suite: CipherSuiteId,
    pub compression_method: u8,
    pub extensions: Vec<Extension>,
}

impl Default for HandshakeMessageServerHello {
    fn default() -> Self {
        HandshakeMessageServerHello {
            version: PROTOCOL_VERSION1_2,
            random: HandshakeRandom::default(),
            cipher_suite: CipherSuiteId::Unsupported,
            compression_method: 0,
            extensions: vec![],
        }
    }
}

impl HandshakeMessageServerHello {
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut out = vec![];
        out.write_u8(self.version.major)?;
        out.write_u8(self.version.minor)?;
        out.extend_from_slice(&self.random.marshal_fixed());

        // empty session_id
        out.write_u8(0)?;

        out.write_u16::<BigEndian>(self.cipher_suite as u16)?;
        out.write_u8(self.compression_method)?;

        let mut ext_body = vec![];
        for ext in &self.extensions {
            ext.marshal(&mut ext_body)?;
        }
        out.write_u16::<BigEndian>(ext_body.len() as u16)?;
        out.extend_from_slice(&ext_body);

        Ok(out)
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        let mut reader = raw;
        let major = reader.read_u8()?;
        let minor = reader.read_u8()?;

        if reader.len() < HANDSHAKE_RANDOM_LENGTH {
            return Err(Error::ErrBufferTooSmall);
        }
        let mut random_raw = [0u8; HANDSHAKE_RANDOM_LENGTH];
        random_raw.copy_from_slice(&reader[..HANDSHAKE_RANDOM_LENGTH]);
        reader = &reader[HANDSHAKE_RANDOM_LENGTH..];
        let random = HandshakeRandom::unmarshal_fixed(&random_raw);

        let session_id_len = reader.read_u8()? as usize;
        if reader.len() < session_id_len {
            return Err(Error::ErrBufferTooSmall);
        }
        reader = &reader[session_id_len..];

        let cipher_suite = CipherSuiteId::from(reader.read_u16::<BigEndian>()?);
        let compression_method = reader.read_u8()?;

        let mut extensions = vec![];
        if !reader.is_empty() {
            let ext_len = reader.read_u16::<BigEndian>()? as usize;
            if reader.len() < ext_len {
                return Err(Error::ErrBufferTooSmall);
            }
            let mut ext_reader = &reader[..ext_len];
            while !ext_reader.is_empty() {
                extensions.push(Extension::unmarshal(&mut ext_reader)?);
            }
        }

        Ok(HandshakeMessageServerHello {
            version: ProtocolVersion { major, minor },
            random,
            cipher_suite,
            compression_method,
            extensions,
        })
    }
}
