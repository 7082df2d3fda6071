use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::handshake_random::*;
use crate::cipher_suite::CipherSuiteId;
use crate::error::*;
use crate::extension::Extension;
use crate::record_layer::{ProtocolVersion, PROTOCOL_VERSION1_2};

/// ClientHello is sent first (and again, with a cookie, after
/// HelloVerifyRequest). It advertises the client's cipher suites,
/// curves and extensions.
///
/// https://tools.ietf.org/html/rfc5246#section-7.4.1.2
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeMessageClientHello {
    pub version: ProtocolVersion,
    pub random: HandshakeRandom,
    pub cookie: Vec<u8>,
    pub cipher_suites: Vec<CipherSuiteId>,
    pub compression_methods: Vec<u8>,
    pub extensions: Vec<Extension>,
}

impl Default for HandshakeMessageClientHello {
    fn default() -> Self {
        HandshakeMessageClientHello {
            version: PROTOCOL_VERSION1_2,
            random: HandshakeRandom::default(),
            cookie: vec![],
            cipher_suites: vec![],
            compression_methods: vec![0],
            extensions: vec![],
        }
    }
}

impl HandshakeMessageClientHello {
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut out = vec![];
        out.write_u8(self.version.major)?;
        out.write_u8(self.version.minor)?;
        out.extend_from_slice(&self.random.marshal_fixed());

        // session_id, always empty for DTLS-SRTP endpoints
        out.write_u8(0)?;

        out.write_u8(self.cookie.len() as u8)?;
        out.extend_from_slice(&self.cookie);

        out.write_u16::<BigEndian>((self.cipher_suites.len() * 2) as u16)?;
        for suite in &self.cipher_suites {
            out.write_u16::<BigEndian>(*suite as u16)?;
        }

        out.write_u8(self.compression_methods.len() as u8)?;
        out.extend_from_slice(&self.compression_methods);

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

        let cookie_len = reader.read_u8()? as usize;
        if reader.len() < cookie_len {
            return Err(Error::ErrBufferTooSmall);
        }
        let cookie = reader[..cookie_len].to_vec();
        reader = &reader[cookie_len..];

        let cipher_suites_len = reader.read_u16::<BigEndian>()? as usize;
        if reader.len() < cipher_suites_len || cipher_suites_len % 2 != 0 {
            return Err(Error::ErrBufferTooSmall);
        }
        let mut cipher_suites = Vec::with_capacity(cipher_suites_len / 2);
        for _ in 0..cipher_suites_len / 2 {
            cipher_suites.push(CipherSuiteId::from(reader.read_u16::<BigEndian>()?));
        }

        let compression_len = reader.read_u8()? as usize;
        if reader.len() < compression_len {
            return Err(Error::ErrBufferTooSmall);
        }
        let compression_methods = reader[..compression_len].to_vec();
        reader = &reader[compression_len..];

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

        Ok(HandshakeMessageClientHello {
            version: ProtocolVersion { major, minor },
            random,
            cookie,
            cipher_suites,
            compression_methods,
            extensions,
        })
    }
}
