use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::HandshakeType;
use crate::error::*;

pub const HANDSHAKE_HEADER_LENGTH: usize = 12;

/// HandshakeHeader is the DTLS handshake header, extending the TLS one
/// with the message sequence and fragment fields.
///
/// https://tools.ietf.org/html/rfc6347#section-4.2.2
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HandshakeHeader {
    pub handshake_type: HandshakeType,
    pub length: u32, // uint24
    pub message_sequence: u16,
    pub fragment_offset: u32, // uint24
    pub fragment_length: u32, // uint24
}

impl HandshakeHeader {
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(HANDSHAKE_HEADER_LENGTH);
        out.write_u8(self.handshake_type as u8)?;
        out.write_u24::<BigEndian>(self.length)?;
        out.write_u16::<BigEndian>(self.message_sequence)?;
        out.write_u24::<BigEndian>(self.fragment_offset)?;
        out.write_u24::<BigEndian>(self.fragment_length)?;
        Ok(out)
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        if raw.len() < HANDSHAKE_HEADER_LENGTH {
            return Err(Error::ErrBufferTooSmall);
        }
        let mut reader = &raw[..];
        let handshake_type = HandshakeType::from(reader.read_u8()?);
        let length = reader.read_u24::<BigEndian>()?;
        let message_sequence = reader.read_u16::<BigEndian>()?;
        let fragment_offset = reader.read_u24::<BigEndian>()?;
        let fragment_length = reader.read_u24::<BigEndian>()?;

        Ok(HandshakeHeader {
            handshake_type,
            length,
            message_sequence,
            fragment_offset,
            fragment_length,
        })
    }
}
