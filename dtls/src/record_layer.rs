#[cfg(test)]
mod record_layer_test;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::content::ContentType;
use crate::error::*;

pub const RECORD_LAYER_HEADER_SIZE: usize = 13;
pub const MAX_SEQUENCE_NUMBER: u64 = 0x0000_FFFF_FFFF_FFFF;

pub const PROTOCOL_VERSION1_0: ProtocolVersion = ProtocolVersion {
    major: 0xfe,
    minor: 0xff,
};
pub const PROTOCOL_VERSION1_2: ProtocolVersion = ProtocolVersion {
    major: 0xfe,
    minor: 0xfd,
};

/// DTLS fixes the on-the-wire protocol version as 1.x = (254, 255-x).
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

/// RecordLayerHeader is the bare DTLS record header: every record,
/// encrypted or not, starts with one.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct RecordLayerHeader {
    pub content_type: ContentType,
    pub protocol_version: ProtocolVersion,
    pub epoch: u16,
    pub sequence_number: u64, // uint48 on the wire
    pub content_len: u16,
}

impl RecordLayerHeader {
    pub fn marshal(&self) -> Result<Vec<u8>> {
        if self.sequence_number > MAX_SEQUENCE_NUMBER {
            return Err(Error::ErrSequenceNumberOverflow);
        }

        let mut out = Vec::with_capacity(RECORD_LAYER_HEADER_SIZE);
        out.write_u8(self.content_type as u8)?;
        out.write_u8(self.protocol_version.major)?;
        out.write_u8(self.protocol_version.minor)?;
        out.write_u16::<BigEndian>(self.epoch)?;
        out.write_u48::<BigEndian>(self.sequence_number)?;
        out.write_u16::<BigEndian>(self.content_len)?;
        Ok(out)
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        if raw.len() < RECORD_LAYER_HEADER_SIZE {
            return Err(Error::ErrBufferTooSmall);
        }
        let mut reader = &raw[..];
        let content_type = ContentType::from(reader.read_u8()?);
        if content_type == ContentType::Invalid {
            return Err(Error::ErrInvalidContentType);
        }
        let major = reader.read_u8()?;
        let minor = reader.read_u8()?;
        let epoch = reader.read_u16::<BigEndian>()?;
        let sequence_number = reader.read_u48::<BigEndian>()?;
        let content_len = reader.read_u16::<BigEndian>()?;

        Ok(RecordLayerHeader {
            content_type,
            protocol_version: ProtocolVersion { major, minor },
            epoch,
            sequence_number,
            content_len,
        })
    }
}

/// Writes the epoch+sequence pair as the 8-byte value AEAD ciphers use
/// for nonces and additional data.
pub fn epoch_sequence_bytes(epoch: u16, sequence_number: u64) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[..2].copy_from_slice(&epoch.to_be_bytes());
    out[2..].copy_from_slice(&sequence_number.to_be_bytes()[2..]);
    out
}

/// Builds the 13-byte additional data for an AEAD record:
/// epoch+seq || type || version || length.
pub fn generate_aead_additional_data(
    epoch: u16,
    sequence_number: u64,
    content_type: ContentType,
    protocol_version: ProtocolVersion,
    payload_len: usize,
) -> Vec<u8> {
    let mut additional_data = Vec::with_capacity(13);
    additional_data.extend_from_slice(&epoch_sequence_bytes(epoch, sequence_number));
    additional_data.push(content_type as u8);
    additional_data.push(protocol_version.major);
    additional_data.push(protocol_version.minor);
    additional_data.extend_from_slice(&(payload_len as u16).to_be_bytes());
    additional_data
}
