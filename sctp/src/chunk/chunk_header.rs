use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::chunk_type::ChunkType;
use crate::error::{Error, Result};

pub const CHUNK_HEADER_SIZE: usize = 4;

/// ChunkHeader is the common chunk prefix: type, flags, and the length
/// of the unpadded chunk.
///
/// https://tools.ietf.org/html/rfc4960#section-3.2
#[derive(Debug, Clone, Default)]
pub struct ChunkHeader {
    pub typ: ChunkType,
    pub flags: u8,
    pub value_length: u16,
}

impl fmt::Display for ChunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.typ)
    }
}

impl ChunkHeader {
    pub fn unmarshal(raw: &Bytes) -> Result<Self> {
        if raw.len() < CHUNK_HEADER_SIZE {
            return Err(Error::ErrChunkHeaderTooSmall);
        }

        let reader = &mut raw.clone();
        let typ = ChunkType(reader.get_u8());
        let flags = reader.get_u8();
        let length = reader.get_u16();

        if length < CHUNK_HEADER_SIZE as u16 {
            return Err(Error::ErrChunkHeaderInvalidLength);
        }
        if raw.len() < length as usize {
            return Err(Error::ErrChunkHeaderNotEnoughSpace);
        }

        Ok(ChunkHeader {
            typ,
            flags,
            value_length: length - CHUNK_HEADER_SIZE as u16,
        })
    }

    pub fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        writer.put_u8(self.typ.0);
        writer.put_u8(self.flags);
        writer.put_u16(self.value_length + CHUNK_HEADER_SIZE as u16);
        Ok(writer.len())
    }

    pub fn value_length(&self) -> usize {
        self.value_length as usize
    }
}

/// get_padding_size returns the number of pad bytes needed for a chunk
/// or parameter of the given length.
pub fn get_padding_size(len: usize) -> usize {
    (4 - (len % 4)) % 4
}
