use std::any::Any;
use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::chunk_header::*;
use super::chunk_type::*;
use super::Chunk;
use crate::error::{Error, Result};

/// ChunkShutdown starts a graceful close.
///
/// https://tools.ietf.org/html/rfc4960#section-3.3.8
#[derive(Default, Debug, Clone)]
pub(crate) struct ChunkShutdown {
    pub(crate) cumulative_tsn_ack: u32,
}

impl fmt::Display for ChunkShutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cum={}", self.header(), self.cumulative_tsn_ack)
    }
}

impl Chunk for ChunkShutdown {
    fn header(&self) -> ChunkHeader {
        ChunkHeader {
            typ: CT_SHUTDOWN,
            flags: 0,
            value_length: 4,
        }
    }

    fn unmarshal(raw: &Bytes) -> Result<Self> {
        let header = ChunkHeader::unmarshal(raw)?;
        if header.typ != CT_SHUTDOWN {
            return Err(Error::ErrChunkTypeUnexpected);
        }
        if header.value_length() != 4 {
            return Err(Error::ErrChunkTooShort);
        }
        let reader = &mut raw.slice(CHUNK_HEADER_SIZE..);
        Ok(ChunkShutdown {
            cumulative_tsn_ack: reader.get_u32(),
        })
    }

    fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(writer)?;
        writer.put_u32(self.cumulative_tsn_ack);
        Ok(writer.len())
    }

    fn check(&self) -> Result<()> {
        Ok(())
    }

    fn value_length(&self) -> usize {
        4
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}
