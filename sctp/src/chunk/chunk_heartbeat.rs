use std::any::Any;
use std::fmt;

use bytes::{Bytes, BytesMut};

use super::chunk_header::*;
use super::chunk_type::*;
use super::Chunk;
use crate::error::{Error, Result};

/// ChunkHeartbeat probes reachability; the opaque info parameter is
/// echoed back verbatim in the ack.
///
/// https://tools.ietf.org/html/rfc4960#section-3.3.5
#[derive(Default, Debug, Clone)]
pub(crate) struct ChunkHeartbeat {
    /// The raw heartbeat info parameter (TLV included).
    pub(crate) params: Bytes,
}

impl fmt::Display for ChunkHeartbeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header())
    }
}

impl Chunk for ChunkHeartbeat {
    fn header(&self) -> ChunkHeader {
        ChunkHeader {
            typ: CT_HEARTBEAT,
            flags: 0,
            value_length: self.value_length() as u16,
        }
    }

    fn unmarshal(raw: &Bytes) -> Result<Self> {
        let header = ChunkHeader::unmarshal(raw)?;
        if header.typ != CT_HEARTBEAT {
            return Err(Error::ErrChunkTypeUnexpected);
        }
        let params = raw.slice(CHUNK_HEADER_SIZE..CHUNK_HEADER_SIZE + header.value_length());
        Ok(ChunkHeartbeat { params })
    }

    fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(writer)?;
        writer.extend_from_slice(&self.params);
        Ok(writer.len())
    }

    fn check(&self) -> Result<()> {
        Ok(())
    }

    fn value_length(&self) -> usize {
        self.params.len()
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}
