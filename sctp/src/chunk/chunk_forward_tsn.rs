#[cfg(test)]
mod chunk_forward_tsn_test;

use std::any::Any;
use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::chunk_header::*;
use super::chunk_type::*;
use super::Chunk;
use crate::error::{Error, Result};

/// A (stream, stream sequence) pair being skipped over.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ChunkForwardTsnStream {
    pub identifier: u16,
    pub sequence: u16,
}

/// ChunkForwardTsn tells the receiver to move its cumulative ack point
/// past abandoned messages (RFC 3758 Section 3.2).
#[derive(Default, Debug, Clone)]
pub struct ChunkForwardTsn {
    /// The new cumulative TSN the receiver should adopt.
    pub new_cumulative_tsn: u32,
    pub streams: Vec<ChunkForwardTsnStream>,
}

impl fmt::Display for ChunkForwardTsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} new_cum={} streams={:?}",
            self.header(),
            self.new_cumulative_tsn,
            self.streams,
        )
    }
}

impl Chunk for ChunkForwardTsn {
    fn header(&self) -> ChunkHeader {
        ChunkHeader {
            typ: CT_FORWARD_TSN,
            flags: 0,
            value_length: self.value_length() as u16,
        }
    }

    fn unmarshal(raw: &Bytes) -> Result<Self> {
        let header = ChunkHeader::unmarshal(raw)?;
        if header.typ != CT_FORWARD_TSN {
            return Err(Error::ErrChunkTypeUnexpected);
        }
        if header.value_length() < 4 {
            return Err(Error::ErrChunkTooShort);
        }

        let reader = &mut raw.slice(CHUNK_HEADER_SIZE..);
        let new_cumulative_tsn = reader.get_u32();

        let mut streams = vec![];
        let stream_count = (header.value_length() - 4) / 4;
        for _ in 0..stream_count {
            streams.push(ChunkForwardTsnStream {
                identifier: reader.get_u16(),
                sequence: reader.get_u16(),
            });
        }

        Ok(ChunkForwardTsn {
            new_cumulative_tsn,
            streams,
        })
    }

    fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(writer)?;
        writer.put_u32(self.new_cumulative_tsn);
        for s in &self.streams {
            writer.put_u16(s.identifier);
            writer.put_u16(s.sequence);
        }
        Ok(writer.len())
    }

    fn check(&self) -> Result<()> {
        Ok(())
    }

    fn value_length(&self) -> usize {
        4 + self.streams.len() * 4
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}
