use std::any::Any;
use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::chunk_header::*;
use super::chunk_type::*;
use super::Chunk;
use crate::error::{Error, Result};

/// A gap-ack block describes a received run beyond the cumulative ack,
/// as offsets from it.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct GapAckBlock {
    pub start: u16,
    pub end: u16,
}

/// ChunkSelectiveAck acknowledges received DATA: a cumulative TSN plus
/// gap blocks and duplicate reports.
///
/// https://tools.ietf.org/html/rfc4960#section-3.3.4
#[derive(Default, Debug, Clone)]
pub struct ChunkSelectiveAck {
    pub cumulative_tsn_ack: u32,
    pub advertised_receiver_window_credit: u32,
    pub gap_ack_blocks: Vec<GapAckBlock>,
    pub duplicate_tsn: Vec<u32>,
}

const SELECTIVE_ACK_HEADER_SIZE: usize = 12;

impl fmt::Display for ChunkSelectiveAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cum={} arwnd={} gaps={:?}",
            self.header(),
            self.cumulative_tsn_ack,
            self.advertised_receiver_window_credit,
            self.gap_ack_blocks,
        )
    }
}

impl Chunk for ChunkSelectiveAck {
    fn header(&self) -> ChunkHeader {
        ChunkHeader {
            typ: CT_SACK,
            flags: 0,
            value_length: self.value_length() as u16,
        }
    }

    fn unmarshal(raw: &Bytes) -> Result<Self> {
        let header = ChunkHeader::unmarshal(raw)?;
        if header.typ != CT_SACK {
            return Err(Error::ErrChunkTypeUnexpected);
        }
        if header.value_length() < SELECTIVE_ACK_HEADER_SIZE {
            return Err(Error::ErrChunkTooShort);
        }

        let reader = &mut raw.slice(CHUNK_HEADER_SIZE..);
        let cumulative_tsn_ack = reader.get_u32();
        let advertised_receiver_window_credit = reader.get_u32();
        let gap_count = reader.get_u16() as usize;
        let dup_count = reader.get_u16() as usize;

        if header.value_length() < SELECTIVE_ACK_HEADER_SIZE + gap_count * 4 + dup_count * 4 {
            return Err(Error::ErrChunkTooShort);
        }

        let mut gap_ack_blocks = Vec::with_capacity(gap_count);
        for _ in 0..gap_count {
            gap_ack_blocks.push(GapAckBlock {
                start: reader.get_u16(),
                end: reader.get_u16(),
            });
        }
        let mut duplicate_tsn = Vec::with_capacity(dup_count);
        for _ in 0..dup_count {
            duplicate_tsn.push(reader.get_u32());
        }

        Ok(ChunkSelectiveAck {
            cumulative_tsn_ack,
            advertised_receiver_window_credit,
            gap_ack_blocks,
            duplicate_tsn,
        })
    }

    fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(writer)?;
        writer.put_u32(self.cumulative_tsn_ack);
        writer.put_u32(self.advertised_receiver_window_credit);
        writer.put_u16(self.gap_ack_blocks.len() as u16);
        writer.put_u16(self.duplicate_tsn.len() as u16);
        for g in &self.gap_ack_blocks {
            writer.put_u16(g.start);
            writer.put_u16(g.end);
        }
        for t in &self.duplicate_tsn {
            writer.put_u32(*t);
        }
        Ok(writer.len())
    }

    fn check(&self) -> Result<()> {
        Ok(())
    }

    fn value_length(&self) -> usize {
        SELECTIVE_ACK_HEADER_SIZE + self.gap_ack_blocks.len() * 4 + self.duplicate_tsn.len() * 4
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}
