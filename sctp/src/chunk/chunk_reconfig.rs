use std::any::Any;
use std::fmt;

use bytes::{Bytes, BytesMut};

use super::chunk_header::*;
use super::chunk_type::*;
use super::Chunk;
use crate::error::{Error, Result};
use crate::param::param_header::PARAM_HEADER_LENGTH;
use crate::param::{build_param, Param};

/// ChunkReconfig carries stream re-configuration parameters: SSN reset
/// requests, responses, add-streams (RFC 6525 Section 3.1).
#[derive(Default, Debug)]
pub struct ChunkReconfig {
    pub param_a: Option<Box<dyn Param + Send + Sync>>,
    pub param_b: Option<Box<dyn Param + Send + Sync>>,
}

impl fmt::Display for ChunkReconfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut res = format!("{}", self.header());
        if let Some(p) = &self.param_a {
            res += format!(" {p}").as_str();
        }
        if let Some(p) = &self.param_b {
            res += format!(" {p}").as_str();
        }
        write!(f, "{res}")
    }
}

impl Chunk for ChunkReconfig {
    fn header(&self) -> ChunkHeader {
        ChunkHeader {
            typ: CT_RECONFIG,
            flags: 0,
            value_length: self.value_length() as u16,
        }
    }

    fn unmarshal(raw: &Bytes) -> Result<Self> {
        let header = ChunkHeader::unmarshal(raw)?;
        if header.typ != CT_RECONFIG {
            return Err(Error::ErrChunkTypeUnexpected);
        }

        let mut offset = CHUNK_HEADER_SIZE;
        let end = CHUNK_HEADER_SIZE + header.value_length();

        if offset + PARAM_HEADER_LENGTH > end {
            return Err(Error::ErrChunkTooShort);
        }
        let param_a = build_param(&raw.slice(offset..end))?;
        let len_a = PARAM_HEADER_LENGTH + param_a.value_length();
        offset += len_a + get_padding_size(len_a);

        let param_b = if offset + PARAM_HEADER_LENGTH <= end {
            Some(build_param(&raw.slice(offset..end))?)
        } else {
            None
        };

        Ok(ChunkReconfig {
            param_a: Some(param_a),
            param_b,
        })
    }

    fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(writer)?;
        let Some(param_a) = &self.param_a else {
            return Err(Error::ErrChunkTooShort);
        };
        param_a.marshal_to(writer)?;
        if let Some(param_b) = &self.param_b {
            let len_a = PARAM_HEADER_LENGTH + param_a.value_length();
            writer.extend_from_slice(&vec![0u8; get_padding_size(len_a)]);
            param_b.marshal_to(writer)?;
        }
        Ok(writer.len())
    }

    fn check(&self) -> Result<()> {
        Ok(())
    }

    fn value_length(&self) -> usize {
        let mut l = 0;
        if let Some(param_a) = &self.param_a {
            l += PARAM_HEADER_LENGTH + param_a.value_length();
        }
        if let Some(param_b) = &self.param_b {
            l += get_padding_size(l) + PARAM_HEADER_LENGTH + param_b.value_length();
        }
        l
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}
