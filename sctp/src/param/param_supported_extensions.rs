use std::any::Any;
use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use super::param_header::*;
use super::param_type::ParamType;
use super::Param;
use crate::chunk::chunk_type::ChunkType;
use crate::error::Result;

/// Lists the chunk types this endpoint understands beyond the base
/// protocol (we announce RECONFIG and FORWARD-TSN).
///
/// https://tools.ietf.org/html/rfc5061#section-4.2.7
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamSupportedExtensions {
    pub chunk_types: Vec<ChunkType>,
}

impl fmt::Display for ParamSupportedExtensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:?}",
            self.header(),
            self.chunk_types
                .iter()
                .map(|ct| ct.to_string())
                .collect::<Vec<String>>()
        )
    }
}

impl Param for ParamSupportedExtensions {
    fn header(&self) -> ParamHeader {
        ParamHeader {
            typ: ParamType::SupportedExt,
            value_length: self.chunk_types.len() as u16,
        }
    }

    fn unmarshal(raw: &Bytes) -> Result<Self> {
        let header = ParamHeader::unmarshal(raw)?;
        let chunk_types = raw
            [PARAM_HEADER_LENGTH..PARAM_HEADER_LENGTH + header.value_length()]
            .iter()
            .map(|b| ChunkType(*b))
            .collect();
        Ok(ParamSupportedExtensions { chunk_types })
    }

    fn marshal_to(&self, buf: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(buf)?;
        for ct in &self.chunk_types {
            buf.put_u8(ct.0);
        }
        Ok(buf.len())
    }

    fn value_length(&self) -> usize {
        self.chunk_types.len()
    }

    fn clone_to(&self) -> Box<dyn Param + Send + Sync> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}
