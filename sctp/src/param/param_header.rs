use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::param_type::ParamType;
use crate::error::{Error, Result};

pub const PARAM_HEADER_LENGTH: usize = 4;

/// ParamHeader carries the parameter type and unpadded length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamHeader {
    pub typ: ParamType,
    pub value_length: u16,
}

impl fmt::Display for ParamHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (len={})", self.typ, self.value_length)
    }
}

impl ParamHeader {
    pub fn unmarshal(raw: &Bytes) -> Result<Self> {
        if raw.len() < PARAM_HEADER_LENGTH {
            return Err(Error::ErrParamHeaderTooShort);
        }

        let reader = &mut raw.clone();
        let typ = ParamType::from(reader.get_u16());
        let len = reader.get_u16() as usize;

        if len < PARAM_HEADER_LENGTH || raw.len() < len {
            return Err(Error::ErrParamHeaderSelfReportedLengthShorter);
        }

        Ok(ParamHeader {
            typ,
            value_length: (len - PARAM_HEADER_LENGTH) as u16,
        })
    }

    pub fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        writer.put_u16(self.typ.into());
        writer.put_u16(self.value_length + PARAM_HEADER_LENGTH as u16);
        Ok(writer.len())
    }

    pub fn value_length(&self) -> usize {
        self.value_length as usize
    }
}
