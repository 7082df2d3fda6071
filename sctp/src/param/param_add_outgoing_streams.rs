use std::any::Any;
use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::param_header::*;
use super::param_type::ParamType;
use super::Param;
use crate::error::{Error, Result};

/// Add Outgoing Streams Request (RFC 6525 Section 4.5), sent when a new
/// channel needs a stream id beyond the negotiated count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamAddOutgoingStreams {
    pub reconfig_request_sequence_number: u32,
    pub number_of_new_streams: u16,
}

impl fmt::Display for ParamAddOutgoingStreams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: seq={} new={}",
            self.header(),
            self.reconfig_request_sequence_number,
            self.number_of_new_streams
        )
    }
}

impl Param for ParamAddOutgoingStreams {
    fn header(&self) -> ParamHeader {
        ParamHeader {
            typ: ParamType::AddOutStreamsReq,
            value_length: 8,
        }
    }

    fn unmarshal(raw: &Bytes) -> Result<Self> {
        let header = ParamHeader::unmarshal(raw)?;
        if header.value_length() < 8 {
            return Err(Error::ErrParamHeaderTooShort);
        }
        let reader = &mut raw.slice(PARAM_HEADER_LENGTH..);
        let reconfig_request_sequence_number = reader.get_u32();
        let number_of_new_streams = reader.get_u16();
        let _reserved = reader.get_u16();
        Ok(ParamAddOutgoingStreams {
            reconfig_request_sequence_number,
            number_of_new_streams,
        })
    }

    fn marshal_to(&self, buf: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(buf)?;
        buf.put_u32(self.reconfig_request_sequence_number);
        buf.put_u16(self.number_of_new_streams);
        buf.put_u16(0);
        Ok(buf.len())
    }

    fn value_length(&self) -> usize {
        8
    }

    fn clone_to(&self) -> Box<dyn Param + Send + Sync> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}
