use std::any::Any;
use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::param_header::*;
use super::param_type::ParamType;
use super::Param;
use crate::error::{Error, Result};

/// Outgoing SSN Reset Request: the sender asks the receiver to reset the
/// incoming SSNs of the listed streams (RFC 6525 Section 4.1). Data
/// channels use this to signal close.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamOutgoingResetRequest {
    /// Monotonic request sequence number.
    pub reconfig_request_sequence_number: u32,
    /// The response sequence number this request answers (mirrored).
    pub reconfig_response_sequence_number: u32,
    /// The sender's last assigned TSN; the receiver defers the reset
    /// until it has received everything up to it.
    pub sender_last_tsn: u32,
    pub stream_identifiers: Vec<u16>,
}

impl fmt::Display for ParamOutgoingResetRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: req={} streams={:?}",
            self.header(),
            self.reconfig_request_sequence_number,
            self.stream_identifiers
        )
    }
}

impl Param for ParamOutgoingResetRequest {
    fn header(&self) -> ParamHeader {
        ParamHeader {
            typ: ParamType::OutSsnResetReq,
            value_length: (12 + 2 * self.stream_identifiers.len()) as u16,
        }
    }

    fn unmarshal(raw: &Bytes) -> Result<Self> {
        let header = ParamHeader::unmarshal(raw)?;
        if header.value_length() < 12 {
            return Err(Error::ErrParamHeaderTooShort);
        }
        let reader = &mut raw.slice(PARAM_HEADER_LENGTH..);
        let reconfig_request_sequence_number = reader.get_u32();
        let reconfig_response_sequence_number = reader.get_u32();
        let sender_last_tsn = reader.get_u32();

        let mut stream_identifiers = vec![];
        let stream_count = (header.value_length() - 12) / 2;
        for _ in 0..stream_count {
            stream_identifiers.push(reader.get_u16());
        }

        Ok(ParamOutgoingResetRequest {
            reconfig_request_sequence_number,
            reconfig_response_sequence_number,
            sender_last_tsn,
            stream_identifiers,
        })
    }

    fn marshal_to(&self, buf: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(buf)?;
        buf.put_u32(self.reconfig_request_sequence_number);
        buf.put_u32(self.reconfig_response_sequence_number);
        buf.put_u32(self.sender_last_tsn);
        for sid in &self.stream_identifiers {
            buf.put_u16(*sid);
        }
        Ok(buf.len())
    }

    fn value_length(&self) -> usize {
        12 + 2 * self.stream_identifiers.len()
    }

    fn clone_to(&self) -> Box<dyn Param + Send + Sync> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}
