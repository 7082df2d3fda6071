use std::any::Any;
use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::chunk_header::*;
use super::chunk_type::*;
use super::Chunk;
use crate::error::{Error, Result};
use crate::param::param_forward_tsn_supported::ParamForwardTsnSupported;
use crate::param::param_header::PARAM_HEADER_LENGTH;
use crate::param::param_supported_extensions::ParamSupportedExtensions;
use crate::param::{build_param, Param};

pub(crate) const INIT_CHUNK_MIN_LENGTH: usize = 16;

/// ChunkInit represents both INIT and INIT-ACK (they share a layout; the
/// ack carries a state cookie among its parameters).
///
/// https://tools.ietf.org/html/rfc4960#section-3.3.2
#[derive(Default, Debug)]
pub(crate) struct ChunkInit {
    pub(crate) is_ack: bool,
    pub(crate) initiate_tag: u32,
    pub(crate) advertised_receiver_window_credit: u32,
    pub(crate) num_outbound_streams: u16,
    pub(crate) num_inbound_streams: u16,
    pub(crate) initial_tsn: u32,
    pub(crate) params: Vec<Box<dyn Param + Send + Sync>>,
}

impl fmt::Display for ChunkInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} initiate_tag={} tsn={} in={} out={}",
            self.header(),
            self.initiate_tag,
            self.initial_tsn,
            self.num_inbound_streams,
            self.num_outbound_streams,
        )
    }
}

impl Chunk for ChunkInit {
    fn header(&self) -> ChunkHeader {
        ChunkHeader {
            typ: if self.is_ack { CT_INIT_ACK } else { CT_INIT },
            flags: 0,
            value_length: self.value_length() as u16,
        }
    }

    fn unmarshal(raw: &Bytes) -> Result<Self> {
        let header = ChunkHeader::unmarshal(raw)?;
        if header.typ != CT_INIT && header.typ != CT_INIT_ACK {
            return Err(Error::ErrChunkTypeUnexpected);
        }
        if header.value_length() < INIT_CHUNK_MIN_LENGTH {
            return Err(Error::ErrChunkTooShort);
        }

        let reader = &mut raw.slice(CHUNK_HEADER_SIZE..);
        let initiate_tag = reader.get_u32();
        let advertised_receiver_window_credit = reader.get_u32();
        let num_outbound_streams = reader.get_u16();
        let num_inbound_streams = reader.get_u16();
        let initial_tsn = reader.get_u32();

        let mut params = vec![];
        let mut offset = CHUNK_HEADER_SIZE + INIT_CHUNK_MIN_LENGTH;
        let end = CHUNK_HEADER_SIZE + header.value_length();
        while offset + PARAM_HEADER_LENGTH <= end {
            let p = build_param(&raw.slice(offset..end))?;
            let len = PARAM_HEADER_LENGTH + p.value_length();
            offset += len + get_padding_size(len);
            params.push(p);
        }

        Ok(ChunkInit {
            is_ack: header.typ == CT_INIT_ACK,
            initiate_tag,
            advertised_receiver_window_credit,
            num_outbound_streams,
            num_inbound_streams,
            initial_tsn,
            params,
        })
    }

    fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(writer)?;
        writer.put_u32(self.initiate_tag);
        writer.put_u32(self.advertised_receiver_window_credit);
        writer.put_u16(self.num_outbound_streams);
        writer.put_u16(self.num_inbound_streams);
        writer.put_u32(self.initial_tsn);
        for (idx, p) in self.params.iter().enumerate() {
            p.marshal_to(writer)?;
            // the final parameter is not padded
            if idx != self.params.len() - 1 {
                let len = PARAM_HEADER_LENGTH + p.value_length();
                writer.extend_from_slice(&vec![0u8; get_padding_size(len)]);
            }
        }
        Ok(writer.len())
    }

    fn check(&self) -> Result<()> {
        // An INIT with a zero initiate tag must be dropped (RFC 4960
        // 3.3.2).
        if self.initiate_tag == 0 {
            return Err(Error::ErrProtocolViolation(
                "INIT initiate tag is zero".to_owned(),
            ));
        }
        if self.num_inbound_streams == 0 || self.num_outbound_streams == 0 {
            return Err(Error::ErrProtocolViolation(
                "INIT stream counts must be non-zero".to_owned(),
            ));
        }
        Ok(())
    }

    fn value_length(&self) -> usize {
        let mut l = INIT_CHUNK_MIN_LENGTH;
        for (idx, p) in self.params.iter().enumerate() {
            let len = PARAM_HEADER_LENGTH + p.value_length();
            l += len;
            if idx != self.params.len() - 1 {
                l += get_padding_size(len);
            }
        }
        l
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}

impl ChunkInit {
    /// The extension parameters both our INIT and INIT-ACK advertise.
    pub(crate) fn common_params() -> Vec<Box<dyn Param + Send + Sync>> {
        vec![
            Box::new(ParamSupportedExtensions {
                chunk_types: vec![CT_RECONFIG, CT_FORWARD_TSN],
            }),
            Box::new(ParamForwardTsnSupported),
        ]
    }
}
