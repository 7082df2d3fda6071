pub mod param_add_outgoing_streams;
pub mod param_forward_tsn_supported;
pub mod param_header;
pub mod param_outgoing_reset_request;
pub mod param_reconfig_response;
pub mod param_state_cookie;
pub mod param_supported_extensions;
pub mod param_type;
pub mod param_unknown;

use std::any::Any;
use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::error::{Error, Result};
use param_add_outgoing_streams::ParamAddOutgoingStreams;
use param_forward_tsn_supported::ParamForwardTsnSupported;
use param_header::*;
use param_outgoing_reset_request::ParamOutgoingResetRequest;
use param_reconfig_response::ParamReconfigResponse;
use param_state_cookie::ParamStateCookie;
use param_supported_extensions::ParamSupportedExtensions;
use param_type::*;
use param_unknown::ParamUnknown;

/// Param is one TLV parameter inside a chunk (INIT, RECONFIG, ...).
pub trait Param: fmt::Display + fmt::Debug + Send + Sync {
    fn header(&self) -> ParamHeader;
    fn unmarshal(raw: &Bytes) -> Result<Self>
    where
        Self: Sized;
    fn marshal_to(&self, buf: &mut BytesMut) -> Result<usize>;
    fn value_length(&self) -> usize;
    fn clone_to(&self) -> Box<dyn Param + Send + Sync>;
    fn as_any(&self) -> &(dyn Any + Send + Sync);

    fn marshal(&self) -> Result<Bytes> {
        let capacity = PARAM_HEADER_LENGTH + self.value_length();
        let mut buf = BytesMut::with_capacity(capacity);
        self.marshal_to(&mut buf)?;
        Ok(buf.freeze())
    }
}

impl Clone for Box<dyn Param + Send + Sync> {
    fn clone(&self) -> Box<dyn Param + Send + Sync> {
        self.clone_to()
    }
}

/// build_param parses the parameter at the start of raw.
pub(crate) fn build_param(raw_param: &Bytes) -> Result<Box<dyn Param + Send + Sync>> {
    if raw_param.len() < PARAM_HEADER_LENGTH {
        return Err(Error::ErrParamHeaderTooShort);
    }
    let typ = ParamType::from(u16::from_be_bytes([raw_param[0], raw_param[1]]));
    Ok(match typ {
        ParamType::StateCookie => Box::new(ParamStateCookie::unmarshal(raw_param)?),
        ParamType::SupportedExt => Box::new(ParamSupportedExtensions::unmarshal(raw_param)?),
        ParamType::ForwardTsnSupp => Box::new(ParamForwardTsnSupported::unmarshal(raw_param)?),
        ParamType::OutSsnResetReq => Box::new(ParamOutgoingResetRequest::unmarshal(raw_param)?),
        ParamType::ReconfigResp => Box::new(ParamReconfigResponse::unmarshal(raw_param)?),
        ParamType::AddOutStreamsReq => Box::new(ParamAddOutgoingStreams::unmarshal(raw_param)?),
        _ => Box::new(ParamUnknown::unmarshal(raw_param)?),
    })
}
