use std::any::Any;
use std::fmt;

use bytes::{Bytes, BytesMut};
use rand::Rng;

use super::param_header::*;
use super::param_type::ParamType;
use super::Param;
use crate::error::Result;

/// The state cookie the server hands out in INIT-ACK and the client
/// echoes back, making the handshake stateless on the server.
///
/// https://tools.ietf.org/html/rfc4960#section-5.1.3
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamStateCookie {
    pub cookie: Bytes,
}

impl fmt::Display for ParamStateCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?}", self.header(), self.cookie)
    }
}

impl Param for ParamStateCookie {
    fn header(&self) -> ParamHeader {
        ParamHeader {
            typ: ParamType::StateCookie,
            value_length: self.cookie.len() as u16,
        }
    }

    fn unmarshal(raw: &Bytes) -> Result<Self> {
        let header = ParamHeader::unmarshal(raw)?;
        let cookie =
            raw.slice(PARAM_HEADER_LENGTH..PARAM_HEADER_LENGTH + header.value_length());
        Ok(ParamStateCookie { cookie })
    }

    fn marshal_to(&self, buf: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(buf)?;
        buf.extend_from_slice(&self.cookie);
        Ok(buf.len())
    }

    fn value_length(&self) -> usize {
        self.cookie.len()
    }

    fn clone_to(&self) -> Box<dyn Param + Send + Sync> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}

impl ParamStateCookie {
    pub fn new() -> Self {
        let mut cookie = vec![0u8; 32];
        rand::thread_rng().fill(cookie.as_mut_slice());
        ParamStateCookie {
            cookie: Bytes::from(cookie),
        }
    }
}
