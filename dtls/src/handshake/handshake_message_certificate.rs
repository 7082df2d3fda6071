use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::*;

/// Certificate carries the sender's certificate chain, leaf first, as
/// raw DER. An empty chain is legal for a client declining to
/// authenticate (the server then aborts per our mutual-auth policy).
///
/// https://tools.ietf.org/html/rfc5246#section-7.4.2
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct HandshakeMessageCertificate {
    pub certificate: Vec<Vec<u8>>,
}

impl HandshakeMessageCertificate {
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut body = vec![];
        for cert in &self.certificate {
            body.write_u24::<BigEndian>(cert.len() as u32)?;
            body.extend_from_slice(cert);
        }

        let mut out = vec![];
        out.write_u24::<BigEndian>(body.len() as u32)?;
        out.extend_from_slice(&body);
        Ok(out)
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        let mut reader = raw;
        let total_len = reader.read_u24::<BigEndian>()? as usize;
        if reader.len() < total_len {
            return Err(Error::ErrBufferTooSmall);
        }
        let mut body = &reader[..total_len];

        let mut certificate = vec![];
        while !body.is_empty() {
            let cert_len = body.read_u24::<BigEndian>()? as usize;
            if body.len() < cert_len {
                return Err(Error::ErrBufferTooSmall);
            }
            certificate.push(body[..cert_len].to_vec());
            body = &body[cert_len..];
        }

        Ok(HandshakeMessageCertificate { certificate })
    }
}
