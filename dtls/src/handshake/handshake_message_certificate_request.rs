use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::crypto::signature_hash_algorithm::SignatureHashAlgorithm;
use crate::error::*;

/// ClientCertificateType values the server will accept.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ClientCertificateType {
    RsaSign = 1,
    EcdsaSign = 64,
    Unsupported = 255,
}

impl From<u8> for ClientCertificateType {
    fn from(val: u8) -> Self {
        match val {
            1 => ClientCertificateType::RsaSign,
            64 => ClientCertificateType::EcdsaSign,
            _ => ClientCertificateType::Unsupported,
        }
    }
}

/// CertificateRequest asks the client to authenticate. WebRTC requires
/// mutual authentication, so the server always sends one.
///
/// https://tools.ietf.org/html/rfc5246#section-7.4.4
#[derive(Default, Debug, Clone, PartialEq)]
pub struct HandshakeMessageCertificateRequest {
    pub certificate_types: Vec<ClientCertificateType>,
    pub signature_hash_algorithms: Vec<SignatureHashAlgorithm>,
}

impl HandshakeMessageCertificateRequest {
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut out = vec![];
        out.write_u8(self.certificate_types.len() as u8)?;
        for t in &self.certificate_types {
            out.write_u8(*t as u8)?;
        }

        out.write_u16::<BigEndian>((self.signature_hash_algorithms.len() * 2) as u16)?;
        for alg in &self.signature_hash_algorithms {
            out.write_u8(alg.hash as u8)?;
            out.write_u8(alg.signature as u8)?;
        }

        // no certificate authorities
        out.write_u16::<BigEndian>(0)?;
        Ok(out)
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        let mut reader = raw;

        let types_len = reader.read_u8()? as usize;
        if reader.len() < types_len {
            return Err(Error::ErrBufferTooSmall);
        }
        let mut certificate_types = Vec::with_capacity(types_len);
        for _ in 0..types_len {
            certificate_types.push(ClientCertificateType::from(reader.read_u8()?));
        }

        let algs_len = reader.read_u16::<BigEndian>()? as usize;
        if reader.len() < algs_len || algs_len % 2 != 0 {
            return Err(Error::ErrBufferTooSmall);
        }
        let mut signature_hash_algorithms = Vec::with_capacity(algs_len / 2);
        for _ in 0..algs_len / 2 {
            let hash = reader.read_u8()?;
            let signature = reader.read_u8()?;
            signature_hash_algorithms.push(SignatureHashAlgorithm {
                hash: hash.into(),
                signature: signature.into(),
            });
        }

        Ok(HandshakeMessageCertificateRequest {
            certificate_types,
            signature_hash_algorithms,
        })
    }
}
