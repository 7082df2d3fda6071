use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::crypto::signature_hash_algorithm::SignatureHashAlgorithm;
use crate::error::*;

/// CertificateVerify proves possession of the certificate's private key
/// with a signature over the handshake transcript so far.
///
/// https://tools.ietf.org/html/rfc5246#section-7.4.8
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct HandshakeMessageCertificateVerify {
    pub algorithm: SignatureHashAlgorithm,
    pub signature: Vec<u8>,
}

impl HandshakeMessageCertificateVerify {
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut out = vec![];
        out.write_u8(self.algorithm.hash as u8)?;
        out.write_u8(self.algorithm.signature as u8)?;
        out.write_u16::<BigEndian>(self.signature.len() as u16)?;
        out.extend_from_slice(&self.signature);
        Ok(out)
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        let mut reader = raw;
        let hash = reader.read_u8()?;
        let signature_alg = reader.read_u8()?;
        let signature_len = reader.read_u16::<BigEndian>()? as usize;
        if reader.len() < signature_len {
            return Err(Error::ErrBufferTooSmall);
        }
        Ok(HandshakeMessageCertificateVerify {
            algorithm: SignatureHashAlgorithm {
                hash: hash.into(),
                signature: signature_alg.into(),
            },
            signature: reader[..signature_len].to_vec(),
        })
    }
}
