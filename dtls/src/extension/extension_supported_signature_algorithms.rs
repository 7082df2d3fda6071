use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::crypto::signature_hash_algorithm::SignatureHashAlgorithm;
use crate::error::*;

/// https://tools.ietf.org/html/rfc5246#section-7.4.1.4.1
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSupportedSignatureAlgorithms {
    pub signature_hash_algorithms: Vec<SignatureHashAlgorithm>,
}

impl ExtensionSupportedSignatureAlgorithms {
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut out = vec![];
        out.write_u16::<BigEndian>((self.signature_hash_algorithms.len() * 2) as u16)?;
        for alg in &self.signature_hash_algorithms {
            out.write_u8(alg.hash as u8)?;
            out.write_u8(alg.signature as u8)?;
        }
        Ok(out)
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        let mut reader = raw;
        let list_len = reader.read_u16::<BigEndian>()? as usize;
        if reader.len() < list_len || list_len % 2 != 0 {
            return Err(Error::ErrBufferTooSmall);
        }
        let mut signature_hash_algorithms = Vec::with_capacity(list_len / 2);
        for _ in 0..list_len / 2 {
            let hash = reader.read_u8()?;
            let signature = reader.read_u8()?;
            signature_hash_algorithms.push(SignatureHashAlgorithm {
                hash: hash.into(),
                signature: signature.into(),
            });
        }
        Ok(ExtensionSupportedSignatureAlgorithms {
            signature_hash_algorithms,
        })
    }
}
