use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::crypto::signature_hash_algorithm::SignatureHashAlgorithm;
use crate::curve::named_curve::NamedCurve;
use crate::error::*;

const ELLIPTIC_CURVE_TYPE_NAMED: u8 = 3;

/// ServerKeyExchange carries the server's ephemeral ECDH public key and
/// a signature over (client_random || server_random || params).
///
/// https://tools.ietf.org/html/rfc4346#section-7.4.3
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct HandshakeMessageServerKeyExchange {
    pub named_curve: NamedCurve,
    pub public_key: Vec<u8>,
    pub algorithm: SignatureHashAlgorithm,
    pub signature: Vec<u8>,
}

impl HandshakeMessageServerKeyExchange {
    /// The ECDH params portion, which is what gets signed.
    pub fn marshal_params(&self) -> Result<Vec<u8>> {
        let mut out = vec![];
        out.write_u8(ELLIPTIC_CURVE_TYPE_NAMED)?;
        out.write_u16::<BigEndian>(self.named_curve as u16)?;
        out.write_u8(self.public_key.len() as u8)?;
        out.extend_from_slice(&self.public_key);
        Ok(out)
    }

    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut out = self.marshal_params()?;
        out.write_u8(self.algorithm.hash as u8)?;
        out.write_u8(self.algorithm.signature as u8)?;
        out.write_u16::<BigEndian>(self.signature.len() as u16)?;
        out.extend_from_slice(&self.signature);
        Ok(out)
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        let mut reader = raw;
        let curve_type = reader.read_u8()?;
        if curve_type != ELLIPTIC_CURVE_TYPE_NAMED {
            return Err(Error::ErrInvalidNamedCurve);
        }
        let named_curve = NamedCurve::from(reader.read_u16::<BigEndian>()?);

        let public_key_len = reader.read_u8()? as usize;
        if reader.len() < public_key_len {
            return Err(Error::ErrBufferTooSmall);
        }
        let public_key = reader[..public_key_len].to_vec();
        reader = &reader[public_key_len..];

        let hash = reader.read_u8()?;
        let signature_alg = reader.read_u8()?;
        let signature_len = reader.read_u16::<BigEndian>()? as usize;
        if reader.len() < signature_len {
            return Err(Error::ErrBufferTooSmall);
        }
        let signature = reader[..signature_len].to_vec();

        Ok(HandshakeMessageServerKeyExchange {
            named_curve,
            public_key,
            algorithm: SignatureHashAlgorithm {
                hash: hash.into(),
                signature: signature_alg.into(),
            },
            signature,
        })
    }
}
