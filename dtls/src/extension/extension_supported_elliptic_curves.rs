use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::curve::named_curve::NamedCurve;
use crate::error::*;

/// https://tools.ietf.org/html/rfc8422#section-5.1.1
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSupportedEllipticCurves {
    pub elliptic_curves: Vec<NamedCurve>,
}

impl ExtensionSupportedEllipticCurves {
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut out = vec![];
        out.write_u16::<BigEndian>((self.elliptic_curves.len() * 2) as u16)?;
        for curve in &self.elliptic_curves {
            out.write_u16::<BigEndian>(*curve as u16)?;
        }
        Ok(out)
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        let mut reader = raw;
        let list_len = reader.read_u16::<BigEndian>()? as usize;
        if reader.len() < list_len || list_len % 2 != 0 {
            return Err(Error::ErrBufferTooSmall);
        }
        let mut elliptic_curves = Vec::with_capacity(list_len / 2);
        for _ in 0..list_len / 2 {
            elliptic_curves.push(NamedCurve::from(reader.read_u16::<BigEndian>()?));
        }
        Ok(ExtensionSupportedEllipticCurves { elliptic_curves })
    }
}
