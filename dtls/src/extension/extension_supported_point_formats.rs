use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::error::*;

pub type EllipticCurvePointFormat = u8;

pub const ELLIPTIC_CURVE_POINT_FORMAT_UNCOMPRESSED: EllipticCurvePointFormat = 0;

/// https://tools.ietf.org/html/rfc4492#section-5.1.2
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSupportedPointFormats {
    pub point_formats: Vec<EllipticCurvePointFormat>,
}

impl ExtensionSupportedPointFormats {
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut out = vec![];
        out.write_u8(self.point_formats.len() as u8)?;
        for f in &self.point_formats {
            out.write_u8(*f)?;
        }
        Ok(out)
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        let mut reader = raw;
        let list_len = reader.read_u8()? as usize;
        if reader.len() < list_len {
            return Err(Error::ErrBufferTooSmall);
        }
        Ok(ExtensionSupportedPointFormats {
            point_formats: reader[..list_len].to_vec(),
        })
    }
}
