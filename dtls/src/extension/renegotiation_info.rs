use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::error::*;

/// An empty renegotiation_info; renegotiation itself is not supported.
///
/// https://tools.ietf.org/html/rfc5746
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRenegotiationInfo {
    pub renegotiated_connection: u8,
}

impl ExtensionRenegotiationInfo {
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut out = vec![];
        out.write_u8(self.renegotiated_connection)?;
        Ok(out)
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        let mut reader = raw;
        let renegotiated_connection = reader.read_u8()?;
        Ok(ExtensionRenegotiationInfo {
            renegotiated_connection,
        })
    }
}
