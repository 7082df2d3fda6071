use crate::error::*;

/// https://tools.ietf.org/html/rfc7627
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ExtensionUseExtendedMasterSecret {
    pub supported: bool,
}

impl ExtensionUseExtendedMasterSecret {
    pub fn marshal(&self) -> Result<Vec<u8>> {
        Ok(vec![])
    }

    pub fn unmarshal(_raw: &[u8]) -> Result<Self> {
        Ok(ExtensionUseExtendedMasterSecret { supported: true })
    }
}
