use crate::error::*;

/// ServerHelloDone closes the server's flight 4.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct HandshakeMessageServerHelloDone;

impl HandshakeMessageServerHelloDone {
    pub fn marshal(&self) -> Result<Vec<u8>> {
        Ok(vec![])
    }

    pub fn unmarshal(_raw: &[u8]) -> Result<Self> {
        Ok(HandshakeMessageServerHelloDone)
    }
}
