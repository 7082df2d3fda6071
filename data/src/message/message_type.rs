use crate::error::Error;

/// DCEP message types (RFC 8832 Section 8.2.1).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    DataChannelAck = 0x02,
    DataChannelOpen = 0x03,
}

impl TryFrom<u8> for MessageType {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self, Error> {
        match v {
            0x02 => Ok(MessageType::DataChannelAck),
            0x03 => Ok(MessageType::DataChannelOpen),
            _ => Err(Error::InvalidMessageType(v)),
        }
    }
}
