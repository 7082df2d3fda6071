#[cfg(test)]
mod message_test;

pub mod message_channel_ack;
pub mod message_channel_open;
pub mod message_type;

use bytes::{Buf, BufMut};

use crate::error::{Error, Result};
use message_channel_ack::DataChannelAck;
use message_channel_open::DataChannelOpen;
use message_type::MessageType;

/// A parsed DCEP message (RFC 8832).
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    DataChannelAck(DataChannelAck),
    DataChannelOpen(DataChannelOpen),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::DataChannelAck(_) => MessageType::DataChannelAck,
            Message::DataChannelOpen(_) => MessageType::DataChannelOpen,
        }
    }

    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = vec![];
        buf.put_u8(self.message_type() as u8);
        match self {
            Message::DataChannelAck(_) => {}
            Message::DataChannelOpen(open) => open.marshal_body(&mut buf),
        }
        buf
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        let mut reader = raw;
        if reader.remaining() < 1 {
            return Err(Error::UnexpectedEndOfBuffer {
                expected: 1,
                actual: 0,
            });
        }
        let typ = MessageType::try_from(reader.get_u8())?;
        match typ {
            MessageType::DataChannelAck => Ok(Message::DataChannelAck(DataChannelAck)),
            MessageType::DataChannelOpen => Ok(Message::DataChannelOpen(
                DataChannelOpen::unmarshal_body(&mut reader)?,
            )),
        }
    }
}
