use bytes::{Buf, BufMut};

use crate::error::{Error, Result};

/// ChannelType determines ordering and reliability (RFC 8832 Section
/// 5.1). The high bit flags unordered delivery.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelType {
    Reliable = 0x00,
    ReliableUnordered = 0x80,
    PartialReliableRexmit = 0x01,
    PartialReliableRexmitUnordered = 0x81,
    PartialReliableTimed = 0x02,
    PartialReliableTimedUnordered = 0x82,
}

impl ChannelType {
    pub fn is_unordered(&self) -> bool {
        (*self as u8) & 0x80 != 0
    }
}

impl TryFrom<u8> for ChannelType {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self> {
        match v {
            0x00 => Ok(ChannelType::Reliable),
            0x80 => Ok(ChannelType::ReliableUnordered),
            0x01 => Ok(ChannelType::PartialReliableRexmit),
            0x81 => Ok(ChannelType::PartialReliableRexmitUnordered),
            0x02 => Ok(ChannelType::PartialReliableTimed),
            0x82 => Ok(ChannelType::PartialReliableTimedUnordered),
            _ => Err(Error::InvalidChannelType(v)),
        }
    }
}

const CHANNEL_OPEN_HEADER_LEN: usize = 11;

/// DATA_CHANNEL_OPEN (RFC 8832 Section 5.1).
///
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Message Type |  Channel Type |            Priority           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                    Reliability Parameter                      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |         Label Length          |       Protocol Length         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             Label                             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            Protocol                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataChannelOpen {
    pub channel_type: ChannelType,
    pub priority: u16,
    pub reliability_parameter: u32,
    pub label: Vec<u8>,
    pub protocol: Vec<u8>,
}

impl DataChannelOpen {
    pub(crate) fn marshal_body(&self, buf: &mut Vec<u8>) {
        buf.put_u8(self.channel_type as u8);
        buf.put_u16(self.priority);
        buf.put_u32(self.reliability_parameter);
        buf.put_u16(self.label.len() as u16);
        buf.put_u16(self.protocol.len() as u16);
        buf.extend_from_slice(&self.label);
        buf.extend_from_slice(&self.protocol);
    }

    pub(crate) fn unmarshal_body(reader: &mut &[u8]) -> Result<Self> {
        if reader.remaining() < CHANNEL_OPEN_HEADER_LEN {
            return Err(Error::UnexpectedEndOfBuffer {
                expected: CHANNEL_OPEN_HEADER_LEN,
                actual: reader.remaining(),
            });
        }
        let channel_type = ChannelType::try_from(reader.get_u8())?;
        let priority = reader.get_u16();
        let reliability_parameter = reader.get_u32();
        let label_len = reader.get_u16() as usize;
        let protocol_len = reader.get_u16() as usize;

        if reader.remaining() < label_len + protocol_len {
            return Err(Error::UnexpectedEndOfBuffer {
                expected: label_len + protocol_len,
                actual: reader.remaining(),
            });
        }
        let label = reader[..label_len].to_vec();
        reader.advance(label_len);
        let protocol = reader[..protocol_len].to_vec();
        reader.advance(protocol_len);

        Ok(DataChannelOpen {
            channel_type,
            priority,
            reliability_parameter,
            label,
            protocol,
        })
    }
}
