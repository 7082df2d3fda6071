#[cfg(test)]
mod packet_test;

use std::fmt;

use bytes::{Buf, Bytes};
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::error::Error;
use crate::header::*;

/// Packet represents an RTP Packet.
#[derive(Debug, Eq, PartialEq, Default, Clone)]
pub struct Packet {
    pub header: Header,
    pub payload: Bytes,
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = "RTP PACKET:\n".to_string();

        out += format!("\tVersion: {}\n", self.header.version).as_str();
        out += format!("\tMarker: {}\n", self.header.marker).as_str();
        out += format!("\tPayload Type: {}\n", self.header.payload_type).as_str();
        out += format!("\tSequence Number: {}\n", self.header.sequence_number).as_str();
        out += format!("\tTimestamp: {}\n", self.header.timestamp).as_str();
        out += format!("\tSSRC: {} ({:x})\n", self.header.ssrc, self.header.ssrc).as_str();
        out += format!("\tPayload Length: {}\n", self.payload.len()).as_str();

        write!(f, "{out}")
    }
}

impl Unmarshal for Packet {
    /// Unmarshal parses the passed byte slice and stores the result in the
    /// Packet.
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self, util::Error>
    where
        Self: Sized,
        B: Buf,
    {
        let header = Header::unmarshal(raw_packet)?;
        let payload_len = raw_packet.remaining();
        let payload = raw_packet.copy_to_bytes(payload_len);
        if header.padding {
            if payload_len > 0 {
                let padding_len = payload[payload_len - 1] as usize;
                if padding_len <= payload_len {
                    Ok(Packet {
                        header,
                        payload: payload.slice(..payload_len - padding_len),
                    })
                } else {
                    Err(Error::ErrShortPacket.into())
                }
            } else {
                Err(Error::ErrShortPacket.into())
            }
        } else {
            Ok(Packet { header, payload })
        }
    }
}

impl MarshalSize for Packet {
    /// MarshalSize returns the size of the packet once marshaled.
    fn marshal_size(&self) -> usize {
        let payload_len = self.payload.len();
        let padding_len = if self.header.padding {
            let padding_len = get_padding_size(payload_len);
            if padding_len == 0 {
                4
            } else {
                padding_len
            }
        } else {
            0
        };
        self.header.marshal_size() + payload_len + padding_len
    }
}

impl Marshal for Packet {
    /// marshal_to serializes the packet and writes to the buffer.
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize, util::Error> {
        let n = self.header.marshal_to(buf)?;
        let buf = &mut buf[n..];
        if buf.len() < self.payload.len() {
            return Err(Error::ErrBufferTooSmall.into());
        }
        buf[..self.payload.len()].copy_from_slice(&self.payload);
        if self.header.padding {
            let padding_len = {
                let padding_len = get_padding_size(self.payload.len());
                if padding_len == 0 {
                    4
                } else {
                    padding_len
                }
            };
            if buf.len() < self.payload.len() + padding_len {
                return Err(Error::ErrBufferTooSmall.into());
            }
            for i in 0..padding_len - 1 {
                buf[self.payload.len() + i] = 0;
            }
            buf[self.payload.len() + padding_len - 1] = padding_len as u8;
            Ok(n + self.payload.len() + padding_len)
        } else {
            Ok(n + self.payload.len())
        }
    }
}

fn get_padding_size(payload_len: usize) -> usize {
    if payload_len % 4 == 0 {
        0
    } else {
        4 - payload_len % 4
    }
}
