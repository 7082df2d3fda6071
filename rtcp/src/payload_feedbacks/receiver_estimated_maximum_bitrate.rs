#[cfg(test)]
mod receiver_estimated_maximum_bitrate_test;

use std::any::Any;
use std::fmt;

use bytes::{Buf, BufMut};
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::error::Error;
use crate::header::*;
use crate::packet::Packet;

/// ReceiverEstimatedMaximumBitrate contains the receiver's estimated
/// maximum bitrate (draft-alvestrand-rmcat-remb).
#[derive(Debug, PartialEq, Default, Clone)]
pub struct ReceiverEstimatedMaximumBitrate {
    /// SSRC of sender
    pub sender_ssrc: u32,
    /// Estimated maximum bitrate
    pub bitrate: f32,
    /// SSRC entries which this packet applies to
    pub ssrcs: Vec<u32>,
}

const REMB_OFFSET: usize = 16;
/// Unique identifier "REMB"
const UNIQUE_IDENTIFIER: [u8; 4] = [b'R', b'E', b'M', b'B'];

impl fmt::Display for ReceiverEstimatedMaximumBitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // keep underlying bits in tact, only shift the exponent for display
        let mut bitrate = self.bitrate;
        let mut powers = 0;
        while bitrate >= 1000.0 && powers < 4 {
            bitrate /= 1000.0;
            powers += 1;
        }
        let units = ["b/s", "Kb/s", "Mb/s", "Gb/s", "Tb/s"];
        write!(
            f,
            "ReceiverEstimatedMaximumBitrate {:x} {:.2} {}",
            self.sender_ssrc, bitrate, units[powers]
        )
    }
}

impl Packet for ReceiverEstimatedMaximumBitrate {
    fn header(&self) -> Header {
        Header {
            padding: false,
            count: FORMAT_REMB,
            packet_type: PacketType::PayloadSpecificFeedback,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }

    /// destination_ssrc returns an array of SSRC values that this packet
    /// refers to.
    fn destination_ssrc(&self) -> Vec<u32> {
        self.ssrcs.clone()
    }

    fn raw_size(&self) -> usize {
        HEADER_LENGTH + REMB_OFFSET + self.ssrcs.len() * 4
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }

    fn equal(&self, other: &(dyn Packet + Send + Sync)) -> bool {
        other
            .as_any()
            .downcast_ref::<ReceiverEstimatedMaximumBitrate>()
            .map_or(false, |a| self == a)
    }

    fn cloned(&self) -> Box<dyn Packet + Send + Sync> {
        Box::new(self.clone())
    }
}

impl MarshalSize for ReceiverEstimatedMaximumBitrate {
    fn marshal_size(&self) -> usize {
        self.raw_size()
    }
}

impl Marshal for ReceiverEstimatedMaximumBitrate {
    /// marshal_to serializes the packet.
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize, util::Error> {
        /*
            0                   1                   2                   3
            0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
           +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
           |V=2|P| FMT=15  |   PT=206      |             length            |
           +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
           |                  SSRC of packet sender                        |
           +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
           |                  SSRC of media source                         |
           +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
           |  Unique identifier 'R' 'E' 'M' 'B'                            |
           +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
           |  Num SSRC     | BR Exp    |  BR Mantissa                      |
           +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
           |   SSRC feedback                                               |
           +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
           |  ...                                                          |
        */
        if buf.len() < self.marshal_size() {
            return Err(Error::BufferTooShort.into());
        }

        let h = self.header();
        let n = h.marshal_to(buf)?;
        buf = &mut buf[n..];

        buf.put_u32(self.sender_ssrc);
        buf.put_u32(0); // always zero

        buf.put_slice(&UNIQUE_IDENTIFIER);

        buf.put_u8(self.ssrcs.len() as u8);

        // 6-bit exponent, 18-bit mantissa
        let mut exp = 0u8;
        let mut bitrate = self.bitrate;
        if bitrate >= (1u64 << 18) as f32 {
            while bitrate >= (1u64 << 18) as f32 && exp < 63 {
                bitrate /= 2.0;
                exp += 1;
            }
        }
        let mantissa = bitrate as u32;

        buf.put_u8((exp << 2) | ((mantissa >> 16) as u8 & 0x03));
        buf.put_u8(((mantissa >> 8) & 0xFF) as u8);
        buf.put_u8((mantissa & 0xFF) as u8);

        for ssrc in &self.ssrcs {
            buf.put_u32(*ssrc);
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for ReceiverEstimatedMaximumBitrate {
    /// unmarshal reads a REMB packet from the given byte stream.
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self, util::Error>
    where
        Self: Sized,
        B: Buf,
    {
        // 20 bytes max of header+ssrc+media+REMB+numssrc/exp/mantissa
        if raw_packet.remaining() < (HEADER_LENGTH + REMB_OFFSET) {
            return Err(Error::PacketTooShort.into());
        }

        let h = Header::unmarshal(raw_packet)?;
        if h.packet_type != PacketType::PayloadSpecificFeedback || h.count != FORMAT_REMB {
            return Err(Error::WrongType.into());
        }

        let sender_ssrc = raw_packet.get_u32();
        let media_ssrc = raw_packet.get_u32();
        if media_ssrc != 0 {
            return Err(Error::SsrcMustBeZero.into());
        }

        let mut identifier = [0u8; 4];
        identifier[0] = raw_packet.get_u8();
        identifier[1] = raw_packet.get_u8();
        identifier[2] = raw_packet.get_u8();
        identifier[3] = raw_packet.get_u8();
        if identifier != UNIQUE_IDENTIFIER {
            return Err(Error::MissingRembIdentifier.into());
        }

        let ssrcs_len = raw_packet.get_u8() as usize;

        let b13 = raw_packet.get_u8();
        let b14 = raw_packet.get_u8();
        let b15 = raw_packet.get_u8();
        let exp = b13 >> 2;
        let mantissa = ((b13 & 0x03) as u32) << 16 | (b14 as u32) << 8 | b15 as u32;

        let bitrate = if exp > 46 {
            // maximum possible bitrate
            f32::MAX
        } else {
            (mantissa as f32) * 2.0_f32.powi(exp as i32)
        };

        if raw_packet.remaining() < ssrcs_len * 4 {
            return Err(Error::SsrcNumAndLengthMismatch.into());
        }
        let mut ssrcs = Vec::with_capacity(ssrcs_len);
        for _ in 0..ssrcs_len {
            ssrcs.push(raw_packet.get_u32());
        }

        Ok(ReceiverEstimatedMaximumBitrate {
            sender_ssrc,
            bitrate,
            ssrcs,
        })
    }
}
