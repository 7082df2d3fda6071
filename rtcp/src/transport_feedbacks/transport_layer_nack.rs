#[cfg(test)]
mod transport_layer_nack_test;

use std::any::Any;
use std::fmt;

use bytes::{Buf, BufMut};
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::error::Error;
use crate::header::*;
use crate::packet::Packet;

/// PacketBitmap shouldn't be used like a normal integral, so it's masked
/// here: the 1st bit is the first loss after the packet ID, and so on.
pub type PacketBitmap = u16;

/// NackPair is a wire-representation of a collection of lost packets: a
/// packet ID for the first loss and a bitmap of the 16 following
/// sequence numbers.
#[derive(Debug, PartialEq, Eq, Default, Clone, Copy)]
pub struct NackPair {
    /// ID of lost packets
    pub packet_id: u16,
    /// Bitmask of following lost packets
    pub lost_packets: PacketBitmap,
}

impl NackPair {
    pub fn new(seq: u16) -> Self {
        NackPair {
            packet_id: seq,
            lost_packets: 0,
        }
    }

    /// packet_list returns a list of Nack'd packets that's referenced by a
    /// NackPair.
    pub fn packet_list(&self) -> Vec<u16> {
        let mut out = Vec::with_capacity(17);
        out.push(self.packet_id);

        let mut b = self.lost_packets;
        let mut i = 0u16;

        while b != 0 {
            if (b & (1 << i)) != 0 {
                b &= !(1 << i);
                out.push(self.packet_id.wrapping_add(i + 1));
            }
            i += 1;
        }

        out
    }

    pub fn range<F>(&self, f: F)
    where
        F: Fn(u16) -> bool,
    {
        if !f(self.packet_id) {
            return;
        }

        let mut b = self.lost_packets;
        let mut i = 0u16;
        while b != 0 {
            if (b & (1 << i)) != 0 {
                b &= !(1 << i);
                if !f(self.packet_id.wrapping_add(i + 1)) {
                    return;
                }
            }
            i += 1;
        }
    }
}

const TLN_LENGTH: usize = 2;
const NACK_OFFSET: usize = 8;

/// The TransportLayerNack packet informs the encoder about the loss of a
/// transport packet.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct TransportLayerNack {
    /// SSRC of sender
    pub sender_ssrc: u32,
    /// SSRC of the media source
    pub media_ssrc: u32,
    pub nacks: Vec<NackPair>,
}

impl fmt::Display for TransportLayerNack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = format!("TransportLayerNack from {:x}\n", self.sender_ssrc);
        out += format!("\tMedia Ssrc {:x}\n", self.media_ssrc).as_str();
        out += "\tID\tLostPackets\n";
        for nack in &self.nacks {
            out += format!("\t{}\t{:b}\n", nack.packet_id, nack.lost_packets).as_str();
        }
        write!(f, "{out}")
    }
}

/// nack_pairs_from_sequence_numbers converts a sorted list of lost
/// sequence numbers into the compact pair encoding.
pub fn nack_pairs_from_sequence_numbers(sequence_numbers: &[u16]) -> Vec<NackPair> {
    if sequence_numbers.is_empty() {
        return vec![];
    }

    let mut nack_pair = NackPair::new(sequence_numbers[0]);
    let mut nack_pairs = vec![];

    for &seq in &sequence_numbers[1..] {
        let distance = seq.wrapping_sub(nack_pair.packet_id);
        if distance >= 1 && distance <= 16 {
            nack_pair.lost_packets |= 1 << (distance - 1);
        } else {
            nack_pairs.push(nack_pair);
            nack_pair = NackPair::new(seq);
        }
    }

    nack_pairs.push(nack_pair);
    nack_pairs
}

impl Packet for TransportLayerNack {
    fn header(&self) -> Header {
        Header {
            padding: false,
            count: FORMAT_NACK,
            packet_type: PacketType::TransportSpecificFeedback,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }

    /// destination_ssrc returns an array of SSRC values that this packet
    /// refers to.
    fn destination_ssrc(&self) -> Vec<u32> {
        vec![self.media_ssrc]
    }

    fn raw_size(&self) -> usize {
        HEADER_LENGTH + NACK_OFFSET + self.nacks.len() * 4
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }

    fn equal(&self, other: &(dyn Packet + Send + Sync)) -> bool {
        other
            .as_any()
            .downcast_ref::<TransportLayerNack>()
            .map_or(false, |a| self == a)
    }

    fn cloned(&self) -> Box<dyn Packet + Send + Sync> {
        Box::new(self.clone())
    }
}

impl MarshalSize for TransportLayerNack {
    fn marshal_size(&self) -> usize {
        self.raw_size()
    }
}

impl Marshal for TransportLayerNack {
    /// marshal_to encodes the packet in binary.
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize, util::Error> {
        if (self.nacks.len() + TLN_LENGTH) > u8::MAX as usize {
            return Err(Error::TooManyReports.into());
        }
        if buf.len() < self.marshal_size() {
            return Err(Error::BufferTooShort.into());
        }

        let h = self.header();
        let n = h.marshal_to(buf)?;
        buf = &mut buf[n..];

        buf.put_u32(self.sender_ssrc);
        buf.put_u32(self.media_ssrc);

        for nack in &self.nacks {
            buf.put_u16(nack.packet_id);
            buf.put_u16(nack.lost_packets);
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for TransportLayerNack {
    /// unmarshal decodes the packet from binary.
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self, util::Error>
    where
        Self: Sized,
        B: Buf,
    {
        let raw_packet_len = raw_packet.remaining();
        if raw_packet_len < (HEADER_LENGTH + NACK_OFFSET) {
            return Err(Error::PacketTooShort.into());
        }

        let h = Header::unmarshal(raw_packet)?;
        if h.packet_type != PacketType::TransportSpecificFeedback || h.count != FORMAT_NACK {
            return Err(Error::WrongType.into());
        }

        let sender_ssrc = raw_packet.get_u32();
        let media_ssrc = raw_packet.get_u32();

        let mut nacks = vec![];
        for _ in 0..(raw_packet_len - HEADER_LENGTH - NACK_OFFSET) / 4 {
            nacks.push(NackPair {
                packet_id: raw_packet.get_u16(),
                lost_packets: raw_packet.get_u16(),
            });
        }

        Ok(TransportLayerNack {
            sender_ssrc,
            media_ssrc,
            nacks,
        })
    }
}
