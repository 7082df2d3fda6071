#[cfg(test)]
mod transport_layer_cc_test;

use std::any::Any;
use std::fmt;

use bytes::{Buf, BufMut};
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::error::Error;
use crate::header::*;
use crate::packet::Packet;

/// https://datatracker.ietf.org/doc/html/draft-holmer-rmcat-transport-wide-cc-extensions-01#page-5
///
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|  FMT=15 |    PT=205     |           length              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                     SSRC of packet sender                     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                      SSRC of media source                     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |      base sequence number     |      packet status count      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                 reference time                | fb pkt. count |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |          packet chunk         |         packet chunk          |
/// .                                                               .
/// |         packet chunk          |  recv delta   |  recv delta   |
/// .                                                               .
/// |           recv delta          |  recv delta   | zero padding  |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
pub const BASE_SEQUENCE_NUMBER_OFFSET: usize = 8;
pub const PACKET_STATUS_COUNT_OFFSET: usize = 10;
pub const REFERENCE_TIME_OFFSET: usize = 12;
pub const FB_PKT_COUNT_OFFSET: usize = 15;
pub const PACKET_CHUNK_OFFSET: usize = 16;
/// TypeTccDeltaScaleFactor is the (micro)seconds per delta tick: 250us.
pub const TYPE_TCC_DELTA_SCALE_FACTOR: i64 = 250;

// for packet status chunk
/// type of packet status chunk
#[derive(Debug, PartialEq, Eq, Default, Clone, Copy)]
pub enum StatusChunkTypeTcc {
    #[default]
    RunLengthChunk = 0,
    StatusVectorChunk = 1,
}

/// type of packet status symbol and recv delta
#[derive(Debug, PartialEq, Eq, Default, Clone, Copy)]
pub enum SymbolTypeTcc {
    /// Packet not received
    #[default]
    PacketNotReceived = 0,
    /// Packet received, small delta (delta fits in one byte)
    PacketReceivedSmallDelta = 1,
    /// Packet received, large or negative delta (two-byte delta)
    PacketReceivedLargeDelta = 2,
    /// Packet received, delta omitted
    PacketReceivedWithoutDelta = 3,
}

/// for status vector chunk: width of each symbol
#[derive(Debug, PartialEq, Eq, Default, Clone, Copy)]
pub enum SymbolSizeTypeTcc {
    #[default]
    OneBit = 0,
    TwoBit = 1,
}

impl From<u16> for SymbolSizeTypeTcc {
    fn from(val: u16) -> Self {
        match val {
            0 => SymbolSizeTypeTcc::OneBit,
            _ => SymbolSizeTypeTcc::TwoBit,
        }
    }
}

impl From<u16> for SymbolTypeTcc {
    fn from(val: u16) -> Self {
        match val {
            0 => SymbolTypeTcc::PacketNotReceived,
            1 => SymbolTypeTcc::PacketReceivedSmallDelta,
            2 => SymbolTypeTcc::PacketReceivedLargeDelta,
            _ => SymbolTypeTcc::PacketReceivedWithoutDelta,
        }
    }
}

/// PacketStatusChunk has two kinds: RunLengthChunk and StatusVectorChunk.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum PacketStatusChunk {
    RunLengthChunk(RunLengthChunk),
    StatusVectorChunk(StatusVectorChunk),
}

impl PacketStatusChunk {
    /// number of packet statuses described by this chunk
    pub fn status_count(&self) -> u16 {
        match self {
            PacketStatusChunk::RunLengthChunk(c) => c.run_length,
            PacketStatusChunk::StatusVectorChunk(c) => c.symbol_list.len() as u16,
        }
    }

    pub fn marshal_to(&self, buf: &mut [u8]) -> Result<usize, util::Error> {
        match self {
            PacketStatusChunk::RunLengthChunk(c) => c.marshal_to(buf),
            PacketStatusChunk::StatusVectorChunk(c) => c.marshal_to(buf),
        }
    }
}

/// RunLengthChunk conveys a run of packets all holding the same status.
///
/// 0                   1
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |T| S |       Run Length        |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct RunLengthChunk {
    /// T = StatusChunkTypeTcc::RunLengthChunk
    pub type_tcc: StatusChunkTypeTcc,
    /// S: type of packet status
    pub packet_status_symbol: SymbolTypeTcc,
    /// run_length: count of S, 13 bits
    pub run_length: u16,
}

impl RunLengthChunk {
    pub fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize, util::Error> {
        if buf.len() < 2 {
            return Err(Error::BufferTooShort.into());
        }
        if self.run_length > 0x1FFF {
            return Err(Error::InvalidSizeOrStartIndex.into());
        }

        let mut dst = 0u16; // T bit zero
        dst |= (self.packet_status_symbol as u16) << 13;
        dst |= self.run_length;
        buf.put_u16(dst);
        Ok(2)
    }

    pub fn unmarshal(raw: u16) -> Result<Self, util::Error> {
        Ok(RunLengthChunk {
            type_tcc: StatusChunkTypeTcc::RunLengthChunk,
            packet_status_symbol: SymbolTypeTcc::from((raw >> 13) & 0x3),
            run_length: raw & 0x1FFF,
        })
    }
}

/// StatusVectorChunk lists individual symbols.
///
/// 0                   1
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |T|S|       symbol list         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct StatusVectorChunk {
    /// T = StatusChunkTypeTcc::StatusVectorChunk
    pub type_tcc: StatusChunkTypeTcc,
    /// S: 0 one bit per symbol, 1 two bits per symbol
    pub symbol_size: SymbolSizeTypeTcc,
    /// symbol_list: 14 one-bit or 7 two-bit symbols
    pub symbol_list: Vec<SymbolTypeTcc>,
}

impl StatusVectorChunk {
    pub fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize, util::Error> {
        if buf.len() < 2 {
            return Err(Error::BufferTooShort.into());
        }

        let mut dst: u16 = 0x8000; // T bit one
        match self.symbol_size {
            SymbolSizeTypeTcc::OneBit => {
                if self.symbol_list.len() > 14 {
                    return Err(Error::InvalidSizeOrStartIndex.into());
                }
                for (i, s) in self.symbol_list.iter().enumerate() {
                    if *s != SymbolTypeTcc::PacketNotReceived {
                        dst |= 1 << (13 - i);
                    }
                }
            }
            SymbolSizeTypeTcc::TwoBit => {
                if self.symbol_list.len() > 7 {
                    return Err(Error::InvalidSizeOrStartIndex.into());
                }
                dst |= 0x4000; // S bit
                for (i, s) in self.symbol_list.iter().enumerate() {
                    dst |= (*s as u16) << (12 - 2 * i);
                }
            }
        }
        buf.put_u16(dst);
        Ok(2)
    }

    pub fn unmarshal(raw: u16, remaining_statuses: u16) -> Result<Self, util::Error> {
        let symbol_size = SymbolSizeTypeTcc::from((raw >> 14) & 0x1);
        let mut symbol_list = vec![];
        match symbol_size {
            SymbolSizeTypeTcc::OneBit => {
                let n = std::cmp::min(14, remaining_statuses);
                for i in 0..n {
                    let bit = (raw >> (13 - i)) & 0x1;
                    symbol_list.push(SymbolTypeTcc::from(bit));
                }
            }
            SymbolSizeTypeTcc::TwoBit => {
                let n = std::cmp::min(7, remaining_statuses);
                for i in 0..n {
                    let sym = (raw >> (12 - 2 * i)) & 0x3;
                    symbol_list.push(SymbolTypeTcc::from(sym));
                }
            }
        }
        Ok(StatusVectorChunk {
            type_tcc: StatusChunkTypeTcc::StatusVectorChunk,
            symbol_size,
            symbol_list,
        })
    }
}

/// RecvDelta is a receive time delta in microseconds, ticked at 250us.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct RecvDelta {
    pub type_tcc_packet: SymbolTypeTcc,
    /// delta in microseconds
    pub delta: i64,
}

impl RecvDelta {
    pub fn marshal_size(&self) -> usize {
        match self.type_tcc_packet {
            SymbolTypeTcc::PacketReceivedSmallDelta => 1,
            SymbolTypeTcc::PacketReceivedLargeDelta => 2,
            _ => 0,
        }
    }

    pub fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize, util::Error> {
        let delta = self.delta / TYPE_TCC_DELTA_SCALE_FACTOR;

        match self.type_tcc_packet {
            SymbolTypeTcc::PacketReceivedSmallDelta => {
                if !(0..=u8::MAX as i64).contains(&delta) {
                    return Err(Error::DeltaExceedLimit.into());
                }
                if buf.is_empty() {
                    return Err(Error::BufferTooShort.into());
                }
                buf.put_u8(delta as u8);
                Ok(1)
            }
            SymbolTypeTcc::PacketReceivedLargeDelta => {
                if !(i16::MIN as i64..=i16::MAX as i64).contains(&delta) {
                    return Err(Error::DeltaExceedLimit.into());
                }
                if buf.len() < 2 {
                    return Err(Error::BufferTooShort.into());
                }
                buf.put_i16(delta as i16);
                Ok(2)
            }
            _ => Err(Error::DeltaExceedLimit.into()),
        }
    }
}

/// TransportLayerCc is the transport-wide congestion-control feedback
/// packet (RTPFB, FMT 15).
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct TransportLayerCc {
    /// SSRC of sender
    pub sender_ssrc: u32,
    /// SSRC of the media source
    pub media_ssrc: u32,
    /// Transport-wide sequence of the first packet this feedback covers
    pub base_sequence_number: u16,
    /// Number of packet statuses in this feedback
    pub packet_status_count: u16,
    /// Absolute reference time in multiples of 64ms, 24 bits
    pub reference_time: u32,
    /// Feedback packet counter, wraps at 255
    pub fb_pkt_count: u8,
    pub packet_chunks: Vec<PacketStatusChunk>,
    pub recv_deltas: Vec<RecvDelta>,
}

impl fmt::Display for TransportLayerCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = format!("TransportLayerCc:\n\tSender Ssrc {:x}\n", self.sender_ssrc);
        out += format!("\tMedia Ssrc {:x}\n", self.media_ssrc).as_str();
        out += format!("\tBase Sequence Number {}\n", self.base_sequence_number).as_str();
        out += format!("\tStatus Count {}\n", self.packet_status_count).as_str();
        out += format!("\tReference Time {}\n", self.reference_time).as_str();
        out += format!("\tFeedback Packet Count {}\n", self.fb_pkt_count).as_str();
        write!(f, "{out}")
    }
}

impl Packet for TransportLayerCc {
    fn header(&self) -> Header {
        Header {
            padding: self.padded_length() != self.raw_size(),
            count: FORMAT_TCC,
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
        let mut n = HEADER_LENGTH + PACKET_CHUNK_OFFSET + self.packet_chunks.len() * 2;
        for d in &self.recv_deltas {
            n += d.marshal_size();
        }
        n
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }

    fn equal(&self, other: &(dyn Packet + Send + Sync)) -> bool {
        other
            .as_any()
            .downcast_ref::<TransportLayerCc>()
            .map_or(false, |a| self == a)
    }

    fn cloned(&self) -> Box<dyn Packet + Send + Sync> {
        Box::new(self.clone())
    }
}

impl TransportLayerCc {
    fn padded_length(&self) -> usize {
        let l = self.raw_size();
        l + crate::get_padding_size(l)
    }
}

impl MarshalSize for TransportLayerCc {
    fn marshal_size(&self) -> usize {
        self.padded_length()
    }
}

impl Marshal for TransportLayerCc {
    /// marshal_to encodes the TransportLayerCc in binary.
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize, util::Error> {
        if buf.len() < self.marshal_size() {
            return Err(Error::BufferTooShort.into());
        }

        let h = self.header();
        let n = h.marshal_to(buf)?;
        buf = &mut buf[n..];

        buf.put_u32(self.sender_ssrc);
        buf.put_u32(self.media_ssrc);
        buf.put_u16(self.base_sequence_number);
        buf.put_u16(self.packet_status_count);

        // reference time is 24 bits
        buf.put_u8(((self.reference_time >> 16) & 0xFF) as u8);
        buf.put_u8(((self.reference_time >> 8) & 0xFF) as u8);
        buf.put_u8((self.reference_time & 0xFF) as u8);
        buf.put_u8(self.fb_pkt_count);

        for chunk in &self.packet_chunks {
            let n = chunk.marshal_to(buf)?;
            buf = &mut buf[n..];
        }

        for delta in &self.recv_deltas {
            let n = delta.marshal_to(buf)?;
            buf = &mut buf[n..];
        }

        for _ in self.raw_size()..self.padded_length() {
            buf.put_u8(0);
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for TransportLayerCc {
    /// unmarshal decodes the TransportLayerCc from binary.
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self, util::Error>
    where
        Self: Sized,
        B: Buf,
    {
        let raw_packet_len = raw_packet.remaining();
        if raw_packet_len < HEADER_LENGTH + PACKET_CHUNK_OFFSET {
            return Err(Error::PacketTooShort.into());
        }

        let h = Header::unmarshal(raw_packet)?;
        if h.packet_type != PacketType::TransportSpecificFeedback || h.count != FORMAT_TCC {
            return Err(Error::WrongType.into());
        }
        let total_length = (h.length as usize + 1) * 4;
        if total_length > raw_packet_len {
            return Err(Error::PacketTooShort.into());
        }

        let sender_ssrc = raw_packet.get_u32();
        let media_ssrc = raw_packet.get_u32();
        let base_sequence_number = raw_packet.get_u16();
        let packet_status_count = raw_packet.get_u16();

        let r0 = raw_packet.get_u8();
        let r1 = raw_packet.get_u8();
        let r2 = raw_packet.get_u8();
        let reference_time = (r0 as u32) << 16 | (r1 as u32) << 8 | r2 as u32;
        let fb_pkt_count = raw_packet.get_u8();

        let mut consumed = HEADER_LENGTH + PACKET_CHUNK_OFFSET;

        let mut packet_chunks = vec![];
        let mut statuses_parsed = 0u16;
        while statuses_parsed < packet_status_count {
            if consumed + 2 > total_length {
                return Err(Error::PacketTooShort.into());
            }
            let raw = raw_packet.get_u16();
            consumed += 2;

            let chunk = if raw & 0x8000 == 0 {
                PacketStatusChunk::RunLengthChunk(RunLengthChunk::unmarshal(raw)?)
            } else {
                PacketStatusChunk::StatusVectorChunk(StatusVectorChunk::unmarshal(
                    raw,
                    packet_status_count - statuses_parsed,
                )?)
            };
            statuses_parsed = statuses_parsed.saturating_add(chunk.status_count());
            packet_chunks.push(chunk);
        }

        // deltas follow, one per received-with-delta status; the final
        // chunk may describe more statuses than packet_status_count, so cap
        let mut recv_deltas = vec![];
        let mut statuses_left = packet_status_count as usize;
        for chunk in &packet_chunks {
            let mut symbols: Vec<SymbolTypeTcc> = match chunk {
                PacketStatusChunk::RunLengthChunk(c) => {
                    vec![c.packet_status_symbol; (c.run_length as usize).min(statuses_left)]
                }
                PacketStatusChunk::StatusVectorChunk(c) => c.symbol_list.clone(),
            };
            symbols.truncate(statuses_left);
            statuses_left -= symbols.len();
            for s in symbols {
                match s {
                    SymbolTypeTcc::PacketReceivedSmallDelta => {
                        if consumed + 1 > total_length {
                            return Err(Error::PacketTooShort.into());
                        }
                        recv_deltas.push(RecvDelta {
                            type_tcc_packet: s,
                            delta: raw_packet.get_u8() as i64 * TYPE_TCC_DELTA_SCALE_FACTOR,
                        });
                        consumed += 1;
                    }
                    SymbolTypeTcc::PacketReceivedLargeDelta => {
                        if consumed + 2 > total_length {
                            return Err(Error::PacketTooShort.into());
                        }
                        recv_deltas.push(RecvDelta {
                            type_tcc_packet: s,
                            delta: raw_packet.get_i16() as i64 * TYPE_TCC_DELTA_SCALE_FACTOR,
                        });
                        consumed += 2;
                    }
                    _ => {}
                }
            }
        }

        // consume padding
        while consumed < total_length {
            raw_packet.get_u8();
            consumed += 1;
        }

        Ok(TransportLayerCc {
            sender_ssrc,
            media_ssrc,
            base_sequence_number,
            packet_status_count,
            reference_time,
            fb_pkt_count,
            packet_chunks,
            recv_deltas,
        })
    }
}
