#[cfg(test)]
mod extended_report_test;

use std::any::Any;
use std::fmt;

use bytes::{Buf, BufMut, Bytes};
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::error::Error;
use crate::header::*;
use crate::packet::Packet;

/// Block type of a receiver-reference-time XR block (RFC 3611 4.4).
pub const BLOCK_TYPE_RRT: u8 = 4;
/// Block type of a DLRR XR block (RFC 3611 4.5).
pub const BLOCK_TYPE_DLRR: u8 = 5;

const XR_HEADER_LENGTH: usize = HEADER_LENGTH + SSRC_LENGTH;
const BLOCK_HEADER_LENGTH: usize = 4;

/// ReceiverReferenceTimeBlock encodes the receiver's NTP clock, letting
/// non-senders participate in round-trip measurement.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct ReceiverReferenceTimeBlock {
    pub ntp_timestamp: u64,
}

/// DLRRReport is one (ssrc, last-RR, delay-since-last-RR) triple.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct DLRRReport {
    pub ssrc: u32,
    /// middle 32 bits of the RRT NTP timestamp this echoes
    pub last_rr: u32,
    /// delay since last_rr in 1/65536 seconds
    pub dlrr: u32,
}

/// DLRRBlock mirrors received receiver-reference-time blocks back to
/// their senders.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct DLRRBlock {
    pub reports: Vec<DLRRReport>,
}

/// ReportBlock is one typed XR block. Unknown block types survive
/// round-trips as raw bytes.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ReportBlock {
    ReceiverReferenceTime(ReceiverReferenceTimeBlock),
    Dlrr(DLRRBlock),
    Unknown { block_type: u8, contents: Bytes },
}

impl ReportBlock {
    fn block_type(&self) -> u8 {
        match self {
            ReportBlock::ReceiverReferenceTime(_) => BLOCK_TYPE_RRT,
            ReportBlock::Dlrr(_) => BLOCK_TYPE_DLRR,
            ReportBlock::Unknown { block_type, .. } => *block_type,
        }
    }

    fn contents_len(&self) -> usize {
        match self {
            ReportBlock::ReceiverReferenceTime(_) => 8,
            ReportBlock::Dlrr(b) => b.reports.len() * 12,
            ReportBlock::Unknown { contents, .. } => contents.len(),
        }
    }

    fn marshal_size(&self) -> usize {
        BLOCK_HEADER_LENGTH + self.contents_len()
    }
}

/// ExtendedReport (XR) packets convey information beyond what fits the
/// regular sender/receiver report blocks. RFC 3611.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct ExtendedReport {
    pub sender_ssrc: u32,
    pub reports: Vec<ReportBlock>,
}

impl fmt::Display for ExtendedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExtendedReport from {:x}, {} blocks",
            self.sender_ssrc,
            self.reports.len()
        )
    }
}

impl Packet for ExtendedReport {
    fn header(&self) -> Header {
        Header {
            padding: false,
            count: 0,
            packet_type: PacketType::ExtendedReport,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }

    /// destination_ssrc returns an array of SSRC values that this packet
    /// refers to.
    fn destination_ssrc(&self) -> Vec<u32> {
        let mut out = vec![];
        for block in &self.reports {
            if let ReportBlock::Dlrr(b) = block {
                for r in &b.reports {
                    out.push(r.ssrc);
                }
            }
        }
        out
    }

    fn raw_size(&self) -> usize {
        let mut n = XR_HEADER_LENGTH;
        for block in &self.reports {
            n += block.marshal_size();
        }
        n
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }

    fn equal(&self, other: &(dyn Packet + Send + Sync)) -> bool {
        other
            .as_any()
            .downcast_ref::<ExtendedReport>()
            .map_or(false, |a| self == a)
    }

    fn cloned(&self) -> Box<dyn Packet + Send + Sync> {
        Box::new(self.clone())
    }
}

impl MarshalSize for ExtendedReport {
    fn marshal_size(&self) -> usize {
        self.raw_size()
    }
}

impl Marshal for ExtendedReport {
    /// marshal_to encodes the ExtendedReport in binary.
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize, util::Error> {
        if buf.len() < self.marshal_size() {
            return Err(Error::BufferTooShort.into());
        }

        let h = self.header();
        let n = h.marshal_to(buf)?;
        buf = &mut buf[n..];

        buf.put_u32(self.sender_ssrc);

        for block in &self.reports {
            buf.put_u8(block.block_type());
            buf.put_u8(0); // type-specific byte, zero for RRT/DLRR
            buf.put_u16((block.contents_len() / 4) as u16);

            match block {
                ReportBlock::ReceiverReferenceTime(b) => {
                    buf.put_u64(b.ntp_timestamp);
                }
                ReportBlock::Dlrr(b) => {
                    for r in &b.reports {
                        buf.put_u32(r.ssrc);
                        buf.put_u32(r.last_rr);
                        buf.put_u32(r.dlrr);
                    }
                }
                ReportBlock::Unknown { contents, .. } => {
                    buf.put_slice(contents);
                }
            }
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for ExtendedReport {
    /// unmarshal decodes the ExtendedReport from binary.
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self, util::Error>
    where
        Self: Sized,
        B: Buf,
    {
        if raw_packet.remaining() < XR_HEADER_LENGTH {
            return Err(Error::PacketTooShort.into());
        }

        let h = Header::unmarshal(raw_packet)?;
        if h.packet_type != PacketType::ExtendedReport {
            return Err(Error::WrongType.into());
        }

        let sender_ssrc = raw_packet.get_u32();

        let mut reports = vec![];
        while raw_packet.remaining() >= BLOCK_HEADER_LENGTH {
            let block_type = raw_packet.get_u8();
            let _type_specific = raw_packet.get_u8();
            let block_length = raw_packet.get_u16() as usize * 4;
            if raw_packet.remaining() < block_length {
                return Err(Error::PacketTooShort.into());
            }

            match block_type {
                BLOCK_TYPE_RRT if block_length == 8 => {
                    reports.push(ReportBlock::ReceiverReferenceTime(
                        ReceiverReferenceTimeBlock {
                            ntp_timestamp: raw_packet.get_u64(),
                        },
                    ));
                }
                BLOCK_TYPE_DLRR if block_length % 12 == 0 => {
                    let mut dlrr = DLRRBlock::default();
                    for _ in 0..block_length / 12 {
                        dlrr.reports.push(DLRRReport {
                            ssrc: raw_packet.get_u32(),
                            last_rr: raw_packet.get_u32(),
                            dlrr: raw_packet.get_u32(),
                        });
                    }
                    reports.push(ReportBlock::Dlrr(dlrr));
                }
                _ => {
                    let contents = raw_packet.copy_to_bytes(block_length);
                    reports.push(ReportBlock::Unknown {
                        block_type,
                        contents,
                    });
                }
            }
        }

        Ok(ExtendedReport {
            sender_ssrc,
            reports,
        })
    }
}
