#[cfg(test)]
mod compound_packet_test;

use std::any::Any;
use std::fmt;

use bytes::Buf;
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::error::Error;
use crate::header::*;
use crate::packet::*;
use crate::source_description::*;

/// A CompoundPacket is a collection of RTCP packets transmitted as a
/// single packet with the underlying protocol (for example UDP).
///
/// To maximize the resolution of reception statistics, the first Packet
/// in a CompoundPacket must always be either a SenderReport or a
/// ReceiverReport, followed by an SDES containing a CNAME item.
///
/// Other RTCP packet types may follow in any order. Packet types may
/// appear more than once.
#[derive(Debug, Default, PartialEq, Clone)]
pub struct CompoundPacket(pub Vec<Box<dyn Packet + Send + Sync>>);

impl fmt::Display for CompoundPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for p in &self.0 {
            out += p.to_string().as_str();
        }
        write!(f, "{out}")
    }
}

impl CompoundPacket {
    /// validate returns an error if this is not an RFC-compliant
    /// CompoundPacket.
    pub fn validate(&self) -> Result<(), Error> {
        if self.0.is_empty() {
            return Err(Error::EmptyCompound);
        }

        // SenderReport and ReceiverReport are the only types that can
        // start a compound packet
        if self.0[0].as_any().downcast_ref::<crate::sender_report::SenderReport>().is_none()
            && self.0[0]
                .as_any()
                .downcast_ref::<crate::receiver_report::ReceiverReport>()
                .is_none()
        {
            return Err(Error::BadFirstPacket);
        }

        for pkt in &self.0[1..] {
            // If the number of RecetpionReports exceeds 31 additional
            // ReceiverReports can be included here.
            if pkt
                .as_any()
                .downcast_ref::<crate::receiver_report::ReceiverReport>()
                .is_some()
            {
                continue;
            }
            // A SourceDescription containing a CNAME must be included in
            // every CompoundPacket.
            if let Some(e) = pkt.as_any().downcast_ref::<SourceDescription>() {
                let mut has_cname = false;
                for c in &e.chunks {
                    for it in &c.items {
                        if it.sdes_type == SdesType::SdesCname {
                            has_cname = true;
                        }
                    }
                }
                if !has_cname {
                    return Err(Error::MissingCname);
                }
                return Ok(());
            }
            // Other packets are not permitted before the CNAME
            return Err(Error::PacketBeforeCname);
        }

        // CNAME never reached
        Err(Error::MissingCname)
    }

    /// CNAME returns the CNAME that *must* be present in every
    /// CompoundPacket.
    pub fn cname(&self) -> Result<bytes::Bytes, Error> {
        if self.0.is_empty() {
            return Err(Error::EmptyCompound);
        }

        for pkt in &self.0[1..] {
            if let Some(sdes) = pkt.as_any().downcast_ref::<SourceDescription>() {
                for c in &sdes.chunks {
                    for it in &c.items {
                        if it.sdes_type == SdesType::SdesCname {
                            return Ok(it.text.clone());
                        }
                    }
                }
            } else if pkt
                .as_any()
                .downcast_ref::<crate::receiver_report::ReceiverReport>()
                .is_none()
            {
                return Err(Error::PacketBeforeCname);
            }
        }
        Err(Error::MissingCname)
    }
}

impl Packet for CompoundPacket {
    fn header(&self) -> Header {
        if self.0.is_empty() {
            Header::default()
        } else {
            self.0[0].header()
        }
    }

    /// destination_ssrc returns the synchronization sources associated
    /// with this CompoundPacket's reception report.
    fn destination_ssrc(&self) -> Vec<u32> {
        if self.0.is_empty() {
            vec![]
        } else {
            self.0[0].destination_ssrc()
        }
    }

    fn raw_size(&self) -> usize {
        let mut l = 0;
        for pkt in &self.0 {
            l += pkt.marshal_size();
        }
        l
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }

    fn equal(&self, other: &(dyn Packet + Send + Sync)) -> bool {
        other
            .as_any()
            .downcast_ref::<CompoundPacket>()
            .map_or(false, |a| self == a)
    }

    fn cloned(&self) -> Box<dyn Packet + Send + Sync> {
        Box::new(self.clone())
    }
}

impl MarshalSize for CompoundPacket {
    fn marshal_size(&self) -> usize {
        self.raw_size()
    }
}

impl Marshal for CompoundPacket {
    /// marshal_to encodes the CompoundPacket as its individual packets
    /// concatenated together.
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize, util::Error> {
        self.validate().map_err(util::Error::from_std)?;

        for pkt in &self.0 {
            let n = pkt.marshal_to(buf)?;
            buf = &mut buf[n..];
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for CompoundPacket {
    /// unmarshal decodes a CompoundPacket from binary.
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self, util::Error>
    where
        Self: Sized,
        B: Buf,
    {
        let mut packets = vec![];

        while raw_packet.has_remaining() {
            let p = unmarshaller(raw_packet).map_err(util::Error::from_std)?;
            packets.push(p);
        }

        let c = CompoundPacket(packets);
        c.validate().map_err(util::Error::from_std)?;

        Ok(c)
    }
}
