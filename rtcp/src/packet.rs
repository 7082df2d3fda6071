#[cfg(test)]
mod packet_test;

use std::any::Any;
use std::fmt;

use bytes::{Buf, Bytes, BytesMut};
use util::marshal::{Marshal, Unmarshal};

use crate::error::{Error, Result};
use crate::extended_report::ExtendedReport;
use crate::goodbye::Goodbye;
use crate::header::*;
use crate::payload_feedbacks::full_intra_request::FullIntraRequest;
use crate::payload_feedbacks::picture_loss_indication::PictureLossIndication;
use crate::payload_feedbacks::receiver_estimated_maximum_bitrate::ReceiverEstimatedMaximumBitrate;
use crate::raw_packet::RawPacket;
use crate::receiver_report::ReceiverReport;
use crate::sender_report::SenderReport;
use crate::source_description::SourceDescription;
use crate::transport_feedbacks::transport_layer_cc::TransportLayerCc;
use crate::transport_feedbacks::transport_layer_nack::TransportLayerNack;

/// Packet represents an RTCP packet, a protocol unit consisting of the
/// common RTCP header and one of the typed payloads.
pub trait Packet: Marshal + fmt::Display + fmt::Debug {
    fn header(&self) -> Header;
    fn destination_ssrc(&self) -> Vec<u32>;
    fn raw_size(&self) -> usize;
    fn as_any(&self) -> &(dyn Any + Send + Sync);
    fn equal(&self, other: &(dyn Packet + Send + Sync)) -> bool;
    fn cloned(&self) -> Box<dyn Packet + Send + Sync>;
}

impl PartialEq for dyn Packet + Send + Sync {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl Clone for Box<dyn Packet + Send + Sync> {
    fn clone(&self) -> Box<dyn Packet + Send + Sync> {
        self.cloned()
    }
}

/// marshal serializes a list of packets into a single compound buffer.
pub fn marshal(packets: &[Box<dyn Packet + Send + Sync>]) -> Result<Bytes> {
    let mut out = BytesMut::new();
    for p in packets {
        let data = p.marshal()?;
        out.extend(data);
    }
    Ok(out.freeze())
}

/// unmarshal parses one compound datagram into the individual RTCP
/// packets it bundles. Unknown packet types decode as RawPacket rather
/// than failing the datagram.
pub fn unmarshal<B>(raw_data: &mut B) -> Result<Vec<Box<dyn Packet + Send + Sync>>>
where
    B: Buf,
{
    let mut packets = vec![];

    while raw_data.has_remaining() {
        let p = unmarshaller(raw_data)?;
        packets.push(p);
    }

    match packets.len() {
        // Empty packet
        0 => Err(Error::InvalidHeader),
        // Multiple packets
        _ => Ok(packets),
    }
}

/// unmarshaller is a factory which pulls the first RTCP packet from a
/// bytestream and returns its parsed representation. The header stays in
/// the buffer handed to the typed decoders; they re-validate it.
pub(crate) fn unmarshaller<B>(raw_data: &mut B) -> Result<Box<dyn Packet + Send + Sync>>
where
    B: Buf,
{
    let h = Header::unmarshal(&mut raw_data.chunk())?;

    let length = (h.length as usize + 1) * 4;
    if length > raw_data.remaining() {
        return Err(Error::PacketTooShort);
    }

    let in_packet = raw_data.copy_to_bytes(length);

    let p: Box<dyn Packet + Send + Sync> = match h.packet_type {
        PacketType::SenderReport => Box::new(SenderReport::unmarshal(&mut in_packet.clone())?),
        PacketType::ReceiverReport => Box::new(ReceiverReport::unmarshal(&mut in_packet.clone())?),
        PacketType::SourceDescription => {
            Box::new(SourceDescription::unmarshal(&mut in_packet.clone())?)
        }
        PacketType::Goodbye => Box::new(Goodbye::unmarshal(&mut in_packet.clone())?),
        PacketType::ExtendedReport => Box::new(ExtendedReport::unmarshal(&mut in_packet.clone())?),

        PacketType::TransportSpecificFeedback => match h.count {
            FORMAT_TCC => Box::new(TransportLayerCc::unmarshal(&mut in_packet.clone())?),
            FORMAT_NACK => Box::new(TransportLayerNack::unmarshal(&mut in_packet.clone())?),
            _ => Box::new(RawPacket::unmarshal(&mut in_packet.clone())?),
        },
        PacketType::PayloadSpecificFeedback => match h.count {
            FORMAT_PLI => Box::new(PictureLossIndication::unmarshal(&mut in_packet.clone())?),
            FORMAT_FIR => Box::new(FullIntraRequest::unmarshal(&mut in_packet.clone())?),
            FORMAT_REMB => {
                match ReceiverEstimatedMaximumBitrate::unmarshal(&mut in_packet.clone()) {
                    Ok(remb) => Box::new(remb),
                    Err(_) => Box::new(RawPacket::unmarshal(&mut in_packet.clone())?),
                }
            }
            _ => Box::new(RawPacket::unmarshal(&mut in_packet.clone())?),
        },
        _ => Box::new(RawPacket::unmarshal(&mut in_packet.clone())?),
    };

    Ok(p)
}
