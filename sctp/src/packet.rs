#[cfg(test)]
mod packet_test;

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use crc::{Crc, CRC_32_ISCSI};

use crate::chunk::chunk_abort::ChunkAbort;
use crate::chunk::chunk_cookie_ack::ChunkCookieAck;
use crate::chunk::chunk_cookie_echo::ChunkCookieEcho;
use crate::chunk::chunk_error::ChunkError;
use crate::chunk::chunk_forward_tsn::ChunkForwardTsn;
use crate::chunk::chunk_header::*;
use crate::chunk::chunk_heartbeat::ChunkHeartbeat;
use crate::chunk::chunk_heartbeat_ack::ChunkHeartbeatAck;
use crate::chunk::chunk_init::ChunkInit;
use crate::chunk::chunk_payload_data::ChunkPayloadData;
use crate::chunk::chunk_reconfig::ChunkReconfig;
use crate::chunk::chunk_selective_ack::ChunkSelectiveAck;
use crate::chunk::chunk_shutdown::ChunkShutdown;
use crate::chunk::chunk_shutdown_ack::ChunkShutdownAck;
use crate::chunk::chunk_shutdown_complete::ChunkShutdownComplete;
use crate::chunk::chunk_type::*;
use crate::chunk::Chunk;
use crate::error::{Error, Result};

pub(crate) const PACKET_HEADER_SIZE: usize = 12;

pub(crate) const CASTAGNOLI: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

///  An SCTP packet is composed of a common header and chunks. A chunk
///  contains either control information or user data.
///
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Source Port Number        |     Destination Port Number   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                      Verification Tag                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Checksum                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Chunk #1                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                              ...                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Default, Debug)]
pub(crate) struct Packet {
    pub(crate) source_port: u16,
    pub(crate) destination_port: u16,
    pub(crate) verification_tag: u32,
    pub(crate) chunks: Vec<Box<dyn Chunk + Send + Sync>>,
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut res = format!(
            "Packet:
        source_port: {}
        destination_port: {}
        verification_tag: {}
        ",
            self.source_port, self.destination_port, self.verification_tag,
        );
        for chunk in &self.chunks {
            res += format!("Chunk: {chunk}\n").as_str();
        }
        write!(f, "{res}")
    }
}

impl Packet {
    pub(crate) fn unmarshal(raw: &Bytes) -> Result<Self> {
        if raw.len() < PACKET_HEADER_SIZE {
            return Err(Error::ErrPacketRawTooSmall);
        }

        let reader = &mut raw.clone();
        let source_port = reader.get_u16();
        let destination_port = reader.get_u16();
        let verification_tag = reader.get_u32();
        let their_checksum = reader.get_u32_le();

        // The checksum is computed with its own field zeroed.
        let mut digest = CASTAGNOLI.digest();
        digest.update(&raw[0..8]);
        digest.update(&[0, 0, 0, 0]);
        digest.update(&raw[PACKET_HEADER_SIZE..]);
        let our_checksum = digest.finalize();
        if their_checksum != our_checksum {
            return Err(Error::ErrChecksumMismatch);
        }

        let mut chunks: Vec<Box<dyn Chunk + Send + Sync>> = vec![];
        let mut offset = PACKET_HEADER_SIZE;
        loop {
            if offset == raw.len() {
                break;
            }
            if offset + CHUNK_HEADER_SIZE > raw.len() {
                return Err(Error::ErrParamHeaderParseFailed);
            }

            let body = raw.slice(offset..);
            let ct = ChunkType(raw[offset]);
            let c: Box<dyn Chunk + Send + Sync> = match ct {
                CT_INIT | CT_INIT_ACK => Box::new(ChunkInit::unmarshal(&body)?),
                CT_ABORT => Box::new(ChunkAbort::unmarshal(&body)?),
                CT_COOKIE_ECHO => Box::new(ChunkCookieEcho::unmarshal(&body)?),
                CT_COOKIE_ACK => Box::new(ChunkCookieAck::unmarshal(&body)?),
                CT_HEARTBEAT => Box::new(ChunkHeartbeat::unmarshal(&body)?),
                CT_HEARTBEAT_ACK => Box::new(ChunkHeartbeatAck::unmarshal(&body)?),
                CT_PAYLOAD_DATA => Box::new(ChunkPayloadData::unmarshal(&body)?),
                CT_SACK => Box::new(ChunkSelectiveAck::unmarshal(&body)?),
                CT_RECONFIG => Box::new(ChunkReconfig::unmarshal(&body)?),
                CT_FORWARD_TSN => Box::new(ChunkForwardTsn::unmarshal(&body)?),
                CT_ERROR => Box::new(ChunkError::unmarshal(&body)?),
                CT_SHUTDOWN => Box::new(ChunkShutdown::unmarshal(&body)?),
                CT_SHUTDOWN_ACK => Box::new(ChunkShutdownAck::unmarshal(&body)?),
                CT_SHUTDOWN_COMPLETE => Box::new(ChunkShutdownComplete::unmarshal(&body)?),
                _ => {
                    // unrecognized chunks are skipped, not fatal
                    let header = ChunkHeader::unmarshal(&body)?;
                    log::trace!("skipping unknown chunk type {}", header.typ);
                    offset += CHUNK_HEADER_SIZE
                        + header.value_length()
                        + get_padding_size(CHUNK_HEADER_SIZE + header.value_length());
                    continue;
                }
            };

            let chunk_value_padding = get_padding_size(CHUNK_HEADER_SIZE + c.value_length());
            offset += CHUNK_HEADER_SIZE + c.value_length() + chunk_value_padding;
            chunks.push(c);
        }

        Ok(Packet {
            source_port,
            destination_port,
            verification_tag,
            chunks,
        })
    }

    pub(crate) fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        // populate the header
        writer.put_u16(self.source_port);
        writer.put_u16(self.destination_port);
        writer.put_u32(self.verification_tag);

        // checksum is computed after the rest of the packet is serialized
        let checksum_pos = writer.len();
        writer.extend_from_slice(&[0, 0, 0, 0]);

        // populate chunks
        for c in &self.chunks {
            c.marshal_to(writer)?;

            let padding_needed = get_padding_size(writer.len());
            if padding_needed != 0 {
                writer.extend_from_slice(&vec![0u8; padding_needed]);
            }
        }

        let mut digest = CASTAGNOLI.digest();
        digest.update(writer);
        let checksum = digest.finalize();

        // Checksum is already in BigEndian; Using LittleEndian stops it
        // from being flipped.
        let checksum_place = &mut writer[checksum_pos..checksum_pos + 4];
        checksum_place.copy_from_slice(&checksum.to_le_bytes());

        Ok(writer.len())
    }

    pub(crate) fn marshal(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(PACKET_HEADER_SIZE);
        self.marshal_to(&mut buf)?;
        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod crc_test {
    use super::*;

    #[test]
    fn test_crc32c_known_vector() {
        // The canonical CRC32C check vector.
        assert_eq!(CASTAGNOLI.checksum(b"123456789"), 0xE3069283);
    }
}
