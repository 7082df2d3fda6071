#[cfg(test)]
mod fragment_buffer_test;

use std::collections::HashMap;

use crate::error::*;
use crate::handshake::handshake_header::{HandshakeHeader, HANDSHAKE_HEADER_LENGTH};

/// Out-of-order and fragmented handshake messages are reassembled here:
/// fragments are keyed by message sequence, and complete messages pop in
/// sequence order.
pub struct FragmentBuffer {
    current_message_sequence_number: u16,
    cache: HashMap<u16, Vec<Fragment>>,
}

struct Fragment {
    header: HandshakeHeader,
    epoch: u16,
    data: Vec<u8>,
}

impl Default for FragmentBuffer {
    fn default() -> Self {
        FragmentBuffer::new()
    }
}

impl FragmentBuffer {
    pub fn new() -> Self {
        FragmentBuffer {
            current_message_sequence_number: 0,
            cache: HashMap::new(),
        }
    }

    /// push feeds the handshake payload of one record (which may bundle
    /// several handshake fragments) into the buffer. Returns true if at
    /// least one fragment was stored.
    pub fn push(&mut self, epoch: u16, mut buf: &[u8]) -> Result<bool> {
        let mut stored = false;
        while !buf.is_empty() {
            if buf.len() < HANDSHAKE_HEADER_LENGTH {
                return Err(Error::ErrBufferTooSmall);
            }
            let header = HandshakeHeader::unmarshal(buf)?;
            let frag_len = header.fragment_length as usize;
            if buf.len() < HANDSHAKE_HEADER_LENGTH + frag_len {
                return Err(Error::ErrBufferTooSmall);
            }

            // stale retransmits are dropped silently
            if header.message_sequence >= self.current_message_sequence_number {
                let data = buf[HANDSHAKE_HEADER_LENGTH..HANDSHAKE_HEADER_LENGTH + frag_len]
                    .to_vec();
                self.cache
                    .entry(header.message_sequence)
                    .or_default()
                    .push(Fragment {
                        header,
                        epoch,
                        data,
                    });
                stored = true;
            }

            buf = &buf[HANDSHAKE_HEADER_LENGTH + frag_len..];
        }
        Ok(stored)
    }

    /// pop returns the next in-order complete message as
    /// (epoch, full message bytes incl. header), if assembled.
    pub fn pop(&mut self) -> Option<(u16, Vec<u8>)> {
        let seq = self.current_message_sequence_number;
        let fragments = self.cache.get(&seq)?;
        let total_length = fragments.first()?.header.length as usize;
        let epoch = fragments.first()?.epoch;

        // walk the fragments, collecting a contiguous 0..total_length run
        let mut body = vec![0u8; total_length];
        let mut have = vec![false; total_length];
        for frag in fragments {
            let start = frag.header.fragment_offset as usize;
            let end = start + frag.data.len();
            if end > total_length {
                return None;
            }
            body[start..end].copy_from_slice(&frag.data);
            for h in &mut have[start..end] {
                *h = true;
            }
        }
        if !have.iter().all(|h| *h) {
            return None;
        }

        let header = HandshakeHeader {
            fragment_offset: 0,
            fragment_length: total_length as u32,
            ..fragments.first()?.header
        };

        self.cache.remove(&seq);
        self.current_message_sequence_number += 1;

        let mut full = header.marshal().ok()?;
        full.extend_from_slice(&body);
        Some((epoch, full))
    }
}
