#[cfg(test)]
mod reassembly_queue_test;

use bytes::{Bytes, BytesMut};

use crate::chunk::chunk_payload_data::{ChunkPayloadData, PayloadProtocolIdentifier};
use crate::util::*;

/// ReassemblyQueue buffers inbound DATA chunks for one stream and
/// surfaces complete messages: unordered messages as soon as their
/// B..E run is contiguous, ordered messages in stream-sequence order.
#[derive(Default, Debug)]
pub(crate) struct ReassemblyQueue {
    pub(crate) si: u16,
    /// The next expected SSN for ordered delivery.
    pub(crate) next_ssn: u16,
    pub(crate) ordered: Vec<ChunkPayloadData>,
    pub(crate) unordered: Vec<ChunkPayloadData>,
    pub(crate) n_bytes: usize,
}

impl ReassemblyQueue {
    pub(crate) fn new(si: u16) -> Self {
        ReassemblyQueue {
            si,
            ..Default::default()
        }
    }

    pub(crate) fn push(&mut self, chunk: ChunkPayloadData) -> bool {
        if chunk.stream_identifier != self.si {
            return false;
        }

        self.n_bytes += chunk.user_data.len();
        if chunk.unordered {
            let pos = self
                .unordered
                .iter()
                .position(|c| sna32lt(chunk.tsn, c.tsn))
                .unwrap_or(self.unordered.len());
            self.unordered.insert(pos, chunk);
        } else {
            // old, already-delivered sequences are dropped
            if sna16lt(chunk.stream_sequence_number, self.next_ssn) {
                self.n_bytes -= chunk.user_data.len();
                return false;
            }
            let pos = self
                .ordered
                .iter()
                .position(|c| {
                    sna16lt(chunk.stream_sequence_number, c.stream_sequence_number)
                        || (chunk.stream_sequence_number == c.stream_sequence_number
                            && sna32lt(chunk.tsn, c.tsn))
                })
                .unwrap_or(self.ordered.len());
            self.ordered.insert(pos, chunk);
        }
        true
    }

    /// read pops the next deliverable message, if any.
    pub(crate) fn read(&mut self) -> Option<(Bytes, PayloadProtocolIdentifier)> {
        if let Some(message) = self.read_unordered() {
            return Some(message);
        }
        self.read_ordered()
    }

    fn read_unordered(&mut self) -> Option<(Bytes, PayloadProtocolIdentifier)> {
        // find a contiguous B..E run at any position
        let mut start = None;
        for (i, c) in self.unordered.iter().enumerate() {
            if c.beginning_fragment {
                start = Some(i);
            }
            if let Some(s) = start {
                // run must be TSN-contiguous from the start
                let expected_tsn = self.unordered[s].tsn.wrapping_add((i - s) as u32);
                if c.tsn != expected_tsn {
                    start = None;
                    continue;
                }
                if c.ending_fragment {
                    let chunks: Vec<ChunkPayloadData> =
                        self.unordered.drain(s..=i).collect();
                    return Some(Self::assemble(&chunks, &mut self.n_bytes));
                }
            }
        }
        None
    }

    fn read_ordered(&mut self) -> Option<(Bytes, PayloadProtocolIdentifier)> {
        // the head must open the message with the expected SSN
        let first = self.ordered.first()?;
        if first.stream_sequence_number != self.next_ssn || !first.beginning_fragment {
            return None;
        }

        let mut end = None;
        for (i, c) in self.ordered.iter().enumerate() {
            if c.stream_sequence_number != self.next_ssn {
                return None;
            }
            let expected_tsn = self.ordered[0].tsn.wrapping_add(i as u32);
            if c.tsn != expected_tsn {
                return None;
            }
            if c.ending_fragment {
                end = Some(i);
                break;
            }
        }
        let end = end?;

        let chunks: Vec<ChunkPayloadData> = self.ordered.drain(..=end).collect();
        self.next_ssn = self.next_ssn.wrapping_add(1);
        Some(Self::assemble(&chunks, &mut self.n_bytes))
    }

    fn assemble(
        chunks: &[ChunkPayloadData],
        n_bytes: &mut usize,
    ) -> (Bytes, PayloadProtocolIdentifier) {
        let mut data = BytesMut::new();
        for c in chunks {
            data.extend_from_slice(&c.user_data);
            *n_bytes -= c.user_data.len();
        }
        let ppid = chunks
            .first()
            .map(|c| c.payload_type)
            .unwrap_or_default();
        (data.freeze(), ppid)
    }

    /// forward_tsn_for_ordered drops buffered ordered chunks up to the
    /// given SSN and advances next_ssn past it (RFC 3758).
    pub(crate) fn forward_tsn_for_ordered(&mut self, last_ssn: u16) {
        let n_bytes = &mut self.n_bytes;
        self.ordered.retain(|c| {
            let keep = sna16gt(c.stream_sequence_number, last_ssn);
            if !keep {
                *n_bytes -= c.user_data.len();
            }
            keep
        });
        if sna16lte(self.next_ssn, last_ssn) {
            self.next_ssn = last_ssn.wrapping_add(1);
        }
    }

    /// forward_tsn_for_unordered drops unordered fragments whose TSN is
    /// at or below the new cumulative TSN.
    pub(crate) fn forward_tsn_for_unordered(&mut self, new_cumulative_tsn: u32) {
        let n_bytes = &mut self.n_bytes;
        self.unordered.retain(|c| {
            let keep = sna32gt(c.tsn, new_cumulative_tsn);
            if !keep {
                *n_bytes -= c.user_data.len();
            }
            keep
        });
    }

    pub(crate) fn get_n_bytes(&self) -> usize {
        self.n_bytes
    }
}
