#[cfg(test)]
mod payload_queue_test;

use std::collections::HashMap;

use crate::chunk::chunk_payload_data::ChunkPayloadData;
use crate::chunk::chunk_selective_ack::GapAckBlock;
use crate::util::*;

/// PayloadQueue holds DATA chunks keyed by TSN in serial-number order.
/// The association uses one instance for the inbound pending set (SACK
/// generation) and one for the outbound in-flight set.
#[derive(Default, Debug)]
pub(crate) struct PayloadQueue {
    pub(crate) chunk_map: HashMap<u32, ChunkPayloadData>,
    pub(crate) sorted: Vec<u32>,
    pub(crate) dup_tsn: Vec<u32>,
    pub(crate) n_bytes: usize,
}

impl PayloadQueue {
    pub(crate) fn new() -> Self {
        PayloadQueue::default()
    }

    fn sorted_insert(&mut self, tsn: u32) {
        let pos = self
            .sorted
            .iter()
            .position(|t| sna32lt(tsn, *t))
            .unwrap_or(self.sorted.len());
        self.sorted.insert(pos, tsn);
    }

    /// push_no_check stores an outbound chunk without duplicate checks.
    pub(crate) fn push_no_check(&mut self, p: ChunkPayloadData) {
        self.n_bytes += p.user_data.len();
        self.sorted_insert(p.tsn);
        self.chunk_map.insert(p.tsn, p);
    }

    /// push stores an inbound chunk unless it duplicates one we hold or
    /// precedes the cumulative TSN. Returns whether it was stored.
    pub(crate) fn push(&mut self, p: ChunkPayloadData, cumulative_tsn: u32) -> bool {
        if self.chunk_map.contains_key(&p.tsn)
            || sna32lte(p.tsn, cumulative_tsn)
        {
            // the chunk  is a duplicate
            self.dup_tsn.push(p.tsn);
            return false;
        }
        self.push_no_check(p);
        true
    }

    pub(crate) fn pop(&mut self, tsn: u32) -> Option<ChunkPayloadData> {
        if let Some(pos) = self.sorted.iter().position(|t| *t == tsn) {
            self.sorted.remove(pos);
        }
        let chunk = self.chunk_map.remove(&tsn)?;
        self.n_bytes -= chunk.user_data.len();
        Some(chunk)
    }

    pub(crate) fn get(&self, tsn: u32) -> Option<&ChunkPayloadData> {
        self.chunk_map.get(&tsn)
    }

    pub(crate) fn get_mut(&mut self, tsn: u32) -> Option<&mut ChunkPayloadData> {
        self.chunk_map.get_mut(&tsn)
    }

    pub(crate) fn has(&self, tsn: u32) -> bool {
        self.chunk_map.contains_key(&tsn)
    }

    pub(crate) fn len(&self) -> usize {
        self.chunk_map.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.chunk_map.is_empty()
    }

    pub(crate) fn get_n_bytes(&self) -> usize {
        self.n_bytes
    }

    /// pop_duplicates drains the duplicate-TSN report list.
    pub(crate) fn pop_duplicates(&mut self) -> Vec<u32> {
        std::mem::take(&mut self.dup_tsn)
    }

    /// get_gap_ack_blocks computes the SACK gap blocks relative to the
    /// cumulative TSN.
    pub(crate) fn get_gap_ack_blocks(&self, cumulative_tsn: u32) -> Vec<GapAckBlock> {
        if self.chunk_map.is_empty() {
            return vec![];
        }

        let mut blocks = vec![];
        let mut block = GapAckBlock::default();

        for (i, tsn) in self.sorted.iter().enumerate() {
            let offset = tsn.wrapping_sub(cumulative_tsn) as u16;
            if i == 0 {
                block.start = offset;
                block.end = offset;
                continue;
            }
            if block.end + 1 == offset {
                block.end += 1;
            } else {
                blocks.push(block);
                block.start = offset;
                block.end = offset;
            }
        }
        blocks.push(block);
        blocks
    }
}
