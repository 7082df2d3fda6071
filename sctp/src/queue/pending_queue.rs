use std::collections::VecDeque;

use crate::chunk::chunk_payload_data::ChunkPayloadData;

/// PendingQueue buffers outbound DATA chunks that have never been sent.
/// Chunks leave in FIFO order, which preserves per-stream ordering.
#[derive(Default, Debug)]
pub(crate) struct PendingQueue {
    queue: VecDeque<ChunkPayloadData>,
    n_bytes: usize,
}

impl PendingQueue {
    pub(crate) fn new() -> Self {
        PendingQueue::default()
    }

    pub(crate) fn push(&mut self, c: ChunkPayloadData) {
        self.n_bytes += c.user_data.len();
        self.queue.push_back(c);
    }

    pub(crate) fn peek(&self) -> Option<&ChunkPayloadData> {
        self.queue.front()
    }

    pub(crate) fn pop(&mut self) -> Option<ChunkPayloadData> {
        let c = self.queue.pop_front()?;
        self.n_bytes -= c.user_data.len();
        Some(c)
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn get_n_bytes(&self) -> usize {
        self.n_bytes
    }
}
