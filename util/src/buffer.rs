#[cfg(test)]
mod buffer_test;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{Mutex, Notify};

use crate::error::{Error, Result};

/// Default per-buffer cap; a full buffer drops the oldest packet.
const DEFAULT_LIMIT_COUNT: usize = 512;

struct BufferInternal {
    packets: VecDeque<Bytes>,
    closed: bool,
}

/// Buffer allows writing packets from one task and reading them from another,
/// preserving packet boundaries. It never blocks writers: when the configured
/// packet limit is reached the oldest packet is discarded.
#[derive(Clone)]
pub struct Buffer {
    inner: Arc<Mutex<BufferInternal>>,
    notify: Arc<Notify>,
    limit_count: usize,
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer::new(DEFAULT_LIMIT_COUNT)
    }
}

impl Buffer {
    pub fn new(limit_count: usize) -> Self {
        Buffer {
            inner: Arc::new(Mutex::new(BufferInternal {
                packets: VecDeque::new(),
                closed: false,
            })),
            notify: Arc::new(Notify::new()),
            limit_count: if limit_count == 0 {
                DEFAULT_LIMIT_COUNT
            } else {
                limit_count
            },
        }
    }

    /// Appends a packet, waking one pending reader.
    pub async fn write(&self, packet: &[u8]) -> Result<usize> {
        {
            let mut inner = self.inner.lock().await;
            if inner.closed {
                return Err(Error::ErrBufferClosed);
            }
            if inner.packets.len() >= self.limit_count {
                inner.packets.pop_front();
            }
            inner.packets.push_back(Bytes::copy_from_slice(packet));
        }
        self.notify.notify_one();
        Ok(packet.len())
    }

    /// Reads a single packet into `packet`, waiting until one is available
    /// or the optional duration elapses.
    pub async fn read(&self, packet: &mut [u8], duration: Option<Duration>) -> Result<usize> {
        let deadline = duration.map(|d| tokio::time::Instant::now() + d);
        loop {
            {
                let mut inner = self.inner.lock().await;
                if let Some(first) = inner.packets.pop_front() {
                    if packet.len() < first.len() {
                        return Err(Error::ErrBufferShort);
                    }
                    packet[..first.len()].copy_from_slice(&first);
                    return Ok(first.len());
                }
                if inner.closed {
                    return Err(Error::ErrBufferClosed);
                }
            }

            if let Some(deadline) = deadline {
                if tokio::time::timeout_at(deadline, self.notify.notified())
                    .await
                    .is_err()
                {
                    return Err(Error::ErrTimeout);
                }
            } else {
                self.notify.notified().await;
            }
        }
    }

    pub async fn close(&self) {
        {
            let mut inner = self.inner.lock().await;
            inner.closed = true;
        }
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }
}
