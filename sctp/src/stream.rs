use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::Notify;

use crate::chunk::chunk_payload_data::{ChunkPayloadData, PayloadProtocolIdentifier};
use crate::error::{Error, Result};
use crate::queue::reassembly_queue::ReassemblyQueue;

/// Reliability policy applied per outbound message (RFC 3758).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReliabilityType {
    /// Normal, reliable delivery.
    #[default]
    Reliable = 0,
    /// Give up after this many retransmissions.
    Rexmit = 1,
    /// Give up after this many milliseconds.
    Timed = 2,
}

impl fmt::Display for ReliabilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReliabilityType::Reliable => "reliable",
            ReliabilityType::Rexmit => "partial (rexmit)",
            ReliabilityType::Timed => "partial (timed)",
        };
        write!(f, "{s}")
    }
}

pub type OnBufferedAmountLowFn = Box<dyn Fn() + Send + Sync>;

/// The association-side operations a stream drives. Installed at
/// construction, keeping the ownership tree acyclic.
#[async_trait::async_trait]
pub(crate) trait StreamOutbound {
    async fn send_payload_data(&self, chunks: Vec<ChunkPayloadData>) -> Result<()>;
    async fn send_reset_request(&self, stream_identifier: u16) -> Result<()>;
    fn max_payload_size(&self) -> usize;
    fn max_message_size(&self) -> u32;
}

/// Stream is one bidirectional SCTP stream. Writes fragment into the
/// association's pending queue; reads assemble from the per-stream
/// reassembly queue.
pub struct Stream {
    pub(crate) stream_identifier: u16,
    pub(crate) default_payload_type: AtomicU32,

    pub(crate) reassembly_queue: Mutex<ReassemblyQueue>,
    pub(crate) read_notifier: Notify,
    pub(crate) read_shutdown: AtomicBool,
    pub(crate) reset_by_peer: AtomicBool,

    pub(crate) sequence_number: AtomicU16,
    pub(crate) unordered: AtomicBool,
    pub(crate) reliability: Mutex<(ReliabilityType, u32)>,

    pub(crate) buffered_amount: AtomicUsize,
    pub(crate) buffered_amount_low: AtomicUsize,
    pub(crate) on_buffered_amount_low: Mutex<Option<OnBufferedAmountLowFn>>,

    pub(crate) outbound: Arc<dyn StreamOutbound + Send + Sync>,
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("stream_identifier", &self.stream_identifier)
            .finish()
    }
}

impl Stream {
    pub(crate) fn new(
        stream_identifier: u16,
        default_payload_type: PayloadProtocolIdentifier,
        outbound: Arc<dyn StreamOutbound + Send + Sync>,
    ) -> Self {
        Stream {
            stream_identifier,
            default_payload_type: AtomicU32::new(default_payload_type as u32),
            reassembly_queue: Mutex::new(ReassemblyQueue::new(stream_identifier)),
            read_notifier: Notify::new(),
            read_shutdown: AtomicBool::new(false),
            reset_by_peer: AtomicBool::new(false),
            sequence_number: AtomicU16::new(0),
            unordered: AtomicBool::new(false),
            reliability: Mutex::new((ReliabilityType::Reliable, 0)),
            buffered_amount: AtomicUsize::new(0),
            buffered_amount_low: AtomicUsize::new(0),
            on_buffered_amount_low: Mutex::new(None),
            outbound,
        }
    }

    pub fn stream_identifier(&self) -> u16 {
        self.stream_identifier
    }

    /// set_default_payload_type sets the PPID used by write.
    pub fn set_default_payload_type(&self, ppid: PayloadProtocolIdentifier) {
        self.default_payload_type.store(ppid as u32, Ordering::SeqCst);
    }

    /// set_reliability_params sets the ordering and partial-reliability
    /// policy for subsequent writes.
    pub fn set_reliability_params(&self, unordered: bool, rel_type: ReliabilityType, rel_val: u32) {
        self.unordered.store(unordered, Ordering::SeqCst);
        let mut reliability = self.reliability.lock().unwrap();
        *reliability = (rel_type, rel_val);
    }

    /// read_sctp reads a whole message and its PPID, awaiting arrival.
    pub async fn read_sctp(&self, buf: &mut [u8]) -> Result<(usize, PayloadProtocolIdentifier)> {
        loop {
            {
                let mut queue = self.reassembly_queue.lock().unwrap();
                if let Some((data, ppid)) = queue.read() {
                    if buf.len() < data.len() {
                        return Err(Error::ErrShortBuffer);
                    }
                    buf[..data.len()].copy_from_slice(&data);
                    return Ok((data.len(), ppid));
                }
            }

            if self.reset_by_peer.load(Ordering::SeqCst) {
                return Err(Error::ErrStreamReset);
            }
            if self.read_shutdown.load(Ordering::SeqCst) {
                return Err(Error::ErrStreamClosed);
            }

            self.read_notifier.notified().await;
        }
    }

    /// write sends data with the stream's default PPID.
    pub async fn write(&self, data: &Bytes) -> Result<usize> {
        let ppid =
            PayloadProtocolIdentifier::from(self.default_payload_type.load(Ordering::SeqCst));
        self.write_sctp(data, ppid).await
    }

    /// write_sctp fragments one message into DATA chunks and queues them
    /// for transmission. It does not await delivery; backpressure is the
    /// buffered_amount counter.
    pub async fn write_sctp(&self, data: &Bytes, ppid: PayloadProtocolIdentifier) -> Result<usize> {
        if data.len() > self.outbound.max_message_size() as usize {
            return Err(Error::ErrOutboundPacketTooLarge);
        }
        if self.read_shutdown.load(Ordering::SeqCst) {
            return Err(Error::ErrStreamClosed);
        }

        let chunks = self.packetize(data, ppid)?;
        self.buffered_amount.fetch_add(data.len(), Ordering::SeqCst);
        self.outbound.send_payload_data(chunks).await?;
        Ok(data.len())
    }

    fn packetize(
        &self,
        raw: &Bytes,
        ppid: PayloadProtocolIdentifier,
    ) -> Result<Vec<ChunkPayloadData>> {
        if raw.is_empty() {
            return Err(Error::ErrEmptyUserData);
        }

        let max_payload_size = self.outbound.max_payload_size();
        let unordered = self.unordered.load(Ordering::SeqCst);
        let ssn = if unordered {
            self.sequence_number.load(Ordering::SeqCst)
        } else {
            self.sequence_number.fetch_add(1, Ordering::SeqCst)
        };
        let (rel_type, rel_val) = *self.reliability.lock().unwrap();

        let mut chunks = vec![];
        let mut remaining = raw.len();
        let mut offset = 0;
        while remaining > 0 {
            let fragment_size = remaining.min(max_payload_size);
            chunks.push(ChunkPayloadData {
                stream_identifier: self.stream_identifier,
                user_data: raw.slice(offset..offset + fragment_size),
                unordered,
                beginning_fragment: offset == 0,
                ending_fragment: remaining <= fragment_size,
                immediate_sack: false,
                payload_type: ppid,
                stream_sequence_number: ssn,
                rel_type: rel_type as u8,
                rel_val,
                ..Default::default()
            });
            remaining -= fragment_size;
            offset += fragment_size;
        }

        Ok(chunks)
    }

    /// buffered_amount returns the bytes queued but not yet acknowledged.
    pub fn buffered_amount(&self) -> usize {
        self.buffered_amount.load(Ordering::SeqCst)
    }

    pub fn buffered_amount_low_threshold(&self) -> usize {
        self.buffered_amount_low.load(Ordering::SeqCst)
    }

    pub fn set_buffered_amount_low_threshold(&self, th: usize) {
        self.buffered_amount_low.store(th, Ordering::SeqCst);
    }

    pub fn on_buffered_amount_low(&self, f: OnBufferedAmountLowFn) {
        let mut handler = self.on_buffered_amount_low.lock().unwrap();
        *handler = Some(f);
    }

    /// Called by the association when the peer acknowledges n bytes.
    pub(crate) fn on_buffer_released(&self, n: usize) {
        if n == 0 {
            return;
        }
        let from = self.buffered_amount.load(Ordering::SeqCst);
        let to = from.saturating_sub(n);
        self.buffered_amount.store(to, Ordering::SeqCst);

        let threshold = self.buffered_amount_low.load(Ordering::SeqCst);
        if from > threshold && to <= threshold {
            let handler = self.on_buffered_amount_low.lock().unwrap();
            if let Some(f) = &*handler {
                f();
            }
        }
    }

    /// Called by the association on inbound DATA for this stream.
    pub(crate) fn handle_data(&self, chunk: ChunkPayloadData) {
        let stored = {
            let mut queue = self.reassembly_queue.lock().unwrap();
            queue.push(chunk)
        };
        if stored {
            self.read_notifier.notify_waiters();
            self.read_notifier.notify_one();
        }
    }

    /// Called by the association when a FORWARD-TSN covers this stream.
    pub(crate) fn handle_forward_tsn(&self, new_cumulative_tsn: u32, ssn: Option<u16>) {
        {
            let mut queue = self.reassembly_queue.lock().unwrap();
            if let Some(ssn) = ssn {
                queue.forward_tsn_for_ordered(ssn);
            }
            queue.forward_tsn_for_unordered(new_cumulative_tsn);
        }
        self.read_notifier.notify_waiters();
        self.read_notifier.notify_one();
    }

    /// Called when the peer resets this stream (RFC 6525): readers
    /// observe ErrStreamReset once buffered data is drained.
    pub(crate) fn handle_reset_by_peer(&self) {
        self.reset_by_peer.store(true, Ordering::SeqCst);
        self.read_notifier.notify_waiters();
        self.read_notifier.notify_one();
    }

    /// close signals stream shutdown to the peer via an outgoing SSN
    /// reset and shuts down the read side locally.
    pub async fn close(&self) -> Result<()> {
        if !self.read_shutdown.swap(true, Ordering::SeqCst) {
            self.outbound
                .send_reset_request(self.stream_identifier)
                .await?;
        }
        self.read_notifier.notify_waiters();
        self.read_notifier.notify_one();
        Ok(())
    }
}
