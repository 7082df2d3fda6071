use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// RTCRtpReceiver owns one inbound stream, keyed by SSRC or, for
/// simulcast before the SSRC is learned, by RID.
pub struct RTCRtpReceiver {
    pub(crate) ssrc: Mutex<Option<u32>>,
    pub(crate) rid: Option<String>,

    track_tx: mpsc::UnboundedSender<rtp::packet::Packet>,
    track_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<rtp::packet::Packet>>,

    /// Loss tracking for NACK generation.
    nack_state: Mutex<NackState>,

    packets_received: AtomicU64,
    last_sequence_number: AtomicU32,
}

#[derive(Default)]
struct NackState {
    highest_seen: Option<u16>,
    missing: BTreeSet<u16>,
}

impl RTCRtpReceiver {
    pub(crate) fn new(rid: Option<String>) -> Arc<Self> {
        let (track_tx, track_rx) = mpsc::unbounded_channel();
        Arc::new(RTCRtpReceiver {
            ssrc: Mutex::new(None),
            rid,
            track_tx,
            track_rx: tokio::sync::Mutex::new(track_rx),
            nack_state: Mutex::new(NackState::default()),
            packets_received: AtomicU64::new(0),
            last_sequence_number: AtomicU32::new(0),
        })
    }

    pub fn ssrc(&self) -> Option<u32> {
        *self.ssrc.lock().unwrap()
    }

    pub(crate) fn set_ssrc(&self, ssrc: u32) {
        let mut guard = self.ssrc.lock().unwrap();
        if guard.is_none() {
            *guard = Some(ssrc);
        }
    }

    /// read_rtp returns the next de-duplicated, decrypted packet.
    pub async fn read_rtp(&self) -> Result<rtp::packet::Packet> {
        let mut rx = self.track_rx.lock().await;
        rx.recv().await.ok_or(Error::ErrConnectionClosed)
    }

    /// deliver feeds one inbound packet, updating loss bookkeeping.
    pub(crate) fn deliver(&self, packet: rtp::packet::Packet) {
        let seq = packet.header.sequence_number;
        {
            let mut nack = self.nack_state.lock().unwrap();
            match nack.highest_seen {
                None => nack.highest_seen = Some(seq),
                Some(highest) => {
                    let diff = seq.wrapping_sub(highest);
                    if diff != 0 && diff < 0x8000 {
                        // advanced: everything between is missing
                        let mut s = highest.wrapping_add(1);
                        while s != seq {
                            nack.missing.insert(s);
                            s = s.wrapping_add(1);
                        }
                        nack.highest_seen = Some(seq);
                    } else {
                        // a late or retransmitted packet fills its hole
                        nack.missing.remove(&seq);
                    }
                }
            }
        }

        self.packets_received.fetch_add(1, Ordering::SeqCst);
        self.last_sequence_number.store(seq as u32, Ordering::SeqCst);
        let _ = self.track_tx.send(packet);
    }

    /// collect_missing drains the sequence numbers a NACK should cover.
    pub(crate) fn collect_missing(&self) -> Vec<u16> {
        let nack = self.nack_state.lock().unwrap();
        nack.missing.iter().copied().collect()
    }

    /// Builds the reception report block for RR emission.
    pub(crate) fn reception_report(&self) -> Option<rtcp::reception_report::ReceptionReport> {
        let ssrc = (*self.ssrc.lock().unwrap())?;
        Some(rtcp::reception_report::ReceptionReport {
            ssrc,
            fraction_lost: 0,
            total_lost: self.nack_state.lock().unwrap().missing.len() as u32,
            last_sequence_number: self.last_sequence_number.load(Ordering::SeqCst),
            jitter: 0,
            last_sender_report: 0,
            delay: 0,
        })
    }
}
