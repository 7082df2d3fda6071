use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};
use rtcp::transport_feedbacks::transport_layer_nack::TransportLayerNack;
use rtp::sequence::{new_random_sequencer, Sequencer};
use util::marshal::Marshal;

use crate::dtls_transport::RTCDtlsTransport;
use crate::error::Result;

/// Retransmit cache depth per SSRC.
const RTX_CACHE_SIZE: usize = 128;

/// RTCRtpSender owns one outbound stream (primary SSRC plus the RTX
/// SSRC bound to it via `ssrc-group:FID`). It keeps a retransmit cache
/// and answers Generic NACKs with RTX packets.
pub struct RTCRtpSender {
    pub(crate) ssrc: u32,
    pub(crate) rtx_ssrc: u32,
    pub(crate) payload_type: u8,
    pub(crate) rtx_payload_type: u8,

    rtx_sequencer: Box<dyn Sequencer>,
    rtx_cache: Mutex<VecDeque<(u16, Bytes)>>,

    transport: Mutex<Option<Arc<RTCDtlsTransport>>>,

    packets_sent: AtomicU64,
    octets_sent: AtomicU64,
    last_timestamp: AtomicU32,
}

impl RTCRtpSender {
    pub(crate) fn new(payload_type: u8, rtx_payload_type: u8) -> Arc<Self> {
        Arc::new(RTCRtpSender {
            ssrc: rand::random::<u32>(),
            rtx_ssrc: rand::random::<u32>(),
            payload_type,
            rtx_payload_type,
            rtx_sequencer: Box::new(new_random_sequencer()),
            rtx_cache: Mutex::new(VecDeque::with_capacity(RTX_CACHE_SIZE)),
            transport: Mutex::new(None),
            packets_sent: AtomicU64::new(0),
            octets_sent: AtomicU64::new(0),
            last_timestamp: AtomicU32::new(0),
        })
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn rtx_ssrc(&self) -> u32 {
        self.rtx_ssrc
    }

    pub(crate) fn set_transport(&self, transport: Arc<RTCDtlsTransport>) {
        let mut guard = self.transport.lock().unwrap();
        *guard = Some(transport);
    }

    fn transport(&self) -> Option<Arc<RTCDtlsTransport>> {
        self.transport.lock().unwrap().clone()
    }

    /// write_rtp sends one RTP packet on the primary SSRC, caching the
    /// payload for retransmission.
    pub async fn write_rtp(&self, packet: &rtp::packet::Packet) -> Result<usize> {
        let raw = packet.marshal().map_err(crate::error::Error::Util)?;

        {
            let mut cache = self.rtx_cache.lock().unwrap();
            if cache.len() >= RTX_CACHE_SIZE {
                cache.pop_front();
            }
            cache.push_back((packet.header.sequence_number, raw.clone()));
        }

        self.packets_sent.fetch_add(1, Ordering::SeqCst);
        self.octets_sent
            .fetch_add(packet.payload.len() as u64, Ordering::SeqCst);
        self.last_timestamp
            .store(packet.header.timestamp, Ordering::SeqCst);

        let Some(transport) = self.transport() else {
            return Err(crate::error::Error::ErrDtlsTransportNotStarted);
        };
        transport.write_rtp_raw(&raw).await?;
        Ok(raw.len())
    }

    /// process_nack answers a Generic NACK: each cached packet named in
    /// the pair list is re-sent as an RTX packet (original sequence
    /// number prefixed, RTX SSRC and payload type).
    pub(crate) async fn process_nack(&self, nack: &TransportLayerNack) -> Result<()> {
        let Some(transport) = self.transport() else {
            return Ok(());
        };

        let mut lost: Vec<u16> = vec![];
        for pair in &nack.nacks {
            lost.extend(pair.packet_list());
        }

        for seq in lost {
            let cached = {
                let cache = self.rtx_cache.lock().unwrap();
                cache.iter().find(|(s, _)| *s == seq).map(|(_, raw)| raw.clone())
            };
            let Some(raw) = cached else {
                log::trace!("NACK for {seq} missed the retransmit cache");
                continue;
            };

            // re-parse the cached packet and wrap it as RTX
            let mut buf = &raw[..];
            let Ok(original) =
                <rtp::packet::Packet as util::marshal::Unmarshal>::unmarshal(&mut buf)
            else {
                continue;
            };

            let mut payload = BytesMut::with_capacity(2 + original.payload.len());
            payload.extend_from_slice(&seq.to_be_bytes());
            payload.extend_from_slice(&original.payload);

            let rtx = rtp::packet::Packet {
                header: rtp::header::Header {
                    version: 2,
                    payload_type: self.rtx_payload_type,
                    sequence_number: self.rtx_sequencer.next_sequence_number(),
                    timestamp: original.header.timestamp,
                    ssrc: self.rtx_ssrc,
                    marker: original.header.marker,
                    ..Default::default()
                },
                payload: payload.freeze(),
            };
            let raw = rtx.marshal().map_err(crate::error::Error::Util)?;
            transport.write_rtp_raw(&raw).await?;
            log::debug!("retransmitted seq {seq} as RTX on {:x}", self.rtx_ssrc);
        }

        Ok(())
    }

    /// Builds the sender report counters.
    pub(crate) fn sender_report(&self) -> rtcp::sender_report::SenderReport {
        rtcp::sender_report::SenderReport {
            ssrc: self.ssrc,
            ntp_time: unix_ntp_now(),
            rtp_time: self.last_timestamp.load(Ordering::SeqCst),
            packet_count: self.packets_sent.load(Ordering::SeqCst) as u32,
            octet_count: self.octets_sent.load(Ordering::SeqCst) as u32,
            reports: vec![],
            profile_extensions: Bytes::new(),
        }
    }
}

/// The 64-bit NTP timestamp for SR blocks.
fn unix_ntp_now() -> u64 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    // seconds offset between 1900 (NTP) and 1970 (Unix)
    let secs = now.as_secs() + 2_208_988_800;
    let frac = (now.subsec_nanos() as u64) * (u32::MAX as u64) / 1_000_000_000;
    (secs << 32) | frac
}
