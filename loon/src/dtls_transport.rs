#[cfg(test)]
mod dtls_transport_test;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as SyncMutex};

use async_trait::async_trait;
use bytes::Bytes;
use rtcp::packet::Packet as RtcpPacket;
use srtp::config::extract_session_keys;
use srtp::context::Context as SrtpContext;
use srtp::protection_profile::ProtectionProfile;
use tokio::sync::Mutex;
use util::marshal::{Marshal, Unmarshal};
use util::Conn;

use crate::error::{Error, Result};
use crate::mux::endpoint::Endpoint;
use crate::mux::mux_func::{match_dtls, match_srtcp, match_srtp};
use crate::mux::{Config as MuxConfig, Mux};
use crate::peer_connection::certificate::{fingerprint_of, RTCCertificate};
use crate::peer_connection::peer_connection_state::RTCDtlsTransportState;
use crate::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use crate::rtp_transceiver::rtp_sender::RTCRtpSender;

pub type OnDtlsStateChangeHdlrFn = Box<dyn FnMut(RTCDtlsTransportState) + Send + Sync>;

/// How often receiver-side feedback (NACK, reports) is evaluated.
const FEEDBACK_INTERVAL: std::time::Duration = std::time::Duration::from_millis(100);
const REPORT_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

/// RTCDtlsTransport is the integrated transport of one 5-tuple: it owns
/// the demultiplexer over the ICE connection, the DTLS endpoint, both
/// SRTP sessions, and the SSRC routing tables. Everything above it only
/// ever sees plaintext.
pub struct RTCDtlsTransport {
    pub(crate) ice_agent: Arc<ice::agent::Agent>,
    certificate: RTCCertificate,
    dtls_handshake_timeout: std::time::Duration,
    dtls_flight_timeout: std::time::Duration,

    state: SyncMutex<RTCDtlsTransportState>,
    on_state_change: SyncMutex<Option<OnDtlsStateChangeHdlrFn>>,

    mux: Mutex<Option<Arc<Mux>>>,
    dtls_conn: Mutex<Option<Arc<dtls::conn::DTLSConn>>>,
    rtp_endpoint: Mutex<Option<Arc<Endpoint>>>,
    rtcp_endpoint: Mutex<Option<Arc<Endpoint>>>,

    srtp_tx: Mutex<Option<SrtpContext>>,
    srtp_rx: Mutex<Option<SrtpContext>>,

    // routing tables
    receivers: SyncMutex<HashMap<u32, Arc<RTCRtpReceiver>>>,
    rid_receivers: SyncMutex<Vec<Arc<RTCRtpReceiver>>>,
    senders: SyncMutex<Vec<Arc<RTCRtpSender>>>,
    /// rtx payload type -> associated (primary) payload type.
    rtx_apt: SyncMutex<HashMap<u8, u8>>,
    /// rtx SSRC -> primary SSRC, from `ssrc-group:FID`.
    fid: SyncMutex<HashMap<u32, u32>>,
    mid_ext_id: SyncMutex<Option<u8>>,
    rid_ext_id: SyncMutex<Option<u8>>,
    twcc_ext_id: SyncMutex<Option<u8>>,
    twcc: SyncMutex<TwccRecorder>,

    loop_handles: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

/// Arrival log for transport-wide congestion-control feedback.
#[derive(Default)]
struct TwccRecorder {
    /// (transport-wide sequence, arrival).
    records: Vec<(u16, tokio::time::Instant)>,
    media_ssrc: u32,
    fb_pkt_count: u8,
    start: Option<tokio::time::Instant>,
}

impl RTCDtlsTransport {
    pub(crate) fn new(
        ice_agent: Arc<ice::agent::Agent>,
        certificate: RTCCertificate,
        dtls_handshake_timeout: std::time::Duration,
        dtls_flight_timeout: std::time::Duration,
    ) -> Arc<Self> {
        Arc::new(RTCDtlsTransport {
            ice_agent,
            certificate,
            dtls_handshake_timeout,
            dtls_flight_timeout,
            state: SyncMutex::new(RTCDtlsTransportState::New),
            on_state_change: SyncMutex::new(None),
            mux: Mutex::new(None),
            dtls_conn: Mutex::new(None),
            rtp_endpoint: Mutex::new(None),
            rtcp_endpoint: Mutex::new(None),
            srtp_tx: Mutex::new(None),
            srtp_rx: Mutex::new(None),
            receivers: SyncMutex::new(HashMap::new()),
            rid_receivers: SyncMutex::new(vec![]),
            senders: SyncMutex::new(vec![]),
            rtx_apt: SyncMutex::new(HashMap::new()),
            fid: SyncMutex::new(HashMap::new()),
            mid_ext_id: SyncMutex::new(None),
            rid_ext_id: SyncMutex::new(None),
            twcc_ext_id: SyncMutex::new(None),
            twcc: SyncMutex::new(TwccRecorder::default()),
            loop_handles: Mutex::new(vec![]),
        })
    }

    pub fn state(&self) -> RTCDtlsTransportState {
        *self.state.lock().unwrap()
    }

    pub fn on_state_change(&self, f: OnDtlsStateChangeHdlrFn) {
        let mut guard = self.on_state_change.lock().unwrap();
        *guard = Some(f);
    }

    fn set_state(&self, state: RTCDtlsTransportState) {
        {
            let mut guard = self.state.lock().unwrap();
            if *guard == state {
                return;
            }
            *guard = state;
        }
        let mut handler = self.on_state_change.lock().unwrap();
        if let Some(f) = &mut *handler {
            f(state);
        }
    }

    /// start brings the transport up over the ICE connection: mux the
    /// 5-tuple, run the DTLS handshake in the signalled role, verify the
    /// peer against the expected fingerprint, then key SRTP.
    pub(crate) async fn start(
        self: &Arc<Self>,
        is_client: bool,
        expected_fingerprint: Option<String>,
    ) -> Result<()> {
        self.set_state(RTCDtlsTransportState::Connecting);

        let ice_conn = self.ice_agent.get_conn();
        let mux = Mux::new(MuxConfig {
            conn: ice_conn,
            buffer_size: crate::RECEIVE_MTU,
        });

        let dtls_endpoint = mux.new_endpoint(Box::new(match_dtls)).await;
        let rtp_endpoint = mux.new_endpoint(Box::new(match_srtp)).await;
        let rtcp_endpoint = mux.new_endpoint(Box::new(match_srtcp)).await;
        {
            let mut guard = self.mux.lock().await;
            *guard = Some(mux);
        }
        {
            let mut guard = self.rtp_endpoint.lock().await;
            *guard = Some(rtp_endpoint);
        }
        {
            let mut guard = self.rtcp_endpoint.lock().await;
            *guard = Some(rtcp_endpoint);
        }

        let dtls_config = dtls::config::Config {
            certificates: vec![self.certificate.certificate.clone()],
            flight_interval: self.dtls_flight_timeout,
            handshake_timeout: self.dtls_handshake_timeout,
            ..Default::default()
        };

        let conn_result = if is_client {
            dtls::conn::DTLSConn::client(dtls_endpoint, dtls_config).await
        } else {
            dtls::conn::DTLSConn::server(dtls_endpoint, dtls_config).await
        };
        let dtls_conn = match conn_result {
            Ok(c) => Arc::new(c),
            Err(err) => {
                self.set_state(RTCDtlsTransportState::Failed);
                return Err(Error::Dtls(err));
            }
        };

        // fingerprint validation replaces CA chains in WebRTC
        if let Some(expected) = expected_fingerprint {
            let certs = dtls_conn.peer_certificates().await;
            let Some(leaf) = certs.first() else {
                self.set_state(RTCDtlsTransportState::Failed);
                return Err(Error::ErrSessionDescriptionNoFingerprint);
            };
            let actual = fingerprint_of(leaf);
            if !actual.eq_ignore_ascii_case(&expected) {
                self.set_state(RTCDtlsTransportState::Failed);
                return Err(Error::ErrFingerprintMismatch);
            }
        }

        {
            let mut guard = self.dtls_conn.lock().await;
            *guard = Some(Arc::clone(&dtls_conn));
        }
        self.set_state(RTCDtlsTransportState::Connected);

        self.start_srtp(is_client).await?;
        self.spawn_rtp_loops().await;
        Ok(())
    }

    /// start_srtp consumes the exported keying material and creates the
    /// send and receive sessions.
    async fn start_srtp(&self, is_client: bool) -> Result<()> {
        let dtls_conn = {
            let guard = self.dtls_conn.lock().await;
            guard.clone().ok_or(Error::ErrDtlsTransportNotStarted)?
        };

        let profile = match dtls_conn.selected_srtp_protection_profile().await {
            dtls::extension::extension_use_srtp::SrtpProtectionProfile::Srtp_Aead_Aes_128_Gcm => {
                ProtectionProfile::AeadAes128Gcm
            }
            dtls::extension::extension_use_srtp::SrtpProtectionProfile::Srtp_Aes128_Cm_Hmac_Sha1_80 => {
                ProtectionProfile::Aes128CmHmacSha1_80
            }
            _ => return Err(Error::Other("no SRTP profile negotiated".to_owned())),
        };

        let material = dtls_conn
            .export_keying_material("EXTRACTOR-dtls_srtp", 2 * profile.key_material_len())
            .await?;
        let keys = extract_session_keys(&material, profile, is_client)
            .ok_or_else(|| Error::Other("exported keying material too short".to_owned()))?;

        let tx = SrtpContext::new(
            &keys.local_master_key,
            &keys.local_master_salt,
            profile,
            None,
            None,
        )?;
        let rx = SrtpContext::new(
            &keys.remote_master_key,
            &keys.remote_master_salt,
            profile,
            None,
            None,
        )?;

        {
            let mut guard = self.srtp_tx.lock().await;
            *guard = Some(tx);
        }
        {
            let mut guard = self.srtp_rx.lock().await;
            *guard = Some(rx);
        }
        log::debug!("SRTP sessions keyed with {profile:?}");
        Ok(())
    }

    // === registration ===

    pub(crate) fn register_sender(&self, sender: Arc<RTCRtpSender>) {
        self.senders.lock().unwrap().push(sender);
    }

    pub(crate) fn register_receiver(&self, ssrc: u32, receiver: Arc<RTCRtpReceiver>) {
        receiver.set_ssrc(ssrc);
        self.receivers.lock().unwrap().insert(ssrc, receiver);
    }

    pub(crate) fn register_rid_receiver(&self, receiver: Arc<RTCRtpReceiver>) {
        self.rid_receivers.lock().unwrap().push(receiver);
    }

    pub(crate) fn add_fid_pair(&self, primary_ssrc: u32, rtx_ssrc: u32) {
        self.fid.lock().unwrap().insert(rtx_ssrc, primary_ssrc);
    }

    pub(crate) fn add_rtx_payload_type(&self, rtx_pt: u8, primary_pt: u8) {
        self.rtx_apt.lock().unwrap().insert(rtx_pt, primary_pt);
    }

    pub(crate) fn set_extension_ids(&self, mid: Option<u8>, rid: Option<u8>) {
        *self.mid_ext_id.lock().unwrap() = mid;
        *self.rid_ext_id.lock().unwrap() = rid;
    }

    pub(crate) fn set_twcc_extension_id(&self, id: Option<u8>) {
        *self.twcc_ext_id.lock().unwrap() = id;
    }

    // === plaintext egress ===

    pub(crate) async fn write_rtp_raw(&self, plaintext: &[u8]) -> Result<()> {
        let encrypted = {
            let mut guard = self.srtp_tx.lock().await;
            let ctx = guard.as_mut().ok_or(Error::ErrDtlsTransportNotStarted)?;
            ctx.encrypt_rtp(plaintext)?
        };
        let endpoint = {
            let guard = self.rtp_endpoint.lock().await;
            guard.clone().ok_or(Error::ErrDtlsTransportNotStarted)?
        };
        endpoint.send(&encrypted).await?;
        Ok(())
    }

    pub(crate) async fn write_rtcp(
        &self,
        packets: &[Box<dyn rtcp::packet::Packet + Send + Sync>],
    ) -> Result<()> {
        let plaintext = rtcp::packet::marshal(packets).map_err(Error::Rtcp)?;
        let encrypted = {
            let mut guard = self.srtp_tx.lock().await;
            let ctx = guard.as_mut().ok_or(Error::ErrDtlsTransportNotStarted)?;
            ctx.encrypt_rtcp(&plaintext)?
        };
        let endpoint = {
            let guard = self.rtcp_endpoint.lock().await;
            guard.clone().ok_or(Error::ErrDtlsTransportNotStarted)?
        };
        endpoint.send(&encrypted).await?;
        Ok(())
    }

    /// The decrypted application-data stream for SCTP.
    pub(crate) async fn data_conn(&self) -> Result<Arc<dyn Conn + Send + Sync>> {
        let guard = self.dtls_conn.lock().await;
        let conn = guard.clone().ok_or(Error::ErrDtlsTransportNotStarted)?;
        Ok(Arc::new(DtlsConnAdapter { conn }))
    }

    // === ingress routing ===

    async fn spawn_rtp_loops(self: &Arc<Self>) {
        let rtp_endpoint = {
            let guard = self.rtp_endpoint.lock().await;
            guard.clone()
        };
        let rtcp_endpoint = {
            let guard = self.rtcp_endpoint.lock().await;
            guard.clone()
        };
        let mut handles = self.loop_handles.lock().await;

        if let Some(endpoint) = rtp_endpoint {
            let transport = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                let mut buf = vec![0u8; crate::RECEIVE_MTU];
                loop {
                    let n = match endpoint.recv(&mut buf).await {
                        Ok(n) => n,
                        Err(_) => break,
                    };
                    let decrypted = {
                        let mut guard = transport.srtp_rx.lock().await;
                        let Some(ctx) = guard.as_mut() else { continue };
                        match ctx.decrypt_rtp(&buf[..n]) {
                            Ok(d) => d,
                            Err(err) => {
                                // per-packet failures are dropped, never fatal
                                log::debug!("SRTP decrypt dropped a packet: {err}");
                                continue;
                            }
                        }
                    };
                    transport.route_rtp(&decrypted);
                }
            }));
        }

        if let Some(endpoint) = rtcp_endpoint {
            let transport = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                let mut buf = vec![0u8; crate::RECEIVE_MTU];
                loop {
                    let n = match endpoint.recv(&mut buf).await {
                        Ok(n) => n,
                        Err(_) => break,
                    };
                    let decrypted = {
                        let mut guard = transport.srtp_rx.lock().await;
                        let Some(ctx) = guard.as_mut() else { continue };
                        match ctx.decrypt_rtcp(&buf[..n]) {
                            Ok(d) => d,
                            Err(err) => {
                                log::debug!("SRTCP decrypt dropped a packet: {err}");
                                continue;
                            }
                        }
                    };
                    transport.route_rtcp(&decrypted).await;
                }
            }));
        }

        // receiver-side feedback: NACKs at a short cadence, reports at
        // the session interval
        let transport = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            let mut last_report = tokio::time::Instant::now();
            loop {
                tokio::time::sleep(FEEDBACK_INTERVAL).await;
                if transport.state() != RTCDtlsTransportState::Connected {
                    break;
                }
                transport.send_nacks().await;
                transport.send_twcc_feedback().await;
                if last_report.elapsed() >= REPORT_INTERVAL {
                    last_report = tokio::time::Instant::now();
                    transport.send_reports().await;
                }
            }
        }));
    }

    fn route_rtp(self: &Arc<Self>, decrypted: &[u8]) {
        let mut buf = decrypted;
        let Ok(packet) = rtp::packet::Packet::unmarshal(&mut buf) else {
            return;
        };
        let ssrc = packet.header.ssrc;

        // log arrivals carrying a transport-wide sequence number
        let twcc_ext_id = *self.twcc_ext_id.lock().unwrap();
        if let Some(ext_id) = twcc_ext_id {
            if let Some(raw) = packet.header.get_extension(ext_id) {
                if raw.len() >= 2 {
                    let seq = u16::from_be_bytes([raw[0], raw[1]]);
                    let mut twcc = self.twcc.lock().unwrap();
                    let now = tokio::time::Instant::now();
                    if twcc.start.is_none() {
                        twcc.start = Some(now);
                    }
                    twcc.media_ssrc = ssrc;
                    twcc.records.push((seq, now));
                }
            }
        }

        // 1. known SSRC
        let receiver = self.receivers.lock().unwrap().get(&ssrc).cloned();
        if let Some(receiver) = receiver {
            receiver.deliver(packet);
            return;
        }

        // 2. RTX repair stream: strip the OSN prefix and re-inject
        let primary = self.fid.lock().unwrap().get(&ssrc).copied();
        if let Some(primary_ssrc) = primary {
            if packet.payload.len() >= 2 {
                let osn = u16::from_be_bytes([packet.payload[0], packet.payload[1]]);
                let apt = self
                    .rtx_apt
                    .lock()
                    .unwrap()
                    .get(&packet.header.payload_type)
                    .copied()
                    .unwrap_or(packet.header.payload_type);
                let repaired = rtp::packet::Packet {
                    header: rtp::header::Header {
                        sequence_number: osn,
                        ssrc: primary_ssrc,
                        payload_type: apt,
                        ..packet.header.clone()
                    },
                    payload: packet.payload.slice(2..),
                };
                let receiver = self.receivers.lock().unwrap().get(&primary_ssrc).cloned();
                if let Some(receiver) = receiver {
                    receiver.deliver(repaired);
                }
                return;
            }
        }

        // 3. simulcast: learn the RID -> SSRC binding from the header
        // extensions of the first packet that carries both
        let rid_ext_id = *self.rid_ext_id.lock().unwrap();
        if let Some(rid_ext_id) = rid_ext_id {
            if let Some(raw_rid) = packet.header.get_extension(rid_ext_id) {
                let rid = String::from_utf8_lossy(&raw_rid).into_owned();
                let found = {
                    let rid_receivers = self.rid_receivers.lock().unwrap();
                    rid_receivers
                        .iter()
                        .find(|r| r.rid.as_deref() == Some(rid.as_str()))
                        .cloned()
                };
                if let Some(receiver) = found {
                    log::debug!("bound simulcast rid {rid} to ssrc {ssrc:x}");
                    self.register_receiver(ssrc, Arc::clone(&receiver));
                    receiver.deliver(packet);
                    return;
                }
            }
        }

        log::trace!("dropping RTP packet with unknown ssrc {ssrc:x}");
    }

    async fn route_rtcp(self: &Arc<Self>, decrypted: &[u8]) {
        let mut buf = decrypted;
        let Ok(packets) = rtcp::packet::unmarshal(&mut buf) else {
            log::debug!("failed to parse inbound RTCP compound");
            return;
        };

        for packet in packets {
            if let Some(nack) = packet
                .as_any()
                .downcast_ref::<rtcp::transport_feedbacks::transport_layer_nack::TransportLayerNack>()
            {
                let sender = {
                    let senders = self.senders.lock().unwrap();
                    senders
                        .iter()
                        .find(|s| s.ssrc == nack.media_ssrc)
                        .cloned()
                };
                if let Some(sender) = sender {
                    let _ = sender.process_nack(nack).await;
                }
            }
            // PLI/FIR/REMB/TWCC and reports are surfaced by type; unknown
            // packet types were already skipped by the parser
        }
    }

    async fn send_nacks(self: &Arc<Self>) {
        let work: Vec<(u32, Vec<u16>)> = {
            let receivers = self.receivers.lock().unwrap();
            receivers
                .iter()
                .filter_map(|(ssrc, r)| {
                    let missing = r.collect_missing();
                    if missing.is_empty() {
                        None
                    } else {
                        Some((*ssrc, missing))
                    }
                })
                .collect()
        };

        for (media_ssrc, missing) in work {
            let nack = rtcp::transport_feedbacks::transport_layer_nack::TransportLayerNack {
                sender_ssrc: 0,
                media_ssrc,
                nacks:
                    rtcp::transport_feedbacks::transport_layer_nack::nack_pairs_from_sequence_numbers(
                        &missing,
                    ),
            };
            if let Err(err) = self.write_rtcp(&[Box::new(nack)]).await {
                log::trace!("failed to send NACK: {err}");
            }
        }
    }

    /// Emits transport-wide congestion-control feedback for arrivals
    /// logged since the last tick (run-length chunks, 250 microsecond
    /// deltas, 64 ms reference-time granularity).
    async fn send_twcc_feedback(self: &Arc<Self>) {
        use rtcp::transport_feedbacks::transport_layer_cc::*;

        let feedback = {
            let mut twcc = self.twcc.lock().unwrap();
            if twcc.records.is_empty() {
                return;
            }
            let Some(start) = twcc.start else { return };
            let mut records = std::mem::take(&mut twcc.records);
            records.sort_by_key(|(seq, _)| *seq);
            records.dedup_by_key(|(seq, _)| *seq);

            let base_seq = records[0].0;
            let last_seq = records[records.len() - 1].0;
            let status_count = last_seq.wrapping_sub(base_seq).wrapping_add(1);

            // reference time in 64ms units since the first arrival
            let first_arrival = records[0].1;
            let reference_time =
                (first_arrival.duration_since(start).as_millis() / 64) as u32 & 0x00FF_FFFF;
            let reference_instant =
                start + std::time::Duration::from_millis(reference_time as u64 * 64);

            let mut packet_chunks = vec![];
            let mut recv_deltas = vec![];
            let mut prev_arrival = reference_instant;
            let mut seq = base_seq;
            let mut idx = 0;
            let mut symbols: Vec<SymbolTypeTcc> = vec![];
            loop {
                let symbol = if idx < records.len() && records[idx].0 == seq {
                    let arrival = records[idx].1;
                    let delta_us = arrival
                        .saturating_duration_since(prev_arrival)
                        .as_micros() as i64;
                    prev_arrival = arrival;
                    idx += 1;
                    let ticks = delta_us / TYPE_TCC_DELTA_SCALE_FACTOR;
                    if (0..=255).contains(&ticks) {
                        recv_deltas.push(RecvDelta {
                            type_tcc_packet: SymbolTypeTcc::PacketReceivedSmallDelta,
                            delta: ticks * TYPE_TCC_DELTA_SCALE_FACTOR,
                        });
                        SymbolTypeTcc::PacketReceivedSmallDelta
                    } else {
                        recv_deltas.push(RecvDelta {
                            type_tcc_packet: SymbolTypeTcc::PacketReceivedLargeDelta,
                            delta: (ticks.clamp(i16::MIN as i64, i16::MAX as i64))
                                * TYPE_TCC_DELTA_SCALE_FACTOR,
                        });
                        SymbolTypeTcc::PacketReceivedLargeDelta
                    }
                } else {
                    SymbolTypeTcc::PacketNotReceived
                };
                symbols.push(symbol);
                if seq == last_seq {
                    break;
                }
                seq = seq.wrapping_add(1);
            }

            // run-length encode the status symbols
            let mut run_start = 0;
            while run_start < symbols.len() {
                let symbol = symbols[run_start];
                let mut run_len = 1;
                while run_start + run_len < symbols.len()
                    && symbols[run_start + run_len] == symbol
                {
                    run_len += 1;
                }
                packet_chunks.push(PacketStatusChunk::RunLengthChunk(RunLengthChunk {
                    type_tcc: StatusChunkTypeTcc::RunLengthChunk,
                    packet_status_symbol: symbol,
                    run_length: run_len as u16,
                }));
                run_start += run_len;
            }

            let fb = TransportLayerCc {
                sender_ssrc: 0,
                media_ssrc: twcc.media_ssrc,
                base_sequence_number: base_seq,
                packet_status_count: status_count,
                reference_time,
                fb_pkt_count: twcc.fb_pkt_count,
                packet_chunks,
                recv_deltas,
            };
            twcc.fb_pkt_count = twcc.fb_pkt_count.wrapping_add(1);
            fb
        };

        if let Err(err) = self.write_rtcp(&[Box::new(feedback)]).await {
            log::trace!("failed to send TWCC feedback: {err}");
        }
    }

    async fn send_reports(self: &Arc<Self>) {
        // RR for everything we receive, SR for everything we send, each
        // bundled with an SDES CNAME
        let reports: Vec<rtcp::reception_report::ReceptionReport> = {
            let receivers = self.receivers.lock().unwrap();
            receivers
                .values()
                .filter_map(|r| r.reception_report())
                .collect()
        };
        let srs: Vec<rtcp::sender_report::SenderReport> = {
            let senders = self.senders.lock().unwrap();
            senders.iter().map(|s| s.sender_report()).collect()
        };

        if !reports.is_empty() {
            let rr = rtcp::receiver_report::ReceiverReport {
                ssrc: 0,
                reports,
                profile_extensions: Bytes::new(),
            };
            let sdes = rtcp::source_description::SourceDescription::with_cname(0, "loon");
            let _ = self
                .write_rtcp(&[Box::new(rr), Box::new(sdes)])
                .await;
        }
        for sr in srs {
            let cname =
                rtcp::source_description::SourceDescription::with_cname(sr.ssrc, "loon");
            let _ = self.write_rtcp(&[Box::new(sr), Box::new(cname)]).await;
        }
    }

    pub(crate) async fn stop(&self) -> Result<()> {
        {
            let mut handles = self.loop_handles.lock().await;
            for handle in handles.drain(..) {
                handle.abort();
            }
        }
        if let Some(conn) = self.dtls_conn.lock().await.take() {
            let _ = conn.close().await;
        }
        if let Some(mux) = self.mux.lock().await.take() {
            let _ = mux.close().await;
        }
        self.set_state(RTCDtlsTransportState::Closed);
        Ok(())
    }
}

/// Adapts the DTLS connection into the packet Conn the SCTP association
/// consumes: each SCTP packet is exactly one DTLS application-data
/// record.
pub(crate) struct DtlsConnAdapter {
    conn: Arc<dtls::conn::DTLSConn>,
}

#[async_trait]
impl Conn for DtlsConnAdapter {
    async fn connect(&self, _addr: SocketAddr) -> util::error::Result<()> {
        Ok(())
    }

    async fn recv(&self, buf: &mut [u8]) -> util::error::Result<usize> {
        self.conn
            .read(buf)
            .await
            .map_err(|e| util::Error::Other(e.to_string()))
    }

    async fn recv_from(&self, buf: &mut [u8]) -> util::error::Result<(usize, SocketAddr)> {
        let n = self.recv(buf).await?;
        Ok((n, SocketAddr::from(([0, 0, 0, 0], 0))))
    }

    async fn send(&self, buf: &[u8]) -> util::error::Result<usize> {
        self.conn
            .write(buf)
            .await
            .map_err(|e| util::Error::Other(e.to_string()))
    }

    async fn send_to(&self, buf: &[u8], _target: SocketAddr) -> util::error::Result<usize> {
        self.send(buf).await
    }

    fn local_addr(&self) -> util::error::Result<SocketAddr> {
        Err(util::Error::Other("not supported".to_owned()))
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        None
    }

    async fn close(&self) -> util::error::Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| util::Error::Other(e.to_string()))
    }
}
