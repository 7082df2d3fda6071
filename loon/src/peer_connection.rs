#[cfg(test)]
mod peer_connection_test;

pub mod certificate;
pub mod peer_connection_state;
pub mod signaling_state;

use std::sync::{Arc, Mutex as SyncMutex};

use rand::Rng;
use tokio::sync::{mpsc, Mutex};

use crate::configuration::{RTCBundlePolicy, RTCConfiguration, RTCIceTransportPolicy};
use crate::data_channel::{RTCDataChannel, RTCDataChannelInit};
use crate::dtls_transport::RTCDtlsTransport;
use crate::error::{Error, Result};
use crate::media_config::{MediaConfig, EXT_ID_MID, EXT_ID_RID, EXT_ID_TWCC};
use crate::rtp_transceiver::rtp_codec::RTPCodecType;
use crate::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use crate::rtp_transceiver::rtp_sender::RTCRtpSender;
use crate::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverDirection};
use crate::sctp_transport::RTCSctpTransport;
use crate::sdp::sdp_type::RTCSdpType;
use crate::sdp::session_description::RTCSessionDescription;
use crate::sdp::{MediaSection, ParsedSdp};
use certificate::RTCCertificate;
use peer_connection_state::*;
use signaling_state::*;

pub type OnIceCandidateHdlrFn = Box<dyn FnMut(Option<RTCIceCandidateInit>) + Send + Sync>;
pub type OnDataChannelHdlrFn = Box<dyn FnMut(Arc<RTCDataChannel>) + Send + Sync>;
pub type OnNegotiationNeededHdlrFn = Box<dyn FnMut() + Send + Sync>;
pub type OnPeerConnectionStateChangeHdlrFn =
    Box<dyn FnMut(RTCPeerConnectionState) + Send + Sync>;
pub type OnIceConnectionStateChangeHdlrFn =
    Box<dyn FnMut(RTCIceConnectionState) + Send + Sync>;

/// RTCIceCandidateInit is the W3C candidate-exchange dictionary.
#[derive(Default, Debug, Clone)]
pub struct RTCIceCandidateInit {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_mline_index: Option<u16>,
    pub username_fragment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaOrderEntry {
    Transceiver(usize),
    Data,
}

struct PCInner {
    is_closed: bool,

    current_local_description: Option<RTCSessionDescription>,
    pending_local_description: Option<RTCSessionDescription>,
    current_remote_description: Option<RTCSessionDescription>,
    pending_remote_description: Option<RTCSessionDescription>,

    transceivers: Vec<Arc<RTCRtpTransceiver>>,
    /// m-line order is preserved across renegotiations.
    media_order: Vec<MediaOrderEntry>,

    data_channels: Vec<Arc<RTCDataChannel>>,
    pending_channels: Vec<Arc<RTCDataChannel>>,
    have_data_media: bool,
    /// The application m-line caches its mid for reuse across offers.
    data_mid: Option<String>,

    /// Single monotonic MID counter shared by transceivers and the data
    /// section.
    greater_mid: u32,

    ice_restart_requested: bool,
    negotiation_needed: bool,

    transports: Vec<Arc<RTCDtlsTransport>>,
    /// Candidates trickled in before any transport existed.
    pending_remote_candidates: Vec<Arc<ice::candidate::Candidate>>,
    sctp: Option<Arc<RTCSctpTransport>>,
    transports_started: bool,
    gathering_started: bool,
    is_offerer: bool,
    session_id: u64,
    session_version: u64,
}

/// RTCPeerConnection is the root entity: it owns the signalling state
/// machine, the transceivers, the data channels and the integrated
/// transports underneath them.
pub struct RTCPeerConnection {
    configuration: RTCConfiguration,
    media_config: MediaConfig,
    certificate: RTCCertificate,

    /// ICE credentials shared by every transport of this connection.
    ice_credentials: SyncMutex<(String, String)>,

    signaling_state: SyncMutex<RTCSignalingState>,
    ice_connection_state: SyncMutex<RTCIceConnectionState>,
    connection_state: SyncMutex<RTCPeerConnectionState>,

    inner: Mutex<PCInner>,

    on_ice_candidate: Arc<SyncMutex<Option<OnIceCandidateHdlrFn>>>,
    on_data_channel: Arc<SyncMutex<Option<OnDataChannelHdlrFn>>>,
    on_negotiation_needed: Arc<SyncMutex<Option<OnNegotiationNeededHdlrFn>>>,
    on_connection_state_change: Arc<SyncMutex<Option<OnPeerConnectionStateChangeHdlrFn>>>,
    on_ice_connection_state_change: Arc<SyncMutex<Option<OnIceConnectionStateChangeHdlrFn>>>,

    data_channel_rx: Mutex<Option<mpsc::UnboundedReceiver<Arc<RTCDataChannel>>>>,
    data_channel_tx: mpsc::UnboundedSender<Arc<RTCDataChannel>>,
}

impl RTCPeerConnection {
    /// new builds a peer connection from the configuration, generating a
    /// certificate when none was provided.
    pub async fn new(configuration: RTCConfiguration) -> Result<Arc<Self>> {
        Self::new_with_media(configuration, MediaConfig::default()).await
    }

    pub async fn new_with_media(
        configuration: RTCConfiguration,
        media_config: MediaConfig,
    ) -> Result<Arc<Self>> {
        let certificate = match configuration.certificates.first() {
            Some(c) => c.clone(),
            None => RTCCertificate::generate()?,
        };

        let (data_channel_tx, data_channel_rx) = mpsc::unbounded_channel();

        let pc = Arc::new(RTCPeerConnection {
            configuration,
            media_config,
            certificate,
            ice_credentials: SyncMutex::new((
                ice::rand::generate_ufrag(),
                ice::rand::generate_pwd(),
            )),
            signaling_state: SyncMutex::new(RTCSignalingState::Stable),
            ice_connection_state: SyncMutex::new(RTCIceConnectionState::New),
            connection_state: SyncMutex::new(RTCPeerConnectionState::New),
            inner: Mutex::new(PCInner {
                is_closed: false,
                current_local_description: None,
                pending_local_description: None,
                current_remote_description: None,
                pending_remote_description: None,
                transceivers: vec![],
                media_order: vec![],
                data_channels: vec![],
                pending_channels: vec![],
                have_data_media: false,
                data_mid: None,
                greater_mid: 0,
                ice_restart_requested: false,
                negotiation_needed: false,
                transports: vec![],
                pending_remote_candidates: vec![],
                sctp: None,
                transports_started: false,
                gathering_started: false,
                is_offerer: false,
                session_id: rand::thread_rng().gen::<u32>() as u64,
                session_version: 2,
            }),
            on_ice_candidate: Arc::new(SyncMutex::new(None)),
            on_data_channel: Arc::new(SyncMutex::new(None)),
            on_negotiation_needed: Arc::new(SyncMutex::new(None)),
            on_connection_state_change: Arc::new(SyncMutex::new(None)),
            on_ice_connection_state_change: Arc::new(SyncMutex::new(None)),
            data_channel_rx: Mutex::new(Some(data_channel_rx)),
            data_channel_tx,
        });

        pc.spawn_data_channel_pump().await;
        Ok(pc)
    }

    async fn spawn_data_channel_pump(self: &Arc<Self>) {
        let Some(mut rx) = self.data_channel_rx.lock().await.take() else {
            return;
        };
        let pc = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(channel) = rx.recv().await {
                {
                    let mut inner = pc.inner.lock().await;
                    inner.data_channels.push(Arc::clone(&channel));
                }
                let mut handler = pc.on_data_channel.lock().unwrap();
                if let Some(f) = &mut *handler {
                    f(channel);
                }
            }
        });
    }

    // === handlers ===

    pub fn on_ice_candidate(&self, f: OnIceCandidateHdlrFn) {
        *self.on_ice_candidate.lock().unwrap() = Some(f);
    }

    pub fn on_data_channel(&self, f: OnDataChannelHdlrFn) {
        *self.on_data_channel.lock().unwrap() = Some(f);
    }

    pub fn on_negotiation_needed(&self, f: OnNegotiationNeededHdlrFn) {
        *self.on_negotiation_needed.lock().unwrap() = Some(f);
    }

    pub fn on_connection_state_change(&self, f: OnPeerConnectionStateChangeHdlrFn) {
        *self.on_connection_state_change.lock().unwrap() = Some(f);
    }

    pub fn on_ice_connection_state_change(&self, f: OnIceConnectionStateChangeHdlrFn) {
        *self.on_ice_connection_state_change.lock().unwrap() = Some(f);
    }

    /// negotiation-needed events coalesce: only the edge from "satisfied"
    /// to "needs negotiation" fires.
    async fn trigger_negotiation_needed(&self) {
        {
            let mut inner = self.inner.lock().await;
            if inner.negotiation_needed || inner.is_closed {
                return;
            }
            inner.negotiation_needed = true;
        }
        let mut handler = self.on_negotiation_needed.lock().unwrap();
        if let Some(f) = &mut *handler {
            f();
        }
    }

    // === states ===

    pub fn signaling_state(&self) -> RTCSignalingState {
        *self.signaling_state.lock().unwrap()
    }

    pub fn ice_connection_state(&self) -> RTCIceConnectionState {
        *self.ice_connection_state.lock().unwrap()
    }

    pub fn connection_state(&self) -> RTCPeerConnectionState {
        *self.connection_state.lock().unwrap()
    }

    fn update_ice_connection_state(&self, state: RTCIceConnectionState) {
        {
            let mut guard = self.ice_connection_state.lock().unwrap();
            if *guard == state {
                return;
            }
            *guard = state;
        }
        {
            let mut handler = self.on_ice_connection_state_change.lock().unwrap();
            if let Some(f) = &mut *handler {
                f(state);
            }
        }
        self.update_connection_state(state, None);
    }

    fn update_connection_state(
        &self,
        ice: RTCIceConnectionState,
        dtls: Option<RTCDtlsTransportState>,
    ) {
        let dtls = dtls.unwrap_or(RTCDtlsTransportState::New);
        let next = derive_connection_state(false, ice, dtls);
        let changed = {
            let mut guard = self.connection_state.lock().unwrap();
            // DTLS "new" while ICE is connected means the handshake is
            // still running: report connecting, not a regression
            let next = if *guard == RTCPeerConnectionState::Connected
                && next == RTCPeerConnectionState::New
            {
                return;
            } else {
                next
            };
            if *guard == next {
                false
            } else {
                *guard = next;
                true
            }
        };
        if changed {
            let state = *self.connection_state.lock().unwrap();
            let mut handler = self.on_connection_state_change.lock().unwrap();
            if let Some(f) = &mut *handler {
                f(state);
            }
        }
    }

    // === transceivers and channels ===

    /// add_transceiver_from_kind creates a transceiver with a fresh
    /// sender/receiver pair.
    pub async fn add_transceiver_from_kind(
        self: &Arc<Self>,
        kind: RTPCodecType,
        direction: RTCRtpTransceiverDirection,
    ) -> Result<Arc<RTCRtpTransceiver>> {
        let codecs = self.media_config.codecs_for(kind);
        let primary = codecs
            .iter()
            .find(|c| !c.is_rtx())
            .cloned()
            .unwrap_or_default();
        let rtx = codecs.iter().find(|c| c.is_rtx()).cloned();

        let sender = RTCRtpSender::new(
            primary.payload_type,
            rtx.as_ref().map(|c| c.payload_type).unwrap_or(0),
        );
        let receiver = RTCRtpReceiver::new(None);
        let transceiver = RTCRtpTransceiver::new(kind, direction, sender, receiver);

        {
            let mut inner = self.inner.lock().await;
            inner.transceivers.push(Arc::clone(&transceiver));
            let idx = inner.transceivers.len() - 1;
            inner.media_order.push(MediaOrderEntry::Transceiver(idx));
        }
        self.trigger_negotiation_needed().await;
        Ok(transceiver)
    }

    /// create_data_channel creates a channel; before the SCTP association
    /// exists it stays `connecting` and is dialed once transports come
    /// up.
    pub async fn create_data_channel(
        self: &Arc<Self>,
        label: &str,
        init: Option<RTCDataChannelInit>,
    ) -> Result<Arc<RTCDataChannel>> {
        let channel = RTCDataChannel::new(label.to_owned(), init.unwrap_or_default());

        let dial_now = {
            let mut inner = self.inner.lock().await;
            if inner.is_closed {
                return Err(Error::ErrConnectionClosed);
            }
            inner.data_channels.push(Arc::clone(&channel));
            if !inner.have_data_media {
                inner.have_data_media = true;
                inner.media_order.push(MediaOrderEntry::Data);
            }
            if let Some(sctp) = inner.sctp.clone() {
                Some(sctp)
            } else {
                inner.pending_channels.push(Arc::clone(&channel));
                None
            }
        };

        match dial_now {
            Some(sctp) => {
                let channel2 = Arc::clone(&channel);
                tokio::spawn(async move {
                    if let Err(err) = sctp.dial_channel(&channel2).await {
                        log::warn!("failed to open data channel: {err}");
                    }
                });
            }
            None => self.trigger_negotiation_needed().await,
        }

        Ok(channel)
    }

    /// restart_ice queues an ICE restart for the next offer.
    pub async fn restart_ice(self: &Arc<Self>) -> Result<()> {
        {
            let mut inner = self.inner.lock().await;
            inner.ice_restart_requested = true;
        }
        self.trigger_negotiation_needed().await;
        Ok(())
    }

    // === transports ===

    fn ice_agent_config(&self) -> ice::agent::agent_config::AgentConfig {
        let (ufrag, pwd) = self.ice_credentials.lock().unwrap().clone();
        let mut urls = vec![];
        for server in &self.configuration.ice_servers {
            for raw in &server.urls {
                match ice::url::Url::parse_url(raw) {
                    Ok(mut url) => {
                        url.username = server.username.clone();
                        url.password = server.credential.clone();
                        urls.push(url);
                    }
                    Err(err) => log::warn!("ignoring unparsable ICE url {raw}: {err}"),
                }
            }
        }

        ice::agent::agent_config::AgentConfig {
            urls,
            candidate_types: if self.configuration.ice_transport_policy
                == RTCIceTransportPolicy::Relay
            {
                vec![ice::candidate::CandidateType::Relay]
            } else {
                vec![
                    ice::candidate::CandidateType::Host,
                    ice::candidate::CandidateType::ServerReflexive,
                    ice::candidate::CandidateType::Relay,
                ]
            },
            local_ufrag: ufrag,
            local_pwd: pwd,
            include_loopback: self.configuration.include_loopback_candidates,
            check_interval: self.configuration.ice_pacing_interval(),
            stun_timeout: self.configuration.stun_timeout(),
            ..Default::default()
        }
    }

    /// find_or_create_transport implements the bundle policy: reuse iff
    /// maxBundle, or the remote bundled and bundling is not disabled.
    async fn find_or_create_transport(
        self: &Arc<Self>,
        remote_is_bundled: bool,
    ) -> Result<Arc<RTCDtlsTransport>> {
        let reuse = match self.configuration.bundle_policy {
            RTCBundlePolicy::MaxBundle => true,
            RTCBundlePolicy::Disable => false,
            _ => remote_is_bundled,
        };

        {
            let inner = self.inner.lock().await;
            if reuse {
                if let Some(t) = inner.transports.first() {
                    return Ok(Arc::clone(t));
                }
            }
        }

        let agent = ice::agent::Agent::new(self.ice_agent_config()).await?;

        // surface trickled candidates
        {
            let handler = Arc::clone(&self.on_ice_candidate);
            let ufrag = self.ice_credentials.lock().unwrap().0.clone();
            agent
                .on_candidate(Box::new(move |candidate| {
                    let mut guard = handler.lock().unwrap();
                    if let Some(f) = &mut *guard {
                        f(candidate.map(|c| RTCIceCandidateInit {
                            candidate: format!("candidate:{}", c.marshal()),
                            sdp_mid: Some("0".to_owned()),
                            sdp_mline_index: Some(0),
                            username_fragment: Some(ufrag.clone()),
                        }));
                    }
                }))
                .await;
        }

        // mirror agent state into the aggregate
        {
            let pc = Arc::downgrade(self);
            agent
                .on_connection_state_change(Box::new(move |state| {
                    if let Some(pc) = pc.upgrade() {
                        pc.update_ice_connection_state(RTCIceConnectionState::from(state));
                    }
                }))
                .await;
        }

        let transport = RTCDtlsTransport::new(
            Arc::clone(&agent),
            self.certificate.clone(),
            self.configuration.dtls_handshake_timeout(),
            self.configuration.dtls_flight_timeout(),
        );

        let mut inner = self.inner.lock().await;
        inner.transports.push(Arc::clone(&transport));
        Ok(transport)
    }

    // === SDP build ===

    fn media_section_for_transceiver(
        &self,
        transceiver: &Arc<RTCRtpTransceiver>,
        mid: String,
        ufrag: &str,
        pwd: &str,
        fingerprint: &str,
        setup: &str,
        direction: RTCRtpTransceiverDirection,
    ) -> MediaSection {
        let codecs = self.media_config.codecs_for(transceiver.kind());

        let mut section = MediaSection {
            kind: transceiver.kind().to_string(),
            port: 9,
            proto: "UDP/TLS/RTP/SAVPF".to_owned(),
            mid,
            direction: Some(direction),
            ice_ufrag: ufrag.to_owned(),
            ice_pwd: pwd.to_owned(),
            ice_options_trickle: true,
            fingerprint: Some(("sha-256".to_owned(), fingerprint.to_owned())),
            setup: setup.to_owned(),
            msid: Some(format!("- {}", transceiver.sender.ssrc())),
            ..Default::default()
        };

        for codec in codecs {
            section.payload_types.push(codec.payload_type);
            section
                .rtpmap
                .insert(codec.payload_type, codec.rtpmap_line());
            if !codec.sdp_fmtp_line.is_empty() {
                section
                    .fmtp
                    .insert(codec.payload_type, codec.sdp_fmtp_line.clone());
            }
            for fb in &codec.rtcp_feedback {
                section.rtcp_fb.push((codec.payload_type, fb.clone()));
            }
        }
        section.extmap = self.media_config.header_extensions.clone();

        // senders publish their SSRCs and the FID binding for RTX
        if direction == RTCRtpTransceiverDirection::Sendrecv
            || direction == RTCRtpTransceiverDirection::Sendonly
        {
            let sender = transceiver.sender();
            section.ssrc_groups.push((
                "FID".to_owned(),
                vec![sender.ssrc(), sender.rtx_ssrc()],
            ));
            section
                .ssrcs
                .push((sender.ssrc(), "cname:loon".to_owned()));
            section
                .ssrcs
                .push((sender.rtx_ssrc(), "cname:loon".to_owned()));
        }

        section
    }

    fn data_media_section(
        &self,
        mid: String,
        ufrag: &str,
        pwd: &str,
        fingerprint: &str,
        setup: &str,
    ) -> MediaSection {
        MediaSection {
            kind: "application".to_owned(),
            port: 9,
            proto: "UDP/DTLS/SCTP".to_owned(),
            mid,
            ice_ufrag: ufrag.to_owned(),
            ice_pwd: pwd.to_owned(),
            ice_options_trickle: true,
            fingerprint: Some(("sha-256".to_owned(), fingerprint.to_owned())),
            setup: setup.to_owned(),
            sctp_port: Some(5000),
            max_message_size: Some(262144),
            ..Default::default()
        }
    }

    /// create_offer synthesizes an offer from the current transceiver and
    /// data-channel state.
    pub async fn create_offer(self: &Arc<Self>) -> Result<RTCSessionDescription> {
        if self.signaling_state() == RTCSignalingState::Closed {
            return Err(Error::ErrConnectionClosed);
        }

        // an ICE restart rotates the shared credentials before the SDP
        // is produced
        let restart = {
            let mut inner = self.inner.lock().await;
            std::mem::take(&mut inner.ice_restart_requested)
        };
        if restart {
            let new_creds = (ice::rand::generate_ufrag(), ice::rand::generate_pwd());
            {
                let mut creds = self.ice_credentials.lock().unwrap();
                *creds = new_creds.clone();
            }
            let transports = {
                let inner = self.inner.lock().await;
                inner.transports.clone()
            };
            for t in transports {
                t.ice_agent
                    .restart(new_creds.0.clone(), new_creds.1.clone())
                    .await?;
                t.ice_agent.gather_candidates().await.ok();
            }
        }

        let (ufrag, pwd) = self.ice_credentials.lock().unwrap().clone();
        let fingerprint = self.certificate.get_fingerprints()[0].value.clone();

        let mut inner = self.inner.lock().await;
        inner.is_offerer = true;

        // assign mids from the shared monotonic counter
        let mut sections = vec![];
        let media_order = inner.media_order.clone();
        for entry in &media_order {
            match entry {
                MediaOrderEntry::Transceiver(idx) => {
                    let transceiver = Arc::clone(&inner.transceivers[*idx]);
                    let mid = match transceiver.mid() {
                        Some(mid) => mid,
                        None => {
                            let mid = inner.greater_mid.to_string();
                            inner.greater_mid += 1;
                            transceiver.set_mid(mid.clone())?;
                            mid
                        }
                    };
                    sections.push(self.media_section_for_transceiver(
                        &transceiver,
                        mid,
                        &ufrag,
                        &pwd,
                        &fingerprint,
                        "actpass",
                        transceiver.direction(),
                    ));
                }
                MediaOrderEntry::Data => {
                    let mid = match &inner.data_mid {
                        Some(mid) => mid.clone(),
                        None => {
                            let mid = inner.greater_mid.to_string();
                            inner.greater_mid += 1;
                            inner.data_mid = Some(mid.clone());
                            mid
                        }
                    };
                    sections.push(self.data_media_section(
                        mid,
                        &ufrag,
                        &pwd,
                        &fingerprint,
                        "actpass",
                    ));
                }
            }
        }

        inner.session_version += 1;
        let parsed = ParsedSdp {
            session_id: inner.session_id,
            session_version: inner.session_version,
            bundle_group: sections.iter().map(|s| s.mid.clone()).collect(),
            extmap_allow_mixed: true,
            media: sections,
        };

        Ok(RTCSessionDescription::from_parsed(RTCSdpType::Offer, parsed))
    }

    /// create_answer mirrors the pending remote offer.
    pub async fn create_answer(self: &Arc<Self>) -> Result<RTCSessionDescription> {
        let (ufrag, pwd) = self.ice_credentials.lock().unwrap().clone();
        let fingerprint = self.certificate.get_fingerprints()[0].value.clone();

        let mut inner = self.inner.lock().await;
        let remote = inner
            .pending_remote_description
            .as_ref()
            .or(inner.current_remote_description.as_ref())
            .ok_or(Error::ErrNoRemoteDescription)?
            .parsed()?
            .clone();

        let mut sections = vec![];
        for remote_section in &remote.media {
            if remote_section.is_application() {
                inner.data_mid = Some(remote_section.mid.clone());
                sections.push(self.data_media_section(
                    remote_section.mid.clone(),
                    &ufrag,
                    &pwd,
                    &fingerprint,
                    "active",
                ));
                continue;
            }

            let transceiver = inner
                .transceivers
                .iter()
                .find(|t| t.mid().as_deref() == Some(remote_section.mid.as_str()))
                .cloned();
            let Some(transceiver) = transceiver else {
                continue;
            };
            let remote_direction = remote_section
                .direction
                .unwrap_or(RTCRtpTransceiverDirection::Sendrecv);
            let direction =
                intersect_direction(transceiver.direction(), remote_direction.reverse());
            sections.push(self.media_section_for_transceiver(
                &transceiver,
                remote_section.mid.clone(),
                &ufrag,
                &pwd,
                &fingerprint,
                "active",
                direction,
            ));
        }

        inner.session_version += 1;
        let parsed = ParsedSdp {
            session_id: inner.session_id,
            session_version: inner.session_version,
            bundle_group: sections.iter().map(|s| s.mid.clone()).collect(),
            extmap_allow_mixed: true,
            media: sections,
        };
        Ok(RTCSessionDescription::from_parsed(
            RTCSdpType::Answer,
            parsed,
        ))
    }

    // === description application ===

    pub async fn set_local_description(
        self: &Arc<Self>,
        desc: RTCSessionDescription,
    ) -> Result<()> {
        let next = match desc.sdp_type {
            RTCSdpType::Offer => RTCSignalingState::HaveLocalOffer,
            RTCSdpType::Answer => RTCSignalingState::Stable,
            RTCSdpType::Pranswer => RTCSignalingState::HaveLocalPranswer,
            _ => return Err(Error::ErrSdpInvalid("unsupported sdp type".to_owned())),
        };
        let new_state = check_next_signaling_state(
            self.signaling_state(),
            next,
            StateChangeOp::SetLocal,
            desc.sdp_type,
        )?;

        let start_after = {
            let mut inner = self.inner.lock().await;
            match desc.sdp_type {
                RTCSdpType::Offer => {
                    inner.pending_local_description = Some(desc);
                    false
                }
                RTCSdpType::Answer => {
                    inner.current_local_description = Some(desc);
                    inner.current_remote_description =
                        inner.pending_remote_description.take();
                    inner.pending_local_description = None;
                    inner.negotiation_needed = false;
                    true
                }
                _ => {
                    inner.pending_local_description = Some(desc);
                    false
                }
            }
        };
        *self.signaling_state.lock().unwrap() = new_state;

        self.ensure_gathering().await?;

        if start_after {
            // we are the answerer; the remote offer is committed
            self.start_transports(false).await?;
        }
        Ok(())
    }

    pub async fn set_remote_description(
        self: &Arc<Self>,
        desc: RTCSessionDescription,
    ) -> Result<()> {
        let parsed = desc.parsed()?.clone();
        let sdp_type = desc.sdp_type;
        let next = match desc.sdp_type {
            RTCSdpType::Offer => RTCSignalingState::HaveRemoteOffer,
            RTCSdpType::Answer => RTCSignalingState::Stable,
            RTCSdpType::Pranswer => RTCSignalingState::HaveRemotePranswer,
            _ => return Err(Error::ErrSdpInvalid("unsupported sdp type".to_owned())),
        };
        let new_state = check_next_signaling_state(
            self.signaling_state(),
            next,
            StateChangeOp::SetRemote,
            desc.sdp_type,
        )?;

        if parsed.ice_credentials().is_none() {
            return Err(Error::ErrSessionDescriptionMissingIceCredentials);
        }

        // ICE restarts are triggered by remote offers only, never
        // answers
        let mut is_restart = false;
        if desc.sdp_type == RTCSdpType::Offer {
            let inner = self.inner.lock().await;
            if let Some(current) = &inner.current_remote_description {
                if let (Some((old_ufrag, _)), Some((new_ufrag, _))) = (
                    current.parsed()?.ice_credentials(),
                    parsed.ice_credentials(),
                ) {
                    is_restart = old_ufrag != new_ufrag;
                }
            }
        }

        {
            let mut inner = self.inner.lock().await;
            match desc.sdp_type {
                RTCSdpType::Offer => {
                    // build transceivers for new media sections
                    for section in &parsed.media {
                        if section.is_application() {
                            inner.have_data_media = true;
                            if !inner
                                .media_order
                                .iter()
                                .any(|e| *e == MediaOrderEntry::Data)
                            {
                                inner.media_order.push(MediaOrderEntry::Data);
                            }
                            continue;
                        }
                        let known = inner
                            .transceivers
                            .iter()
                            .any(|t| t.mid().as_deref() == Some(section.mid.as_str()));
                        if !known {
                            let kind = RTPCodecType::from(section.kind.as_str());
                            let sender = RTCRtpSender::new(0, 0);
                            let receiver = RTCRtpReceiver::new(None);
                            let transceiver = RTCRtpTransceiver::new(
                                kind,
                                RTCRtpTransceiverDirection::Recvonly,
                                sender,
                                receiver,
                            );
                            transceiver.set_mid(section.mid.clone())?;
                            inner.transceivers.push(transceiver);
                            let idx = inner.transceivers.len() - 1;
                            inner.media_order.push(MediaOrderEntry::Transceiver(idx));
                        }
                    }
                    inner.pending_remote_description = Some(desc);
                }
                RTCSdpType::Answer => {
                    inner.current_remote_description = Some(desc);
                    inner.current_local_description = inner.pending_local_description.take();
                    inner.pending_remote_description = None;
                    inner.negotiation_needed = false;
                }
                _ => {
                    inner.pending_remote_description = Some(desc);
                }
            }
        }
        *self.signaling_state.lock().unwrap() = new_state;

        if is_restart {
            // the answer we produce next carries fresh credentials
            let new_creds = (ice::rand::generate_ufrag(), ice::rand::generate_pwd());
            {
                let mut creds = self.ice_credentials.lock().unwrap();
                *creds = new_creds.clone();
            }
            let transports = {
                let inner = self.inner.lock().await;
                inner.transports.clone()
            };
            for t in transports {
                t.ice_agent
                    .restart(new_creds.0.clone(), new_creds.1.clone())
                    .await?;
                t.ice_agent.gather_candidates().await.ok();
            }
        }

        if sdp_type == RTCSdpType::Answer {
            // we are the offerer; the exchange is complete
            self.start_transports(true).await?;
        }
        Ok(())
    }

    pub async fn local_description(&self) -> Option<RTCSessionDescription> {
        let inner = self.inner.lock().await;
        inner
            .pending_local_description
            .clone()
            .or_else(|| inner.current_local_description.clone())
    }

    pub async fn remote_description(&self) -> Option<RTCSessionDescription> {
        let inner = self.inner.lock().await;
        inner
            .pending_remote_description
            .clone()
            .or_else(|| inner.current_remote_description.clone())
    }

    /// add_ice_candidate feeds a trickled remote candidate to every
    /// transport.
    pub async fn add_ice_candidate(&self, candidate: RTCIceCandidateInit) -> Result<()> {
        if candidate.candidate.is_empty() {
            return Ok(());
        }
        let parsed = Arc::new(ice::candidate::Candidate::unmarshal(&candidate.candidate)?);
        let transports = {
            let mut inner = self.inner.lock().await;
            if inner.transports.is_empty() {
                // hold on to candidates that raced the answer
                inner.pending_remote_candidates.push(parsed);
                return Ok(());
            }
            inner.transports.clone()
        };
        for transport in transports {
            transport
                .ice_agent
                .add_remote_candidate(Arc::clone(&parsed))
                .await?;
        }
        Ok(())
    }

    async fn ensure_gathering(self: &Arc<Self>) -> Result<()> {
        let remote_bundled = {
            let inner = self.inner.lock().await;
            inner
                .pending_remote_description
                .as_ref()
                .or(inner.current_remote_description.as_ref())
                .and_then(|d| d.parsed.as_ref())
                .map(|p| p.is_bundled())
                .unwrap_or(true)
        };
        let transport = self.find_or_create_transport(remote_bundled).await?;

        let mut inner = self.inner.lock().await;
        if !inner.gathering_started {
            inner.gathering_started = true;
            drop(inner);
            transport.ice_agent.gather_candidates().await?;
        }
        Ok(())
    }

    /// start_transports wires ICE, DTLS, SRTP and SCTP once both
    /// descriptions are committed.
    async fn start_transports(self: &Arc<Self>, we_are_offerer: bool) -> Result<()> {
        let (remote, local) = {
            let inner = self.inner.lock().await;
            let remote = inner
                .current_remote_description
                .as_ref()
                .ok_or(Error::ErrNoRemoteDescription)?
                .parsed()?
                .clone();
            let local = inner
                .current_local_description
                .as_ref()
                .ok_or(Error::ErrNoRemoteDescription)?
                .parsed()?
                .clone();
            (remote, local)
        };

        let (remote_ufrag, remote_pwd) = remote
            .ice_credentials()
            .ok_or(Error::ErrSessionDescriptionMissingIceCredentials)?;
        let remote_fingerprint = remote.fingerprint().map(|(_, v)| v);

        // DTLS role from a=setup
        let is_dtls_client = if we_are_offerer {
            // remote answered active -> remote is the client
            !remote
                .media
                .iter()
                .any(|m| m.setup == "active")
        } else {
            local.media.iter().any(|m| m.setup == "active")
        };

        let remote_has_data = remote.media.iter().any(|m| m.is_application());
        let remote_candidates: Vec<String> = remote
            .media
            .iter()
            .flat_map(|m| m.candidates.clone())
            .collect();

        let already_started = {
            let inner = self.inner.lock().await;
            inner.transports_started
        };

        let transport = self.find_or_create_transport(remote.is_bundled()).await?;

        // ICE credentials and candidates always apply (restart included)
        transport
            .ice_agent
            .set_remote_credentials(remote_ufrag, remote_pwd)
            .await?;
        let stashed = {
            let mut inner = self.inner.lock().await;
            std::mem::take(&mut inner.pending_remote_candidates)
        };
        for candidate in stashed {
            transport.ice_agent.add_remote_candidate(candidate).await?;
        }
        for raw in &remote_candidates {
            if let Ok(candidate) = ice::candidate::Candidate::unmarshal(raw) {
                transport
                    .ice_agent
                    .add_remote_candidate(Arc::new(candidate))
                    .await?;
            }
        }
        transport
            .ice_agent
            .start_connectivity(we_are_offerer)
            .await
            .or_else(|e| {
                // a restart re-enters checking on a started agent
                if e == ice::Error::ErrMultipleStart && already_started {
                    Ok(())
                } else {
                    Err(e)
                }
            })?;

        if already_started {
            return Ok(());
        }
        {
            let mut inner = self.inner.lock().await;
            inner.transports_started = true;
        }

        // register media routing before packets can arrive
        self.configure_media_routing(&transport, &remote).await;

        let pc = Arc::clone(self);
        let transport2 = Arc::clone(&transport);
        tokio::spawn(async move {
            if let Err(err) = transport2
                .start(is_dtls_client, remote_fingerprint)
                .await
            {
                log::error!("transport start failed: {err}");
                pc.update_connection_state(
                    RTCIceConnectionState::Failed,
                    Some(RTCDtlsTransportState::Failed),
                );
                return;
            }
            pc.update_connection_state(
                pc.ice_connection_state(),
                Some(RTCDtlsTransportState::Connected),
            );

            if remote_has_data {
                let sctp = RTCSctpTransport::new(Arc::clone(&transport2));
                {
                    let mut inner = pc.inner.lock().await;
                    inner.sctp = Some(Arc::clone(&sctp));
                }
                if let Err(err) = sctp
                    .start(is_dtls_client, pc.data_channel_tx.clone())
                    .await
                {
                    log::error!("SCTP start failed: {err}");
                    return;
                }

                // open the channels created before the transport existed
                let pending = {
                    let mut inner = pc.inner.lock().await;
                    std::mem::take(&mut inner.pending_channels)
                };
                for channel in pending {
                    if let Err(err) = sctp.dial_channel(&channel).await {
                        log::warn!("failed to open data channel: {err}");
                    }
                }
            }
        });

        Ok(())
    }

    /// Registers SSRC, RTX and simulcast routing from the remote
    /// description.
    async fn configure_media_routing(
        &self,
        transport: &Arc<RTCDtlsTransport>,
        remote: &ParsedSdp,
    ) {
        transport.set_extension_ids(Some(EXT_ID_MID), Some(EXT_ID_RID));
        transport.set_twcc_extension_id(Some(EXT_ID_TWCC));

        let inner = self.inner.lock().await;
        for section in &remote.media {
            if section.is_application() {
                continue;
            }
            let transceiver = inner
                .transceivers
                .iter()
                .find(|t| t.mid().as_deref() == Some(section.mid.as_str()));
            let Some(transceiver) = transceiver else {
                continue;
            };

            transceiver.sender.set_transport(Arc::clone(transport));
            transport.register_sender(transceiver.sender());

            // RTX payload types from fmtp apt=
            for (pt, params) in &section.fmtp {
                if let Some(apt) = params
                    .split(';')
                    .find_map(|p| p.trim().strip_prefix("apt="))
                    .and_then(|v| v.parse::<u8>().ok())
                {
                    transport.add_rtx_payload_type(*pt, apt);
                }
            }

            // remote SSRCs route to our receiver; FID binds RTX repair
            let receiver = transceiver.receiver();
            let mut primary_ssrc = None;
            for (semantics, ssrcs) in &section.ssrc_groups {
                if semantics == "FID" && ssrcs.len() >= 2 {
                    primary_ssrc = Some(ssrcs[0]);
                    transport.add_fid_pair(ssrcs[0], ssrcs[1]);
                }
            }
            if primary_ssrc.is_none() {
                primary_ssrc = section.ssrcs.first().map(|(ssrc, _)| *ssrc);
            }
            if let Some(ssrc) = primary_ssrc {
                transport.register_receiver(ssrc, receiver);
            } else if !section.rids.is_empty() {
                transport.register_rid_receiver(receiver);
            }
        }
    }

    /// close tears the whole connection down; outstanding operations
    /// observe closure.
    pub async fn close(&self) -> Result<()> {
        let (transports, sctp, channels) = {
            let mut inner = self.inner.lock().await;
            if inner.is_closed {
                return Ok(());
            }
            inner.is_closed = true;
            (
                inner.transports.clone(),
                inner.sctp.take(),
                inner.data_channels.clone(),
            )
        };

        *self.signaling_state.lock().unwrap() = RTCSignalingState::Closed;

        for channel in channels {
            let _ = channel.close().await;
        }
        if let Some(sctp) = sctp {
            let _ = sctp.stop().await;
        }
        for transport in transports {
            let _ = transport.stop().await;
            let _ = transport.ice_agent.close().await;
        }

        {
            let mut guard = self.connection_state.lock().unwrap();
            *guard = RTCPeerConnectionState::Closed;
        }
        Ok(())
    }
}

/// The direction we answer with: what we want, constrained by what the
/// peer can do.
fn intersect_direction(
    ours: RTCRtpTransceiverDirection,
    theirs_reversed: RTCRtpTransceiverDirection,
) -> RTCRtpTransceiverDirection {
    use RTCRtpTransceiverDirection::*;
    let want_send = matches!(ours, Sendrecv | Sendonly);
    let want_recv = matches!(ours, Sendrecv | Recvonly);
    let can_send = matches!(theirs_reversed, Sendrecv | Sendonly);
    let can_recv = matches!(theirs_reversed, Sendrecv | Recvonly);

    match (want_send && can_send, want_recv && can_recv) {
        (true, true) => Sendrecv,
        (true, false) => Sendonly,
        (false, true) => Recvonly,
        (false, false) => Inactive,
    }
}
