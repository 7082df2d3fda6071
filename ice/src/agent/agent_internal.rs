use std::net::SocketAddr;
use std::sync::Arc;

use stun::attributes::*;
use stun::error_code::*;
use stun::fingerprint::FINGERPRINT;
use stun::integrity::MessageIntegrity;
use stun::message::*;
use stun::textattrs::TextAttribute;
use stun::xoraddr::XorMappedAddress;
use tokio::time::{Duration, Instant};

use super::agent_config::*;
use super::{
    AgentConfig, OnCandidateHdlrFn, OnConnectionStateChangeHdlrFn,
    OnSelectedCandidatePairChangeHdlrFn,
};
use crate::candidate::*;
use crate::control::*;
use crate::priority::PriorityAttr;
use crate::rand::generate_tie_breaker;
use crate::state::*;
use crate::use_candidate::UseCandidateAttr;

/// An outstanding Binding request we sent on some pair.
pub(crate) struct BindingRequest {
    pub(crate) timestamp: Instant,
    pub(crate) transaction_id: TransactionId,
    pub(crate) destination: SocketAddr,
    pub(crate) is_use_candidate: bool,
}

pub(crate) struct AgentInternal {
    pub(crate) ufrag: String,
    pub(crate) pwd: String,
    pub(crate) remote_ufrag: String,
    pub(crate) remote_pwd: String,

    pub(crate) is_controlling: bool,
    pub(crate) tie_breaker: u64,
    pub(crate) started: bool,
    pub(crate) done: bool,

    pub(crate) connection_state: ConnectionState,
    pub(crate) gathering_state: GatheringState,

    pub(crate) local_candidates: Vec<Arc<Candidate>>,
    pub(crate) remote_candidates: Vec<Arc<Candidate>>,
    pub(crate) checklist: Vec<CandidatePair>,
    pub(crate) selected_pair: Option<usize>,
    pub(crate) nominated_pending: bool,

    pub(crate) pending_requests: Vec<BindingRequest>,

    /// Non-STUN traffic surfaced to the AgentConn.
    pub(crate) buffer: util::Buffer,

    pub(crate) on_candidate_hdlr: Option<OnCandidateHdlrFn>,
    pub(crate) on_connection_state_change_hdlr: Option<OnConnectionStateChangeHdlrFn>,
    pub(crate) on_selected_candidate_pair_change_hdlr:
        Option<OnSelectedCandidatePairChangeHdlrFn>,

    // consent freshness (RFC 7675)
    pub(crate) consent_interval: Duration,
    pub(crate) next_consent_at: Option<Instant>,
    pub(crate) consent_outstanding: bool,
    pub(crate) consecutive_consent_failures: u32,

    pub(crate) check_interval: Duration,
    pub(crate) check_retry_interval: Duration,
    pub(crate) max_binding_requests: u16,
    pub(crate) stun_timeout: Duration,
    pub(crate) last_ping_at: Option<Instant>,

    pub(crate) urls: Vec<crate::url::Url>,
    pub(crate) network_types: Vec<crate::network_type::NetworkType>,
    pub(crate) candidate_types: Vec<CandidateType>,
    pub(crate) include_loopback: bool,
    pub(crate) multicast_dns_mode: crate::mdns_mode::MulticastDnsMode,
    pub(crate) mdns_name: String,
    pub(crate) mdns_conn: Option<Arc<mdns::DnsConn>>,
    pub(crate) read_loop_handles: Vec<tokio::task::JoinHandle<()>>,
}

impl AgentInternal {
    pub(crate) fn new(
        config: AgentConfig,
        ufrag: String,
        pwd: String,
        buffer: util::Buffer,
    ) -> Self {
        AgentInternal {
            ufrag,
            pwd,
            remote_ufrag: String::new(),
            remote_pwd: String::new(),
            is_controlling: false,
            tie_breaker: generate_tie_breaker(),
            started: false,
            done: false,
            connection_state: ConnectionState::New,
            gathering_state: GatheringState::New,
            local_candidates: vec![],
            remote_candidates: vec![],
            checklist: vec![],
            selected_pair: None,
            nominated_pending: false,
            pending_requests: vec![],
            buffer,
            on_candidate_hdlr: None,
            on_connection_state_change_hdlr: None,
            on_selected_candidate_pair_change_hdlr: None,
            consent_interval: config.consent_interval,
            next_consent_at: None,
            consent_outstanding: false,
            consecutive_consent_failures: 0,
            check_interval: config.check_interval,
            check_retry_interval: DEFAULT_CHECK_RETRY_INTERVAL,
            max_binding_requests: config.max_binding_requests,
            stun_timeout: config.stun_timeout,
            last_ping_at: None,
            urls: config.urls,
            network_types: config.network_types,
            candidate_types: config.candidate_types,
            include_loopback: config.include_loopback,
            multicast_dns_mode: config.multicast_dns_mode,
            mdns_name: String::new(),
            mdns_conn: None,
            read_loop_handles: vec![],
        }
    }

    pub(crate) fn update_connection_state(&mut self, state: ConnectionState) {
        if self.connection_state == state {
            return;
        }
        log::info!("ICE connection state changed: {} -> {}", self.connection_state, state);
        self.connection_state = state;
        if let Some(hdlr) = &mut self.on_connection_state_change_hdlr {
            hdlr(state);
        }
    }

    /// add_local_candidate stores a gathered candidate, pairs it and
    /// fires the trickle handler.
    pub(crate) fn add_local_candidate(&mut self, candidate: Arc<Candidate>) {
        for c in &self.local_candidates {
            if c.equal(&candidate) {
                return;
            }
        }
        self.local_candidates.push(Arc::clone(&candidate));
        self.pair_candidate(Some(self.local_candidates.len() - 1), None);

        if let Some(hdlr) = &mut self.on_candidate_hdlr {
            hdlr(Some(candidate));
        }
    }

    pub(crate) fn add_remote_candidate(&mut self, candidate: Arc<Candidate>) {
        for c in &self.remote_candidates {
            if c.equal(&candidate) {
                return;
            }
        }
        self.remote_candidates.push(Arc::clone(&candidate));
        self.pair_candidate(None, Some(self.remote_candidates.len() - 1));
    }

    /// pair_candidate inserts pairs for a newly learned candidate
    /// (trickle keeps mutating the list).
    fn pair_candidate(&mut self, local_idx: Option<usize>, remote_idx: Option<usize>) {
        let locals: Vec<usize> = match local_idx {
            Some(i) => vec![i],
            None => (0..self.local_candidates.len()).collect(),
        };
        let remotes: Vec<usize> = match remote_idx {
            Some(i) => vec![i],
            None => (0..self.remote_candidates.len()).collect(),
        };

        for l in &locals {
            for r in &remotes {
                let local = &self.local_candidates[*l];
                let remote = &self.remote_candidates[*r];
                if !CandidatePair::compatible(local, remote) {
                    continue;
                }
                if self
                    .find_pair(&local.id, remote.addr())
                    .is_some()
                {
                    continue;
                }
                let pair = CandidatePair::new(Arc::clone(local), Arc::clone(remote));
                self.checklist.push(pair);
            }
        }

        let is_controlling = self.is_controlling;
        self.checklist
            .sort_by(|a, b| b.priority(is_controlling).cmp(&a.priority(is_controlling)));
        // indexes shifted; recompute the selected pair position
        if self.selected_pair.is_some() {
            self.selected_pair = self
                .checklist
                .iter()
                .position(|p| p.nominated && p.state == CandidatePairState::Succeeded);
        }
    }

    pub(crate) fn find_pair(
        &self,
        local_id: &str,
        remote_addr: Option<SocketAddr>,
    ) -> Option<usize> {
        self.checklist.iter().position(|p| {
            p.local.id == local_id && p.remote.addr() == remote_addr && remote_addr.is_some()
        })
    }

    /// contact is the periodic driver: checks, retries and consent.
    pub(crate) async fn contact(&mut self, now: Instant) {
        if self.done || !self.started {
            return;
        }

        // expire stale outstanding requests
        let timeout = self.stun_timeout;
        self.pending_requests
            .retain(|r| now.duration_since(r.timestamp) < timeout);

        match self.connection_state {
            ConnectionState::Checking
            | ConnectionState::Connected
            | ConnectionState::Completed
            | ConnectionState::Disconnected => {}
            _ => return,
        }

        if let Some(selected) = self.selected_pair {
            self.consent_check(now, selected).await;
            return;
        }

        // re-ping or fail in-progress pairs, then launch the next waiting
        // check in priority order
        let retry_after = self.check_retry_interval;
        let allow_ping = self
            .last_ping_at
            .map(|t| now.duration_since(t) >= self.check_interval)
            .unwrap_or(true);
        if !allow_ping {
            return;
        }

        // fresh checks first, in priority order
        let mut to_ping = None;
        for (i, pair) in self.checklist.iter_mut().enumerate() {
            if matches!(
                pair.state,
                CandidatePairState::Waiting | CandidatePairState::Frozen
            ) {
                pair.state = CandidatePairState::InProgress;
                to_ping = Some(i);
                break;
            }
        }
        // then re-pings of in-progress pairs, at a slower pace
        if to_ping.is_none() {
            let retry_ok = self
                .last_ping_at
                .map(|t| now.duration_since(t) >= retry_after)
                .unwrap_or(true);
            if retry_ok {
                for (i, pair) in self.checklist.iter_mut().enumerate() {
                    if pair.state == CandidatePairState::InProgress {
                        if pair.binding_request_count >= self.max_binding_requests {
                            pair.state = CandidatePairState::Failed;
                            continue;
                        }
                        to_ping = Some(i);
                        break;
                    }
                }
            }
        }

        if let Some(i) = to_ping {
            self.last_ping_at = Some(now);
            self.ping_candidate_pair(i).await;
        } else if self
            .checklist
            .iter()
            .all(|p| p.state == CandidatePairState::Failed)
            && !self.checklist.is_empty()
            && self.gathering_state == GatheringState::Complete
        {
            self.update_connection_state(ConnectionState::Failed);
        }
    }

    /// consent_check keeps the selected pair fresh per RFC 7675:
    /// 5s x (0.8 + 0.4 rand) cadence, one failure demotes to
    /// Disconnected, six to Failed.
    async fn consent_check(&mut self, now: Instant, selected: usize) {
        let due = match self.next_consent_at {
            Some(at) => now >= at,
            None => true,
        };
        if !due {
            return;
        }

        if self.consent_outstanding {
            self.consecutive_consent_failures += 1;
            log::debug!(
                "consent check missed ({} consecutive)",
                self.consecutive_consent_failures
            );
            if self.consecutive_consent_failures >= MAX_CONSENT_FAILURES {
                self.update_connection_state(ConnectionState::Failed);
                return;
            }
            self.update_connection_state(ConnectionState::Disconnected);
        }

        let jitter = 0.8 + 0.4 * rand::random::<f64>();
        self.next_consent_at =
            Some(now + self.consent_interval.mul_f64(jitter));
        self.consent_outstanding = true;
        self.ping_candidate_pair(selected).await;
    }

    /// The PRIORITY attribute value: what our candidate's priority would
    /// be as a peer-reflexive candidate.
    fn prflx_priority(&self, component: u16) -> u32 {
        (1 << 24) * (CandidateType::PeerReflexive.preference() as u32)
            + (1 << 8) * (DEFAULT_LOCAL_PREFERENCE as u32)
            + (256 - component as u32)
    }

    /// ping_candidate_pair sends a Binding request on a pair.
    pub(crate) async fn ping_candidate_pair(&mut self, pair_idx: usize) {
        let Some(pair) = self.checklist.get_mut(pair_idx) else {
            return;
        };
        let Some(remote_addr) = pair.remote.addr() else {
            return;
        };
        pair.binding_request_count += 1;
        let component = pair.local.component;
        let local_conn = pair.local.conn.clone();
        let use_candidate = self.is_controlling;

        let username = format!("{}:{}", self.remote_ufrag, self.ufrag);
        let mut msg = Message::new();
        let mut setters: Vec<Box<dyn Setter>> = vec![
            Box::new(TransactionId::new()),
            Box::new(BINDING_REQUEST),
            Box::new(TextAttribute::new(ATTR_USERNAME, username)),
        ];
        if self.is_controlling {
            setters.push(Box::new(AttrControlling(self.tie_breaker)));
            // aggressive nomination: every check carries USE-CANDIDATE
            setters.push(Box::new(UseCandidateAttr::new()));
        } else {
            setters.push(Box::new(AttrControlled(self.tie_breaker)));
        }
        setters.push(Box::new(PriorityAttr(self.prflx_priority(component))));
        setters.push(Box::new(MessageIntegrity::new_short_term_integrity(
            &self.remote_pwd,
        )));
        setters.push(Box::new(FINGERPRINT));

        if let Err(err) = msg.build(&setters) {
            log::warn!("failed to build binding request: {err}");
            return;
        }

        self.pending_requests.push(BindingRequest {
            timestamp: Instant::now(),
            transaction_id: msg.transaction_id,
            destination: remote_addr,
            is_use_candidate: use_candidate,
        });

        if let Some(conn) = local_conn {
            if let Err(err) = conn.send_to(&msg.raw, remote_addr).await {
                log::trace!("binding request send failed: {err}");
            }
        }
    }

    /// handle_inbound processes one STUN message received on a local
    /// candidate's socket.
    pub(crate) async fn handle_inbound(
        &mut self,
        buf: &[u8],
        local_idx: usize,
        from: SocketAddr,
    ) {
        let mut m = Message::new();
        if m.unmarshal_binary(buf).is_err() {
            return;
        }

        match m.typ.class {
            CLASS_REQUEST => self.handle_binding_request(m, local_idx, from).await,
            CLASS_SUCCESS_RESPONSE => self.handle_success_response(m, local_idx, from).await,
            CLASS_ERROR_RESPONSE => self.handle_error_response(m).await,
            _ => {}
        }
    }

    async fn handle_binding_request(
        &mut self,
        mut m: Message,
        local_idx: usize,
        from: SocketAddr,
    ) {
        if self.remote_pwd.is_empty() {
            // checks can arrive before the answer is processed
            log::trace!("dropping early binding request from {from}");
            return;
        }

        // authenticate with our password
        let integrity = MessageIntegrity::new_short_term_integrity(&self.pwd);
        if integrity.check(&mut m).is_err() {
            log::warn!("binding request from {from} failed integrity check");
            return;
        }

        let local = Arc::clone(&self.local_candidates[local_idx]);

        // role conflict (RFC 8445 7.2.1.1)
        let mut remote_control = AttrControlling::default();
        let has_controlling = remote_control.get_from(&m).is_ok();
        if has_controlling && self.is_controlling {
            if self.tie_breaker >= remote_control.0 {
                // we keep the role; the peer must switch
                let mut res = Message::new();
                let _ = res.build(&[
                    Box::new(m.transaction_id),
                    Box::new(BINDING_ERROR),
                    Box::new(CODE_ROLE_CONFLICT),
                    Box::new(MessageIntegrity::new_short_term_integrity(&self.pwd)),
                    Box::new(FINGERPRINT),
                ]);
                if let Some(conn) = &local.conn {
                    let _ = conn.send_to(&res.raw, from).await;
                }
                return;
            }
            log::debug!("role conflict: switching to controlled");
            self.is_controlling = false;
        }
        let mut remote_controlled = AttrControlled::default();
        if remote_controlled.get_from(&m).is_ok() && !self.is_controlling {
            if self.tie_breaker >= remote_controlled.0 {
                log::debug!("role conflict: switching to controlling");
                self.is_controlling = true;
            } else {
                let mut res = Message::new();
                let _ = res.build(&[
                    Box::new(m.transaction_id),
                    Box::new(BINDING_ERROR),
                    Box::new(CODE_ROLE_CONFLICT),
                    Box::new(MessageIntegrity::new_short_term_integrity(&self.pwd)),
                    Box::new(FINGERPRINT),
                ]);
                if let Some(conn) = &local.conn {
                    let _ = conn.send_to(&res.raw, from).await;
                }
                return;
            }
        }

        // learn a peer-reflexive candidate for unknown 5-tuples
        let remote = match self
            .remote_candidates
            .iter()
            .find(|c| c.addr() == Some(from))
        {
            Some(c) => Arc::clone(c),
            None => {
                let mut prio = PriorityAttr::default();
                let _ = prio.get_from(&m);
                let prflx = Arc::new(Candidate {
                    network_type: local.network_type,
                    candidate_type: CandidateType::PeerReflexive,
                    address: from.ip().to_string(),
                    port: from.port(),
                    component: local.component,
                    priority_override: if prio.0 != 0 { prio.0 } else { PRFLX_PRIORITY },
                    ..Default::default()
                });
                log::debug!("learned peer-reflexive candidate {prflx}");
                self.add_remote_candidate(Arc::clone(&prflx));
                prflx
            }
        };

        // the response must leave through the socket the request hit
        let mut res = Message::new();
        let _ = res.build(&[
            Box::new(m.transaction_id),
            Box::new(BINDING_SUCCESS),
            Box::new(XorMappedAddress {
                ip: from.ip(),
                port: from.port(),
            }),
            Box::new(MessageIntegrity::new_short_term_integrity(&self.pwd)),
            Box::new(FINGERPRINT),
        ]);
        if let Some(conn) = &local.conn {
            let _ = conn.send_to(&res.raw, from).await;
        }

        // triggered check bookkeeping
        let use_candidate = UseCandidateAttr::is_set(&m);
        let pair_idx = match self.find_pair(&local.id, remote.addr()) {
            Some(i) => i,
            None => {
                let pair = CandidatePair::new(Arc::clone(&local), Arc::clone(&remote));
                self.checklist.push(pair);
                self.checklist.len() - 1
            }
        };

        let pair = &mut self.checklist[pair_idx];
        if use_candidate && !self.is_controlling {
            // the controlling side nominated this pair
            pair.nominated = true;
            if pair.state == CandidatePairState::Succeeded {
                self.set_selected_pair(Some(pair_idx));
            } else {
                self.nominated_pending = true;
            }
        } else if pair.state == CandidatePairState::Frozen
            || pair.state == CandidatePairState::Failed
        {
            pair.state = CandidatePairState::Waiting;
        }
    }

    async fn handle_success_response(
        &mut self,
        mut m: Message,
        _local_idx: usize,
        from: SocketAddr,
    ) {
        let Some(req_idx) = self
            .pending_requests
            .iter()
            .position(|r| r.transaction_id == m.transaction_id)
        else {
            log::trace!("discarding unmatched binding response from {from}");
            return;
        };
        let request = self.pending_requests.remove(req_idx);

        let integrity = MessageIntegrity::new_short_term_integrity(&self.remote_pwd);
        if integrity.check(&mut m).is_err() {
            log::warn!("binding response from {from} failed integrity check");
            return;
        }

        // consent freshness bookkeeping
        self.consent_outstanding = false;
        if self.consecutive_consent_failures > 0 {
            self.consecutive_consent_failures = 0;
            if self.connection_state == ConnectionState::Disconnected {
                self.update_connection_state(ConnectionState::Connected);
            }
        }

        let Some(pair_idx) = self
            .checklist
            .iter()
            .position(|p| p.remote.addr() == Some(request.destination))
        else {
            return;
        };

        let pair = &mut self.checklist[pair_idx];
        pair.state = CandidatePairState::Succeeded;
        log::debug!("check succeeded: {pair}");

        let nominate = if self.is_controlling {
            // aggressive nomination: a succeeded check carried
            // USE-CANDIDATE
            request.is_use_candidate
        } else {
            pair.nominated || self.nominated_pending
        };
        if nominate {
            self.checklist[pair_idx].nominated = true;
            self.nominated_pending = false;
            self.set_selected_pair(Some(pair_idx));
        } else if self.connection_state == ConnectionState::Checking {
            self.update_connection_state(ConnectionState::Connected);
        }
    }

    async fn handle_error_response(&mut self, m: Message) {
        let Some(req_idx) = self
            .pending_requests
            .iter()
            .position(|r| r.transaction_id == m.transaction_id)
        else {
            return;
        };
        let request = self.pending_requests.remove(req_idx);

        let mut code = ErrorCodeAttribute::default();
        if code.get_from(&m).is_err() {
            return;
        }
        if code.code == CODE_ROLE_CONFLICT {
            // the peer kept its role; switch ours and retry the check
            log::debug!("received 487, switching role");
            self.is_controlling = !self.is_controlling;
            if let Some(pair_idx) = self
                .checklist
                .iter()
                .position(|p| p.remote.addr() == Some(request.destination))
            {
                self.checklist[pair_idx].state = CandidatePairState::Waiting;
            }
        }
    }

    /// set_selected_pair promotes a nominated pair (at most one per
    /// component is ever selected).
    pub(crate) fn set_selected_pair(&mut self, pair_idx: Option<usize>) {
        let Some(idx) = pair_idx else {
            self.selected_pair = None;
            return;
        };

        let better = match self.selected_pair {
            Some(current) => {
                let is_controlling = self.is_controlling;
                self.checklist[idx].priority(is_controlling)
                    > self.checklist[current].priority(is_controlling)
            }
            None => true,
        };
        if !better {
            return;
        }

        self.selected_pair = Some(idx);
        self.next_consent_at = None;
        self.consent_outstanding = false;

        let (local, remote) = {
            let p = &self.checklist[idx];
            (Arc::clone(&p.local), Arc::clone(&p.remote))
        };
        log::info!("selected candidate pair: {} <-> {}", local, remote);
        if let Some(hdlr) = &mut self.on_selected_candidate_pair_change_hdlr {
            hdlr(Arc::clone(&local), Arc::clone(&remote));
        }

        match self.connection_state {
            ConnectionState::Checking | ConnectionState::Disconnected => {
                self.update_connection_state(ConnectionState::Connected);
                if self.is_controlling {
                    self.update_connection_state(ConnectionState::Completed);
                }
            }
            ConnectionState::Connected if self.is_controlling => {
                self.update_connection_state(ConnectionState::Completed);
            }
            _ => {}
        }
    }
}
