#[cfg(test)]
mod agent_test;

pub mod agent_config;
pub mod agent_gather;
pub mod agent_internal;
pub mod agent_transport;

use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use crate::candidate::*;
use crate::error::*;
use crate::rand::*;
use crate::state::*;
use agent_config::AgentConfig;
use agent_internal::AgentInternal;
use agent_transport::AgentConn;

/// Handler for ICE connection state changes.
pub type OnConnectionStateChangeHdlrFn = Box<dyn FnMut(ConnectionState) + Send + Sync>;
/// Handler for newly gathered local candidates; None marks the end of
/// gathering.
pub type OnCandidateHdlrFn = Box<dyn FnMut(Option<Arc<Candidate>>) + Send + Sync>;
/// Handler for selected-pair changes: (local, remote).
pub type OnSelectedCandidatePairChangeHdlrFn =
    Box<dyn FnMut(Arc<Candidate>, Arc<Candidate>) + Send + Sync>;

/// Agent represents the ICE agent: candidate gathering, the checklist,
/// nomination and consent freshness (RFC 8445, RFC 7675).
pub struct Agent {
    pub(crate) internal: Arc<Mutex<AgentInternal>>,
    pub(crate) notify: Arc<Notify>,
    pub(crate) agent_conn: Arc<AgentConn>,
    check_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Agent {
    /// new creates an Agent.
    pub async fn new(config: AgentConfig) -> Result<Arc<Self>> {
        let ufrag = if config.local_ufrag.is_empty() {
            generate_ufrag()
        } else {
            config.local_ufrag.clone()
        };
        let pwd = if config.local_pwd.is_empty() {
            generate_pwd()
        } else {
            config.local_pwd.clone()
        };

        let buffer = util::Buffer::new(0);
        let internal = Arc::new(Mutex::new(AgentInternal::new(
            config,
            ufrag,
            pwd,
            buffer.clone(),
        )));
        let notify = Arc::new(Notify::new());
        let agent_conn = Arc::new(AgentConn::new(Arc::clone(&internal), buffer));

        Ok(Arc::new(Agent {
            internal,
            notify,
            agent_conn,
            check_handle: Mutex::new(None),
        }))
    }

    /// get_local_user_credentials returns the local (ufrag, pwd).
    pub async fn get_local_user_credentials(&self) -> (String, String) {
        let internal = self.internal.lock().await;
        (internal.ufrag.clone(), internal.pwd.clone())
    }

    /// set_remote_credentials sets the peer's (ufrag, pwd) from SDP.
    pub async fn set_remote_credentials(
        &self,
        remote_ufrag: String,
        remote_pwd: String,
    ) -> Result<()> {
        if remote_ufrag.is_empty() {
            return Err(Error::ErrRemoteUfragEmpty);
        }
        if remote_pwd.is_empty() {
            return Err(Error::ErrRemotePwdEmpty);
        }
        let mut internal = self.internal.lock().await;
        internal.remote_ufrag = remote_ufrag;
        internal.remote_pwd = remote_pwd;
        Ok(())
    }

    /// on_candidate sets a handler for newly gathered candidates.
    pub async fn on_candidate(&self, f: OnCandidateHdlrFn) {
        let mut internal = self.internal.lock().await;
        internal.on_candidate_hdlr = Some(f);
    }

    /// on_connection_state_change sets a handler for state changes.
    pub async fn on_connection_state_change(&self, f: OnConnectionStateChangeHdlrFn) {
        let mut internal = self.internal.lock().await;
        internal.on_connection_state_change_hdlr = Some(f);
    }

    /// on_selected_candidate_pair_change sets a handler fired when the
    /// nominated pair changes.
    pub async fn on_selected_candidate_pair_change(
        &self,
        f: OnSelectedCandidatePairChangeHdlrFn,
    ) {
        let mut internal = self.internal.lock().await;
        internal.on_selected_candidate_pair_change_hdlr = Some(f);
    }

    /// gather_candidates starts host/srflx/relay gathering; candidates
    /// surface through on_candidate, terminated by a None.
    pub async fn gather_candidates(self: &Arc<Self>) -> Result<()> {
        {
            let mut internal = self.internal.lock().await;
            if internal.gathering_state == GatheringState::Gathering {
                return Err(Error::ErrGatheringInProgress);
            }
            internal.gathering_state = GatheringState::Gathering;
        }

        let agent = Arc::clone(self);
        tokio::spawn(async move {
            agent_gather::gather(agent).await;
        });
        Ok(())
    }

    /// add_remote_candidate adds a trickled remote candidate, resolving
    /// mDNS names first when needed.
    pub async fn add_remote_candidate(self: &Arc<Self>, candidate: Arc<Candidate>) -> Result<()> {
        if candidate.is_mdns_name() {
            let mdns = {
                let internal = self.internal.lock().await;
                internal.mdns_conn.clone()
            };
            let Some(mdns) = mdns else {
                log::debug!("dropping mDNS candidate, resolution disabled");
                return Ok(());
            };
            let agent = Arc::clone(self);
            let candidate = Arc::clone(&candidate);
            tokio::spawn(async move {
                match mdns
                    .query(&candidate.address, std::time::Duration::from_secs(3))
                    .await
                {
                    Ok((_, addr)) => {
                        candidate.set_resolved_addr(std::net::SocketAddr::new(
                            addr,
                            candidate.port,
                        ));
                        let mut internal = agent.internal.lock().await;
                        internal.add_remote_candidate(candidate);
                        agent.notify.notify_one();
                    }
                    Err(err) => {
                        log::warn!("failed to resolve mDNS candidate: {err}");
                    }
                }
            });
            return Ok(());
        }

        let mut internal = self.internal.lock().await;
        internal.add_remote_candidate(candidate);
        self.notify.notify_one();
        Ok(())
    }

    /// start_connectivity begins connectivity checks in the given role.
    pub async fn start_connectivity(self: &Arc<Self>, is_controlling: bool) -> Result<()> {
        let check_interval = {
            let mut internal = self.internal.lock().await;
            if internal.started {
                return Err(Error::ErrMultipleStart);
            }
            if internal.remote_ufrag.is_empty() || internal.remote_pwd.is_empty() {
                return Err(Error::ErrRemoteUfragEmpty);
            }
            internal.started = true;
            internal.is_controlling = is_controlling;
            internal.update_connection_state(ConnectionState::Checking);
            internal.check_interval
        };

        let internal = Arc::clone(&self.internal);
        let notify = Arc::clone(&self.notify);
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = notify.notified() => {}
                    _ = tokio::time::sleep(check_interval) => {}
                }
                let done = {
                    let mut guard = internal.lock().await;
                    if guard.done {
                        true
                    } else {
                        guard.contact(tokio::time::Instant::now()).await;
                        guard.done
                    }
                };
                if done {
                    break;
                }
            }
        });
        let mut guard = self.check_handle.lock().await;
        *guard = Some(handle);
        Ok(())
    }

    /// get_conn returns the packet-oriented connection routed through
    /// the selected pair.
    pub fn get_conn(&self) -> Arc<AgentConn> {
        Arc::clone(&self.agent_conn)
    }

    /// get_local_candidates returns all gathered local candidates.
    pub async fn get_local_candidates(&self) -> Vec<Arc<Candidate>> {
        let internal = self.internal.lock().await;
        internal.local_candidates.clone()
    }

    pub async fn connection_state(&self) -> ConnectionState {
        let internal = self.internal.lock().await;
        internal.connection_state
    }

    pub async fn gathering_state(&self) -> GatheringState {
        let internal = self.internal.lock().await;
        internal.gathering_state
    }

    /// get_selected_candidate_pair returns (local, remote) of the
    /// nominated pair, if any.
    pub async fn get_selected_candidate_pair(&self) -> Option<(Arc<Candidate>, Arc<Candidate>)> {
        let internal = self.internal.lock().await;
        internal.selected_pair.map(|i| {
            let p = &internal.checklist[i];
            (Arc::clone(&p.local), Arc::clone(&p.remote))
        })
    }

    /// restart discards remote state and credentials for an ICE restart.
    /// Gathering must be re-run by the caller.
    pub async fn restart(&self, ufrag: String, pwd: String) -> Result<()> {
        let mut internal = self.internal.lock().await;
        internal.ufrag = if ufrag.is_empty() {
            generate_ufrag()
        } else {
            ufrag
        };
        internal.pwd = if pwd.is_empty() { generate_pwd() } else { pwd };
        internal.remote_ufrag = String::new();
        internal.remote_pwd = String::new();
        internal.remote_candidates.clear();
        internal.checklist.clear();
        internal.selected_pair = None;
        internal.pending_requests.clear();
        internal.started = false;
        internal.consecutive_consent_failures = 0;
        internal.update_connection_state(ConnectionState::Checking);
        Ok(())
    }

    /// close shuts the agent down, releasing all sockets.
    pub async fn close(&self) -> Result<()> {
        {
            let mut internal = self.internal.lock().await;
            if internal.done {
                return Ok(());
            }
            internal.done = true;
            internal.buffer.close().await;
            for c in &internal.local_candidates {
                if let Some(conn) = &c.conn {
                    let _ = conn.close().await;
                }
            }
            if let Some(mdns) = internal.mdns_conn.take() {
                mdns.close().await;
            }
            internal.update_connection_state(ConnectionState::Closed);
        }
        if let Some(handle) = self.check_handle.lock().await.take() {
            handle.abort();
        }
        self.notify.notify_waiters();
        Ok(())
    }
}
