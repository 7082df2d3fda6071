use std::time::Duration;

use crate::candidate::CandidateType;
use crate::mdns_mode::MulticastDnsMode;
use crate::network_type::NetworkType;
use crate::url::Url;

/// The pacing interval between outgoing connectivity checks.
pub(crate) const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(5);
/// How many binding requests a pair may consume before it fails.
pub(crate) const DEFAULT_MAX_BINDING_REQUESTS: u16 = 7;
/// Base interval between consent-freshness checks (jittered ±20%).
pub(crate) const DEFAULT_CONSENT_INTERVAL: Duration = Duration::from_secs(5);
/// Consecutive consent failures before the agent fails.
pub(crate) const MAX_CONSENT_FAILURES: u32 = 6;
/// Re-ping interval for in-progress pairs while checking.
pub(crate) const DEFAULT_CHECK_RETRY_INTERVAL: Duration = Duration::from_millis(400);
/// STUN transaction deadline used during gathering.
pub(crate) const DEFAULT_STUN_TIMEOUT: Duration = Duration::from_millis(1500);

/// AgentConfig collects the tunables for an Agent.
pub struct AgentConfig {
    /// STUN and TURN servers used for srflx/relay gathering.
    pub urls: Vec<Url>,

    /// Networks the agent gathers on.
    pub network_types: Vec<NetworkType>,
    /// Candidate types the agent gathers; a `[Relay]` list is the
    /// relay-only transport policy.
    pub candidate_types: Vec<CandidateType>,

    /// Pre-seeded credentials (generated when empty).
    pub local_ufrag: String,
    pub local_pwd: String,

    pub multicast_dns_mode: MulticastDnsMode,

    /// Loopback addresses are skipped unless enabled (useful in tests).
    pub include_loopback: bool,

    pub check_interval: Duration,
    pub max_binding_requests: u16,
    pub stun_timeout: Duration,
    pub consent_interval: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            urls: vec![],
            network_types: vec![NetworkType::Udp4],
            candidate_types: vec![
                CandidateType::Host,
                CandidateType::ServerReflexive,
                CandidateType::Relay,
            ],
            local_ufrag: String::new(),
            local_pwd: String::new(),
            multicast_dns_mode: MulticastDnsMode::Disabled,
            include_loopback: false,
            check_interval: DEFAULT_CHECK_INTERVAL,
            max_binding_requests: DEFAULT_MAX_BINDING_REQUESTS,
            stun_timeout: DEFAULT_STUN_TIMEOUT,
            consent_interval: DEFAULT_CONSENT_INTERVAL,
        }
    }
}
