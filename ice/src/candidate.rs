#[cfg(test)]
mod candidate_pair_test;
#[cfg(test)]
mod candidate_test;

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use md5::{Digest, Md5};
use serde::Serialize;
use util::Conn;

use crate::error::*;
use crate::network_type::*;
use crate::rand::generate_cand_id;
use crate::state::CandidatePairState;
use crate::tcp_type::TcpType;

/// The component for RTP (and, with rtcp-mux, everything else).
pub const COMPONENT_RTP: u16 = 1;
/// The component for RTCP when rtcp-mux is disabled.
pub const COMPONENT_RTCP: u16 = 2;

pub(crate) const RECEIVE_MTU: usize = 8192;
pub(crate) const DEFAULT_LOCAL_PREFERENCE: u16 = 65535;

/// Priority that a peer-reflexive candidate must be paired with
/// (RFC 8445 Section 7.3.1.3).
pub const PRFLX_PRIORITY: u32 = 2130706431;

/// CandidateType represents the type of candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CandidateType {
    #[serde(rename = "unspecified")]
    Unspecified,
    #[serde(rename = "host")]
    Host,
    #[serde(rename = "srflx")]
    ServerReflexive,
    #[serde(rename = "prflx")]
    PeerReflexive,
    #[serde(rename = "relay")]
    Relay,
}

impl fmt::Display for CandidateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            CandidateType::Host => "host",
            CandidateType::ServerReflexive => "srflx",
            CandidateType::PeerReflexive => "prflx",
            CandidateType::Relay => "relay",
            CandidateType::Unspecified => "Unknown candidate type",
        };
        write!(f, "{s}")
    }
}

impl Default for CandidateType {
    fn default() -> Self {
        Self::Unspecified
    }
}

impl CandidateType {
    /// preference returns the type preference weight of a CandidateType.
    ///
    /// RFC 5245 Section 4.1.2.2: 126 for host, 110 for peer reflexive,
    /// 100 for server reflexive and 0 for relayed.
    #[must_use]
    pub const fn preference(self) -> u16 {
        match self {
            Self::Host => 126,
            Self::PeerReflexive => 110,
            Self::ServerReflexive => 100,
            Self::Relay | CandidateType::Unspecified => 0,
        }
    }
}

/// CandidateRelatedAddress conveys transport addresses related to the
/// candidate, useful for diagnostics and other purposes.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct CandidateRelatedAddress {
    pub address: String,
    pub port: u16,
}

impl fmt::Display for CandidateRelatedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " related {}:{}", self.address, self.port)
    }
}

/// Candidate represents one transport address candidate, local or
/// remote. Local candidates own the socket they were gathered on.
pub struct Candidate {
    pub id: String,
    pub network_type: NetworkType,
    pub candidate_type: CandidateType,
    /// IP literal, or a `<uuid>.local` obfuscation name.
    pub address: String,
    pub port: u16,
    pub component: u16,
    pub tcp_type: TcpType,
    pub related_address: Option<CandidateRelatedAddress>,
    pub(crate) priority_override: u32,
    pub(crate) foundation_override: String,
    /// The socket this local candidate reads/writes; None for remote
    /// candidates.
    pub(crate) conn: Option<Arc<dyn Conn + Send + Sync>>,
    /// The resolved address of the peer (for mDNS remotes).
    pub(crate) resolved_addr: std::sync::Mutex<Option<SocketAddr>>,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}:{}{}",
            self.network_type,
            self.candidate_type,
            self.address,
            self.port,
            self.related_address
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_default(),
        )
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl Default for Candidate {
    fn default() -> Self {
        Candidate {
            id: generate_cand_id(),
            network_type: NetworkType::default(),
            candidate_type: CandidateType::default(),
            address: String::new(),
            port: 0,
            component: COMPONENT_RTP,
            tcp_type: TcpType::default(),
            related_address: None,
            priority_override: 0,
            foundation_override: String::new(),
            conn: None,
            resolved_addr: std::sync::Mutex::new(None),
        }
    }
}

impl Candidate {
    /// priority computes the candidate's priority per RFC 5245 Section
    /// 4.1.2.1.
    pub fn priority(&self) -> u32 {
        if self.priority_override != 0 {
            return self.priority_override;
        }

        // The local preference MUST be an integer from 0 (lowest
        // preference) to 65535 (highest preference) inclusive.
        (1 << 24) * (self.candidate_type.preference() as u32)
            + (1 << 8) * (DEFAULT_LOCAL_PREFERENCE as u32)
            + (256 - self.component as u32)
    }

    /// foundation is an MD5-derived short string grouping candidates of
    /// the same type, base address and transport.
    pub fn foundation(&self) -> String {
        if !self.foundation_override.is_empty() {
            return self.foundation_override.clone();
        }

        let mut hasher = Md5::new();
        hasher.update(
            format!(
                "{}{}{}",
                self.candidate_type, self.address, self.network_type
            )
            .as_bytes(),
        );
        let digest = hasher.finalize();
        format!(
            "{:02x}{:02x}{:02x}{:02x}",
            digest[0], digest[1], digest[2], digest[3]
        )
    }

    /// addr returns the network address of this candidate, resolving the
    /// mDNS name if it was already looked up.
    pub fn addr(&self) -> Option<SocketAddr> {
        if let Some(resolved) = *self.resolved_addr.lock().unwrap() {
            return Some(resolved);
        }
        let ip: IpAddr = self.address.parse().ok()?;
        Some(SocketAddr::new(ip, self.port))
    }

    pub(crate) fn set_resolved_addr(&self, addr: SocketAddr) {
        let mut resolved = self.resolved_addr.lock().unwrap();
        *resolved = Some(addr);
    }

    pub fn is_mdns_name(&self) -> bool {
        self.address.ends_with(".local")
    }

    /// equal is used to compare two candidates by value.
    pub fn equal(&self, other: &Candidate) -> bool {
        self.network_type == other.network_type
            && self.candidate_type == other.candidate_type
            && self.address == other.address
            && self.port == other.port
            && self.tcp_type == other.tcp_type
    }

    /// marshal returns the string representation of this candidate per
    /// RFC 5245 Section 15.1 (without any `candidate:` prefix).
    pub fn marshal(&self) -> String {
        let mut out = format!(
            "{} {} {} {} {} {} typ {}",
            self.foundation(),
            self.component,
            self.network_type.network_short(),
            self.priority(),
            self.address,
            self.port,
            self.candidate_type,
        );

        if let Some(related) = &self.related_address {
            out += format!(" raddr {} rport {}", related.address, related.port).as_str();
        }
        if self.tcp_type != TcpType::Unspecified {
            out += format!(" tcptype {}", self.tcp_type).as_str();
        }
        out
    }

    /// unmarshal parses a candidate-attribute string, accepting it with
    /// or without the `candidate:` / `a=candidate:` prefix.
    pub fn unmarshal(raw: &str) -> Result<Candidate> {
        let raw = raw
            .trim()
            .trim_start_matches("a=")
            .trim_start_matches("candidate:");
        let split: Vec<&str> = raw.split_whitespace().collect();
        if split.len() < 8 {
            return Err(Error::ErrAttributeTooShortIceCandidate);
        }

        let foundation = split[0].to_owned();
        let component: u16 = split[1].parse().map_err(|_| Error::ErrParseComponent)?;
        let protocol = split[2].to_lowercase();
        let priority: u32 = split[3].parse().map_err(|_| Error::ErrParsePriority)?;
        let address = split[4].to_owned();
        let port: u16 = split[5].parse().map_err(|_| Error::ErrParsePort)?;

        if split[6] != "typ" {
            return Err(Error::ErrParseType);
        }
        let candidate_type = match split[7] {
            "host" => CandidateType::Host,
            "srflx" => CandidateType::ServerReflexive,
            "prflx" => CandidateType::PeerReflexive,
            "relay" => CandidateType::Relay,
            _ => return Err(Error::ErrUnknownCandidateType),
        };

        // network type from the protocol and a best-effort address family
        let is_v6 = address.contains(':');
        let network_type = match (protocol.as_str(), is_v6) {
            ("udp", false) => NetworkType::Udp4,
            ("udp", true) => NetworkType::Udp6,
            ("tcp", false) => NetworkType::Tcp4,
            ("tcp", true) => NetworkType::Tcp6,
            _ => return Err(Error::ErrNetworkTypeUnknown),
        };

        let mut candidate = Candidate {
            network_type,
            candidate_type,
            address,
            port,
            component,
            priority_override: priority,
            foundation_override: foundation,
            ..Default::default()
        };

        // optional extensions: raddr/rport, tcptype, generation, ufrag
        let mut i = 8;
        let mut raddr: Option<String> = None;
        let mut rport: Option<u16> = None;
        while i + 1 < split.len() {
            match split[i] {
                "raddr" => raddr = Some(split[i + 1].to_owned()),
                "rport" => {
                    rport = Some(
                        split[i + 1]
                            .parse()
                            .map_err(|_| Error::ErrParseRelatedAddr)?,
                    )
                }
                "tcptype" => candidate.tcp_type = TcpType::from(split[i + 1]),
                // generation and ufrag are accepted and ignored
                _ => {}
            }
            i += 2;
        }
        if let (Some(address), Some(port)) = (raddr, rport) {
            candidate.related_address = Some(CandidateRelatedAddress { address, port });
        }

        Ok(candidate)
    }
}

/// CandidatePair is a combination of a local and remote candidate.
pub struct CandidatePair {
    pub local: Arc<Candidate>,
    pub remote: Arc<Candidate>,
    pub state: CandidatePairState,
    pub nominated: bool,
    pub binding_request_count: u16,
}

impl fmt::Display for CandidatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "prio {} (local, prio {}) {} <-> {} (remote, prio {})",
            self.priority(true),
            self.local.priority(),
            self.local,
            self.remote,
            self.remote.priority()
        )
    }
}

impl CandidatePair {
    pub fn new(local: Arc<Candidate>, remote: Arc<Candidate>) -> Self {
        CandidatePair {
            local,
            remote,
            state: CandidatePairState::Waiting,
            nominated: false,
            binding_request_count: 0,
        }
    }

    /// priority computes the 64-bit pair priority (RFC 8445 Section
    /// 6.1.2.3).
    pub fn priority(&self, is_controlling: bool) -> u64 {
        let (g, d) = if is_controlling {
            (self.local.priority() as u64, self.remote.priority() as u64)
        } else {
            (self.remote.priority() as u64, self.local.priority() as u64)
        };

        // 1 << 32 * min + 2 * max + (g > d ? 1 : 0)
        (1 << 32) * g.min(d) + 2 * g.max(d) + u64::from(g > d)
    }

    /// Candidates may pair only within a component, address family and
    /// transport, with compatible TCP types.
    pub fn compatible(local: &Candidate, remote: &Candidate) -> bool {
        if local.component != remote.component {
            return false;
        }
        if local.network_type.is_udp() != remote.network_type.is_udp() {
            return false;
        }
        if local.network_type.is_ipv4() != remote.network_type.is_ipv4()
            && !remote.is_mdns_name()
        {
            return false;
        }
        if local.network_type.is_tcp() && !local.tcp_type.compatible_with(&remote.tcp_type) {
            return false;
        }
        true
    }
}
