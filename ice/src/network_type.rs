use std::fmt;
use std::net::IpAddr;

use serde::Serialize;

use crate::error::*;

pub(crate) const UDP: &str = "udp";
pub(crate) const TCP: &str = "tcp";

/// NetworkType represents the transport and address family of a
/// candidate.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Serialize)]
pub enum NetworkType {
    #[serde(rename = "udp4")]
    Udp4,
    #[serde(rename = "udp6")]
    Udp6,
    #[serde(rename = "tcp4")]
    Tcp4,
    #[serde(rename = "tcp6")]
    Tcp6,
    #[serde(rename = "unspecified")]
    Unspecified,
}

impl Default for NetworkType {
    fn default() -> Self {
        NetworkType::Unspecified
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NetworkType::Udp4 => "udp4",
            NetworkType::Udp6 => "udp6",
            NetworkType::Tcp4 => "tcp4",
            NetworkType::Tcp6 => "tcp6",
            NetworkType::Unspecified => "unspecified",
        };
        write!(f, "{s}")
    }
}

impl NetworkType {
    /// is_udp returns whether the network type is UDP based.
    pub fn is_udp(&self) -> bool {
        *self == NetworkType::Udp4 || *self == NetworkType::Udp6
    }

    /// is_tcp returns whether the network type is TCP based.
    pub fn is_tcp(&self) -> bool {
        *self == NetworkType::Tcp4 || *self == NetworkType::Tcp6
    }

    /// is_ipv4 returns whether the network type is IPv4.
    pub fn is_ipv4(&self) -> bool {
        *self == NetworkType::Udp4 || *self == NetworkType::Tcp4
    }

    /// is_ipv6 returns whether the network type is IPv6.
    pub fn is_ipv6(&self) -> bool {
        *self == NetworkType::Udp6 || *self == NetworkType::Tcp6
    }

    /// network_short returns "udp" or "tcp".
    pub fn network_short(&self) -> String {
        match self {
            NetworkType::Udp4 | NetworkType::Udp6 => UDP.to_owned(),
            NetworkType::Tcp4 | NetworkType::Tcp6 => TCP.to_owned(),
            NetworkType::Unspecified => "unspecified".to_owned(),
        }
    }
}

/// determine_network_type derives the NetworkType from a transport name
/// and address.
pub fn determine_network_type(network: &str, ip: &IpAddr) -> Result<NetworkType> {
    let ipv4 = ip.is_ipv4();
    match network.to_lowercase().as_str() {
        UDP => Ok(if ipv4 {
            NetworkType::Udp4
        } else {
            NetworkType::Udp6
        }),
        TCP => Ok(if ipv4 {
            NetworkType::Tcp4
        } else {
            NetworkType::Tcp6
        }),
        _ => Err(Error::ErrNetworkTypeUnknown),
    }
}
