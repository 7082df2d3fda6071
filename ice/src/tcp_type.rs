use std::fmt;

use serde::Serialize;

/// TCPType is the type of ICE TCP candidate (RFC 6544).
#[derive(PartialEq, Eq, Debug, Copy, Clone, Serialize)]
pub enum TcpType {
    /// The default; not a TCP candidate.
    #[serde(rename = "unspecified")]
    Unspecified,
    /// Active TCP candidates open outbound connections; they are
    /// generated on demand against remote passive candidates and never
    /// signalled with a real port.
    #[serde(rename = "active")]
    Active,
    /// Passive TCP candidates listen for inbound connections.
    #[serde(rename = "passive")]
    Passive,
    /// Simultaneous-open candidates do both.
    #[serde(rename = "so")]
    SimultaneousOpen,
}

impl From<&str> for TcpType {
    fn from(raw: &str) -> Self {
        match raw {
            "active" => TcpType::Active,
            "passive" => TcpType::Passive,
            "so" => TcpType::SimultaneousOpen,
            _ => TcpType::Unspecified,
        }
    }
}

impl fmt::Display for TcpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TcpType::Active => "active",
            TcpType::Passive => "passive",
            TcpType::SimultaneousOpen => "so",
            TcpType::Unspecified => "unspecified",
        };
        write!(f, "{s}")
    }
}

impl Default for TcpType {
    fn default() -> Self {
        TcpType::Unspecified
    }
}

impl TcpType {
    /// Candidate pairing rule: active pairs with passive, and
    /// simultaneous-open with itself.
    pub fn compatible_with(&self, other: &TcpType) -> bool {
        matches!(
            (self, other),
            (TcpType::Active, TcpType::Passive)
                | (TcpType::Passive, TcpType::Active)
                | (TcpType::SimultaneousOpen, TcpType::SimultaneousOpen)
        )
    }
}
