use std::fmt;

/// RTCIceGatheringState mirrors the ICE agent's gathering progress.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCIceGatheringState {
    Unspecified,
    New,
    Gathering,
    Complete,
}

impl Default for RTCIceGatheringState {
    fn default() -> Self {
        RTCIceGatheringState::New
    }
}

impl fmt::Display for RTCIceGatheringState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RTCIceGatheringState::Unspecified => "unspecified",
            RTCIceGatheringState::New => "new",
            RTCIceGatheringState::Gathering => "gathering",
            RTCIceGatheringState::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// RTCIceConnectionState mirrors the ICE agent's connection state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCIceConnectionState {
    Unspecified,
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

impl Default for RTCIceConnectionState {
    fn default() -> Self {
        RTCIceConnectionState::New
    }
}

impl fmt::Display for RTCIceConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RTCIceConnectionState::Unspecified => "unspecified",
            RTCIceConnectionState::New => "new",
            RTCIceConnectionState::Checking => "checking",
            RTCIceConnectionState::Connected => "connected",
            RTCIceConnectionState::Completed => "completed",
            RTCIceConnectionState::Disconnected => "disconnected",
            RTCIceConnectionState::Failed => "failed",
            RTCIceConnectionState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

impl From<ice::state::ConnectionState> for RTCIceConnectionState {
    fn from(state: ice::state::ConnectionState) -> Self {
        match state {
            ice::state::ConnectionState::New => RTCIceConnectionState::New,
            ice::state::ConnectionState::Checking => RTCIceConnectionState::Checking,
            ice::state::ConnectionState::Connected => RTCIceConnectionState::Connected,
            ice::state::ConnectionState::Completed => RTCIceConnectionState::Completed,
            ice::state::ConnectionState::Disconnected => RTCIceConnectionState::Disconnected,
            ice::state::ConnectionState::Failed => RTCIceConnectionState::Failed,
            ice::state::ConnectionState::Closed => RTCIceConnectionState::Closed,
            ice::state::ConnectionState::Unspecified => RTCIceConnectionState::Unspecified,
        }
    }
}

/// RTCDtlsTransportState is the DTLS endpoint's lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCDtlsTransportState {
    Unspecified,
    New,
    Connecting,
    Connected,
    Closed,
    Failed,
}

impl Default for RTCDtlsTransportState {
    fn default() -> Self {
        RTCDtlsTransportState::New
    }
}

impl fmt::Display for RTCDtlsTransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RTCDtlsTransportState::Unspecified => "unspecified",
            RTCDtlsTransportState::New => "new",
            RTCDtlsTransportState::Connecting => "connecting",
            RTCDtlsTransportState::Connected => "connected",
            RTCDtlsTransportState::Closed => "closed",
            RTCDtlsTransportState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// RTCPeerConnectionState is the aggregate of the ICE and DTLS states:
/// the worst state across all transports wins.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCPeerConnectionState {
    Unspecified,
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl Default for RTCPeerConnectionState {
    fn default() -> Self {
        RTCPeerConnectionState::New
    }
}

impl fmt::Display for RTCPeerConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RTCPeerConnectionState::Unspecified => "unspecified",
            RTCPeerConnectionState::New => "new",
            RTCPeerConnectionState::Connecting => "connecting",
            RTCPeerConnectionState::Connected => "connected",
            RTCPeerConnectionState::Disconnected => "disconnected",
            RTCPeerConnectionState::Failed => "failed",
            RTCPeerConnectionState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// derive_connection_state computes the aggregate per the W3C algorithm.
pub(crate) fn derive_connection_state(
    is_closed: bool,
    ice: RTCIceConnectionState,
    dtls: RTCDtlsTransportState,
) -> RTCPeerConnectionState {
    if is_closed {
        return RTCPeerConnectionState::Closed;
    }
    if ice == RTCIceConnectionState::Failed || dtls == RTCDtlsTransportState::Failed {
        return RTCPeerConnectionState::Failed;
    }
    if ice == RTCIceConnectionState::Disconnected {
        return RTCPeerConnectionState::Disconnected;
    }
    if (ice == RTCIceConnectionState::Connected || ice == RTCIceConnectionState::Completed)
        && dtls == RTCDtlsTransportState::Connected
    {
        return RTCPeerConnectionState::Connected;
    }
    if ice == RTCIceConnectionState::Checking || dtls == RTCDtlsTransportState::Connecting {
        return RTCPeerConnectionState::Connecting;
    }
    RTCPeerConnectionState::New
}
