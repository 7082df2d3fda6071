use std::fmt;

/// ConnectionState is the overall status of the ICE agent.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum ConnectionState {
    Unspecified,
    /// The agent is gathering addresses.
    New,
    /// The agent is checking pairs but has not found a connection yet.
    Checking,
    /// The agent has a pairing, but is still checking other pairs.
    Connected,
    /// The agent has finished checking.
    Completed,
    /// The agent has not received a response to recent consent checks.
    Disconnected,
    /// The agent finished gathering and checking and failed to connect.
    Failed,
    /// The agent has finished and is no longer handling requests.
    Closed,
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Unspecified
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Unspecified => "Unspecified",
            ConnectionState::New => "New",
            ConnectionState::Checking => "Checking",
            ConnectionState::Connected => "Connected",
            ConnectionState::Completed => "Completed",
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Failed => "Failed",
            ConnectionState::Closed => "Closed",
        };
        write!(f, "{s}")
    }
}

/// GatheringState describes the progress of local candidate gathering.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum GatheringState {
    Unspecified,
    /// The agent was just created.
    New,
    /// The agent is discovering local candidates.
    Gathering,
    /// The agent has finished gathering.
    Complete,
}

impl Default for GatheringState {
    fn default() -> Self {
        GatheringState::Unspecified
    }
}

impl fmt::Display for GatheringState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GatheringState::Unspecified => "unspecified",
            GatheringState::New => "new",
            GatheringState::Gathering => "gathering",
            GatheringState::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// CandidatePairState is the state of a checklist entry.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum CandidatePairState {
    Unspecified,
    /// The check for this pair hasn't been performed and can't yet be.
    Frozen,
    /// The check has not been performed, and can be performed as soon as
    /// it is the highest-priority Waiting pair.
    Waiting,
    /// The check has been sent, but the transaction is in progress.
    InProgress,
    /// The check failed.
    Failed,
    /// The check produced a successful result.
    Succeeded,
}

impl Default for CandidatePairState {
    fn default() -> Self {
        CandidatePairState::Unspecified
    }
}

impl fmt::Display for CandidatePairState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CandidatePairState::Unspecified => "unspecified",
            CandidatePairState::Frozen => "frozen",
            CandidatePairState::Waiting => "waiting",
            CandidatePairState::InProgress => "in-progress",
            CandidatePairState::Failed => "failed",
            CandidatePairState::Succeeded => "succeeded",
        };
        write!(f, "{s}")
    }
}
