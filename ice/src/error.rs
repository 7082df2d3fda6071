use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("the agent is closed")]
    ErrClosed,
    #[error("found not  supported network type")]
    ErrNetworkTypeUnknown,
    #[error("connecting with bad local address")]
    ErrLocalUfragInsufficientBits,
    #[error("local password is less than 22 bytes long")]
    ErrLocalPwdInsufficientBits,
    #[error("remote ufrag is empty")]
    ErrRemoteUfragEmpty,
    #[error("remote pwd is empty")]
    ErrRemotePwdEmpty,
    #[error("no candidate pairs available")]
    ErrNoCandidatePairs,
    #[error("connection state is not connected, unable to send")]
    ErrNotConnected,
    #[error("attempted to start agent twice")]
    ErrMultipleStart,
    #[error("failed to parse address")]
    ErrAddressParseFailed,
    #[error("unknown candidate type")]
    ErrUnknownCandidateType,
    #[error("attribute not long enough to be ICE candidate")]
    ErrAttributeTooShortIceCandidate,
    #[error("could not parse component")]
    ErrParseComponent,
    #[error("could not parse priority")]
    ErrParsePriority,
    #[error("could not parse port")]
    ErrParsePort,
    #[error("could not parse related addresses")]
    ErrParseRelatedAddr,
    #[error("could not parse type")]
    ErrParseType,
    #[error("unknown role")]
    ErrUnknownRole,
    #[error("invalid url")]
    ErrInvalidUrl,
    #[error("invalid scheme type")]
    ErrSchemeType,
    #[error("queries must be in the form of 'transport=udp'")]
    ErrInvalidQuery,
    #[error("gathering is already in progress")]
    ErrGatheringInProgress,
    #[error("mDNS resolution failed")]
    ErrMulticastDnsLookup,
    #[error("{0}")]
    Util(#[from] util::Error),
    #[error("{0}")]
    Stun(#[from] stun::Error),
    #[error("{0}")]
    Turn(#[from] turn::Error),
    #[error("{0}")]
    Mdns(#[from] mdns::Error),
    #[error("{0}")]
    Other(String),
}
