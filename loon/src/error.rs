use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("connection closed")]
    ErrConnectionClosed,
    #[error("data channel not open")]
    ErrDataChannelNotOpen,
    #[error("certificate is expired or not yet valid")]
    ErrCertificateExpired,
    #[error("the SDP does not contain a valid fingerprint")]
    ErrSessionDescriptionNoFingerprint,
    #[error("the remote certificate does not match the SDP fingerprint")]
    ErrFingerprintMismatch,
    #[error("the SDP does not contain ICE credentials")]
    ErrSessionDescriptionMissingIceCredentials,
    #[error("invalid SDP: {0}")]
    ErrSdpInvalid(String),
    #[error("invalid signaling state transition: {0}")]
    ErrSignalingStateTransitionInvalid(String),
    #[error("remote description is not set")]
    ErrNoRemoteDescription,
    #[error("ICE connection failed")]
    ErrIceFailed,
    #[error("DTLS transport is not started")]
    ErrDtlsTransportNotStarted,
    #[error("SCTP transport is not established")]
    ErrSctpNotEstablished,
    #[error("a mid must be unique within one session")]
    ErrMidNotUnique,
    #[error("sender does not carry the requested SSRC")]
    ErrSenderUnknownSsrc,
    #[error("{0}")]
    Util(#[from] util::Error),
    #[error("{0}")]
    Ice(#[from] ice::Error),
    #[error("{0}")]
    Dtls(#[from] dtls::Error),
    #[error("{0}")]
    Srtp(#[from] srtp::Error),
    #[error("{0}")]
    Sctp(#[from] sctp::Error),
    #[error("{0}")]
    Data(#[from] data::Error),
    #[error("{0}")]
    Rtp(#[from] rtp::Error),
    #[error("{0}")]
    Rtcp(#[from] rtcp::Error),
    #[error("{0}")]
    Other(String),
}
