use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("raw is too small for a SCTP chunk")]
    ErrChunkHeaderTooSmall,
    #[error("not enough data left in SCTP packet to satisfy requested length")]
    ErrChunkHeaderNotEnoughSpace,
    #[error("chunk has invalid length")]
    ErrChunkHeaderInvalidLength,
    #[error("ChunkType is not of expected type")]
    ErrChunkTypeUnexpected,
    #[error("chunk too short")]
    ErrChunkTooShort,
    #[error("SCTP packet is smaller than the header size")]
    ErrPacketRawTooSmall,
    #[error("checksum mismatch theirs")]
    ErrChecksumMismatch,
    #[error("param header too short")]
    ErrParamHeaderTooShort,
    #[error("param self reported length is shorter than header length")]
    ErrParamHeaderSelfReportedLengthShorter,
    #[error("unable to parse SCTP param, not enough data for complete header")]
    ErrParamHeaderParseFailed,
    #[error("association closed before connecting")]
    ErrAssociationClosedBeforeConn,
    #[error("association init failed")]
    ErrAssociationInitFailed,
    #[error("association handshake closed")]
    ErrAssociationHandshakeClosed,
    #[error("SCTP is already closed")]
    ErrAssociationClosed,
    #[error("association aborted: {0}")]
    ErrAbort(String),
    #[error("protocol violation: {0}")]
    ErrProtocolViolation(String),
    #[error("stream already closed")]
    ErrStreamClosed,
    #[error("stream reset by peer")]
    ErrStreamReset,
    #[error("short buffer")]
    ErrShortBuffer,
    #[error("outbound packet larger than maximum message size")]
    ErrOutboundPacketTooLarge,
    #[error("stream is not existing")]
    ErrStreamNotExisted,
    #[error("user data cannot be empty")]
    ErrEmptyUserData,
    #[error("{0}")]
    Util(#[from] util::Error),
    #[error("{0}")]
    Other(String),
}

impl From<Error> for util::Error {
    fn from(e: Error) -> Self {
        util::Error::from_std(e)
    }
}
