use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("conn is closed")]
    ErrConnClosed,
    #[error("read/write timeout")]
    ErrDeadlineExceeded,
    #[error("context is not supported for export_keying_material")]
    ErrContextUnsupported,
    #[error("handshake is in progress")]
    ErrHandshakeInProgress,
    #[error("handshake timed out")]
    ErrHandshakeTimeout,
    #[error("invalid content type")]
    ErrInvalidContentType,
    #[error("invalid packet length")]
    ErrInvalidPacketLength,
    #[error("unable to determine if ClientKeyExchange is a public key or PSK Identity")]
    ErrAmbiguousPskIdentity,
    #[error("buffer is too small")]
    ErrBufferTooSmall,
    #[error("cipher suite is already initialized")]
    ErrCipherSuiteAlreadyInitialized,
    #[error("cipher suite has not been initialized")]
    ErrCipherSuiteNotInit,
    #[error("client sent certificate verify but we have no certificate to verify")]
    ErrCertificateVerifyNoCertificate,
    #[error("client+server do not support any shared cipher suites")]
    ErrCipherSuiteNoIntersection,
    #[error("client sent certificate but did not verify it")]
    ErrClientCertificateNotVerified,
    #[error("server required client verification, but got none")]
    ErrClientCertificateRequired,
    #[error("server responded with SRTP Profile we do not support")]
    ErrClientNoMatchingSrtpProfile,
    #[error("client required Extended Master Secret extension, but server does not support it")]
    ErrClientRequiredButNoServerEms,
    #[error("server hello can not be created without a cipher suite")]
    ErrCipherSuiteUnset,
    #[error("invalid or unknown cipher suite")]
    ErrInvalidCipherSuite,
    #[error("unable to find matching named curve")]
    ErrNoSupportedEllipticCurves,
    #[error("invalid named curve")]
    ErrInvalidNamedCurve,
    #[error("certificate request sent, but no certificate received")]
    ErrCertificateRequired,
    #[error("hash/signature algorithm pair is not supported")]
    ErrNoAvailableSignatureSchemes,
    #[error("no certificates configured")]
    ErrNoCertificates,
    #[error("alert is fatal: {0}")]
    ErrFatalAlert(String),
    #[error("peer sent close_notify")]
    ErrAlertCloseNotify,
    #[error("handshake message unset, unable to marshal")]
    ErrHandshakeMessageUnset,
    #[error("sequence number overflow")]
    ErrSequenceNumberOverflow,
    #[error("fragment buffer overflow: new size {new_size} is greater than specified max {max_size}")]
    ErrFragmentBufferOverflow { new_size: usize, max_size: usize },
    #[error("unhandled content type")]
    ErrUnhandledContextType,
    #[error("verification of the certificate signature failed")]
    ErrKeySignatureMismatch,
    #[error("decryption of the record failed")]
    ErrDecryptFailed,
    #[error("signature verification of the handshake transcript failed")]
    ErrVerifyDataMismatch,
    #[error("certificate is not valid for requested verification")]
    ErrInvalidCertificate,
    #[error("extension {0} is malformed")]
    ErrInvalidExtension(u16),
    #[error("{0}")]
    Other(String),
    #[error("{0}")]
    Io(#[source] IoError),
    #[error("{0}")]
    Util(#[from] util::Error),
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}
