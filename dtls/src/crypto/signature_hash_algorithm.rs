use std::fmt;

/// HashAlgorithm, as defined by TLS SignatureAndHashAlgorithm.
///
/// https://tools.ietf.org/html/rfc5246#section-7.4.1.4.1
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256 = 4,
    Sha384 = 5,
    Unsupported = 0,
}

impl From<u8> for HashAlgorithm {
    fn from(val: u8) -> Self {
        match val {
            4 => HashAlgorithm::Sha256,
            5 => HashAlgorithm::Sha384,
            _ => HashAlgorithm::Unsupported,
        }
    }
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::Sha256
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sha256 => write!(f, "sha-256"),
            HashAlgorithm::Sha384 => write!(f, "sha-384"),
            HashAlgorithm::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// SignatureAlgorithm, the signing half of the pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    Rsa = 1,
    Ecdsa = 3,
    Unsupported = 0,
}

impl From<u8> for SignatureAlgorithm {
    fn from(val: u8) -> Self {
        match val {
            1 => SignatureAlgorithm::Rsa,
            3 => SignatureAlgorithm::Ecdsa,
            _ => SignatureAlgorithm::Unsupported,
        }
    }
}

impl Default for SignatureAlgorithm {
    fn default() -> Self {
        SignatureAlgorithm::Ecdsa
    }
}

/// SignatureHashAlgorithm is a signature/hash algorithm pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct SignatureHashAlgorithm {
    pub hash: HashAlgorithm,
    pub signature: SignatureAlgorithm,
}

/// The pairs we offer and accept.
pub fn default_signature_schemes() -> Vec<SignatureHashAlgorithm> {
    vec![
        SignatureHashAlgorithm {
            hash: HashAlgorithm::Sha256,
            signature: SignatureAlgorithm::Ecdsa,
        },
        SignatureHashAlgorithm {
            hash: HashAlgorithm::Sha256,
            signature: SignatureAlgorithm::Rsa,
        },
    ]
}
