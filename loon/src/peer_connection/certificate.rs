use dtls::crypto::Certificate;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// RTCDtlsFingerprint is the hash-and-digest pair published in SDP.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTCDtlsFingerprint {
    pub algorithm: String,
    pub value: String,
}

/// RTCCertificate represents the x509 certificate used to authenticate
/// the DTLS transport; its fingerprint is what the SDP pins.
pub struct RTCCertificate {
    pub(crate) certificate: Certificate,
}

impl Clone for RTCCertificate {
    fn clone(&self) -> Self {
        RTCCertificate {
            certificate: self.certificate.clone(),
        }
    }
}

impl RTCCertificate {
    /// generate creates a self-signed ECDSA P-256 certificate.
    pub fn generate() -> Result<Self> {
        let certificate = Certificate::generate_self_signed(vec!["WebRTC".to_owned()])
            .map_err(Error::Dtls)?;
        Ok(RTCCertificate { certificate })
    }

    /// from_existing wraps a caller-provided DTLS certificate.
    pub fn from_existing(certificate: Certificate) -> Self {
        RTCCertificate { certificate }
    }

    /// get_fingerprints returns the SHA-256 fingerprints of the chain.
    pub fn get_fingerprints(&self) -> Vec<RTCDtlsFingerprint> {
        self.certificate
            .certificate
            .iter()
            .map(|der| RTCDtlsFingerprint {
                algorithm: "sha-256".to_owned(),
                value: fingerprint_of(der),
            })
            .collect()
    }
}

/// Colon-separated lowercase hex SHA-256, the `a=fingerprint` format.
pub(crate) fn fingerprint_of(der: &[u8]) -> String {
    let digest = Sha256::digest(der);
    digest
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<String>>()
        .join(":")
}

#[cfg(test)]
mod certificate_test {
    use super::*;

    #[test]
    fn test_generate_and_fingerprint() -> Result<()> {
        let cert = RTCCertificate::generate()?;
        let fps = cert.get_fingerprints();
        assert_eq!(fps.len(), 1);
        assert_eq!(fps[0].algorithm, "sha-256");
        // 32 bytes -> 32 hex pairs joined by colons
        assert_eq!(fps[0].value.len(), 32 * 2 + 31);
        Ok(())
    }

    #[test]
    fn test_fingerprints_are_unique_per_certificate() -> Result<()> {
        let a = RTCCertificate::generate()?;
        let b = RTCCertificate::generate()?;
        assert_ne!(
            a.get_fingerprints()[0].value,
            b.get_fingerprints()[0].value
        );
        Ok(())
    }
}
