#[cfg(test)]
mod crypto_test;

pub mod crypto_chacha20;
pub mod crypto_gcm;
pub mod signature_hash_algorithm;

use rcgen::{CertificateParams, KeyPair};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, RsaKeyPair};

use crate::error::*;
use signature_hash_algorithm::*;

/// Certificate is our identity: a DER chain (leaf first) plus the leaf's
/// private key.
pub struct Certificate {
    pub certificate: Vec<Vec<u8>>,
    pub private_key: CryptoPrivateKey,
}

impl Clone for Certificate {
    fn clone(&self) -> Self {
        Certificate {
            certificate: self.certificate.clone(),
            private_key: self.private_key.clone(),
        }
    }
}

impl Certificate {
    /// generate_self_signed produces an ECDSA P-256 certificate with the
    /// given subject alt names.
    pub fn generate_self_signed(subject_alt_names: Vec<String>) -> Result<Self> {
        let key_pair = KeyPair::generate(&rcgen::PKCS_ECDSA_P256_SHA256)
            .map_err(|e| Error::Other(e.to_string()))?;
        let serialized_der = key_pair.serialize_der();

        let mut params = CertificateParams::new(subject_alt_names);
        params.alg = &rcgen::PKCS_ECDSA_P256_SHA256;
        params.key_pair = Some(key_pair);

        let x509 = rcgen::Certificate::from_params(params)
            .map_err(|e| Error::Other(e.to_string()))?;
        let certificate = x509
            .serialize_der()
            .map_err(|e| Error::Other(e.to_string()))?;

        let private_key = CryptoPrivateKey::from_pkcs8_ecdsa(&serialized_der)?;

        Ok(Certificate {
            certificate: vec![certificate],
            private_key,
        })
    }
}

pub enum CryptoPrivateKeyKind {
    Ecdsa256(EcdsaKeyPair),
    Rsa256(RsaKeyPair),
}

/// CryptoPrivateKey is the leaf's signing key. Cloning re-parses from
/// the retained PKCS#8 document since ring key pairs are not Clone.
pub struct CryptoPrivateKey {
    pub kind: CryptoPrivateKeyKind,
    pub serialized_der: Vec<u8>,
}

impl Clone for CryptoPrivateKey {
    fn clone(&self) -> Self {
        match &self.kind {
            CryptoPrivateKeyKind::Ecdsa256(_) => {
                CryptoPrivateKey::from_pkcs8_ecdsa(&self.serialized_der)
                    .expect("already-validated key must re-parse")
            }
            CryptoPrivateKeyKind::Rsa256(_) => {
                CryptoPrivateKey::from_pkcs8_rsa(&self.serialized_der)
                    .expect("already-validated key must re-parse")
            }
        }
    }
}

impl CryptoPrivateKey {
    pub fn from_pkcs8_ecdsa(der: &[u8]) -> Result<Self> {
        let pair = EcdsaKeyPair::from_pkcs8(
            &ring::signature::ECDSA_P256_SHA256_ASN1_SIGNING,
            der,
            &SystemRandom::new(),
        )
        .map_err(|e| Error::Other(e.to_string()))?;
        Ok(CryptoPrivateKey {
            kind: CryptoPrivateKeyKind::Ecdsa256(pair),
            serialized_der: der.to_vec(),
        })
    }

    pub fn from_pkcs8_rsa(der: &[u8]) -> Result<Self> {
        let pair = RsaKeyPair::from_pkcs8(der).map_err(|e| Error::Other(e.to_string()))?;
        Ok(CryptoPrivateKey {
            kind: CryptoPrivateKeyKind::Rsa256(pair),
            serialized_der: der.to_vec(),
        })
    }

    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self.kind {
            CryptoPrivateKeyKind::Ecdsa256(_) => SignatureAlgorithm::Ecdsa,
            CryptoPrivateKeyKind::Rsa256(_) => SignatureAlgorithm::Rsa,
        }
    }

    /// Signs msg with SHA-256 and this key (ASN.1 for ECDSA, PKCS#1 v1.5
    /// for RSA).
    pub fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        match &self.kind {
            CryptoPrivateKeyKind::Ecdsa256(pair) => pair
                .sign(&SystemRandom::new(), msg)
                .map(|s| s.as_ref().to_vec())
                .map_err(|e| Error::Other(e.to_string())),
            CryptoPrivateKeyKind::Rsa256(pair) => {
                let mut signature = vec![0u8; pair.public().modulus_len()];
                pair.sign(
                    &ring::signature::RSA_PKCS1_SHA256,
                    &SystemRandom::new(),
                    msg,
                    &mut signature,
                )
                .map_err(|e| Error::Other(e.to_string()))?;
                Ok(signature)
            }
        }
    }
}

/// value_key_message builds the byte string signed in ServerKeyExchange.
pub(crate) fn value_key_message(
    client_random: &[u8],
    server_random: &[u8],
    public_key_params: &[u8],
) -> Vec<u8> {
    let mut msg = Vec::with_capacity(client_random.len() + server_random.len() + public_key_params.len());
    msg.extend_from_slice(client_random);
    msg.extend_from_slice(server_random);
    msg.extend_from_slice(public_key_params);
    msg
}

/// generate_key_signature signs the ECDHE parameters for
/// ServerKeyExchange.
pub(crate) fn generate_key_signature(
    client_random: &[u8],
    server_random: &[u8],
    public_key_params: &[u8],
    private_key: &CryptoPrivateKey,
) -> Result<Vec<u8>> {
    let msg = value_key_message(client_random, server_random, public_key_params);
    private_key.sign(&msg)
}

/// verify_key_signature checks the peer's ServerKeyExchange signature
/// against the leaf certificate it presented.
pub(crate) fn verify_key_signature(
    client_random: &[u8],
    server_random: &[u8],
    public_key_params: &[u8],
    algorithm: &SignatureHashAlgorithm,
    signature: &[u8],
    peer_certificate: &[u8],
) -> Result<()> {
    let msg = value_key_message(client_random, server_random, public_key_params);
    verify_signature(&msg, algorithm, signature, peer_certificate)
}

/// verify_certificate_verify checks the peer's transcript signature.
pub(crate) fn verify_certificate_verify(
    handshake_bodies: &[u8],
    algorithm: &SignatureHashAlgorithm,
    signature: &[u8],
    peer_certificate: &[u8],
) -> Result<()> {
    verify_signature(handshake_bodies, algorithm, signature, peer_certificate)
}

fn verify_signature(
    msg: &[u8],
    algorithm: &SignatureHashAlgorithm,
    signature: &[u8],
    peer_certificate: &[u8],
) -> Result<()> {
    let (_, cert) = x509_parser::parse_x509_certificate(peer_certificate)
        .map_err(|e| Error::Other(e.to_string()))?;
    let spki = cert.public_key();
    let public_key = spki.subject_public_key.data.as_ref();

    let verify_alg: &dyn ring::signature::VerificationAlgorithm = match algorithm.signature {
        SignatureAlgorithm::Ecdsa => &ring::signature::ECDSA_P256_SHA256_ASN1,
        SignatureAlgorithm::Rsa => &ring::signature::RSA_PKCS1_2048_8192_SHA256,
        _ => return Err(Error::ErrNoAvailableSignatureSchemes),
    };

    ring::signature::UnparsedPublicKey::new(verify_alg, public_key)
        .verify(msg, signature)
        .map_err(|_| Error::ErrKeySignatureMismatch)
}
