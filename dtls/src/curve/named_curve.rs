use p256::ecdh::EphemeralSecret;
use p256::{EncodedPoint, PublicKey};
use rand::rngs::OsRng;

use crate::error::*;

/// NamedCurve identifies an elliptic curve group.
///
/// https://www.iana.org/assignments/tls-parameters/tls-parameters.xhtml#tls-parameters-8
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NamedCurve {
    P256 = 0x0017,
    X25519 = 0x001d,
    Unsupported = 0x0000,
}

impl From<u16> for NamedCurve {
    fn from(val: u16) -> Self {
        match val {
            0x0017 => NamedCurve::P256,
            0x001d => NamedCurve::X25519,
            _ => NamedCurve::Unsupported,
        }
    }
}

impl Default for NamedCurve {
    fn default() -> Self {
        NamedCurve::Unsupported
    }
}

/// The curves offered in supported_groups, most preferred first.
pub fn default_named_curves() -> Vec<NamedCurve> {
    vec![NamedCurve::X25519, NamedCurve::P256]
}

pub enum NamedCurvePrivateKey {
    EphemeralSecretP256(EphemeralSecret),
    StaticSecretX25519(x25519_dalek::StaticSecret),
}

/// NamedCurveKeypair is an ephemeral ECDH keypair for one handshake.
pub struct NamedCurveKeypair {
    pub curve: NamedCurve,
    pub public_key: Vec<u8>,
    pub private_key: NamedCurvePrivateKey,
}

impl NamedCurve {
    /// generate_keypair creates an ephemeral keypair on this curve.
    pub fn generate_keypair(&self) -> Result<NamedCurveKeypair> {
        match self {
            NamedCurve::P256 => {
                let private_key = EphemeralSecret::random(&mut OsRng);
                let public_key = EncodedPoint::from(private_key.public_key())
                    .as_bytes()
                    .to_vec();
                Ok(NamedCurveKeypair {
                    curve: NamedCurve::P256,
                    public_key,
                    private_key: NamedCurvePrivateKey::EphemeralSecretP256(private_key),
                })
            }
            NamedCurve::X25519 => {
                let private_key = x25519_dalek::StaticSecret::random_from_rng(OsRng);
                let public_key = x25519_dalek::PublicKey::from(&private_key)
                    .as_bytes()
                    .to_vec();
                Ok(NamedCurveKeypair {
                    curve: NamedCurve::X25519,
                    public_key,
                    private_key: NamedCurvePrivateKey::StaticSecretX25519(private_key),
                })
            }
            NamedCurve::Unsupported => Err(Error::ErrInvalidNamedCurve),
        }
    }
}

/// elliptic_curve_pre_master_secret runs ECDH against the remote public
/// key.
pub fn elliptic_curve_pre_master_secret(
    keypair: &NamedCurveKeypair,
    remote_public_key: &[u8],
) -> Result<Vec<u8>> {
    match &keypair.private_key {
        NamedCurvePrivateKey::EphemeralSecretP256(secret) => {
            let public = PublicKey::from_sec1_bytes(remote_public_key)
                .map_err(|_| Error::ErrInvalidNamedCurve)?;
            let shared = secret.diffie_hellman(&public);
            Ok(shared.raw_secret_bytes().to_vec())
        }
        NamedCurvePrivateKey::StaticSecretX25519(secret) => {
            if remote_public_key.len() != 32 {
                return Err(Error::ErrInvalidNamedCurve);
            }
            let mut remote = [0u8; 32];
            remote.copy_from_slice(remote_public_key);
            let shared = secret.diffie_hellman(&x25519_dalek::PublicKey::from(remote));
            Ok(shared.as_bytes().to_vec())
        }
    }
}
