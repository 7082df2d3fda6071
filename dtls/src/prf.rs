#[cfg(test)]
mod prf_test;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha384};

use crate::error::*;

pub(crate) const MASTER_SECRET_LENGTH: usize = 48;

/// The PRF hash family, fixed by the negotiated cipher suite.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CipherSuiteHash {
    Sha256,
    Sha384,
}

/// EncryptionKeys is the expanded key block for an AEAD suite.
#[derive(Debug, Clone)]
pub struct EncryptionKeys {
    pub master_secret: Vec<u8>,
    pub client_write_key: Vec<u8>,
    pub server_write_key: Vec<u8>,
    pub client_write_iv: Vec<u8>,
    pub server_write_iv: Vec<u8>,
}

fn hmac_sha(hash: CipherSuiteHash, key: &[u8], data: &[&[u8]]) -> Result<Vec<u8>> {
    match hash {
        CipherSuiteHash::Sha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(key)
                .map_err(|e| Error::Other(e.to_string()))?;
            for d in data {
                mac.update(d);
            }
            Ok(mac.finalize().into_bytes().to_vec())
        }
        CipherSuiteHash::Sha384 => {
            let mut mac = Hmac::<Sha384>::new_from_slice(key)
                .map_err(|e| Error::Other(e.to_string()))?;
            for d in data {
                mac.update(d);
            }
            Ok(mac.finalize().into_bytes().to_vec())
        }
    }
}

/// prf_p_hash is P_hash from RFC 5246 Section 5: HMAC chaining until
/// enough output has been produced.
pub fn prf_p_hash(
    secret: &[u8],
    seed: &[u8],
    requested_length: usize,
    hash: CipherSuiteHash,
) -> Result<Vec<u8>> {
    let mut last_round = seed.to_vec();
    let mut out = vec![];

    while out.len() < requested_length {
        last_round = hmac_sha(hash, secret, &[&last_round])?;
        let with_secret = hmac_sha(hash, secret, &[&last_round, seed])?;
        out.extend_from_slice(&with_secret);
    }

    out.truncate(requested_length);
    Ok(out)
}

fn prf(
    secret: &[u8],
    label: &str,
    seed: &[u8],
    requested_length: usize,
    hash: CipherSuiteHash,
) -> Result<Vec<u8>> {
    let mut label_seed = label.as_bytes().to_vec();
    label_seed.extend_from_slice(seed);
    prf_p_hash(secret, &label_seed, requested_length, hash)
}

pub fn prf_master_secret(
    pre_master_secret: &[u8],
    client_random: &[u8],
    server_random: &[u8],
    hash: CipherSuiteHash,
) -> Result<Vec<u8>> {
    let mut seed = client_random.to_vec();
    seed.extend_from_slice(server_random);
    prf(
        pre_master_secret,
        "master secret",
        &seed,
        MASTER_SECRET_LENGTH,
        hash,
    )
}

/// prf_extended_master_secret binds the master secret to the full hello
/// transcript (RFC 7627).
pub fn prf_extended_master_secret(
    pre_master_secret: &[u8],
    session_hash: &[u8],
    hash: CipherSuiteHash,
) -> Result<Vec<u8>> {
    prf(
        pre_master_secret,
        "extended master secret",
        session_hash,
        MASTER_SECRET_LENGTH,
        hash,
    )
}

pub fn hash_transcript(handshake_bodies: &[u8], hash: CipherSuiteHash) -> Vec<u8> {
    match hash {
        CipherSuiteHash::Sha256 => Sha256::digest(handshake_bodies).to_vec(),
        CipherSuiteHash::Sha384 => Sha384::digest(handshake_bodies).to_vec(),
    }
}

pub fn prf_verify_data_client(
    master_secret: &[u8],
    handshake_bodies: &[u8],
    hash: CipherSuiteHash,
) -> Result<Vec<u8>> {
    let transcript = hash_transcript(handshake_bodies, hash);
    prf(master_secret, "client finished", &transcript, 12, hash)
}

pub fn prf_verify_data_server(
    master_secret: &[u8],
    handshake_bodies: &[u8],
    hash: CipherSuiteHash,
) -> Result<Vec<u8>> {
    let transcript = hash_transcript(handshake_bodies, hash);
    prf(master_secret, "server finished", &transcript, 12, hash)
}

/// prf_encryption_keys expands the key block. AEAD suites carry no MAC
/// keys, so the block is keys then fixed IVs (RFC 5246 Section 6.3; note
/// the server_random || client_random seed order).
pub fn prf_encryption_keys(
    master_secret: &[u8],
    client_random: &[u8],
    server_random: &[u8],
    key_len: usize,
    iv_len: usize,
    hash: CipherSuiteHash,
) -> Result<EncryptionKeys> {
    let mut seed = server_random.to_vec();
    seed.extend_from_slice(client_random);

    let material = prf(
        master_secret,
        "key expansion",
        &seed,
        2 * key_len + 2 * iv_len,
        hash,
    )?;

    let mut offset = 0;
    let client_write_key = material[offset..offset + key_len].to_vec();
    offset += key_len;
    let server_write_key = material[offset..offset + key_len].to_vec();
    offset += key_len;
    let client_write_iv = material[offset..offset + iv_len].to_vec();
    offset += iv_len;
    let server_write_iv = material[offset..offset + iv_len].to_vec();

    Ok(EncryptionKeys {
        master_secret: master_secret.to_vec(),
        client_write_key,
        server_write_key,
        client_write_iv,
        server_write_iv,
    })
}

/// prf_exporter implements the RFC 5705 keying material exporter
/// (without context), used for DTLS-SRTP key export (RFC 5764).
pub fn prf_exporter(
    master_secret: &[u8],
    label: &str,
    client_random: &[u8],
    server_random: &[u8],
    requested_length: usize,
    hash: CipherSuiteHash,
) -> Result<Vec<u8>> {
    let mut seed = client_random.to_vec();
    seed.extend_from_slice(server_random);
    prf(master_secret, label, &seed, requested_length, hash)
}
