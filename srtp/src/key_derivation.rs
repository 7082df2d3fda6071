#[cfg(test)]
mod key_derivation_test;

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;

use crate::error::{Error, Result};

pub const LABEL_SRTP_ENCRYPTION: u8 = 0x00;
pub const LABEL_SRTP_AUTHENTICATION_TAG: u8 = 0x01;
pub const LABEL_SRTP_SALT: u8 = 0x02;
pub const LABEL_SRTCP_ENCRYPTION: u8 = 0x03;
pub const LABEL_SRTCP_AUTHENTICATION_TAG: u8 = 0x04;
pub const LABEL_SRTCP_SALT: u8 = 0x05;

/// aes_cm_key_derivation derives a session key from the master key and
/// salt with the AES-CM PRF of RFC 3711 Section 4.3.
pub fn aes_cm_key_derivation(
    label: u8,
    master_key: &[u8],
    master_salt: &[u8],
    index_over_kdr: u64,
    out_len: usize,
) -> Result<Vec<u8>> {
    if index_over_kdr != 0 {
        // 24-bit "index DIV kdr" is not supported (pass 0)
        return Err(Error::ErrNonZeroKdrNotSupported);
    }

    // https://tools.ietf.org/html/rfc3711#appendix-B.3
    // The input block for AES-CM is generated by exclusive-oring the
    // master salt with the concatenation of the encryption key label 0x00
    // with (index DIV kdr), padded to the block size, then treating that
    // as an incrementing counter.
    let n_master_key = master_key.len();
    let n_salt = master_salt.len();

    let mut prf_in = vec![0u8; n_master_key];
    prf_in[..n_salt].copy_from_slice(master_salt);

    prf_in[7] ^= label;

    let cipher = Aes128::new_from_slice(master_key)
        .map_err(|e| Error::Other(e.to_string()))?;

    let mut out = vec![0u8; ((out_len + n_master_key) / n_master_key) * n_master_key];
    let mut i = 0u16;
    let mut n = 0usize;
    while n < out_len {
        prf_in[n_master_key - 2..].copy_from_slice(&i.to_be_bytes());

        let mut block = aes::Block::clone_from_slice(&prf_in);
        cipher.encrypt_block(&mut block);
        out[n..n + n_master_key].copy_from_slice(&block);

        i += 1;
        n += n_master_key;
    }

    out.truncate(out_len);
    Ok(out)
}

/// generate_counter builds the per-packet AES-CM counter (RFC 3711
/// Section 4.1.1).
pub fn generate_counter(
    sequence_number: u16,
    rollover_counter: u32,
    ssrc: u32,
    session_salt: &[u8],
) -> [u8; 16] {
    debug_assert!(session_salt.len() <= 16);

    let mut counter = [0u8; 16];
    counter[4..8].copy_from_slice(&ssrc.to_be_bytes());
    counter[8..12].copy_from_slice(&rollover_counter.to_be_bytes());
    counter[12..14].copy_from_slice(&sequence_number.to_be_bytes());

    for (i, s) in session_salt.iter().enumerate() {
        counter[i] ^= *s;
    }

    counter
}
