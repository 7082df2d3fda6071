#[cfg(test)]
mod integrity_test;

use std::fmt;

use md5::{Digest, Md5};
use ring::hmac;
use subtle::ConstantTimeEq;

use crate::attributes::*;
use crate::error::*;
use crate::message::*;

/// MessageIntegrity represents MESSAGE-INTEGRITY attribute. The value is
/// the HMAC-SHA1 key (password for short-term, MD5 digest for long-term
/// credentials).
///
/// RFC 5389 Section 15.4
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct MessageIntegrity(pub Vec<u8>);

fn new_hmac(key: &[u8], message: &[u8]) -> Vec<u8> {
    let mac = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, key);
    hmac::sign(&mac, message).as_ref().to_vec()
}

impl fmt::Display for MessageIntegrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KEY: 0x{:x?}", self.0)
    }
}

pub const MESSAGE_INTEGRITY_SIZE: usize = 20;

impl Setter for MessageIntegrity {
    /// add_to adds MESSAGE-INTEGRITY attribute to message.
    fn add_to(&self, m: &mut Message) -> Result<()> {
        // The message length must count the integrity attribute itself
        // before the HMAC input is taken.
        for a in &m.attributes.0 {
            if a.typ == ATTR_FINGERPRINT {
                return Err(Error::ErrFingerprintBeforeIntegrity);
            }
        }

        let prev_len = m.length;
        m.length += (ATTRIBUTE_HEADER_SIZE + MESSAGE_INTEGRITY_SIZE) as u32;
        m.write_length();
        let v = new_hmac(&self.0, &m.raw);
        m.length = prev_len;
        m.write_length();

        m.add(ATTR_MESSAGE_INTEGRITY, &v);
        Ok(())
    }
}

impl MessageIntegrity {
    /// new_long_term_integrity returns new MessageIntegrity with key for
    /// long-term credentials. Password, username, and realm must be
    /// SASL-prepared.
    pub fn new_long_term_integrity(username: &str, realm: &str, password: &str) -> Self {
        let s = format!("{username}:{realm}:{password}");

        let mut h = Md5::new();
        h.update(s.as_bytes());

        MessageIntegrity(h.finalize().as_slice().to_vec())
    }

    /// new_short_term_integrity returns new MessageIntegrity with key for
    /// short-term credentials. Password must be SASL-prepared.
    pub fn new_short_term_integrity(password: &str) -> Self {
        MessageIntegrity(password.as_bytes().to_vec())
    }

    /// check checks MESSAGE-INTEGRITY attribute.
    pub fn check(&self, m: &mut Message) -> Result<()> {
        let v = m.get(ATTR_MESSAGE_INTEGRITY)?;

        // Adjusting length in header to match m.raw.
        let length = m.length;
        let mut after_integrity = false;
        let mut size_reduced = 0u32;

        for a in &m.attributes.0 {
            if after_integrity {
                size_reduced += nearest_padded_value_length(a.value.len()) as u32;
                size_reduced += ATTRIBUTE_HEADER_SIZE as u32;
            }
            if a.typ == ATTR_MESSAGE_INTEGRITY {
                after_integrity = true;
            }
        }
        m.length -= size_reduced;
        m.write_length();

        // start of integrity attribute bytes
        let afterward = m.raw.len()
            - (m.raw.len() - MESSAGE_HEADER_SIZE - m.length as usize)
            - (ATTRIBUTE_HEADER_SIZE + MESSAGE_INTEGRITY_SIZE);
        let b = m.raw[..afterward].to_vec();
        let expected = new_hmac(&self.0, &b);

        m.length = length;
        m.write_length();

        if expected[..].ct_eq(&v[..]).into() {
            Ok(())
        } else {
            Err(Error::ErrIntegrityMismatch)
        }
    }
}
