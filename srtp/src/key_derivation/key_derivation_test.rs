use super::*;

// Test vectors from RFC 3711 Appendix B.3.
const MASTER_KEY: [u8; 16] = [
    0xE1, 0xF9, 0x7A, 0x0D, 0x3E, 0x01, 0x8B, 0xE0, 0xD6, 0x4F, 0xA3, 0x2C, 0x06, 0xDE, 0x41,
    0x39,
];
const MASTER_SALT: [u8; 14] = [
    0x0E, 0xC6, 0x75, 0xAD, 0x49, 0x8A, 0xFE, 0xEB, 0xB6, 0x96, 0x0B, 0x3A, 0xAB, 0xE6,
];

#[test]
fn test_session_key_derivation() -> Result<()> {
    let session_key = aes_cm_key_derivation(
        LABEL_SRTP_ENCRYPTION,
        &MASTER_KEY,
        &MASTER_SALT,
        0,
        MASTER_KEY.len(),
    )?;
    assert_eq!(
        session_key,
        vec![
            0xC6, 0x1E, 0x7A, 0x93, 0x74, 0x4F, 0x39, 0xEE, 0x10, 0x73, 0x4A, 0xFE, 0x3F, 0xF7,
            0xA0, 0x87
        ]
    );
    Ok(())
}

#[test]
fn test_session_salt_derivation() -> Result<()> {
    let session_salt = aes_cm_key_derivation(
        LABEL_SRTP_SALT,
        &MASTER_KEY,
        &MASTER_SALT,
        0,
        MASTER_SALT.len(),
    )?;
    assert_eq!(
        session_salt,
        vec![
            0x30, 0xCB, 0xBC, 0x08, 0x86, 0x3D, 0x8C, 0x85, 0xD4, 0x9D, 0xB3, 0x4A, 0x9A, 0xE1
        ]
    );
    Ok(())
}

#[test]
fn test_session_auth_key_length() -> Result<()> {
    let auth_key = aes_cm_key_derivation(
        LABEL_SRTP_AUTHENTICATION_TAG,
        &MASTER_KEY,
        &MASTER_SALT,
        0,
        20,
    )?;
    assert_eq!(auth_key.len(), 20);
    Ok(())
}

#[test]
fn test_kdr_not_supported() {
    let result = aes_cm_key_derivation(LABEL_SRTP_ENCRYPTION, &MASTER_KEY, &MASTER_SALT, 1, 16);
    assert_eq!(result, Err(Error::ErrNonZeroKdrNotSupported));
}

#[test]
fn test_generate_counter() {
    // counter = salt XOR (ssrc || roc || seq || 0x0000)
    let salt = [0u8; 14];
    let counter = generate_counter(0x1234, 1, 0xdeadbeef, &salt);
    assert_eq!(&counter[4..8], &0xdeadbeefu32.to_be_bytes());
    assert_eq!(&counter[8..12], &1u32.to_be_bytes());
    assert_eq!(&counter[12..14], &0x1234u16.to_be_bytes());
    assert_eq!(&counter[14..16], &[0, 0]);
}
