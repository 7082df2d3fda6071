use super::*;

#[test]
fn test_p_hash_sha256_properties() -> Result<()> {
    let secret = b"secret";
    let seed = b"seed";
    let out = prf_p_hash(secret, seed, 32, CipherSuiteHash::Sha256)?;
    assert_eq!(out.len(), 32);
    // deterministic: same inputs produce same output
    let out2 = prf_p_hash(secret, seed, 32, CipherSuiteHash::Sha256)?;
    assert_eq!(out, out2);
    // a longer request extends, not re-randomizes, the stream
    let out3 = prf_p_hash(secret, seed, 48, CipherSuiteHash::Sha256)?;
    assert_eq!(&out3[..32], &out[..]);
    Ok(())
}

#[test]
fn test_master_secret_has_fixed_length() -> Result<()> {
    let pre = vec![0x11u8; 32];
    let cr = vec![0x22u8; 32];
    let sr = vec![0x33u8; 32];
    let master = prf_master_secret(&pre, &cr, &sr, CipherSuiteHash::Sha256)?;
    assert_eq!(master.len(), 48);
    Ok(())
}

#[test]
fn test_key_block_partition() -> Result<()> {
    let master = vec![0x42u8; 48];
    let cr = vec![0x01u8; 32];
    let sr = vec![0x02u8; 32];

    let keys = prf_encryption_keys(&master, &cr, &sr, 16, 4, CipherSuiteHash::Sha256)?;
    assert_eq!(keys.client_write_key.len(), 16);
    assert_eq!(keys.server_write_key.len(), 16);
    assert_eq!(keys.client_write_iv.len(), 4);
    assert_eq!(keys.server_write_iv.len(), 4);
    assert_ne!(keys.client_write_key, keys.server_write_key);
    Ok(())
}

#[test]
fn test_verify_data_differs_between_sides() -> Result<()> {
    let master = vec![0x42u8; 48];
    let transcript = b"handshake bytes";
    let client = prf_verify_data_client(&master, transcript, CipherSuiteHash::Sha256)?;
    let server = prf_verify_data_server(&master, transcript, CipherSuiteHash::Sha256)?;
    assert_eq!(client.len(), 12);
    assert_eq!(server.len(), 12);
    assert_ne!(client, server);
    Ok(())
}

#[test]
fn test_exporter_is_label_sensitive() -> Result<()> {
    let master = vec![0x42u8; 48];
    let cr = vec![0x01u8; 32];
    let sr = vec![0x02u8; 32];
    let a = prf_exporter(
        &master,
        "EXTRACTOR-dtls_srtp",
        &cr,
        &sr,
        60,
        CipherSuiteHash::Sha256,
    )?;
    let b = prf_exporter(&master, "other label", &cr, &sr, 60, CipherSuiteHash::Sha256)?;
    assert_eq!(a.len(), 60);
    assert_ne!(a, b);
    Ok(())
}
