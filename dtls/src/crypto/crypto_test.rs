use super::*;

#[test]
fn test_generate_self_signed() -> Result<()> {
    let cert = Certificate::generate_self_signed(vec!["loon".to_owned()])?;
    assert_eq!(cert.certificate.len(), 1);
    assert!(!cert.certificate[0].is_empty());
    assert_eq!(cert.private_key.signature_algorithm(), SignatureAlgorithm::Ecdsa);

    // the DER must parse as X.509
    let (_, parsed) = x509_parser::parse_x509_certificate(&cert.certificate[0])
        .map_err(|e| Error::Other(e.to_string()))?;
    assert!(parsed.validity().is_valid());
    Ok(())
}

#[test]
fn test_key_signature_round_trip() -> Result<()> {
    let cert = Certificate::generate_self_signed(vec!["loon".to_owned()])?;
    let client_random = [0x11u8; 32];
    let server_random = [0x22u8; 32];
    let params = b"named-curve-params";

    let signature =
        generate_key_signature(&client_random, &server_random, params, &cert.private_key)?;

    let algorithm = SignatureHashAlgorithm {
        hash: HashAlgorithm::Sha256,
        signature: SignatureAlgorithm::Ecdsa,
    };
    verify_key_signature(
        &client_random,
        &server_random,
        params,
        &algorithm,
        &signature,
        &cert.certificate[0],
    )?;

    // a different transcript must not verify
    let result = verify_key_signature(
        &server_random,
        &client_random,
        params,
        &algorithm,
        &signature,
        &cert.certificate[0],
    );
    assert_eq!(result, Err(Error::ErrKeySignatureMismatch));
    Ok(())
}

#[test]
fn test_certificate_verify_round_trip() -> Result<()> {
    let cert = Certificate::generate_self_signed(vec!["loon".to_owned()])?;
    let transcript = b"concatenated handshake messages";

    let signature = cert.private_key.sign(transcript)?;
    let algorithm = SignatureHashAlgorithm {
        hash: HashAlgorithm::Sha256,
        signature: SignatureAlgorithm::Ecdsa,
    };
    verify_certificate_verify(transcript, &algorithm, &signature, &cert.certificate[0])?;

    let result = verify_certificate_verify(
        b"tampered transcript",
        &algorithm,
        &signature,
        &cert.certificate[0],
    );
    assert_eq!(result, Err(Error::ErrKeySignatureMismatch));
    Ok(())
}

#[test]
fn test_private_key_clone_signs_identically_verifiable() -> Result<()> {
    let cert = Certificate::generate_self_signed(vec!["loon".to_owned()])?;
    let cloned = cert.private_key.clone();
    let signature = cloned.sign(b"data")?;
    let algorithm = SignatureHashAlgorithm {
        hash: HashAlgorithm::Sha256,
        signature: SignatureAlgorithm::Ecdsa,
    };
    verify_certificate_verify(b"data", &algorithm, &signature, &cert.certificate[0])?;
    Ok(())
}
