use util::conn::conn_pipe::pipe;

use super::*;

fn test_config() -> Result<Config> {
    let certificate = Certificate::generate_self_signed(vec!["loon".to_owned()])?;
    Ok(Config {
        certificates: vec![certificate],
        ..Default::default()
    })
}

async fn handshake_pair(
    client_config: Config,
    server_config: Config,
) -> Result<(DTLSConn, DTLSConn)> {
    let (ca, cb) = pipe();

    let server = tokio::spawn(async move { DTLSConn::server(cb, server_config).await });
    let client = DTLSConn::client(ca, client_config).await?;
    let server = server.await.map_err(|e| Error::Other(e.to_string()))??;
    Ok((client, server))
}

#[tokio::test]
async fn test_handshake_and_transfer() -> Result<()> {
    let (client, server) = handshake_pair(test_config()?, test_config()?).await?;

    client.write(b"hello from client").await?;
    let mut buf = [0u8; 100];
    let n = server.read(&mut buf).await?;
    assert_eq!(&buf[..n], b"hello from client");

    server.write(b"hello from server").await?;
    let n = client.read(&mut buf).await?;
    assert_eq!(&buf[..n], b"hello from server");

    client.close().await?;
    server.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_srtp_profile_negotiated() -> Result<()> {
    let (client, server) = handshake_pair(test_config()?, test_config()?).await?;

    let client_profile = client.selected_srtp_protection_profile().await;
    let server_profile = server.selected_srtp_protection_profile().await;
    assert_eq!(client_profile, server_profile);
    assert_ne!(client_profile, SrtpProtectionProfile::Unsupported);
    Ok(())
}

#[tokio::test]
async fn test_exported_keying_material_matches() -> Result<()> {
    let (client, server) = handshake_pair(test_config()?, test_config()?).await?;

    let client_material = client
        .export_keying_material("EXTRACTOR-dtls_srtp", 60)
        .await?;
    let server_material = server
        .export_keying_material("EXTRACTOR-dtls_srtp", 60)
        .await?;
    assert_eq!(client_material.len(), 60);
    assert_eq!(client_material, server_material);
    Ok(())
}

#[tokio::test]
async fn test_peer_certificates_surface() -> Result<()> {
    let client_config = test_config()?;
    let server_config = test_config()?;
    let client_cert_der = client_config.certificates[0].certificate[0].clone();
    let server_cert_der = server_config.certificates[0].certificate[0].clone();

    let (client, server) = handshake_pair(client_config, server_config).await?;

    assert_eq!(client.peer_certificates().await, vec![server_cert_der]);
    assert_eq!(server.peer_certificates().await, vec![client_cert_der]);
    Ok(())
}

#[tokio::test]
async fn test_handshake_chacha20_only() -> Result<()> {
    let mut client_config = test_config()?;
    client_config.cipher_suites =
        vec![CipherSuiteId::Tls_Ecdhe_Ecdsa_With_Chacha20_Poly1305_Sha256];
    let server_config = test_config()?;

    let (client, server) = handshake_pair(client_config, server_config).await?;

    client.write(b"chacha").await?;
    let mut buf = [0u8; 32];
    let n = server.read(&mut buf).await?;
    assert_eq!(&buf[..n], b"chacha");
    Ok(())
}

#[tokio::test]
async fn test_handshake_no_common_suite_fails() -> Result<()> {
    let mut client_config = test_config()?;
    client_config.cipher_suites = vec![CipherSuiteId::Tls_Ecdhe_Rsa_With_Aes_128_Gcm_Sha256];
    client_config.handshake_timeout = std::time::Duration::from_millis(500);
    let mut server_config = test_config()?;
    // the server holds an ECDSA certificate, so an RSA-only client offer
    // cannot be served
    server_config.handshake_timeout = std::time::Duration::from_millis(500);

    let result = handshake_pair(client_config, server_config).await;
    assert!(result.is_err());
    Ok(())
}
