use sctp::association::{Association, Config as SctpConfig};
use util::conn::conn_pipe::pipe;

use super::*;

async fn association_pair() -> Result<(Arc<Association>, Arc<Association>)> {
    let (ca, cb) = pipe();
    let server = tokio::spawn(async move { Association::server(SctpConfig::new(cb)).await });
    let client = Association::client(SctpConfig::new(ca)).await?;
    let server = server
        .await
        .map_err(|e| Error::Other(e.to_string()))?
        .map_err(Error::Sctp)?;
    Ok((client, server))
}

#[tokio::test]
async fn test_data_channel_open_ack_and_transfer() -> Result<()> {
    let (client, server) = association_pair().await?;

    let dial = DataChannel::dial(
        &client,
        1,
        Config {
            label: "chat".to_owned(),
            ..Default::default()
        },
    )
    .await?;
    assert!(!dial.is_open(), "open before ACK must be pending");

    let accepted = DataChannel::accept(&server).await?;
    assert_eq!(accepted.label(), "chat");
    assert!(accepted.is_open());

    // dialer sees the ACK while reading
    dial.write_data_channel(&Bytes::from_static(b"hi"), true)
        .await?;
    let mut buf = vec![0u8; 64];
    let (n, is_string) = accepted.read_data_channel(&mut buf).await?;
    assert_eq!(&buf[..n], b"hi");
    assert!(is_string);

    accepted
        .write_data_channel(&Bytes::from_static(b"yo"), false)
        .await?;
    let (n, is_string) = dial.read_data_channel(&mut buf).await?;
    assert_eq!(&buf[..n], b"yo");
    assert!(!is_string);
    assert!(dial.is_open(), "the ACK must have been consumed");

    client.close().await.map_err(Error::Sctp)?;
    server.close().await.map_err(Error::Sctp)?;
    Ok(())
}

#[tokio::test]
async fn test_empty_messages_round_trip() -> Result<()> {
    let (client, server) = association_pair().await?;

    let dial = DataChannel::dial(&client, 1, Config::default()).await?;
    let accepted = DataChannel::accept(&server).await?;

    dial.write_data_channel(&Bytes::new(), true).await?;
    dial.write_data_channel(&Bytes::new(), false).await?;

    let mut buf = vec![0u8; 8];
    let (n, is_string) = accepted.read_data_channel(&mut buf).await?;
    assert_eq!(n, 0);
    assert!(is_string);
    let (n, is_string) = accepted.read_data_channel(&mut buf).await?;
    assert_eq!(n, 0);
    assert!(!is_string);

    client.close().await.map_err(Error::Sctp)?;
    server.close().await.map_err(Error::Sctp)?;
    Ok(())
}
