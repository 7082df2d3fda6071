use bytes::Bytes;
use util::conn::conn_pipe::pipe;

use super::*;
use crate::stream::ReliabilityType;

async fn association_pair() -> Result<(Arc<Association>, Arc<Association>)> {
    let (ca, cb) = pipe();

    let server = tokio::spawn(async move { Association::server(Config::new(cb)).await });
    let client = Association::client(Config::new(ca)).await?;
    let server = server
        .await
        .map_err(|e| Error::Other(e.to_string()))??;
    Ok((client, server))
}

#[tokio::test]
async fn test_association_handshake() -> Result<()> {
    let (client, server) = association_pair().await?;
    client.close().await?;
    server.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_stream_send_receive() -> Result<()> {
    let (client, server) = association_pair().await?;

    let s = client
        .open_stream(1, PayloadProtocolIdentifier::Binary)
        .await?;
    s.write(&Bytes::from_static(b"hello sctp")).await?;

    let accepted = server.accept_stream().await.expect("stream expected");
    assert_eq!(accepted.stream_identifier(), 1);

    let mut buf = vec![0u8; 64];
    let (n, ppid) = accepted.read_sctp(&mut buf).await?;
    assert_eq!(&buf[..n], b"hello sctp");
    assert_eq!(ppid, PayloadProtocolIdentifier::Binary);

    // and the reverse direction on the same stream
    accepted
        .write_sctp(&Bytes::from_static(b"pong"), PayloadProtocolIdentifier::Binary)
        .await?;
    let (n, _) = s.read_sctp(&mut buf).await?;
    assert_eq!(&buf[..n], b"pong");

    client.close().await?;
    server.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_large_message_fragmentation() -> Result<()> {
    let (client, server) = association_pair().await?;

    let s = client
        .open_stream(2, PayloadProtocolIdentifier::Binary)
        .await?;

    // 50 000 bytes forces fragmentation at the 1200-byte payload limit
    let blob: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
    s.write(&Bytes::from(blob.clone())).await?;

    let accepted = server.accept_stream().await.expect("stream expected");
    let mut buf = vec![0u8; 64 * 1024];
    let (n, _) = accepted.read_sctp(&mut buf).await?;
    assert_eq!(n, blob.len());
    assert_eq!(&buf[..n], &blob[..]);

    client.close().await?;
    server.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_ordered_delivery_across_messages() -> Result<()> {
    let (client, server) = association_pair().await?;

    let s = client
        .open_stream(3, PayloadProtocolIdentifier::Binary)
        .await?;
    for i in 0u8..10 {
        s.write(&Bytes::from(vec![i])).await?;
    }

    let accepted = server.accept_stream().await.expect("stream expected");
    let mut buf = vec![0u8; 16];
    for i in 0u8..10 {
        let (n, _) = accepted.read_sctp(&mut buf).await?;
        assert_eq!(n, 1);
        assert_eq!(buf[0], i, "reliable+ordered must preserve send order");
    }

    client.close().await?;
    server.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_buffered_amount_drains_on_ack() -> Result<()> {
    let (client, server) = association_pair().await?;

    let s = client
        .open_stream(4, PayloadProtocolIdentifier::Binary)
        .await?;
    s.write(&Bytes::from_static(b"0123456789")).await?;
    assert!(s.buffered_amount() > 0);

    let accepted = server.accept_stream().await.expect("stream expected");
    let mut buf = vec![0u8; 32];
    let _ = accepted.read_sctp(&mut buf).await?;

    // the SACK takes one delayed-ack interval at most
    let mut drained = false;
    for _ in 0..100 {
        if s.buffered_amount() == 0 {
            drained = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(drained, "buffered_amount must drain once SACKed");

    client.close().await?;
    server.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_unordered_reliability_params_accepted() -> Result<()> {
    let (client, server) = association_pair().await?;

    let s = client
        .open_stream(5, PayloadProtocolIdentifier::Binary)
        .await?;
    s.set_reliability_params(true, ReliabilityType::Rexmit, 0);
    s.write(&Bytes::from_static(b"unordered")).await?;

    let accepted = server.accept_stream().await.expect("stream expected");
    let mut buf = vec![0u8; 32];
    let (n, _) = accepted.read_sctp(&mut buf).await?;
    assert_eq!(&buf[..n], b"unordered");

    client.close().await?;
    server.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_stream_reset_signals_peer() -> Result<()> {
    let (client, server) = association_pair().await?;

    let s = client
        .open_stream(6, PayloadProtocolIdentifier::Binary)
        .await?;
    s.write(&Bytes::from_static(b"bye")).await?;

    let accepted = server.accept_stream().await.expect("stream expected");
    let mut buf = vec![0u8; 8];
    let _ = accepted.read_sctp(&mut buf).await?;

    s.close().await?;

    // the peer eventually observes the reset
    let result = accepted.read_sctp(&mut buf).await;
    assert_eq!(result.err(), Some(Error::ErrStreamReset));

    client.close().await?;
    server.close().await?;
    Ok(())
}
