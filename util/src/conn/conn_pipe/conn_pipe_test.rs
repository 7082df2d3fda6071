use super::*;

#[tokio::test]
async fn test_pipe_round_trip() -> Result<()> {
    let (a, b) = pipe();

    a.send(b"ping").await?;
    let mut buf = [0u8; 16];
    let n = b.recv(&mut buf).await?;
    assert_eq!(&buf[..n], b"ping");

    b.send(b"pong").await?;
    let n = a.recv(&mut buf).await?;
    assert_eq!(&buf[..n], b"pong");
    Ok(())
}

#[tokio::test]
async fn test_pipe_preserves_datagram_boundaries() -> Result<()> {
    let (a, b) = pipe();

    a.send(b"one").await?;
    a.send(b"two").await?;

    let mut buf = [0u8; 16];
    let n = b.recv(&mut buf).await?;
    assert_eq!(&buf[..n], b"one");
    let n = b.recv(&mut buf).await?;
    assert_eq!(&buf[..n], b"two");
    Ok(())
}
