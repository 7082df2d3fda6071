use std::time::Duration;

use super::*;

#[tokio::test]
async fn test_buffer_write_then_read() -> Result<()> {
    let buffer = Buffer::new(0);

    buffer.write(&[0, 1]).await?;
    buffer.write(&[2, 3, 4]).await?;

    let mut packet = [0u8; 4];
    let n = buffer.read(&mut packet, None).await?;
    assert_eq!(&packet[..n], &[0, 1]);

    let n = buffer.read(&mut packet, None).await?;
    assert_eq!(&packet[..n], &[2, 3, 4]);
    Ok(())
}

#[tokio::test]
async fn test_buffer_read_timeout() {
    let buffer = Buffer::new(0);
    let mut packet = [0u8; 4];
    let result = buffer
        .read(&mut packet, Some(Duration::from_millis(20)))
        .await;
    assert_eq!(result, Err(Error::ErrTimeout));
}

#[tokio::test]
async fn test_buffer_close_unblocks_reader() {
    let buffer = Buffer::new(0);
    let reader = buffer.clone();
    let handle = tokio::spawn(async move {
        let mut packet = [0u8; 4];
        reader.read(&mut packet, None).await
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    buffer.close().await;

    let result = handle.await.unwrap();
    assert_eq!(result, Err(Error::ErrBufferClosed));
}

#[tokio::test]
async fn test_buffer_short_read() {
    let buffer = Buffer::new(0);
    buffer.write(&[0, 1, 2, 3]).await.unwrap();

    let mut packet = [0u8; 2];
    let result = buffer.read(&mut packet, None).await;
    assert_eq!(result, Err(Error::ErrBufferShort));
}
