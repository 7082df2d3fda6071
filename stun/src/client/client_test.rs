use util::conn::conn_pipe::pipe;

use super::*;
use crate::fingerprint::FINGERPRINT;

#[tokio::test]
async fn test_client_request_response() -> Result<()> {
    let (ca, cb) = pipe();

    let client = Client::new(ClientConfig::new(ca));

    // fake server: reflect every request as a success response
    tokio::spawn(async move {
        let mut buf = vec![0u8; 1500];
        while let Ok(n) = cb.recv(&mut buf).await {
            let mut req = Message::new();
            if req.unmarshal_binary(&buf[..n]).is_err() {
                continue;
            }
            let mut res = Message::new();
            res.build(&[
                Box::new(req.transaction_id),
                Box::new(BINDING_SUCCESS),
                Box::new(FINGERPRINT),
            ])
            .unwrap();
            let _ = cb.send(&res.raw).await;
        }
    });

    let mut req = Message::new();
    req.build(&[
        Box::new(TransactionId::new()),
        Box::new(BINDING_REQUEST),
        Box::new(FINGERPRINT),
    ])?;

    let res = client.send_request(&req).await?;
    assert_eq!(res.typ, BINDING_SUCCESS);
    assert_eq!(res.transaction_id, req.transaction_id);

    client.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_client_request_times_out() -> Result<()> {
    let (ca, _cb) = pipe();

    let mut config = ClientConfig::new(ca);
    config.rto = Duration::from_millis(10);
    config.timeout = Duration::from_millis(60);
    config.max_attempts = 3;
    let client = Client::new(config);

    let mut req = Message::new();
    req.build(&[Box::new(TransactionId::new()), Box::new(BINDING_REQUEST)])?;

    let result = client.send_request(&req).await;
    assert_eq!(result.err(), Some(Error::ErrTransactionTimeOut));

    client.close().await?;
    Ok(())
}
