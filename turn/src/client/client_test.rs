use std::net::SocketAddr;

use stun::attributes::*;
use stun::error_code::*;
use stun::integrity::MessageIntegrity;
use stun::textattrs::TextAttribute;
use util::conn::conn_pipe::pipe;
use util::Conn;

use super::*;
use crate::proto::relayaddr::RelayedAddress;

fn serv_addr() -> SocketAddr {
    "127.0.0.1:3478".parse().unwrap()
}

/// Minimal in-test TURN server: answers the first Allocate with 401 plus
/// realm/nonce, then grants the authenticated retry.
async fn run_mock_allocation_server(conn: std::sync::Arc<util::conn::conn_pipe::PipeConn>) {
    let mut buf = vec![0u8; 1500];
    loop {
        let Ok(n) = conn.recv(&mut buf).await else {
            return;
        };
        if !stun::message::is_message(&buf[..n]) {
            continue;
        }
        let mut req = Message::new();
        if req.unmarshal_binary(&buf[..n]).is_err() {
            continue;
        }
        if req.typ.method != METHOD_ALLOCATE {
            continue;
        }

        let mut res = Message::new();
        if !req.contains(ATTR_MESSAGE_INTEGRITY) {
            res.build(&[
                Box::new(req.transaction_id),
                Box::new(MessageType::new(METHOD_ALLOCATE, CLASS_ERROR_RESPONSE)),
                Box::new(CODE_UNAUTHORIZED),
                Box::new(TextAttribute::new(ATTR_REALM, "loon.test".to_owned())),
                Box::new(TextAttribute::new(ATTR_NONCE, "nonce-0".to_owned())),
            ])
            .unwrap();
        } else {
            // verify the long-term credentials before granting
            let mut verify = req.clone();
            let integrity =
                MessageIntegrity::new_long_term_integrity("user", "loon.test", "pass");
            assert!(integrity.check(&mut verify).is_ok());

            res.build(&[
                Box::new(req.transaction_id),
                Box::new(MessageType::new(METHOD_ALLOCATE, CLASS_SUCCESS_RESPONSE)),
                Box::new(RelayedAddress {
                    ip: "127.0.0.1".parse().unwrap(),
                    port: 50000,
                }),
                Box::new(crate::proto::lifetime::Lifetime(
                    std::time::Duration::from_secs(600),
                )),
            ])
            .unwrap();
        }
        let _ = conn.send(&res.raw).await;
    }
}

#[tokio::test]
async fn test_allocate_with_401_retry() -> Result<()> {
    let (client_conn, server_conn) = pipe();
    tokio::spawn(run_mock_allocation_server(server_conn));

    let client = Client::new(ClientConfig {
        stun_serv_addr: None,
        turn_serv_addr: serv_addr(),
        username: "user".to_owned(),
        password: "pass".to_owned(),
        realm: String::new(),
        software: String::new(),
        rto: std::time::Duration::from_millis(100),
        conn: client_conn,
    })
    .await?;

    let relay = client.allocate().await?;
    assert_eq!(
        relay.relayed_addr(),
        "127.0.0.1:50000".parse::<SocketAddr>().unwrap()
    );

    // a second allocate on the same client must be refused
    assert_eq!(
        client.allocate().await.err(),
        Some(Error::ErrAlreadyAllocated)
    );

    client.close().await?;
    Ok(())
}
