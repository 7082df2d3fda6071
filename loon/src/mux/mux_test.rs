use util::conn::conn_pipe::pipe;
use util::Conn;

use super::mux_func::*;
use super::*;

#[test]
fn test_match_functions() {
    // DTLS content types
    assert!(match_dtls(&[22, 254, 253]));
    assert!(match_dtls(&[20]));
    assert!(!match_dtls(&[19]));
    assert!(!match_dtls(&[64]));

    // RTP vs RTCP by payload type in the second byte
    let rtp = [0x80u8, 96, 0x00, 0x01];
    let rtcp = [0x80u8, 200, 0x00, 0x01];
    assert!(match_srtp(&rtp));
    assert!(!match_srtcp(&rtp));
    assert!(match_srtcp(&rtcp));
    assert!(!match_srtp(&rtcp));

    // STUN lands outside all of these
    let stun = [0x00u8, 0x01, 0x00, 0x00];
    assert!(!match_dtls(&stun));
    assert!(!match_srtp_or_srtcp(&stun));
}

#[tokio::test]
async fn test_mux_routes_by_first_byte() -> crate::error::Result<()> {
    let (ca, cb) = pipe();

    let mux = Mux::new(Config {
        conn: ca,
        buffer_size: 1500,
    });
    let dtls_endpoint = mux.new_endpoint(Box::new(match_dtls)).await;
    let rtp_endpoint = mux.new_endpoint(Box::new(match_srtp)).await;
    let rtcp_endpoint = mux.new_endpoint(Box::new(match_srtcp)).await;

    cb.send(&[22, 1, 2, 3]).await?;
    cb.send(&[0x80, 96, 0, 1, 9, 9]).await?;
    cb.send(&[0x80, 200, 0, 1, 7]).await?;

    let mut buf = [0u8; 32];
    let n = dtls_endpoint.recv(&mut buf).await?;
    assert_eq!(&buf[..n], &[22, 1, 2, 3]);

    let n = rtp_endpoint.recv(&mut buf).await?;
    assert_eq!(&buf[..n], &[0x80, 96, 0, 1, 9, 9]);

    let n = rtcp_endpoint.recv(&mut buf).await?;
    assert_eq!(&buf[..n], &[0x80, 200, 0, 1, 7]);

    // egress rides the underlying conn
    dtls_endpoint.send(&[23, 0]).await?;
    let n = cb.recv(&mut buf).await?;
    assert_eq!(&buf[..n], &[23, 0]);

    mux.close().await?;
    Ok(())
}
