use bytes::{Bytes, BytesMut};
use util::marshal::Marshal;

use super::*;
use crate::peer_connection::certificate::RTCCertificate;

const PRIMARY_SSRC: u32 = 0x1111_1111;
const RTX_SSRC: u32 = 0x2222_2222;
const PRIMARY_PT: u8 = 96;
const RTX_PT: u8 = 97;

async fn test_transport() -> Arc<RTCDtlsTransport> {
    let agent = ice::agent::Agent::new(ice::agent::agent_config::AgentConfig {
        include_loopback: true,
        ..Default::default()
    })
    .await
    .unwrap();
    RTCDtlsTransport::new(
        agent,
        RTCCertificate::generate().unwrap(),
        std::time::Duration::from_secs(30),
        std::time::Duration::from_millis(500),
    )
}

fn media_packet(ssrc: u32, pt: u8, seq: u16, payload: &[u8]) -> Vec<u8> {
    let packet = rtp::packet::Packet {
        header: rtp::header::Header {
            version: 2,
            payload_type: pt,
            sequence_number: seq,
            timestamp: 1234,
            ssrc,
            ..Default::default()
        },
        payload: Bytes::copy_from_slice(payload),
    };
    packet.marshal().unwrap().to_vec()
}

fn rtx_packet(original_seq: u16, rtx_seq: u16, payload: &[u8]) -> Vec<u8> {
    let mut rtx_payload = BytesMut::new();
    rtx_payload.extend_from_slice(&original_seq.to_be_bytes());
    rtx_payload.extend_from_slice(payload);
    media_packet(RTX_SSRC, RTX_PT, rtx_seq, &rtx_payload)
}

/// RFC 4588 repair: an unknown SSRC bound through `ssrc-group:FID` is
/// de-prefixed and re-injected as the primary stream.
#[tokio::test]
async fn test_rtx_packets_are_repaired_into_primary_stream() {
    let transport = test_transport().await;
    let receiver = crate::rtp_transceiver::rtp_receiver::RTCRtpReceiver::new(None);
    transport.register_receiver(PRIMARY_SSRC, Arc::clone(&receiver));
    transport.add_fid_pair(PRIMARY_SSRC, RTX_SSRC);
    transport.add_rtx_payload_type(RTX_PT, PRIMARY_PT);

    transport.route_rtp(&media_packet(PRIMARY_SSRC, PRIMARY_PT, 1000, b"one"));
    transport.route_rtp(&rtx_packet(1001, 7, b"two"));

    let first = receiver.read_rtp().await.unwrap();
    assert_eq!(first.header.sequence_number, 1000);
    assert_eq!(first.header.ssrc, PRIMARY_SSRC);

    let repaired = receiver.read_rtp().await.unwrap();
    assert_eq!(repaired.header.sequence_number, 1001);
    assert_eq!(repaired.header.ssrc, PRIMARY_SSRC);
    assert_eq!(repaired.header.payload_type, PRIMARY_PT);
    assert_eq!(repaired.payload, Bytes::from_static(b"two"));
}

/// Scenario from the NACK path: a burst loss of 1020..1024 is tracked
/// until RTX repairs fill every hole.
#[tokio::test]
async fn test_receiver_tracks_and_clears_missing_sequences() {
    let transport = test_transport().await;
    let receiver = crate::rtp_transceiver::rtp_receiver::RTCRtpReceiver::new(None);
    transport.register_receiver(PRIMARY_SSRC, Arc::clone(&receiver));
    transport.add_fid_pair(PRIMARY_SSRC, RTX_SSRC);
    transport.add_rtx_payload_type(RTX_PT, PRIMARY_PT);

    // 1000..=1019 arrive, 1020..=1024 are lost, 1025..=1030 arrive
    for seq in 1000..=1019u16 {
        transport.route_rtp(&media_packet(PRIMARY_SSRC, PRIMARY_PT, seq, b"x"));
    }
    for seq in 1025..=1030u16 {
        transport.route_rtp(&media_packet(PRIMARY_SSRC, PRIMARY_PT, seq, b"x"));
    }

    let missing = receiver.collect_missing();
    assert_eq!(missing, vec![1020, 1021, 1022, 1023, 1024]);

    // the retransmissions land as RTX
    for (i, seq) in (1020..=1024u16).enumerate() {
        transport.route_rtp(&rtx_packet(seq, 50 + i as u16, b"repair"));
    }
    assert!(receiver.collect_missing().is_empty());

    // the complete run 1000..=1030 was delivered exactly once each
    let mut seen = std::collections::HashSet::new();
    for _ in 0..31 {
        let packet = receiver.read_rtp().await.unwrap();
        assert!(seen.insert(packet.header.sequence_number));
    }
    for seq in 1000..=1030u16 {
        assert!(seen.contains(&seq), "seq {seq} missing from delivery");
    }
}

/// The simulcast path learns RID -> SSRC bindings from the header
/// extension of the first packet carrying it.
#[tokio::test]
async fn test_simulcast_rid_binding() {
    let transport = test_transport().await;
    let receiver =
        crate::rtp_transceiver::rtp_receiver::RTCRtpReceiver::new(Some("hi".to_owned()));
    transport.register_rid_receiver(Arc::clone(&receiver));
    transport.set_extension_ids(Some(4), Some(10));

    let mut header = rtp::header::Header {
        version: 2,
        payload_type: PRIMARY_PT,
        sequence_number: 7,
        ssrc: 0x3333_3333,
        ..Default::default()
    };
    header
        .set_extension(10, Bytes::from_static(b"hi"))
        .unwrap();
    let packet = rtp::packet::Packet {
        header,
        payload: Bytes::from_static(b"layer"),
    };
    transport.route_rtp(&packet.marshal().unwrap());

    let delivered = receiver.read_rtp().await.unwrap();
    assert_eq!(delivered.header.ssrc, 0x3333_3333);
    assert_eq!(receiver.ssrc(), Some(0x3333_3333));
}
