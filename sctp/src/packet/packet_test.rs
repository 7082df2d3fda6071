use bytes::Bytes;

use super::*;

#[test]
fn test_packet_round_trip_with_data_chunk() -> Result<()> {
    let pkt = Packet {
        source_port: 5000,
        destination_port: 5000,
        verification_tag: 0x12345678,
        chunks: vec![Box::new(ChunkPayloadData {
            tsn: 42,
            stream_identifier: 1,
            stream_sequence_number: 2,
            beginning_fragment: true,
            ending_fragment: true,
            user_data: Bytes::from_static(b"hello"),
            ..Default::default()
        })],
    };

    let raw = pkt.marshal()?;
    // padded to a word boundary
    assert_eq!(raw.len() % 4, 0);

    let decoded = Packet::unmarshal(&raw)?;
    assert_eq!(decoded.source_port, 5000);
    assert_eq!(decoded.verification_tag, 0x12345678);
    assert_eq!(decoded.chunks.len(), 1);

    let data = decoded.chunks[0]
        .as_any()
        .downcast_ref::<ChunkPayloadData>()
        .expect("expected DATA chunk");
    assert_eq!(data.tsn, 42);
    assert_eq!(data.user_data, Bytes::from_static(b"hello"));
    assert!(data.beginning_fragment && data.ending_fragment);
    Ok(())
}

#[test]
fn test_packet_checksum_is_validated() -> Result<()> {
    let pkt = Packet {
        source_port: 5000,
        destination_port: 5000,
        verification_tag: 1,
        chunks: vec![Box::new(ChunkSelectiveAck {
            cumulative_tsn_ack: 10,
            advertised_receiver_window_credit: 100,
            gap_ack_blocks: vec![],
            duplicate_tsn: vec![],
        })],
    };

    let raw = pkt.marshal()?;
    let mut corrupted = raw.to_vec();
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0xff;
    let result = Packet::unmarshal(&Bytes::from(corrupted));
    assert_eq!(result.err(), Some(Error::ErrChecksumMismatch));
    Ok(())
}

#[test]
fn test_packet_rejects_short_input() {
    let result = Packet::unmarshal(&Bytes::from_static(&[0u8; 4]));
    assert_eq!(result.err(), Some(Error::ErrPacketRawTooSmall));
}

#[test]
fn test_packet_init_round_trip() -> Result<()> {
    let init = ChunkInit {
        is_ack: false,
        initiate_tag: 0xa0b0c0d0,
        advertised_receiver_window_credit: 1024 * 1024,
        num_outbound_streams: 1024,
        num_inbound_streams: 1024,
        initial_tsn: 1234,
        params: ChunkInit::common_params(),
    };
    let pkt = Packet {
        source_port: 5000,
        destination_port: 5000,
        verification_tag: 0,
        chunks: vec![Box::new(init)],
    };

    let raw = pkt.marshal()?;
    let decoded = Packet::unmarshal(&raw)?;
    let init = decoded.chunks[0]
        .as_any()
        .downcast_ref::<ChunkInit>()
        .expect("expected INIT chunk");
    assert!(!init.is_ack);
    assert_eq!(init.initiate_tag, 0xa0b0c0d0);
    assert_eq!(init.initial_tsn, 1234);
    assert_eq!(init.params.len(), 2);
    Ok(())
}

#[test]
fn test_packet_bundled_chunks() -> Result<()> {
    let pkt = Packet {
        source_port: 5000,
        destination_port: 5000,
        verification_tag: 7,
        chunks: vec![
            Box::new(ChunkSelectiveAck {
                cumulative_tsn_ack: 3,
                advertised_receiver_window_credit: 100,
                gap_ack_blocks: vec![],
                duplicate_tsn: vec![],
            }),
            Box::new(ChunkPayloadData {
                tsn: 4,
                beginning_fragment: true,
                ending_fragment: true,
                user_data: Bytes::from_static(b"xy"),
                ..Default::default()
            }),
        ],
    };

    let raw = pkt.marshal()?;
    let decoded = Packet::unmarshal(&raw)?;
    assert_eq!(decoded.chunks.len(), 2);
    Ok(())
}
