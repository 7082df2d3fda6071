use bytes::Bytes;

use super::*;

#[test]
fn test_nack_unmarshal_golden() -> Result<(), util::Error> {
    let raw = Bytes::from_static(&[
        0x81, 0xcd, 0x0, 0x3, // v=2, p=0, FMT=1, RTPFB, len=3
        0x90, 0x2f, 0x9e, 0x2e, // sender=0x902f9e2e
        0x90, 0x2f, 0x9e, 0x2e, // media=0x902f9e2e
        0x0, 0x1, 0x0, 0x0, // nack 0x0001, 0x0000
    ]);
    let mut buf = &raw[..];
    let nack = TransportLayerNack::unmarshal(&mut buf)?;
    assert_eq!(
        nack,
        TransportLayerNack {
            sender_ssrc: 0x902f9e2e,
            media_ssrc: 0x902f9e2e,
            nacks: vec![NackPair {
                packet_id: 1,
                lost_packets: 0
            }],
        }
    );
    Ok(())
}

#[test]
fn test_nack_pair_packet_list() {
    let tests: Vec<(NackPair, Vec<u16>)> = vec![
        (NackPair::new(42), vec![42]),
        (
            NackPair {
                packet_id: 42,
                lost_packets: 1,
            },
            vec![42, 43],
        ),
        (
            NackPair {
                packet_id: 42,
                lost_packets: 0x8000,
            },
            vec![42, 58],
        ),
        (
            NackPair {
                packet_id: 42,
                lost_packets: 3,
            },
            vec![42, 43, 44],
        ),
    ];
    for (pair, want) in tests {
        assert_eq!(pair.packet_list(), want);
    }
}

#[test]
fn test_nack_pairs_from_sequence_numbers() {
    // 1020..=1024: one pair with a bitmap for the four trailing numbers
    let pairs = nack_pairs_from_sequence_numbers(&[1020, 1021, 1022, 1023, 1024]);
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].packet_id, 1020);
    assert_eq!(pairs[0].lost_packets, 0b1111);
    assert_eq!(pairs[0].packet_list(), vec![1020, 1021, 1022, 1023, 1024]);

    // a gap larger than 16 starts a new pair
    let pairs = nack_pairs_from_sequence_numbers(&[10, 100]);
    assert_eq!(pairs.len(), 2);
}

#[test]
fn test_nack_round_trip() -> Result<(), util::Error> {
    let nack = TransportLayerNack {
        sender_ssrc: 0x1111,
        media_ssrc: 0x2222,
        nacks: nack_pairs_from_sequence_numbers(&[5, 7, 30]),
    };
    let raw = nack.marshal()?;
    let mut buf = &raw[..];
    let decoded = TransportLayerNack::unmarshal(&mut buf)?;
    assert_eq!(decoded, nack);
    Ok(())
}
