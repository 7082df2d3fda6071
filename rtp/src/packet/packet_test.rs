use bytes::{Bytes, BytesMut};

use super::*;

#[test]
fn test_basic() -> Result<(), util::Error> {
    let raw_pkt = Bytes::from_static(&[
        0x90, 0xe0, 0x69, 0x8f, 0xd9, 0xc2, 0x93, 0xda, 0x1c, 0x64, 0x27, 0x82, 0x00, 0x01,
        0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x98, 0x36, 0xbe, 0x88, 0x9e,
    ]);
    let parsed_packet = Packet {
        header: Header {
            version: 2,
            padding: false,
            extension: true,
            marker: true,
            payload_type: 96,
            sequence_number: 27023,
            timestamp: 3653407706,
            ssrc: 476325762,
            csrc: vec![],
            extension_profile: 1,
            extensions: vec![Extension {
                id: 0,
                payload: Bytes::from_static(&[0xFF, 0xFF, 0xFF, 0xFF]),
            }],
        },
        payload: raw_pkt.slice(20..),
    };

    let mut buf = &raw_pkt[..];
    let packet = Packet::unmarshal(&mut buf)?;
    assert_eq!(
        packet, parsed_packet,
        "TestBasic unmarshal: got {packet}, want {parsed_packet}"
    );

    assert_eq!(
        packet.header.marshal_size(),
        20,
        "wrong computed header marshal size"
    );
    assert_eq!(
        packet.marshal_size(),
        raw_pkt.len(),
        "wrong computed marshal size"
    );

    let raw = packet.marshal()?;
    assert_eq!(raw.len(), raw_pkt.len());
    assert_eq!(raw, raw_pkt);
    Ok(())
}

#[test]
fn test_extension_one_byte_round_trip() -> Result<(), util::Error> {
    let mut header = Header {
        version: 2,
        payload_type: 111,
        sequence_number: 100,
        timestamp: 9000,
        ssrc: 0xdeadbeef,
        ..Default::default()
    };
    header
        .set_extension(5, Bytes::from_static(&[0x00, 0x01]))
        .map_err(util::Error::from_std)?;
    header
        .set_extension(3, Bytes::from_static(&[0xaa]))
        .map_err(util::Error::from_std)?;
    assert_eq!(header.extension_profile, EXTENSION_PROFILE_ONE_BYTE);

    let packet = Packet {
        header,
        payload: Bytes::from_static(&[0x01, 0x02, 0x03, 0x04]),
    };

    let raw = packet.marshal()?;
    let mut buf = &raw[..];
    let decoded = Packet::unmarshal(&mut buf)?;

    assert_eq!(
        decoded.header.get_extension(5),
        Some(Bytes::from_static(&[0x00, 0x01]))
    );
    assert_eq!(decoded.header.get_extension(3), Some(Bytes::from_static(&[0xaa])));
    assert_eq!(decoded.payload, packet.payload);
    Ok(())
}

#[test]
fn test_padding_round_trip() -> Result<(), util::Error> {
    let packet = Packet {
        header: Header {
            version: 2,
            padding: true,
            payload_type: 96,
            sequence_number: 1,
            timestamp: 2,
            ssrc: 3,
            ..Default::default()
        },
        payload: Bytes::from_static(&[0x01, 0x02, 0x03]),
    };

    let raw = packet.marshal()?;
    // padded up to a word boundary
    assert_eq!(raw.len() % 4, 0);

    let mut buf = &raw[..];
    let decoded = Packet::unmarshal(&mut buf)?;
    assert_eq!(decoded.payload, packet.payload);
    Ok(())
}

#[test]
fn test_unmarshal_too_short() {
    let raw = Bytes::from_static(&[0x80, 0x60, 0x00]);
    let mut buf = &raw[..];
    let result = Packet::unmarshal(&mut buf);
    assert!(result.is_err());
}

#[test]
fn test_marshal_into_undersized_buffer() {
    let packet = Packet {
        header: Header {
            version: 2,
            ..Default::default()
        },
        payload: Bytes::from_static(&[0u8; 32]),
    };
    let mut small = BytesMut::zeroed(8);
    assert!(packet.marshal_to(&mut small[..]).is_err());
}
