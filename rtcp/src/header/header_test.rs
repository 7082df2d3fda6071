use super::*;

#[test]
fn test_header_round_trip() -> Result<(), util::Error> {
    let h = Header {
        padding: true,
        count: 31,
        packet_type: PacketType::SenderReport,
        length: 4,
    };
    let raw = h.marshal()?;
    assert_eq!(raw.len(), HEADER_LENGTH);

    let mut buf = &raw[..];
    let decoded = Header::unmarshal(&mut buf)?;
    assert_eq!(decoded, h);
    Ok(())
}

#[test]
fn test_header_rejects_wrong_version() {
    // version bits 01 instead of 10
    let raw = [0x41u8, 0xc8, 0x00, 0x00];
    let mut buf = &raw[..];
    let result = Header::unmarshal(&mut buf);
    assert!(result.is_err());
}

#[test]
fn test_header_rejects_invalid_count() {
    let h = Header {
        padding: false,
        count: 40,
        packet_type: PacketType::Goodbye,
        length: 0,
    };
    assert!(h.marshal().is_err());
}

#[test]
fn test_packet_type_strings() {
    assert_eq!(PacketType::from(200), PacketType::SenderReport);
    assert_eq!(PacketType::from(205), PacketType::TransportSpecificFeedback);
    assert_eq!(PacketType::from(199), PacketType::Unsupported);
    assert_eq!(PacketType::SourceDescription.to_string(), "SDES");
}
