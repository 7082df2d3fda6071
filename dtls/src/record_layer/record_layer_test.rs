use super::*;

#[test]
fn test_record_header_round_trip() -> Result<()> {
    let h = RecordLayerHeader {
        content_type: ContentType::Handshake,
        protocol_version: PROTOCOL_VERSION1_2,
        epoch: 1,
        sequence_number: 0x0000_0001_0203_0405 & MAX_SEQUENCE_NUMBER,
        content_len: 100,
    };
    let raw = h.marshal()?;
    assert_eq!(raw.len(), RECORD_LAYER_HEADER_SIZE);

    let decoded = RecordLayerHeader::unmarshal(&raw)?;
    assert_eq!(decoded, h);
    Ok(())
}

#[test]
fn test_record_header_sequence_overflow() {
    let h = RecordLayerHeader {
        content_type: ContentType::ApplicationData,
        protocol_version: PROTOCOL_VERSION1_2,
        epoch: 1,
        sequence_number: MAX_SEQUENCE_NUMBER + 1,
        content_len: 0,
    };
    assert_eq!(h.marshal(), Err(Error::ErrSequenceNumberOverflow));
}

#[test]
fn test_record_header_rejects_unknown_content_type() {
    let raw = [0u8; RECORD_LAYER_HEADER_SIZE];
    assert_eq!(
        RecordLayerHeader::unmarshal(&raw),
        Err(Error::ErrInvalidContentType)
    );
}

#[test]
fn test_aead_additional_data_layout() {
    let ad = generate_aead_additional_data(
        1,
        7,
        ContentType::ApplicationData,
        PROTOCOL_VERSION1_2,
        42,
    );
    assert_eq!(ad.len(), 13);
    assert_eq!(&ad[..2], &[0, 1]); // epoch
    assert_eq!(ad[7], 7); // low byte of sequence
    assert_eq!(ad[8], ContentType::ApplicationData as u8);
    assert_eq!(&ad[11..], &[0, 42]);
}
