use super::*;

#[test]
fn test_channel_data_encode_decode() -> Result<()> {
    let mut d = ChannelData {
        data: vec![1, 2, 3],
        number: ChannelNumber(MIN_CHANNEL_NUMBER + 1),
        raw: vec![],
    };
    d.encode();

    // padded to a multiple of four
    assert_eq!(d.raw.len() % 4, 0);
    // length field reflects the unpadded payload
    assert_eq!(u16::from_be_bytes([d.raw[2], d.raw[3]]), 3);

    let mut decoded = ChannelData {
        raw: d.raw.clone(),
        ..Default::default()
    };
    decoded.decode()?;
    assert_eq!(decoded.data, d.data);
    assert_eq!(decoded.number, d.number);
    Ok(())
}

#[test]
fn test_channel_data_detection() {
    let mut d = ChannelData {
        data: vec![1, 2, 3, 4],
        number: ChannelNumber(MIN_CHANNEL_NUMBER),
        raw: vec![],
    };
    d.encode();
    assert!(is_channel_data(&d.raw));

    // STUN messages start with 0x00/0x01 and must not be mistaken
    assert!(!is_channel_data(&[0x00, 0x01, 0x00, 0x00]));
    // too short
    assert!(!is_channel_data(&[0x40]));
}

#[test]
fn test_channel_data_bad_length() {
    let mut d = ChannelData {
        raw: vec![0x40, 0x00, 0x00, 0xff, 0x01],
        ..Default::default()
    };
    assert_eq!(d.decode(), Err(Error::ErrBadChannelDataLength));
}
