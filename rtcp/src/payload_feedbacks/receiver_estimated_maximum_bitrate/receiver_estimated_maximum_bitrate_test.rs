use bytes::Bytes;

use super::*;

#[test]
fn test_remb_unmarshal_golden() -> Result<(), util::Error> {
    // Real data sniffed from a browser: bitrate 8927168 bps, one SSRC
    // 1215622422.
    let raw = Bytes::from_static(&[
        143, 206, 0, 5, 0, 0, 0, 1, 0, 0, 0, 0, 82, 69, 77, 66, 1, 26, 32, 223, 72, 116, 237,
        22,
    ]);
    let mut buf = &raw[..];
    let remb = ReceiverEstimatedMaximumBitrate::unmarshal(&mut buf)?;
    assert_eq!(remb.sender_ssrc, 1);
    assert_eq!(remb.bitrate, 8927168.0);
    assert_eq!(remb.ssrcs, vec![1215622422]);
    Ok(())
}

#[test]
fn test_remb_round_trip() -> Result<(), util::Error> {
    let remb = ReceiverEstimatedMaximumBitrate {
        sender_ssrc: 1,
        bitrate: 8927168.0,
        ssrcs: vec![1215622422],
    };
    let raw = remb.marshal()?;
    let mut buf = &raw[..];
    let decoded = ReceiverEstimatedMaximumBitrate::unmarshal(&mut buf)?;
    assert_eq!(decoded, remb);
    Ok(())
}

#[test]
fn test_remb_missing_identifier() {
    let raw = Bytes::from_static(&[
        143, 206, 0, 5, 0, 0, 0, 1, 0, 0, 0, 0, 82, 69, 77, 65, 1, 26, 32, 223, 72, 116, 237,
        22,
    ]);
    let mut buf = &raw[..];
    assert!(ReceiverEstimatedMaximumBitrate::unmarshal(&mut buf).is_err());
}
