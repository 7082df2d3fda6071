use bytes::Bytes;

use super::*;

#[test]
fn test_pli_unmarshal_golden() -> Result<(), util::Error> {
    let raw = Bytes::from_static(&[
        0x81, 0xce, 0x00, 0x02, // v=2, p=0, FMT=1, PSFB, len=2
        0x00, 0x00, 0x00, 0x00, // ssrc=0x0
        0x4b, 0xc4, 0xfc, 0xb4, // ssrc=0x4bc4fcb4
    ]);
    let mut buf = &raw[..];
    let pli = PictureLossIndication::unmarshal(&mut buf)?;
    assert_eq!(
        pli,
        PictureLossIndication {
            sender_ssrc: 0x0,
            media_ssrc: 0x4bc4fcb4,
        }
    );
    Ok(())
}

#[test]
fn test_pli_round_trip() -> Result<(), util::Error> {
    let pli = PictureLossIndication {
        sender_ssrc: 0x902f9e2e,
        media_ssrc: 0x902f9e2e,
    };
    let raw = pli.marshal()?;
    let mut buf = &raw[..];
    let decoded = PictureLossIndication::unmarshal(&mut buf)?;
    assert_eq!(decoded, pli);
    Ok(())
}

#[test]
fn test_pli_wrong_format_rejected() {
    let raw = Bytes::from_static(&[
        0x84, 0xce, 0x00, 0x02, // FMT=4 (FIR), PSFB
        0x00, 0x00, 0x00, 0x00, //
        0x4b, 0xc4, 0xfc, 0xb4, //
    ]);
    let mut buf = &raw[..];
    assert!(PictureLossIndication::unmarshal(&mut buf).is_err());
}
