use super::*;

#[test]
fn test_xr_rrt_round_trip() -> Result<(), util::Error> {
    let xr = ExtendedReport {
        sender_ssrc: 0x902f9e2e,
        reports: vec![ReportBlock::ReceiverReferenceTime(
            ReceiverReferenceTimeBlock {
                ntp_timestamp: 0x0102030405060708,
            },
        )],
    };
    let raw = xr.marshal()?;
    let mut buf = &raw[..];
    let decoded = ExtendedReport::unmarshal(&mut buf)?;
    assert_eq!(decoded, xr);
    Ok(())
}

#[test]
fn test_xr_dlrr_round_trip() -> Result<(), util::Error> {
    let xr = ExtendedReport {
        sender_ssrc: 1,
        reports: vec![ReportBlock::Dlrr(DLRRBlock {
            reports: vec![
                DLRRReport {
                    ssrc: 2,
                    last_rr: 0xaabbccdd,
                    dlrr: 100,
                },
                DLRRReport {
                    ssrc: 3,
                    last_rr: 0x11223344,
                    dlrr: 200,
                },
            ],
        })],
    };
    let raw = xr.marshal()?;
    let mut buf = &raw[..];
    let decoded = ExtendedReport::unmarshal(&mut buf)?;
    assert_eq!(decoded, xr);
    assert_eq!(decoded.destination_ssrc(), vec![2, 3]);
    Ok(())
}

#[test]
fn test_xr_unknown_block_survives() -> Result<(), util::Error> {
    let xr = ExtendedReport {
        sender_ssrc: 1,
        reports: vec![ReportBlock::Unknown {
            block_type: 99,
            contents: bytes::Bytes::from_static(&[1, 2, 3, 4]),
        }],
    };
    let raw = xr.marshal()?;
    let mut buf = &raw[..];
    let decoded = ExtendedReport::unmarshal(&mut buf)?;
    assert_eq!(decoded, xr);
    Ok(())
}
