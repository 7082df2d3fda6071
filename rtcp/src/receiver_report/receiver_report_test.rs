use bytes::Bytes;

use super::*;

#[test]
fn test_receiver_report_round_trip() -> Result<(), util::Error> {
    let rr = ReceiverReport {
        ssrc: 0x902f9e2e,
        reports: vec![
            ReceptionReport {
                ssrc: 0xbc5e9a40,
                fraction_lost: 0,
                total_lost: 5,
                last_sequence_number: 0x46e1,
                jitter: 273,
                last_sender_report: 0x9f36432,
                delay: 150137,
            },
            ReceptionReport {
                ssrc: 0x11223344,
                ..Default::default()
            },
        ],
        profile_extensions: Bytes::new(),
    };

    let raw = rr.marshal()?;
    let mut buf = &raw[..];
    let decoded = ReceiverReport::unmarshal(&mut buf)?;
    assert_eq!(decoded, rr);
    assert_eq!(decoded.header().count, 2);
    Ok(())
}

#[test]
fn test_receiver_report_too_many_reports() {
    let rr = ReceiverReport {
        ssrc: 1,
        reports: vec![ReceptionReport::default(); 32],
        profile_extensions: Bytes::new(),
    };
    assert!(rr.marshal().is_err());
}

#[test]
fn test_receiver_report_total_lost_range() {
    let report = ReceptionReport {
        total_lost: 1 << 25,
        ..Default::default()
    };
    assert!(report.marshal().is_err());
}
