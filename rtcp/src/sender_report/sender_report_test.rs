use bytes::Bytes;

use super::*;
use crate::reception_report::ReceptionReport;

#[test]
fn test_sender_report_round_trip() -> Result<(), util::Error> {
    let sr = SenderReport {
        ssrc: 0x902f9e2e,
        ntp_time: 0xda8bd1fcdddda05a,
        rtp_time: 0xaaf4edd5,
        packet_count: 1,
        octet_count: 2,
        reports: vec![ReceptionReport {
            ssrc: 0xbc5e9a40,
            fraction_lost: 3,
            total_lost: 12,
            last_sequence_number: 0x46e1,
            jitter: 273,
            last_sender_report: 0x9f36432,
            delay: 150137,
        }],
        profile_extensions: Bytes::new(),
    };

    let raw = sr.marshal()?;
    let mut buf = &raw[..];
    let decoded = SenderReport::unmarshal(&mut buf)?;
    assert_eq!(decoded, sr);

    let h = decoded.header();
    assert_eq!(h.count, 1);
    assert_eq!(h.packet_type, PacketType::SenderReport);
    assert_eq!((h.length as usize + 1) * 4, raw.len());
    Ok(())
}

#[test]
fn test_sender_report_wrong_type() {
    let rr_bytes = Bytes::from_static(&[
        0x80, 0xc9, 0x0, 0x1, // RR, no reports
        0x90, 0x2f, 0x9e, 0x2e,
    ]);
    let mut buf = &rr_bytes[..];
    assert!(SenderReport::unmarshal(&mut buf).is_err());
}

#[test]
fn test_sender_report_destination_ssrc() {
    let sr = SenderReport {
        ssrc: 1,
        reports: vec![ReceptionReport {
            ssrc: 2,
            ..Default::default()
        }],
        ..Default::default()
    };
    assert_eq!(sr.destination_ssrc(), vec![2, 1]);
}
