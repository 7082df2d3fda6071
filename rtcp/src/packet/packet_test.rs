use bytes::Bytes;

use super::*;
use crate::reception_report::ReceptionReport;

fn real_packet() -> Bytes {
    Bytes::from_static(&[
        // Receiver Report (offset=0)
        0x81, 0xc9, 0x0, 0x7, // v=2, p=0, count=1, RR, len=7
        0x90, 0x2f, 0x9e, 0x2e, // ssrc=0x902f9e2e
        0xbc, 0x5e, 0x9a, 0x40, // ssrc=0xbc5e9a40
        0x0, 0x0, 0x0, 0x0, // fracLost=0, totalLost=0
        0x0, 0x0, 0x46, 0xe1, // lastSeq=0x46e1
        0x0, 0x0, 0x1, 0x11, // jitter=273
        0x9, 0xf3, 0x64, 0x32, // lsr=0x9f36432
        0x0, 0x2, 0x4a, 0x79, // delay=150137
        // Source Description (offset=32)
        0x81, 0xca, 0x0, 0xc, // v=2, p=0, count=1, SDES, len=12
        0x90, 0x2f, 0x9e, 0x2e, // ssrc=0x902f9e2e
        0x1, 0x26, // CNAME, len=38
        0x7b, 0x39, 0x63, 0x30, 0x30, 0x65, 0x62, 0x39, 0x32, 0x2d, 0x31, 0x61, 0x66, 0x62,
        0x2d, 0x39, 0x64, 0x34, 0x39, 0x2d, 0x61, 0x34, 0x37, 0x64, 0x2d, 0x39, 0x31, 0x66,
        0x36, 0x34, 0x65, 0x65, 0x65, 0x36, 0x39, 0x66, 0x35, 0x7d, // text="{9c00eb92-1afb-9d49-a47d-91f64eee69f5}"
        0x0, 0x0, 0x0, 0x0, // END + padding
        // Goodbye (offset=84)
        0x81, 0xcb, 0x0, 0x1, // v=2, p=0, count=1, BYE, len=1
        0x90, 0x2f, 0x9e, 0x2e, // source=0x902f9e2e
        0x81, 0xce, 0x0, 0x2, // v=2, p=0, count=1, PLI, len=2
        0x90, 0x2f, 0x9e, 0x2e, // sender=0x902f9e2e
        0x90, 0x2f, 0x9e, 0x2e, // media=0x902f9e2e
        0x85, 0xcd, 0x0, 0x2, // v=2, p=0, count=5, RRR(ignored), len=2
        0x90, 0x2f, 0x9e, 0x2e, // sender=0x902f9e2e
        0x90, 0x2f, 0x9e, 0x2e, // media=0x902f9e2e
    ])
}

#[test]
fn test_packet_unmarshal() -> Result<()> {
    let mut data = real_packet();
    let packets = unmarshal(&mut data)?;

    assert_eq!(packets.len(), 5);

    let rr = packets[0]
        .as_any()
        .downcast_ref::<ReceiverReport>()
        .expect("first packet should be an RR");
    assert_eq!(rr.ssrc, 0x902f9e2e);
    assert_eq!(
        rr.reports[0],
        ReceptionReport {
            ssrc: 0xbc5e9a40,
            fraction_lost: 0,
            total_lost: 0,
            last_sequence_number: 0x46e1,
            jitter: 273,
            last_sender_report: 0x9f36432,
            delay: 150137,
        }
    );

    assert!(packets[1]
        .as_any()
        .downcast_ref::<SourceDescription>()
        .is_some());
    assert!(packets[2].as_any().downcast_ref::<Goodbye>().is_some());
    assert!(packets[3]
        .as_any()
        .downcast_ref::<PictureLossIndication>()
        .is_some());
    // RRR (fmt=5) is not implemented and must fall back to RawPacket
    assert!(packets[4].as_any().downcast_ref::<RawPacket>().is_some());
    Ok(())
}

#[test]
fn test_packet_unmarshal_empty() {
    let mut data = Bytes::new();
    let result = unmarshal(&mut data);
    assert_eq!(result.err(), Some(Error::InvalidHeader));
}

#[test]
fn test_packet_unmarshal_invalid_header_length() {
    // header claims a length that extends past the buffer
    let mut data = Bytes::from_static(&[0x81, 0xc9, 0x00, 0x07, 0x90, 0x2f, 0x9e, 0x2e]);
    let result = unmarshal(&mut data);
    assert_eq!(result.err(), Some(Error::PacketTooShort));
}

#[test]
fn test_marshal_concatenates_packets() -> Result<()> {
    let pli = PictureLossIndication {
        sender_ssrc: 1,
        media_ssrc: 2,
    };
    let bye = Goodbye {
        sources: vec![3],
        ..Default::default()
    };
    let packets: Vec<Box<dyn Packet + Send + Sync>> = vec![Box::new(pli), Box::new(bye)];
    let data = marshal(&packets)?;

    let mut buf = data.clone();
    let decoded = unmarshal(&mut buf)?;
    assert_eq!(decoded.len(), 2);
    assert!(decoded[0]
        .as_any()
        .downcast_ref::<PictureLossIndication>()
        .is_some());
    assert!(decoded[1].as_any().downcast_ref::<Goodbye>().is_some());
    Ok(())
}
