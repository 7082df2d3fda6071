use bytes::Bytes;

use super::*;
use crate::goodbye::Goodbye;
use crate::receiver_report::ReceiverReport;
use crate::sender_report::SenderReport;

fn cname() -> SourceDescription {
    SourceDescription::with_cname(1234, "cname")
}

#[test]
fn test_compound_packet_validate_ok() {
    let c = CompoundPacket(vec![
        Box::new(ReceiverReport {
            ssrc: 1234,
            ..Default::default()
        }),
        Box::new(cname()),
    ]);
    assert!(c.validate().is_ok());
    assert_eq!(c.cname().unwrap(), Bytes::from_static(b"cname"));
}

#[test]
fn test_compound_packet_bad_first_packet() {
    let c = CompoundPacket(vec![
        Box::new(Goodbye::default()),
        Box::new(cname()),
    ]);
    assert_eq!(c.validate(), Err(Error::BadFirstPacket));
}

#[test]
fn test_compound_packet_missing_cname() {
    let c = CompoundPacket(vec![Box::new(SenderReport {
        ssrc: 1234,
        ..Default::default()
    })]);
    assert_eq!(c.validate(), Err(Error::MissingCname));
}

#[test]
fn test_compound_packet_packet_before_cname() {
    let c = CompoundPacket(vec![
        Box::new(SenderReport {
            ssrc: 1234,
            ..Default::default()
        }),
        Box::new(Goodbye::default()),
    ]);
    assert_eq!(c.validate(), Err(Error::PacketBeforeCname));
}

#[test]
fn test_compound_packet_round_trip() -> Result<(), util::Error> {
    let c = CompoundPacket(vec![
        Box::new(ReceiverReport {
            ssrc: 1234,
            ..Default::default()
        }),
        Box::new(cname()),
    ]);

    let raw = c.marshal()?;
    let mut buf = &raw[..];
    let decoded = CompoundPacket::unmarshal(&mut buf)?;
    assert_eq!(decoded.0.len(), 2);
    assert_eq!(decoded.cname().map_err(util::Error::from_std)?, "cname");
    Ok(())
}
