use bytes::Bytes;

use super::*;

#[test]
fn test_goodbye_round_trip() -> Result<(), util::Error> {
    let bye = Goodbye {
        sources: vec![0x902f9e2e, 0x11223344],
        reason: Bytes::from_static(b"session ended"),
    };

    let raw = bye.marshal()?;
    assert_eq!(raw.len() % 4, 0);

    let mut buf = &raw[..];
    let decoded = Goodbye::unmarshal(&mut buf)?;
    assert_eq!(decoded.sources, bye.sources);
    assert_eq!(decoded.reason, bye.reason);
    Ok(())
}

#[test]
fn test_goodbye_no_reason() -> Result<(), util::Error> {
    let bye = Goodbye {
        sources: vec![1],
        reason: Bytes::new(),
    };
    let raw = bye.marshal()?;
    let mut buf = &raw[..];
    let decoded = Goodbye::unmarshal(&mut buf)?;
    assert_eq!(decoded.sources, vec![1]);
    assert!(decoded.reason.is_empty());
    Ok(())
}

#[test]
fn test_goodbye_too_many_sources() {
    let bye = Goodbye {
        sources: vec![0; 32],
        reason: Bytes::new(),
    };
    assert!(bye.marshal().is_err());
}
