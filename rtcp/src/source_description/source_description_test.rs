use bytes::Bytes;

use super::*;

#[test]
fn test_sdes_round_trip() -> Result<(), util::Error> {
    let sdes = SourceDescription::with_cname(0x902f9e2e, "{9c00eb92}");

    let raw = sdes.marshal()?;
    assert_eq!(raw.len() % 4, 0);

    let mut buf = &raw[..];
    let decoded = SourceDescription::unmarshal(&mut buf)?;
    assert_eq!(decoded, sdes);
    Ok(())
}

#[test]
fn test_sdes_multiple_items() -> Result<(), util::Error> {
    let sdes = SourceDescription {
        chunks: vec![SourceDescriptionChunk {
            source: 1,
            items: vec![
                SourceDescriptionItem {
                    sdes_type: SdesType::SdesCname,
                    text: Bytes::from_static(b"cname"),
                },
                SourceDescriptionItem {
                    sdes_type: SdesType::SdesTool,
                    text: Bytes::from_static(b"loon"),
                },
            ],
        }],
    };

    let raw = sdes.marshal()?;
    let mut buf = &raw[..];
    let decoded = SourceDescription::unmarshal(&mut buf)?;
    assert_eq!(decoded, sdes);
    Ok(())
}

#[test]
fn test_sdes_item_rejects_end_type() {
    let item = SourceDescriptionItem {
        sdes_type: SdesType::SdesEnd,
        text: Bytes::new(),
    };
    assert!(item.marshal().is_err());
}

#[test]
fn test_sdes_text_too_long() {
    let item = SourceDescriptionItem {
        sdes_type: SdesType::SdesCname,
        text: Bytes::from(vec![b'a'; 300]),
    };
    assert!(item.marshal().is_err());
}
