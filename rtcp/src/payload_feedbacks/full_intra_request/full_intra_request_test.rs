use super::*;

#[test]
fn test_fir_round_trip() -> Result<(), util::Error> {
    let fir = FullIntraRequest {
        sender_ssrc: 0x902f9e2e,
        media_ssrc: 0x902f9e2e,
        fir: vec![FirEntry {
            ssrc: 0x4bc4fcb4,
            sequence_number: 42,
        }],
    };
    let raw = fir.marshal()?;
    let mut buf = &raw[..];
    let decoded = FullIntraRequest::unmarshal(&mut buf)?;
    assert_eq!(decoded, fir);
    Ok(())
}

#[test]
fn test_fir_multiple_entries() -> Result<(), util::Error> {
    let fir = FullIntraRequest {
        sender_ssrc: 1,
        media_ssrc: 2,
        fir: vec![
            FirEntry {
                ssrc: 3,
                sequence_number: 1,
            },
            FirEntry {
                ssrc: 4,
                sequence_number: 2,
            },
        ],
    };
    let raw = fir.marshal()?;
    let mut buf = &raw[..];
    let decoded = FullIntraRequest::unmarshal(&mut buf)?;
    assert_eq!(decoded.fir.len(), 2);
    assert_eq!(decoded.destination_ssrc(), vec![3, 4]);
    Ok(())
}
