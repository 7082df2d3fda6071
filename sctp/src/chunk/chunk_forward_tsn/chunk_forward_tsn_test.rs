use super::*;

#[test]
fn test_forward_tsn_round_trip() -> Result<()> {
    let chunk = ChunkForwardTsn {
        new_cumulative_tsn: 0x11223344,
        streams: vec![
            ChunkForwardTsnStream {
                identifier: 1,
                sequence: 5,
            },
            ChunkForwardTsnStream {
                identifier: 3,
                sequence: 7,
            },
        ],
    };

    let raw = chunk.marshal()?;
    let decoded = ChunkForwardTsn::unmarshal(&raw)?;
    assert_eq!(decoded.new_cumulative_tsn, chunk.new_cumulative_tsn);
    assert_eq!(decoded.streams, chunk.streams);
    Ok(())
}

#[test]
fn test_forward_tsn_no_streams() -> Result<()> {
    let chunk = ChunkForwardTsn {
        new_cumulative_tsn: 3,
        streams: vec![],
    };
    let raw = chunk.marshal()?;
    let decoded = ChunkForwardTsn::unmarshal(&raw)?;
    assert_eq!(decoded.new_cumulative_tsn, 3);
    assert!(decoded.streams.is_empty());
    Ok(())
}
