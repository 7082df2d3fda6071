use super::*;

#[test]
fn test_run_length_chunk_round_trip() -> Result<(), util::Error> {
    let chunk = RunLengthChunk {
        type_tcc: StatusChunkTypeTcc::RunLengthChunk,
        packet_status_symbol: SymbolTypeTcc::PacketReceivedSmallDelta,
        run_length: 200,
    };
    let mut buf = [0u8; 2];
    chunk.marshal_to(&mut buf)?;
    let raw = u16::from_be_bytes(buf);
    assert_eq!(raw & 0x8000, 0);
    let decoded = RunLengthChunk::unmarshal(raw)?;
    assert_eq!(decoded, chunk);
    Ok(())
}

#[test]
fn test_status_vector_chunk_round_trip_one_bit() -> Result<(), util::Error> {
    let chunk = StatusVectorChunk {
        type_tcc: StatusChunkTypeTcc::StatusVectorChunk,
        symbol_size: SymbolSizeTypeTcc::OneBit,
        symbol_list: vec![
            SymbolTypeTcc::PacketReceivedSmallDelta,
            SymbolTypeTcc::PacketNotReceived,
            SymbolTypeTcc::PacketNotReceived,
            SymbolTypeTcc::PacketReceivedSmallDelta,
            SymbolTypeTcc::PacketNotReceived,
            SymbolTypeTcc::PacketNotReceived,
            SymbolTypeTcc::PacketNotReceived,
            SymbolTypeTcc::PacketNotReceived,
            SymbolTypeTcc::PacketNotReceived,
            SymbolTypeTcc::PacketNotReceived,
            SymbolTypeTcc::PacketNotReceived,
            SymbolTypeTcc::PacketNotReceived,
            SymbolTypeTcc::PacketNotReceived,
            SymbolTypeTcc::PacketNotReceived,
        ],
    };
    let mut buf = [0u8; 2];
    chunk.marshal_to(&mut buf)?;
    let raw = u16::from_be_bytes(buf);
    let decoded = StatusVectorChunk::unmarshal(raw, 14)?;
    assert_eq!(decoded, chunk);
    Ok(())
}

#[test]
fn test_transport_layer_cc_round_trip() -> Result<(), util::Error> {
    let cc = TransportLayerCc {
        sender_ssrc: 0x902f9e2e,
        media_ssrc: 0x4bc4fcb4,
        base_sequence_number: 120,
        packet_status_count: 3,
        reference_time: 298618,
        fb_pkt_count: 1,
        packet_chunks: vec![PacketStatusChunk::RunLengthChunk(RunLengthChunk {
            type_tcc: StatusChunkTypeTcc::RunLengthChunk,
            packet_status_symbol: SymbolTypeTcc::PacketReceivedSmallDelta,
            run_length: 3,
        })],
        recv_deltas: vec![
            RecvDelta {
                type_tcc_packet: SymbolTypeTcc::PacketReceivedSmallDelta,
                delta: 250,
            },
            RecvDelta {
                type_tcc_packet: SymbolTypeTcc::PacketReceivedSmallDelta,
                delta: 1000,
            },
            RecvDelta {
                type_tcc_packet: SymbolTypeTcc::PacketReceivedSmallDelta,
                delta: 500,
            },
        ],
    };

    let raw = cc.marshal()?;
    assert_eq!(raw.len() % 4, 0);

    let mut buf = &raw[..];
    let decoded = TransportLayerCc::unmarshal(&mut buf)?;
    assert_eq!(decoded, cc);
    Ok(())
}

#[test]
fn test_transport_layer_cc_mixed_chunks_with_large_delta() -> Result<(), util::Error> {
    let cc = TransportLayerCc {
        sender_ssrc: 1,
        media_ssrc: 2,
        base_sequence_number: 1000,
        packet_status_count: 7,
        reference_time: 1,
        fb_pkt_count: 0,
        packet_chunks: vec![PacketStatusChunk::StatusVectorChunk(StatusVectorChunk {
            type_tcc: StatusChunkTypeTcc::StatusVectorChunk,
            symbol_size: SymbolSizeTypeTcc::TwoBit,
            symbol_list: vec![
                SymbolTypeTcc::PacketReceivedSmallDelta,
                SymbolTypeTcc::PacketNotReceived,
                SymbolTypeTcc::PacketReceivedLargeDelta,
                SymbolTypeTcc::PacketNotReceived,
                SymbolTypeTcc::PacketNotReceived,
                SymbolTypeTcc::PacketReceivedSmallDelta,
                SymbolTypeTcc::PacketNotReceived,
            ],
        })],
        recv_deltas: vec![
            RecvDelta {
                type_tcc_packet: SymbolTypeTcc::PacketReceivedSmallDelta,
                delta: 500,
            },
            RecvDelta {
                type_tcc_packet: SymbolTypeTcc::PacketReceivedLargeDelta,
                delta: -1000,
            },
            RecvDelta {
                type_tcc_packet: SymbolTypeTcc::PacketReceivedSmallDelta,
                delta: 250,
            },
        ],
    };

    let raw = cc.marshal()?;
    let mut buf = &raw[..];
    let decoded = TransportLayerCc::unmarshal(&mut buf)?;
    assert_eq!(decoded, cc);
    Ok(())
}

#[test]
fn test_recv_delta_limits() {
    // small delta must fit one unsigned byte of ticks
    let d = RecvDelta {
        type_tcc_packet: SymbolTypeTcc::PacketReceivedSmallDelta,
        delta: 256 * TYPE_TCC_DELTA_SCALE_FACTOR,
    };
    let mut buf = [0u8; 2];
    assert!(d.marshal_to(&mut buf).is_err());

    // negative deltas require the large form
    let d = RecvDelta {
        type_tcc_packet: SymbolTypeTcc::PacketReceivedLargeDelta,
        delta: -250,
    };
    assert!(d.marshal_to(&mut buf).is_ok());
}
