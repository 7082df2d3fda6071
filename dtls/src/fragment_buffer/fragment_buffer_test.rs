use super::*;
use crate::handshake::HandshakeType;

fn fragment(seq: u16, total: u32, offset: u32, data: &[u8]) -> Vec<u8> {
    let header = HandshakeHeader {
        handshake_type: HandshakeType::Certificate,
        length: total,
        message_sequence: seq,
        fragment_offset: offset,
        fragment_length: data.len() as u32,
    };
    let mut out = header.marshal().unwrap();
    out.extend_from_slice(data);
    out
}

#[test]
fn test_single_fragment_pops() -> Result<()> {
    let mut fb = FragmentBuffer::new();
    fb.push(0, &fragment(0, 4, 0, &[1, 2, 3, 4]))?;

    let (epoch, full) = fb.pop().expect("message should be complete");
    assert_eq!(epoch, 0);
    assert_eq!(&full[HANDSHAKE_HEADER_LENGTH..], &[1, 2, 3, 4]);
    assert!(fb.pop().is_none());
    Ok(())
}

#[test]
fn test_out_of_order_fragments_assemble() -> Result<()> {
    let mut fb = FragmentBuffer::new();
    fb.push(0, &fragment(0, 6, 3, &[4, 5, 6]))?;
    assert!(fb.pop().is_none(), "half a message must not pop");
    fb.push(0, &fragment(0, 6, 0, &[1, 2, 3]))?;

    let (_, full) = fb.pop().expect("message should be complete");
    assert_eq!(&full[HANDSHAKE_HEADER_LENGTH..], &[1, 2, 3, 4, 5, 6]);
    Ok(())
}

#[test]
fn test_messages_pop_in_sequence_order() -> Result<()> {
    let mut fb = FragmentBuffer::new();
    fb.push(0, &fragment(1, 1, 0, &[0xbb]))?;
    assert!(fb.pop().is_none(), "seq 1 must wait for seq 0");
    fb.push(0, &fragment(0, 1, 0, &[0xaa]))?;

    let (_, first) = fb.pop().unwrap();
    assert_eq!(first[HANDSHAKE_HEADER_LENGTH], 0xaa);
    let (_, second) = fb.pop().unwrap();
    assert_eq!(second[HANDSHAKE_HEADER_LENGTH], 0xbb);
    Ok(())
}

#[test]
fn test_stale_retransmit_is_dropped() -> Result<()> {
    let mut fb = FragmentBuffer::new();
    fb.push(0, &fragment(0, 1, 0, &[0xaa]))?;
    let _ = fb.pop().unwrap();

    // retransmit of the already-popped message
    fb.push(0, &fragment(0, 1, 0, &[0xaa]))?;
    assert!(fb.pop().is_none());
    Ok(())
}
