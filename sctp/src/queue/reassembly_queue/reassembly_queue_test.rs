use super::*;

fn frag(
    tsn: u32,
    ssn: u16,
    begin: bool,
    end: bool,
    unordered: bool,
    data: &'static [u8],
) -> ChunkPayloadData {
    ChunkPayloadData {
        tsn,
        stream_identifier: 0,
        stream_sequence_number: ssn,
        beginning_fragment: begin,
        ending_fragment: end,
        unordered,
        user_data: Bytes::from_static(data),
        payload_type: PayloadProtocolIdentifier::Binary,
        ..Default::default()
    }
}

#[test]
fn test_ordered_single_chunk_message() {
    let mut q = ReassemblyQueue::new(0);
    assert!(q.push(frag(1, 0, true, true, false, b"abc")));

    let (data, ppid) = q.read().expect("message should be ready");
    assert_eq!(data, Bytes::from_static(b"abc"));
    assert_eq!(ppid, PayloadProtocolIdentifier::Binary);
    assert!(q.read().is_none());
}

#[test]
fn test_ordered_fragmented_message() {
    let mut q = ReassemblyQueue::new(0);
    q.push(frag(1, 0, true, false, false, b"ab"));
    assert!(q.read().is_none(), "incomplete message must not deliver");
    q.push(frag(2, 0, false, false, false, b"cd"));
    q.push(frag(3, 0, false, true, false, b"ef"));

    let (data, _) = q.read().unwrap();
    assert_eq!(data, Bytes::from_static(b"abcdef"));
}

#[test]
fn test_ordered_delivery_respects_ssn() {
    let mut q = ReassemblyQueue::new(0);
    // ssn 1 arrives before ssn 0
    q.push(frag(2, 1, true, true, false, b"second"));
    assert!(q.read().is_none(), "ssn 1 must wait for ssn 0");
    q.push(frag(1, 0, true, true, false, b"first"));

    assert_eq!(q.read().unwrap().0, Bytes::from_static(b"first"));
    assert_eq!(q.read().unwrap().0, Bytes::from_static(b"second"));
}

#[test]
fn test_unordered_delivers_immediately() {
    let mut q = ReassemblyQueue::new(0);
    // unordered message with a later TSN than pending ordered data
    q.push(frag(10, 5, true, true, false, b"ordered"));
    q.push(frag(11, 0, true, true, true, b"unordered"));

    assert_eq!(q.read().unwrap().0, Bytes::from_static(b"unordered"));
    assert!(q.read().is_none(), "ordered ssn 5 still blocked");
}

#[test]
fn test_forward_tsn_unblocks_ordered() {
    let mut q = ReassemblyQueue::new(0);
    // ssn 0 was abandoned by the sender; ssn 1 is complete
    q.push(frag(5, 1, true, true, false, b"kept"));
    assert!(q.read().is_none());

    q.forward_tsn_for_ordered(0);
    assert_eq!(q.read().unwrap().0, Bytes::from_static(b"kept"));
}

#[test]
fn test_byte_accounting() {
    let mut q = ReassemblyQueue::new(0);
    q.push(frag(1, 0, true, true, false, b"abcd"));
    assert_eq!(q.get_n_bytes(), 4);
    let _ = q.read();
    assert_eq!(q.get_n_bytes(), 0);
}
