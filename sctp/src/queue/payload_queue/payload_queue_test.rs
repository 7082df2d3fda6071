use bytes::Bytes;

use super::*;

fn chunk(tsn: u32) -> ChunkPayloadData {
    ChunkPayloadData {
        tsn,
        user_data: Bytes::from_static(b"data"),
        ..Default::default()
    }
}

#[test]
fn test_push_and_pop_in_order() {
    let mut q = PayloadQueue::new();
    assert!(q.push(chunk(1), 0));
    assert!(q.push(chunk(2), 0));
    assert_eq!(q.len(), 2);
    assert_eq!(q.get_n_bytes(), 8);

    assert!(q.pop(1).is_some());
    assert!(q.pop(1).is_none());
    assert_eq!(q.get_n_bytes(), 4);
}

#[test]
fn test_duplicates_are_reported() {
    let mut q = PayloadQueue::new();
    assert!(q.push(chunk(5), 0));
    assert!(!q.push(chunk(5), 0), "same TSN twice is a duplicate");
    assert!(!q.push(chunk(0), 3), "TSN at/below cumulative is a duplicate");
    assert_eq!(q.pop_duplicates(), vec![5, 0]);
    assert!(q.pop_duplicates().is_empty());
}

#[test]
fn test_gap_ack_blocks() {
    let mut q = PayloadQueue::new();
    // cumulative 10; received 12,13,14 and 17
    for tsn in [12u32, 13, 14, 17] {
        q.push(chunk(tsn), 10);
    }
    let blocks = q.get_gap_ack_blocks(10);
    assert_eq!(
        blocks,
        vec![
            GapAckBlock { start: 2, end: 4 },
            GapAckBlock { start: 7, end: 7 }
        ]
    );
}

#[test]
fn test_sorted_across_wraparound() {
    let mut q = PayloadQueue::new();
    q.push(chunk(u32::MAX), u32::MAX - 2);
    q.push(chunk(0), u32::MAX - 2);
    assert_eq!(q.sorted, vec![u32::MAX, 0]);
}
